use gdal::spatial_ref::AxisMappingStrategy;
use gdal::spatial_ref::CoordTransform;
use gdal::spatial_ref::SpatialRef;
use gdal::vector::Geometry as GDALGeometry;
use gdal::vector::OGRFieldType;
use gdal::vector::ToGdal as _;
use geo::CoordsIter as _;
use geo_types::Geometry;
use indexmap::IndexMap;

use crate::errors::CommandError;
use crate::utils::extent::BoundingBox;

/// WGS 84. Everything on the map is in this system, with longitude as x.
pub(crate) const CANONICAL_EPSG: u32 = 4326;

#[derive(Clone,Debug,PartialEq)]
pub(crate) enum Crs {
    Canonical,
    /// WKT of a source coordinate system which has not been reprojected yet.
    Source(String)
}

#[derive(Clone,Debug,PartialEq)]
pub(crate) enum AttributeValue {
    Integer(i64),
    Real(f64),
    Text(String),
    Null
}

#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub(crate) enum FieldKind {
    Integer,
    Real,
    Text
}

impl FieldKind {

    pub(crate) const fn from_gdal(field_type: OGRFieldType::Type) -> Self {
        match field_type {
            OGRFieldType::OFTInteger | OGRFieldType::OFTInteger64 => Self::Integer,
            OGRFieldType::OFTReal => Self::Real,
            _ => Self::Text
        }
    }

    pub(crate) const fn to_gdal(self) -> OGRFieldType::Type {
        match self {
            Self::Integer => OGRFieldType::OFTInteger64,
            Self::Real => OGRFieldType::OFTReal,
            Self::Text => OGRFieldType::OFTString,
        }
    }
}

#[derive(Clone,Debug,PartialEq,Eq)]
pub(crate) struct FieldDef {
    pub(crate) name: String,
    pub(crate) kind: FieldKind
}

#[derive(Clone,Debug)]
pub(crate) struct MapFeature {
    pub(crate) geometry: Geometry<f64>,
    pub(crate) attributes: IndexMap<String,AttributeValue>
}

impl MapFeature {

    pub(crate) const fn new(geometry: Geometry<f64>, attributes: IndexMap<String,AttributeValue>) -> Self {
        Self {
            geometry,
            attributes
        }
    }
}

/// An ordered set of features read from one source layer.
#[derive(Clone,Debug)]
pub(crate) struct GeometryCollection {
    crs: Crs,
    fields: Vec<FieldDef>,
    features: Vec<MapFeature>
}

impl GeometryCollection {

    pub(crate) const fn new(crs: Crs, fields: Vec<FieldDef>) -> Self {
        Self {
            crs,
            fields,
            features: Vec::new()
        }
    }

    pub(crate) const fn canonical(fields: Vec<FieldDef>) -> Self {
        Self::new(Crs::Canonical, fields)
    }

    pub(crate) fn push(&mut self, feature: MapFeature) {
        self.features.push(feature)
    }

    pub(crate) const fn crs(&self) -> &Crs {
        &self.crs
    }

    pub(crate) fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub(crate) fn features(&self) -> &[MapFeature] {
        &self.features
    }

    pub(crate) fn len(&self) -> usize {
        self.features.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub(crate) fn vertex_count(&self) -> usize {
        self.features.iter().map(|feature| feature.geometry.coords_count()).sum()
    }

    /// None if there are no features, or none of them have any coordinates.
    pub(crate) fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::union_all(self.features.iter().filter_map(|feature| BoundingBox::from_geometry(&feature.geometry)))
    }

    /// Swaps in new geometry for every feature, in feature order. Attributes are untouched.
    pub(crate) fn replace_geometries(&mut self, geometries: Vec<Geometry<f64>>) {
        debug_assert_eq!(geometries.len(),self.features.len());
        for (feature,geometry) in self.features.iter_mut().zip(geometries) {
            feature.geometry = geometry;
        }
    }

    pub(crate) fn reproject_to_canonical(self) -> Result<Self,CommandError> {
        let wkt = match &self.crs {
            Crs::Canonical => return Ok(self),
            Crs::Source(wkt) => wkt
        };
        let mut source = SpatialRef::from_wkt(wkt)?;
        source.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
        let reprojector = Reprojector::from_source(&source)?;
        let mut result = Self::canonical(self.fields);
        for feature in self.features {
            let geometry = reprojector.reproject(&feature.geometry.to_gdal()?)?;
            result.push(MapFeature::new(geometry, feature.attributes));
        }
        Ok(result)
    }

}

pub(crate) fn canonical_spatial_ref() -> Result<SpatialRef,CommandError> {
    let mut srs = SpatialRef::from_epsg(CANONICAL_EPSG)?;
    // EPSG:4326 is officially lat/lon, but the map wants x to be longitude.
    srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
    Ok(srs)
}

/// Moves GDAL geometries from one source coordinate system into the canonical one.
pub(crate) struct Reprojector {
    // None when the source is already canonical
    transform: Option<CoordTransform>
}

impl Reprojector {

    pub(crate) fn from_source(source: &SpatialRef) -> Result<Self,CommandError> {
        let target = canonical_spatial_ref()?;
        let transform = if source == &target {
            None
        } else {
            Some(CoordTransform::new(source, &target)?)
        };
        Ok(Self {
            transform
        })
    }

    pub(crate) fn reproject(&self, geometry: &GDALGeometry) -> Result<Geometry<f64>,CommandError> {
        let converted = if let Some(transform) = &self.transform {
            geometry.transform(transform)?.to_geo()
        } else {
            geometry.to_geo()
        };
        converted.map_err(|e| CommandError::CorruptSource(format!("{e}")))
    }
}
