use std::path::Path;

use gdal::Dataset;
use gdal::vector::Feature;
use gdal::vector::Layer;
use gdal::vector::LayerAccess as _;
use indexmap::IndexMap;

use crate::errors::CommandError;
use crate::geometry::AttributeValue;
use crate::geometry::Crs;
use crate::geometry::FieldDef;
use crate::geometry::FieldKind;
use crate::geometry::GeometryCollection;
use crate::geometry::MapFeature;
use crate::progress::ProgressObserver;
use crate::progress::WatchableIterator as _;

// GDAL short names of the drivers whose files hold several named layers.
const CONTAINER_DRIVERS: [&str; 1] = ["GPKG"];

fn open_source(path: &Path) -> Result<Dataset,CommandError> {
    if !path.exists() {
        return Err(CommandError::FileNotFound(path.to_path_buf()))
    }
    Dataset::open(path).map_err(|e| CommandError::CorruptSource(format!("{}: {e}",path.display())))
}

fn is_container(dataset: &Dataset) -> bool {
    CONTAINER_DRIVERS.contains(&dataset.driver().short_name().as_str())
}

/// Layer identifiers in the order the source stores them.
pub(crate) fn list_layers(path: &Path) -> Result<Vec<String>,CommandError> {
    let dataset = open_source(path)?;
    Ok(dataset.layers().map(|layer| layer.name()).collect())
}

fn select_layer<'dataset>(dataset: &'dataset Dataset, layer_identifier: Option<&str>) -> Result<Layer<'dataset>,CommandError> {
    match layer_identifier {
        Some(identifier) => dataset.layer_by_name(identifier).map_err(|_| CommandError::CorruptSource(format!("layer '{identifier}' not found"))),
        None if is_container(dataset) => Err(CommandError::LayerRequired(dataset.layers().map(|layer| layer.name()).collect())),
        None => dataset.layer(0).map_err(|e| CommandError::CorruptSource(format!("{e}")))
    }
}

/// Loads one layer and reprojects it into the canonical CRS.
pub(crate) fn load<Progress: ProgressObserver>(path: &Path, layer_identifier: Option<&str>, progress: &mut Progress) -> Result<GeometryCollection,CommandError> {
    let dataset = open_source(path)?;
    let mut layer = select_layer(&dataset, layer_identifier)?;
    read_features(&mut layer, progress)?.reproject_to_canonical()
}

/// Loads one layer as it is stored, without reprojection. Only the offline tools want this.
pub(crate) fn load_native<Progress: ProgressObserver>(path: &Path, layer_identifier: &str, progress: &mut Progress) -> Result<GeometryCollection,CommandError> {
    let dataset = open_source(path)?;
    let mut layer = select_layer(&dataset, Some(layer_identifier))?;
    read_features(&mut layer, progress)
}

fn read_features<Progress: ProgressObserver>(layer: &mut Layer, progress: &mut Progress) -> Result<GeometryCollection,CommandError> {

    let name = layer.name();
    // without this there's no way to know where anything is
    let crs = match layer.spatial_ref() {
        Some(srs) => Crs::Source(srs.to_wkt()?),
        None => return Err(CommandError::MissingProjection(name))
    };
    let fields: Vec<FieldDef> = layer.defn().fields().map(|field| FieldDef {
        name: field.name(),
        kind: FieldKind::from_gdal(field.field_type())
    }).collect();

    let mut collection = GeometryCollection::new(crs, fields.clone());
    let mut skipped = 0;

    for feature in layer.features().watch(progress, format!("Reading {name}."), format!("{name} read.")) {
        let Some(geometry) = feature.geometry() else {
            skipped += 1;
            continue;
        };
        let geometry = geometry.to_geo().map_err(|e| CommandError::CorruptSource(format!("{name}: {e}")))?;
        let attributes = read_attributes(&feature, &fields)?;
        collection.push(MapFeature::new(geometry, attributes));
    }

    if skipped > 0 {
        progress.warning(|| format!("{skipped} features in {name} have no geometry and were skipped."));
    }
    if collection.is_empty() {
        progress.warning(|| format!("{name} has no features."));
    }

    Ok(collection)
}

fn read_attributes(feature: &Feature, fields: &[FieldDef]) -> Result<IndexMap<String,AttributeValue>,CommandError> {
    let mut attributes = IndexMap::new();
    for field in fields {
        let name = field.name.as_str();
        let value = match field.kind {
            FieldKind::Integer => feature.field_as_integer64_by_name(name)?.map(AttributeValue::Integer),
            FieldKind::Real => feature.field_as_double_by_name(name)?.map(AttributeValue::Real),
            FieldKind::Text => feature.field_as_string_by_name(name)?.map(AttributeValue::Text),
        };
        _ = attributes.insert(field.name.clone(), value.unwrap_or(AttributeValue::Null));
    }
    Ok(attributes)
}

#[cfg(test)]
pub(crate) mod test {
    use std::path::Path;

    use gdal::DriverManager;
    use gdal::LayerOptions;
    use gdal::spatial_ref::SpatialRef;
    use gdal::vector::LayerAccess as _;
    use gdal::vector::OGRFieldType;
    use gdal::vector::OGRwkbGeometryType;
    use gdal::vector::ToGdal as _;
    use geo_types::Geometry;
    use geo_types::polygon;
    use tempfile::TempDir;

    use super::list_layers;
    use super::load;
    use super::load_native;
    use crate::errors::CommandError;
    use crate::geometry::AttributeValue;
    use crate::geometry::Crs;

    pub(crate) fn square(west: f64, south: f64, size: f64) -> Geometry<f64> {
        Geometry::Polygon(polygon![
            (x: west, y: south),
            (x: west + size, y: south),
            (x: west + size, y: south + size),
            (x: west, y: south + size),
            (x: west, y: south),
        ])
    }

    /// Writes a layer of squares named by a "name" field. `epsg` of None writes no CRS at all.
    pub(crate) fn write_fixture(path: &Path, driver: &str, layers: &[(&str,Option<u32>,&[(&str,Geometry<f64>)])]) {
        let driver = DriverManager::get_driver_by_name(driver).unwrap();
        let mut dataset = driver.create_vector_only(path).unwrap();
        for (layer_name,epsg,features) in layers {
            let srs = epsg.map(|epsg| SpatialRef::from_epsg(epsg).unwrap());
            let mut layer = dataset.create_layer(LayerOptions {
                name: *layer_name,
                ty: OGRwkbGeometryType::wkbPolygon,
                srs: srs.as_ref(),
                ..Default::default()
            }).unwrap();
            layer.create_defn_fields(&[("name",OGRFieldType::OFTString),("area_ha",OGRFieldType::OFTReal)]).unwrap();
            for (name,geometry) in *features {
                layer.create_feature_fields(geometry.to_gdal().unwrap(), &["name","area_ha"], &[
                    gdal::vector::FieldValue::StringValue((*name).to_owned()),
                    gdal::vector::FieldValue::RealValue(1.5),
                ]).unwrap();
            }
        }
    }

    #[test]
    fn test_missing_file() {
        let result = load(Path::new("/no/such/boundary.shp"), None, &mut ());
        assert!(matches!(result,Err(CommandError::FileNotFound(_))));
    }

    #[test]
    fn test_garbage_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbage.gpkg");
        std::fs::write(&path, b"this is not a geopackage").unwrap();
        assert!(matches!(load(&path, None, &mut ()),Err(CommandError::CorruptSource(_))));
    }

    #[test]
    fn test_geopackage_requires_layer() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sites.gpkg");
        write_fixture(&path, "GPKG", &[
            ("parcels",Some(4326),&[("north",square(-1.0, 52.0, 0.01))]),
            ("access",Some(4326),&[("lane",square(-1.1, 52.1, 0.01))]),
        ]);
        assert_eq!(list_layers(&path).unwrap(),vec!["parcels".to_owned(),"access".to_owned()]);
        match load(&path, None, &mut ()) {
            Err(CommandError::LayerRequired(layers)) => assert_eq!(layers.len(),2),
            other => panic!("expected LayerRequired, got {other:?}")
        }
        let access = load(&path, Some("access"), &mut ()).unwrap();
        assert_eq!(access.len(),1);
        assert_eq!(access.features()[0].attributes.get("name"),Some(&AttributeValue::Text("lane".to_owned())));
        assert_eq!(access.features()[0].attributes.get("area_ha"),Some(&AttributeValue::Real(1.5)));
        assert!(matches!(load(&path, Some("nope"), &mut ()),Err(CommandError::CorruptSource(_))));
    }

    #[test]
    fn test_shapefile_reprojected_from_british_grid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("parcel.shp");
        write_fixture(&path, "ESRI Shapefile", &[("parcel",Some(27700),&[("field",square(430_000.0, 290_000.0, 500.0))])]);
        let collection = load(&path, None, &mut ()).unwrap();
        assert_eq!(collection.crs(),&Crs::Canonical);
        let bounds = collection.bounding_box().unwrap();
        assert!(bounds.min_x > -2.0 && bounds.max_x < -1.0);
        assert!(bounds.min_y > 52.0 && bounds.max_y < 53.0);

        let native = load_native(&path, "parcel", &mut ()).unwrap();
        assert!(matches!(native.crs(),Crs::Source(_)));
        assert!(native.bounding_box().unwrap().min_x >= 430_000.0 - 1e-6);
    }

    #[test]
    fn test_source_without_projection_fails_loudly() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no_prj.shp");
        write_fixture(&path, "ESRI Shapefile", &[("no_prj",None,&[("field",square(0.0, 0.0, 1.0))])]);
        assert!(matches!(load(&path, None, &mut ()),Err(CommandError::MissingProjection(_))));
    }

    #[test]
    fn test_empty_layer_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.gpkg");
        write_fixture(&path, "GPKG", &[("nothing",Some(4326),&[])]);
        let collection = load(&path, Some("nothing"), &mut ()).unwrap();
        assert!(collection.is_empty());
        assert_eq!(collection.fields().len(),2);
    }
}
