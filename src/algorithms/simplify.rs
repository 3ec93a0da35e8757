use gdal::vector::ToGdal as _;
use geo::Area as _;
use geo_types::Geometry;

use crate::errors::CommandError;
use crate::geometry::GeometryCollection;
use crate::progress::ProgressObserver;
use crate::progress::WatchableIterator as _;

/// Tolerances are in coordinate units, which are degrees once a collection has been loaded.
#[derive(Clone,Copy,Debug,PartialEq)]
pub(crate) struct SimplifySettings {
    pub(crate) feature_count_threshold: usize,
    pub(crate) tolerance_small: f64,
    pub(crate) tolerance_large: f64,
}

impl SimplifySettings {

    /// Large layers get the coarser tolerance. A count equal to the threshold is still "small".
    pub(crate) const fn tolerance_for(&self, feature_count: usize) -> f64 {
        if feature_count > self.feature_count_threshold {
            self.tolerance_large
        } else {
            self.tolerance_small
        }
    }
}

impl Default for SimplifySettings {

    fn default() -> Self {
        Self {
            feature_count_threshold: 5000,
            tolerance_small: 0.0001,
            tolerance_large: 0.002
        }
    }
}

#[derive(Clone,Copy,Debug,PartialEq)]
pub(crate) enum Tolerance {
    Adaptive(SimplifySettings),
    /// Overrides the adaptive choice for one collection, for datasets that need something coarser.
    Fixed(f64)
}

impl Tolerance {

    pub(crate) const fn resolve(&self, feature_count: usize) -> f64 {
        match self {
            Self::Adaptive(settings) => settings.tolerance_for(feature_count),
            Self::Fixed(tolerance) => *tolerance
        }
    }
}

impl Default for Tolerance {

    fn default() -> Self {
        Self::Adaptive(SimplifySettings::default())
    }
}

pub(crate) trait GeometrySimplifier {

    fn simplify_geometry(&self, geometry: &Geometry<f64>, tolerance: f64) -> Result<Geometry<f64>,CommandError>;

}

/// GEOS' topology preserving simplifier (through GDAL). Unlike plain Douglas-Peucker, it won't let
/// rings cross or collapse.
pub(crate) struct TopologyPreserving;

impl GeometrySimplifier for TopologyPreserving {

    fn simplify_geometry(&self, geometry: &Geometry<f64>, tolerance: f64) -> Result<Geometry<f64>,CommandError> {
        match geometry {
            // nothing to remove
            Geometry::Point(_) | Geometry::MultiPoint(_) => Ok(geometry.clone()),
            Geometry::Line(_) | Geometry::LineString(_) | Geometry::Polygon(_) | Geometry::MultiLineString(_) | Geometry::MultiPolygon(_) | Geometry::GeometryCollection(_) | Geometry::Rect(_) | Geometry::Triangle(_) => {
                let simplified = geometry.to_gdal()?.simplify_preserve_topology(tolerance)?;
                simplified.to_geo().map_err(|e| CommandError::SimplificationFailed(format!("{e}")))
            }
        }
    }
}

fn ring_count(geometry: &Geometry<f64>) -> usize {
    match geometry {
        Geometry::Polygon(polygon) => 1 + polygon.interiors().len(),
        Geometry::MultiPolygon(polygons) => polygons.iter().map(|polygon| 1 + polygon.interiors().len()).sum(),
        Geometry::GeometryCollection(collection) => collection.iter().map(ring_count).sum(),
        Geometry::Rect(_) | Geometry::Triangle(_) => 1,
        Geometry::Point(_) | Geometry::Line(_) | Geometry::LineString(_) | Geometry::MultiPoint(_) | Geometry::MultiLineString(_) => 0
    }
}

fn is_valid(geometry: &Geometry<f64>) -> Result<bool,CommandError> {
    Ok(geometry.to_gdal()?.is_valid())
}

/// Rejects a simplified geometry which lost a ring, collapsed to zero area, or became invalid when the input was valid.
fn check_simplified(original: &Geometry<f64>, simplified: &Geometry<f64>) -> Result<(),CommandError> {
    let original_rings = ring_count(original);
    if original_rings == 0 {
        return Ok(())
    }
    if ring_count(simplified) < original_rings {
        return Err(CommandError::SimplificationFailed("a ring collapsed".to_owned()))
    }
    if original.unsigned_area() > 0.0 && simplified.unsigned_area() <= 0.0 {
        return Err(CommandError::SimplificationFailed("a polygon collapsed to zero area".to_owned()))
    }
    if is_valid(original)? && !is_valid(simplified)? {
        return Err(CommandError::SimplificationFailed("simplification produced an invalid polygon".to_owned()))
    }
    Ok(())
}

fn simplified_geometries<Progress: ProgressObserver, Simplifier: GeometrySimplifier>(collection: &GeometryCollection, tolerance: f64, simplifier: &Simplifier, progress: &mut Progress) -> Result<Vec<Geometry<f64>>,CommandError> {
    let mut result = Vec::with_capacity(collection.len());
    for feature in collection.features().iter().watch(progress,"Simplifying geometry.","Geometry simplified.") {
        let simplified = simplifier.simplify_geometry(&feature.geometry, tolerance)?;
        check_simplified(&feature.geometry, &simplified)?;
        result.push(simplified);
    }
    Ok(result)
}

/**
Reduces the vertex count of every feature. This only ever trades accuracy for rendering speed: if any
feature can't be simplified cleanly, the whole collection is returned as it was, with a warning.
*/
pub(crate) fn simplify_with<Progress: ProgressObserver, Simplifier: GeometrySimplifier>(mut collection: GeometryCollection, tolerance: &Tolerance, simplifier: &Simplifier, progress: &mut Progress) -> GeometryCollection {
    let tolerance = tolerance.resolve(collection.len());
    match simplified_geometries(&collection, tolerance, simplifier, progress) {
        Ok(geometries) => {
            let before = collection.vertex_count();
            collection.replace_geometries(geometries);
            progress.message(|| format!("Simplified at {tolerance}: {before} vertices down to {}.",collection.vertex_count()));
        },
        Err(err) => progress.warning(|| format!("{err} Using the original geometry.")),
    }
    collection
}

pub(crate) fn simplify<Progress: ProgressObserver>(collection: GeometryCollection, tolerance: &Tolerance, progress: &mut Progress) -> GeometryCollection {
    simplify_with(collection, tolerance, &TopologyPreserving, progress)
}
