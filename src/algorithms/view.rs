use serde::Serialize;

use crate::errors::CommandError;
use crate::geometry::GeometryCollection;
use crate::utils::extent::BoundingBox;

#[derive(Clone,Debug,PartialEq,Serialize)]
pub(crate) struct ViewDescriptor {
    pub(crate) center_latitude: f64,
    pub(crate) center_longitude: f64,
    pub(crate) zoom_level: u8
}

impl Default for ViewDescriptor {

    // roughly the middle of England, where the base datasets are
    fn default() -> Self {
        Self {
            center_latitude: 52.0,
            center_longitude: -1.0,
            zoom_level: 6
        }
    }
}

/// Maps the larger side of a bounding box (in degrees) to a web map zoom level. This is a rule of
/// thumb for "fits on screen", not a scale calculation.
#[derive(Clone,Debug,PartialEq)]
pub(crate) struct ZoomTable {
    // (exclusive lower bound, zoom), largest extent first
    steps: Vec<(f64,u8)>,
    fallback: u8
}

impl ZoomTable {

    pub(crate) fn new(mut steps: Vec<(f64,u8)>, fallback: u8) -> Self {
        steps.sort_by(|(a,_),(b,_)| b.total_cmp(a));
        Self {
            steps,
            fallback
        }
    }

    pub(crate) fn zoom_for(&self, max_dimension: f64) -> u8 {
        self.steps.iter().find(|(above,_)| max_dimension > *above).map_or(self.fallback, |(_,zoom)| *zoom)
    }
}

impl Default for ZoomTable {

    fn default() -> Self {
        Self::new(vec![
            (10.0,5),
            (5.0,6),
            (2.0,7),
            (1.0,8),
            (0.5,9),
            (0.1,11),
            (0.05,12),
        ], 13)
    }
}

pub(crate) fn view_for_bounds(bounds: &BoundingBox, table: &ZoomTable) -> ViewDescriptor {
    let (center_longitude,center_latitude) = bounds.center();
    ViewDescriptor {
        center_latitude,
        center_longitude,
        zoom_level: table.zoom_for(bounds.max_dimension())
    }
}

/// Fits the view to everything in all of the collections. Empty collections are ignored, but there
/// has to be something left.
pub(crate) fn compute_view<'collection, Collections: IntoIterator<Item = &'collection GeometryCollection>>(collections: Collections, table: &ZoomTable) -> Result<ViewDescriptor,CommandError> {
    let bounds = BoundingBox::union_all(collections.into_iter().filter_map(GeometryCollection::bounding_box)).ok_or(CommandError::NoGeometry)?;
    Ok(view_for_bounds(&bounds, table))
}
