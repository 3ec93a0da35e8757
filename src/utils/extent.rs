use geo::BoundingRect;
use geo_types::Geometry;

/// Axis-aligned bounds in map coordinates (degrees once the data is in the canonical CRS).
#[derive(Clone,Debug,PartialEq)]
pub(crate) struct BoundingBox {
    pub(crate) min_x: f64,
    pub(crate) min_y: f64,
    pub(crate) max_x: f64,
    pub(crate) max_y: f64,
}

impl BoundingBox {

    pub(crate) const fn from_bounds(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y
        }
    }

    pub(crate) fn from_geometry(geometry: &Geometry<f64>) -> Option<Self> {
        // empty geometries (and empty collections) have no rect
        geometry.bounding_rect().map(|rect| Self::from_bounds(rect.min().x, rect.min().y, rect.max().x, rect.max().y))
    }

    /// Smallest box containing both boxes.
    pub(crate) fn union(&self, other: &Self) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub(crate) fn union_all<Boxes: IntoIterator<Item = Self>>(boxes: Boxes) -> Option<Self> {
        boxes.into_iter().reduce(|combined, next| combined.union(&next))
    }

    pub(crate) fn width(&self) -> f64 {
        (self.max_x - self.min_x).abs()
    }

    pub(crate) fn height(&self) -> f64 {
        (self.max_y - self.min_y).abs()
    }

    pub(crate) fn max_dimension(&self) -> f64 {
        self.width().max(self.height())
    }

    pub(crate) fn center(&self) -> (f64,f64) {
        (self.min_x.midpoint(self.max_x),self.min_y.midpoint(self.max_y))
    }

}
