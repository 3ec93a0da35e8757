/*!
Named, colored layers for one session. Base layers come from the manifest, user layers from uploads.
*/

use std::rc::Rc;

use indexmap::IndexMap;

use crate::geometry::GeometryCollection;

pub(crate) mod cache;
pub(crate) mod manifest;

pub(crate) type Rgba = [u8; 4];

/// Magenta, mostly opaque, so an uploaded boundary stands out against the base layers.
pub(crate) const USER_FILL_COLOR: Rgba = [255,0,255,180];

#[derive(Clone,Copy,Debug,PartialEq,Eq,Hash)]
pub(crate) enum LayerCategory {
    Base,
    User
}

impl LayerCategory {

    /// Whether a layer in this category is drawn before anyone has said otherwise.
    pub(crate) const fn visible_by_default(self) -> bool {
        match self {
            Self::Base => false,
            Self::User => true
        }
    }
}

#[derive(Clone,Debug)]
pub(crate) struct Layer {
    name: String,
    // shared with the base cache, the geometry is read-only once loaded
    geometry: Rc<GeometryCollection>,
    fill_color: Rgba,
    category: LayerCategory
}

impl Layer {

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn geometry(&self) -> &GeometryCollection {
        &self.geometry
    }

    pub(crate) const fn fill_color(&self) -> Rgba {
        self.fill_color
    }

    pub(crate) const fn category(&self) -> LayerCategory {
        self.category
    }
}

#[derive(Default)]
pub(crate) struct LayerRegistry {
    base: IndexMap<String,Layer>,
    user: IndexMap<String,Layer>
}

impl LayerRegistry {

    const fn layers(&self, category: LayerCategory) -> &IndexMap<String,Layer> {
        match category {
            LayerCategory::Base => &self.base,
            LayerCategory::User => &self.user
        }
    }

    /// Returns false, and changes nothing, if the category already has a layer with this name. The first one wins.
    pub(crate) fn register(&mut self, name: &str, geometry: Rc<GeometryCollection>, fill_color: Rgba, category: LayerCategory) -> bool {
        let layers = match category {
            LayerCategory::Base => &mut self.base,
            LayerCategory::User => &mut self.user
        };
        if layers.contains_key(name) {
            return false
        }
        _ = layers.insert(name.to_owned(), Layer {
            name: name.to_owned(),
            geometry,
            fill_color,
            category
        });
        true
    }

    /// Layers in registration order.
    pub(crate) fn list(&self, category: LayerCategory) -> impl Iterator<Item = &Layer> {
        self.layers(category).values()
    }

    pub(crate) fn get(&self, category: LayerCategory, name: &str) -> Option<&Layer> {
        self.layers(category).get(name)
    }

    pub(crate) fn contains(&self, category: LayerCategory, name: &str) -> bool {
        self.layers(category).contains_key(name)
    }

    pub(crate) fn len(&self, category: LayerCategory) -> usize {
        self.layers(category).len()
    }

}

/// Which layers the user wants drawn. Anything not mentioned falls back to its category's default.
#[derive(Clone,Debug,Default)]
pub(crate) struct LayerVisibility {
    overrides: IndexMap<(LayerCategory,String),bool>
}

impl LayerVisibility {

    pub(crate) fn set(&mut self, category: LayerCategory, name: &str, visible: bool) {
        _ = self.overrides.insert((category,name.to_owned()), visible);
    }

    pub(crate) fn is_visible(&self, layer: &Layer) -> bool {
        self.overrides.get(&(layer.category,layer.name.clone())).copied().unwrap_or_else(|| layer.category.visible_by_default())
    }

}
