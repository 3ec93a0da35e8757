/*!
The JSON handed to the map surface. The surface draws whatever it is given, so everything about how a layer
looks is decided here.
*/

use geojson::Feature;
use geojson::FeatureCollection;
use geojson::JsonObject;
use geojson::JsonValue;
use serde::Serialize;

use crate::algorithms::view::ViewDescriptor;
use crate::errors::CommandError;
use crate::geometry::AttributeValue;
use crate::geometry::GeometryCollection;
use crate::layers::Layer;
use crate::layers::LayerCategory;
use crate::layers::Rgba;

pub(crate) const MAP_STYLE: &str = "https://basemaps.cartocdn.com/gl/positron-gl-style/style.json";

#[derive(Clone,Copy,Debug,PartialEq)]
struct LayerStyle {
    stroke_color: Rgba,
    stroke_width: u8,
    opacity: f64
}

impl LayerStyle {

    const fn for_category(category: LayerCategory) -> Self {
        match category {
            LayerCategory::Base => Self {
                stroke_color: [0,0,0,255],
                stroke_width: 1,
                opacity: 0.7
            },
            LayerCategory::User => Self {
                stroke_color: [255,0,0,255],
                stroke_width: 2,
                opacity: 0.8
            }
        }
    }
}

#[derive(Debug,Serialize)]
pub(crate) struct RenderLayer {
    pub(crate) name: String,
    pub(crate) geometry: FeatureCollection,
    pub(crate) fill_color: Rgba,
    pub(crate) stroke_color: Rgba,
    pub(crate) stroke_width: u8,
    pub(crate) opacity: f64
}

impl RenderLayer {

    pub(crate) fn from_layer(layer: &Layer) -> Self {
        let style = LayerStyle::for_category(layer.category());
        Self {
            name: layer.name().to_owned(),
            geometry: to_feature_collection(layer.geometry()),
            fill_color: layer.fill_color(),
            stroke_color: style.stroke_color,
            stroke_width: style.stroke_width,
            opacity: style.opacity
        }
    }
}

#[derive(Debug,Serialize)]
pub(crate) struct RenderPayload {
    pub(crate) view: ViewDescriptor,
    pub(crate) map_style: &'static str,
    pub(crate) layers: Vec<RenderLayer>
}

impl RenderPayload {

    /// Layers are drawn in the order given, so callers pass base layers first.
    pub(crate) fn new<'layer, Layers: IntoIterator<Item = &'layer Layer>>(view: ViewDescriptor, layers: Layers) -> Self {
        Self {
            view,
            map_style: MAP_STYLE,
            layers: layers.into_iter().map(RenderLayer::from_layer).collect()
        }
    }

    pub(crate) fn to_json(&self) -> Result<String,CommandError> {
        serde_json::to_string_pretty(self).map_err(|e| CommandError::PayloadWrite(format!("{e}")))
    }
}

fn attribute_to_json(value: &AttributeValue) -> JsonValue {
    match value {
        AttributeValue::Integer(value) => JsonValue::from(*value),
        // NaN and infinity have no JSON form, from gives them null
        AttributeValue::Real(value) => JsonValue::from(*value),
        AttributeValue::Text(value) => JsonValue::from(value.as_str()),
        AttributeValue::Null => JsonValue::Null,
    }
}

pub(crate) fn to_feature_collection(collection: &GeometryCollection) -> FeatureCollection {
    let features = collection.features().iter().map(|feature| {
        let properties: JsonObject = feature.attributes.iter().map(|(name,value)| (name.clone(),attribute_to_json(value))).collect();
        Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&feature.geometry))),
            id: None,
            properties: Some(properties),
            foreign_members: None
        }
    }).collect();
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None
    }
}
