//! Renderer adapter abstraction.
//!
//! The annotation core never talks to a map library directly. It creates
//! sources and layers, projects coordinates and queries rendered features
//! through [`MapAdapter`], and writes feature diffs through [`MapSource`].

mod memory;

pub use memory::{MemoryAdapter, MemorySource};

use crate::features::{FeatureCollection, FeatureId, FeatureShape, LngLat, Properties, SourceDiff, SourceName};
use indexmap::IndexMap;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Sources created by the adapter, keyed by name in creation order.
pub type Sources = IndexMap<SourceName, Box<dyn MapSource>>;

/// Identifier of a renderer layer.
pub type LayerId = String;

/// A renderer-side collection of GeoJSON features.
pub trait MapSource {
    /// Name of the source.
    fn name(&self) -> SourceName;

    /// Current renderer content.
    fn get_geojson(&self) -> FeatureCollection;

    /// Replace the whole content.
    fn set_geojson(&mut self, collection: FeatureCollection);

    /// Apply an incremental diff (removes, then adds, then updates).
    fn update_data(&mut self, diff: &SourceDiff);

    /// Remove the source from the renderer.
    fn remove(self: Box<Self>);
}

/// Renderer layer kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerType {
    Circle,
    Line,
    Fill,
    Symbol,
}

impl LayerType {
    pub fn as_str(self) -> &'static str {
        match self {
            LayerType::Circle => "circle",
            LayerType::Line => "line",
            LayerType::Fill => "fill",
            LayerType::Symbol => "symbol",
        }
    }
}

/// Style of a layer, without id, source and filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialLayerStyle {
    #[serde(rename = "type")]
    pub layer_type: LayerType,
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub paint: Properties,
    #[serde(default, skip_serializing_if = "Properties::is_empty")]
    pub layout: Properties,
}

impl PartialLayerStyle {
    /// Create a style with empty paint and layout.
    pub fn new(layer_type: LayerType) -> Self {
        Self {
            layer_type,
            paint: Properties::new(),
            layout: Properties::new(),
        }
    }

    /// Set a paint property (builder style).
    pub fn with_paint(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.paint.insert(key.to_string(), value.into());
        self
    }
}

/// A fully specified layer handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerSpec {
    pub id: LayerId,
    pub source: SourceName,
    /// Shapes rendered by this layer (the layer filter).
    pub shapes: Vec<FeatureShape>,
    pub style: PartialLayerStyle,
}

/// Screen-space query region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScreenQuery {
    Point(Point),
    Bounds(Rect),
}

/// The map library as seen by the annotation core.
pub trait MapAdapter {
    /// Create a source. `None` if the renderer refuses it.
    fn add_source(&mut self, name: SourceName, initial: FeatureCollection) -> Option<Box<dyn MapSource>>;

    /// Create a layer. `None` if the renderer refuses it.
    fn add_layer(&mut self, layer: LayerSpec) -> Option<LayerId>;

    /// Look up a layer by id.
    fn get_layer(&self, id: &str) -> Option<LayerSpec>;

    /// Remove a layer. Returns whether it existed.
    fn remove_layer(&mut self, id: &str) -> bool;

    /// Geographic to screen coordinates.
    fn project(&self, lng_lat: LngLat) -> Point;

    /// Screen to geographic coordinates.
    fn unproject(&self, point: Point) -> LngLat;

    /// Screen rectangle covering `[south-west, north-east]` bounds.
    fn coord_bounds_to_screen_bounds(&self, bounds: [LngLat; 2]) -> Rect {
        Rect::from_points(self.project(bounds[0]), self.project(bounds[1]))
    }

    /// Ids of rendered features hit by the query, restricted to `sources`.
    fn query_features(&self, query: ScreenQuery, sources: &[SourceName]) -> Vec<FeatureId>;
}
