//! Headless in-memory renderer.

use super::{LayerId, LayerSpec, MapAdapter, MapSource, ScreenQuery};
use crate::features::{
    Feature, FeatureCollection, FeatureId, LngLat, SourceDiff, SourceName, diff_feature_id,
};
use indexmap::IndexMap;
use kurbo::{Point, Rect};
use std::cell::RefCell;
use std::rc::Rc;

/// Default pixels per degree.
pub const DEFAULT_SCALE: f64 = 100.0;

/// Default hit radius of point queries, in pixels.
pub const DEFAULT_HIT_TOLERANCE: f64 = 5.0;

#[derive(Debug)]
struct MemoryMap {
    sources: IndexMap<SourceName, IndexMap<FeatureId, Feature>>,
    update_log: IndexMap<SourceName, Vec<SourceDiff>>,
    layers: IndexMap<LayerId, LayerSpec>,
    rejected_sources: Vec<SourceName>,
    scale: f64,
    hit_tolerance: f64,
}

impl Default for MemoryMap {
    fn default() -> Self {
        Self {
            sources: IndexMap::new(),
            update_log: IndexMap::new(),
            layers: IndexMap::new(),
            rejected_sources: Vec::new(),
            scale: DEFAULT_SCALE,
            hit_tolerance: DEFAULT_HIT_TOLERANCE,
        }
    }
}

fn keyed(collection: FeatureCollection) -> IndexMap<FeatureId, Feature> {
    collection
        .features
        .into_iter()
        .filter_map(|feature| diff_feature_id(&feature).map(|id| (id, feature)))
        .collect()
}

/// In-memory map used by tests and headless hosts.
///
/// Clones share the same underlying state, so a test can keep a handle to
/// inspect what the annotation core wrote after handing a clone over.
#[derive(Debug, Clone, Default)]
pub struct MemoryAdapter {
    map: Rc<RefCell<MemoryMap>>,
}

impl MemoryAdapter {
    /// Create an empty map with the default scale.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the projection scale in pixels per degree.
    pub fn with_scale(self, scale: f64) -> Self {
        self.map.borrow_mut().scale = scale;
        self
    }

    /// Make `add_source` fail for a source name.
    pub fn reject_source(&self, name: SourceName) {
        self.map.borrow_mut().rejected_sources.push(name);
    }

    /// Features currently held by a source, in insertion order.
    pub fn source_features(&self, name: SourceName) -> Vec<Feature> {
        self.map
            .borrow()
            .sources
            .get(&name)
            .map(|features| features.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Check if a source currently holds a feature.
    pub fn source_contains(&self, name: SourceName, id: &FeatureId) -> bool {
        self.map
            .borrow()
            .sources
            .get(&name)
            .is_some_and(|features| features.contains_key(id))
    }

    /// Every diff written to a source so far.
    pub fn update_calls(&self, name: SourceName) -> Vec<SourceDiff> {
        self.map
            .borrow()
            .update_log
            .get(&name)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of diffs written to a source so far.
    pub fn update_count(&self, name: SourceName) -> usize {
        self.map.borrow().update_log.get(&name).map_or(0, Vec::len)
    }

    /// Forget recorded diffs.
    pub fn clear_update_log(&self) {
        self.map.borrow_mut().update_log.clear();
    }

    /// Ids of all layers, in creation order.
    pub fn layer_ids(&self) -> Vec<LayerId> {
        self.map.borrow().layers.keys().cloned().collect()
    }

    /// Check if a source exists.
    pub fn has_source(&self, name: SourceName) -> bool {
        self.map.borrow().sources.contains_key(&name)
    }
}

fn overlaps(a: Rect, b: Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}

impl MapAdapter for MemoryAdapter {
    fn add_source(&mut self, name: SourceName, initial: FeatureCollection) -> Option<Box<dyn MapSource>> {
        let mut map = self.map.borrow_mut();
        if map.rejected_sources.contains(&name) || map.sources.contains_key(&name) {
            return None;
        }
        map.sources.insert(name, keyed(initial));
        Some(Box::new(MemorySource {
            name,
            map: self.map.clone(),
        }))
    }

    fn add_layer(&mut self, layer: LayerSpec) -> Option<LayerId> {
        let mut map = self.map.borrow_mut();
        if map.layers.contains_key(&layer.id) || !map.sources.contains_key(&layer.source) {
            return None;
        }
        let id = layer.id.clone();
        map.layers.insert(id.clone(), layer);
        Some(id)
    }

    fn get_layer(&self, id: &str) -> Option<LayerSpec> {
        self.map.borrow().layers.get(id).cloned()
    }

    fn remove_layer(&mut self, id: &str) -> bool {
        self.map.borrow_mut().layers.shift_remove(id).is_some()
    }

    fn project(&self, lng_lat: LngLat) -> Point {
        let scale = self.map.borrow().scale;
        Point::new(lng_lat[0] * scale, -lng_lat[1] * scale)
    }

    fn unproject(&self, point: Point) -> LngLat {
        let scale = self.map.borrow().scale;
        [point.x / scale, -point.y / scale]
    }

    fn query_features(&self, query: ScreenQuery, sources: &[SourceName]) -> Vec<FeatureId> {
        let map = self.map.borrow();
        let tolerance = map.hit_tolerance;
        let mut result = Vec::new();

        for name in sources {
            let Some(features) = map.sources.get(name) else {
                continue;
            };
            // Later features render on top.
            for (id, feature) in features.iter().rev() {
                let Some(bounds) = feature.geometry.bounds() else {
                    continue;
                };
                let screen = self.coord_bounds_to_screen_bounds(bounds);
                let hit = match query {
                    ScreenQuery::Point(point) => screen.inflate(tolerance, tolerance).contains(point),
                    ScreenQuery::Bounds(rect) => overlaps(screen, rect.abs()),
                };
                if hit {
                    result.push(id.clone());
                }
            }
        }
        result
    }
}

/// A source of a [`MemoryAdapter`].
#[derive(Debug)]
pub struct MemorySource {
    name: SourceName,
    map: Rc<RefCell<MemoryMap>>,
}

impl MapSource for MemorySource {
    fn name(&self) -> SourceName {
        self.name
    }

    fn get_geojson(&self) -> FeatureCollection {
        self.map
            .borrow()
            .sources
            .get(&self.name)
            .map(|features| features.values().cloned().collect::<Vec<_>>().into())
            .unwrap_or_default()
    }

    fn set_geojson(&mut self, collection: FeatureCollection) {
        self.map
            .borrow_mut()
            .sources
            .insert(self.name, keyed(collection));
    }

    fn update_data(&mut self, diff: &SourceDiff) {
        let mut map = self.map.borrow_mut();
        map.update_log.entry(self.name).or_default().push(diff.clone());

        let Some(features) = map.sources.get_mut(&self.name) else {
            log::error!("Source \"{}\" was removed", self.name);
            return;
        };
        for id in &diff.remove {
            features.shift_remove(id);
        }
        for feature in &diff.add {
            if let Some(id) = diff_feature_id(feature) {
                features.insert(id, feature.clone());
            }
        }
        for feature in &diff.update {
            let Some(id) = diff_feature_id(feature) else {
                continue;
            };
            match features.get_mut(&id) {
                Some(existing) => *existing = feature.clone(),
                None => log::warn!("Source \"{}\": update of unknown feature \"{}\"", self.name, id),
            }
        }
    }

    fn remove(self: Box<Self>) {
        self.map.borrow_mut().sources.shift_remove(&self.name);
    }
}
