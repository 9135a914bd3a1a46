//! Feature store.
//!
//! [`Features`] owns the canonical `id -> FeatureData` map and the renderer
//! sources. Every mutation is mirrored to the owning source as a
//! [`SourceDiff`] through the [`SourceUpdateManager`].

mod data;
mod geojson;
mod layers;
mod source_update;

pub use data::{
    FEATURE_ID_PROPERTY, FeatureData, FeatureShape, FeatureSnapshot, HelperShape, MarkerKind,
    SHAPE_PROPERTY, ShapeName, SourceName, shape_of_geojson,
};
pub use geojson::{
    Feature, FeatureCollection, FeatureId, GeoJson, Geometry, GeometryType, LngLat, Properties,
};
pub use source_update::{
    MAX_PENDING_DIFFS, SourceDiff, SourceUpdateManager, diff_feature_id, merge_geojson_diff,
};

use crate::adapter::{LayerId, MapAdapter, ScreenQuery, Sources};
use crate::error::{Error, Result};
use crate::events::PointerEvent;
use crate::options::{IdGenerator, Options, Settings};
use indexmap::IndexMap;
use kurbo::Rect;
use serde_json::Value;

/// Arguments of [`Features::create_feature`].
#[derive(Debug, Clone)]
pub struct CreateFeature {
    pub geojson: Feature,
    pub source: SourceName,
    /// Overrides the shape read from the `shape` property or the geometry.
    pub shape: Option<FeatureShape>,
    pub id: Option<FeatureId>,
    pub parent: Option<FeatureId>,
    /// Imported features do not fire creation events.
    pub imported: bool,
}

impl CreateFeature {
    pub fn new(geojson: Feature, source: SourceName) -> Self {
        Self {
            geojson,
            source,
            shape: None,
            id: None,
            parent: None,
            imported: false,
        }
    }

    pub fn with_id(mut self, id: impl Into<FeatureId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_shape(mut self, shape: impl Into<FeatureShape>) -> Self {
        self.shape = Some(shape.into());
        self
    }

    pub fn with_parent(mut self, parent: FeatureId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn imported(mut self) -> Self {
        self.imported = true;
        self
    }
}

/// Counts of an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
}

/// Result of [`Features::import_geojson`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportResult {
    pub stats: ImportStats,
    pub added_features: Vec<FeatureId>,
}

/// The feature store.
pub struct Features {
    counter: u64,
    store: IndexMap<FeatureId, FeatureData>,
    sources: Sources,
    update_manager: SourceUpdateManager,
    default_source: SourceName,
    id_generator: IdGenerator,
    max_generic_layers: usize,
    layers: Vec<LayerId>,
}

impl Default for Features {
    fn default() -> Self {
        let settings = Settings::default();
        Self {
            counter: 0,
            store: IndexMap::new(),
            sources: Sources::new(),
            update_manager: SourceUpdateManager::new(),
            default_source: settings.default_source,
            id_generator: settings.id_generator,
            max_generic_layers: settings.max_generic_layers,
            layers: Vec::new(),
        }
    }
}

impl Features {
    /// Create an empty store without sources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the configured sources and, if enabled, the default layers.
    ///
    /// A second call logs a warning and does nothing. On failure everything
    /// created so far is removed again, so a later call starts over.
    pub fn init(&mut self, adapter: &mut dyn MapAdapter, options: &Options) -> Result<()> {
        if !self.sources.is_empty() {
            log::warn!("features.init(): features are already initialized");
            return Ok(());
        }

        let settings = &options.settings;
        self.default_source = settings.default_source;
        self.id_generator = settings.id_generator.clone();
        self.max_generic_layers = settings.max_generic_layers;

        let result = self.create_sources(adapter, options);
        if let Err(err) = &result {
            log::error!("features.init(): {}, removing created sources", err);
            self.destroy(adapter);
        }
        result
    }

    fn create_sources(&mut self, adapter: &mut dyn MapAdapter, options: &Options) -> Result<()> {
        for name in &options.settings.sources {
            if self.sources.contains_key(name) {
                continue;
            }
            let source = adapter
                .add_source(*name, FeatureCollection::new())
                .ok_or(Error::SourceCreation(*name))?;
            log::debug!("Created source \"{}\"", name);
            self.sources.insert(*name, source);
        }

        if options.settings.use_default_layers {
            self.layers = self.create_layers(adapter, &options.layer_styles)?;
        }
        Ok(())
    }

    /// Remove layers and sources from the renderer and forget all features,
    /// pending diffs and the id counter.
    pub fn destroy(&mut self, adapter: &mut dyn MapAdapter) {
        for layer in self.layers.drain(..) {
            adapter.remove_layer(&layer);
        }
        for (_, source) in self.sources.drain(..) {
            source.remove();
        }
        self.store.clear();
        self.update_manager = SourceUpdateManager::new();
        self.counter = 0;
    }

    /// Check if a source was created.
    pub fn has_source(&self, source: SourceName) -> bool {
        self.sources.contains_key(&source)
    }

    /// Names of the created sources.
    pub fn source_names(&self) -> Vec<SourceName> {
        self.sources.keys().copied().collect()
    }

    /// Get the source used by imports.
    pub fn default_source(&self) -> SourceName {
        self.default_source
    }

    pub fn set_default_source(&mut self, source: SourceName) {
        self.default_source = source;
    }

    /// Ids of the layers created on init.
    pub fn layers(&self) -> &[LayerId] {
        &self.layers
    }

    fn new_feature_id(&mut self, geojson: &Feature) -> FeatureId {
        self.counter += 1;
        match &self.id_generator {
            IdGenerator::Counter => loop {
                let id = FeatureId::new(format!("feature-{}", self.counter));
                if !self.store.contains_key(&id) {
                    return id;
                }
                self.counter += 1;
            },
            IdGenerator::Uuid => FeatureId::new(uuid::Uuid::new_v4().to_string()),
            IdGenerator::Custom(generate) => generate(geojson),
        }
    }

    /// Register a feature and queue its addition to the source.
    ///
    /// The id is the explicit one, then the id property of the GeoJSON, then
    /// a generated one. Returns `None` (and logs) if the id is taken, the
    /// source or the parent is missing, or the shape cannot be resolved.
    pub fn create_feature(&mut self, request: CreateFeature) -> Option<&FeatureData> {
        let CreateFeature {
            geojson,
            source,
            shape,
            id,
            parent,
            imported: _,
        } = request;

        if !self.sources.contains_key(&source) {
            log::error!("Features.create_feature: missing source \"{}\"", source);
            return None;
        }

        let shape = shape
            .or_else(|| geojson.property_str(SHAPE_PROPERTY).and_then(FeatureShape::parse))
            .or_else(|| shape_of_geojson(&geojson).map(FeatureShape::Shape));
        let Some(shape) = shape else {
            log::error!("Features.create_feature: unknown shape of {:?}", geojson.geometry.geometry_type());
            return None;
        };

        if let Some(parent) = parent.as_ref().filter(|parent| !self.store.contains_key(*parent)) {
            log::error!("Features.create_feature: parent \"{}\" not found", parent);
            return None;
        }

        let id = match id.or_else(|| geojson.property_id(FEATURE_ID_PROPERTY)) {
            Some(id) => id,
            None => self.new_feature_id(&geojson),
        };
        if self.store.contains_key(&id) {
            log::error!("Features.create_feature: feature with the id \"{}\" already exists", id);
            return None;
        }

        let data = FeatureData::new(id.clone(), shape, geojson, source, parent);
        self.update_manager
            .update_source(&mut self.sources, source, SourceDiff::add(data.geojson.clone()));
        self.store.insert(id.clone(), data);
        self.store.get(&id)
    }

    /// Create a helper marker bound to a parent feature.
    pub fn create_marker_feature(
        &mut self,
        parent: &FeatureId,
        coordinate: LngLat,
        kind: MarkerKind,
        source: SourceName,
    ) -> Option<&FeatureData> {
        let shape = HelperShape::from(kind);
        let geojson = Feature::new(Geometry::Point { coordinates: coordinate });
        self.create_feature(
            CreateFeature::new(geojson, source)
                .with_shape(shape)
                .with_parent(parent.clone()),
        )
    }

    /// Get a feature if it lives in `source`.
    pub fn get(&self, source: SourceName, id: &FeatureId) -> Option<&FeatureData> {
        self.store.get(id).filter(|data| data.source == source)
    }

    /// Check if a feature lives in `source`.
    pub fn has(&self, source: SourceName, id: &FeatureId) -> bool {
        self.get(source, id).is_some()
    }

    /// Get a feature from any source.
    pub fn get_any(&self, id: &FeatureId) -> Option<&FeatureData> {
        self.store.get(id)
    }

    /// Iterate over non-temporary features.
    pub fn iter(&self) -> impl Iterator<Item = &FeatureData> {
        self.store.values().filter(|data| !data.temporary())
    }

    /// Iterate over temporary features.
    pub fn iter_temporary(&self) -> impl Iterator<Item = &FeatureData> {
        self.store.values().filter(|data| data.temporary())
    }

    /// Number of features in all sources.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Direct children of a feature.
    pub fn children_of(&self, id: &FeatureId) -> Vec<FeatureId> {
        self.store
            .values()
            .filter(|data| data.parent.as_ref() == Some(id))
            .map(|data| data.id.clone())
            .collect()
    }

    /// Delete a feature and, first, all of its descendants.
    pub fn delete(&mut self, id: &FeatureId) -> bool {
        if !self.store.contains_key(id) {
            log::error!("features.delete: feature \"{}\" not found", id);
            return false;
        }

        for child in self.children_of(id) {
            self.delete(&child);
        }

        if let Some(data) = self.store.shift_remove(id) {
            self.update_manager
                .update_source(&mut self.sources, data.source, SourceDiff::remove(data.id));
        }
        true
    }

    /// Delete every feature in one atomic batch.
    pub fn delete_all(&mut self) {
        self.begin_atomic();
        for (id, data) in self.store.drain(..) {
            self.update_manager
                .update_source(&mut self.sources, data.source, SourceDiff::remove(id));
        }
        self.finish_atomic();
    }

    /// Move a feature to another source, keeping its id.
    ///
    /// With `atomic`, the removal and the addition reach the renderer in the
    /// same flush.
    pub fn change_source(&mut self, id: &FeatureId, target: SourceName, atomic: bool) -> bool {
        if !self.sources.contains_key(&target) {
            log::error!("features.change_source: missing source \"{}\"", target);
            return false;
        }
        let Some(data) = self.store.get_mut(id) else {
            log::error!("features.change_source: feature \"{}\" not found", id);
            return false;
        };
        if data.source == target {
            return true;
        }

        let previous = std::mem::replace(&mut data.source, target);
        let geojson = data.geojson.clone();

        if atomic {
            self.begin_atomic();
        }
        self.update_manager
            .update_source(&mut self.sources, previous, SourceDiff::remove(id.clone()));
        self.update_manager
            .update_source(&mut self.sources, target, SourceDiff::add(geojson));
        if atomic {
            self.finish_atomic();
        }
        true
    }

    fn update_geojson(&mut self, id: &FeatureId, apply: impl FnOnce(&mut Feature)) -> Option<Feature> {
        let Some(data) = self.store.get_mut(id) else {
            log::error!("features: feature \"{}\" not found", id);
            return None;
        };
        let previous = data.geojson.clone();
        apply(&mut data.geojson);
        let diff = SourceDiff::update(data.geojson.clone());
        let source = data.source;
        self.update_manager.update_source(&mut self.sources, source, diff);
        Some(previous)
    }

    /// Replace the geometry of a feature. Returns the previous GeoJSON.
    pub fn update_geometry(&mut self, id: &FeatureId, geometry: Geometry) -> Option<Feature> {
        self.update_geojson(id, |geojson| geojson.geometry = geometry)
    }

    /// Merge properties into a feature. The id and shape properties are kept.
    /// Returns the previous GeoJSON.
    pub fn update_properties(&mut self, id: &FeatureId, properties: Properties) -> Option<Feature> {
        self.update_geojson(id, |geojson| {
            for (key, value) in properties {
                if key != FEATURE_ID_PROPERTY && key != SHAPE_PROPERTY {
                    geojson.properties.insert(key, value);
                }
            }
        })
    }

    /// Import external GeoJSON into the default source.
    ///
    /// Features whose shape cannot be inferred, or whose id is taken, are
    /// counted as failed.
    pub fn import_geojson(&mut self, geojson: GeoJson, id_property: Option<&str>) -> ImportResult {
        let mut result = ImportResult::default();

        for mut feature in geojson.into_features() {
            result.stats.total += 1;

            if let Some(custom_id) = id_property.and_then(|name| feature.property_id(name)) {
                feature.id = Some(custom_id);
            }

            match self.import_geojson_feature(feature) {
                Some(id) => {
                    result.added_features.push(id);
                    result.stats.success += 1;
                }
                None => result.stats.failed += 1,
            }
        }
        result
    }

    fn import_geojson_feature(&mut self, feature: Feature) -> Option<FeatureId> {
        let Some(shape) = shape_of_geojson(&feature) else {
            log::error!(
                "features.import_geojson: unknown shape of {:?}",
                feature.geometry.geometry_type()
            );
            return None;
        };

        let mut request = CreateFeature::new(feature, self.default_source)
            .with_shape(shape)
            .imported();
        request.id = request.geojson.id.clone();
        self.create_feature(request).map(|data| data.id.clone())
    }

    /// Add external GeoJSON as if it had been drawn.
    ///
    /// With `use_default_source` the default source wins over `source`.
    pub fn add_geojson_feature(
        &mut self,
        geojson: Feature,
        source: Option<SourceName>,
        use_default_source: bool,
    ) -> Option<&FeatureData> {
        let target = if use_default_source {
            if source.is_some() {
                log::warn!("features.add_geojson_feature: default source is set, source is ignored");
            }
            Some(self.default_source)
        } else {
            source
        };
        let Some(target) = target else {
            log::error!("features.add_geojson_feature: missing source");
            return None;
        };

        let Some(shape) = shape_of_geojson(&geojson) else {
            log::error!("features.add_geojson_feature: unknown shape");
            return None;
        };

        let mut request = CreateFeature::new(geojson, target).with_shape(shape);
        request.id = request.geojson.id.clone();
        self.create_feature(request)
    }

    /// Export persistent features from the current renderer content.
    ///
    /// `allowed_shapes` defaults to the public shapes; `id_property` renames
    /// the id property.
    pub fn export_geojson(
        &self,
        allowed_shapes: Option<&[FeatureShape]>,
        id_property: Option<&str>,
    ) -> FeatureCollection {
        let id_property = id_property.unwrap_or(FEATURE_ID_PROPERTY);
        let mut result = FeatureCollection::new();

        for (name, source) in self.sources.iter().filter(|(name, _)| name.is_persistent()) {
            for mut feature in source.get_geojson().features {
                let Some(data) = feature.id.as_ref().and_then(|id| self.get(*name, id)) else {
                    continue;
                };

                let allowed = match allowed_shapes {
                    Some(shapes) => shapes.contains(&data.shape),
                    None => data.shape.as_shape().is_some(),
                };
                if !allowed {
                    continue;
                }

                let id = feature
                    .properties
                    .get(FEATURE_ID_PROPERTY)
                    .cloned()
                    .unwrap_or(Value::Null);
                if id_property != FEATURE_ID_PROPERTY {
                    feature.properties.remove(FEATURE_ID_PROPERTY);
                    feature.properties.insert(id_property.to_string(), id.clone());
                }
                feature.id = FeatureId::from_value(&id);
                result.features.push(feature);
            }
        }
        result
    }

    /// Current renderer content of a source.
    pub fn source_geojson(&self, source: SourceName) -> Result<FeatureCollection> {
        self.sources
            .get(&source)
            .map(|s| s.get_geojson())
            .ok_or(Error::MissingSource(source))
    }

    /// Replace the renderer content of a source.
    pub fn set_source_geojson(&mut self, source: SourceName, collection: FeatureCollection) -> Result<()> {
        let target = self.sources.get_mut(&source).ok_or(Error::MissingSource(source))?;
        target.set_geojson(collection);
        Ok(())
    }

    fn resolve(&self, ids: Vec<FeatureId>, sources: &[SourceName]) -> Vec<&FeatureData> {
        ids.iter()
            .filter_map(|id| self.store.get(id))
            .filter(|data| sources.contains(&data.source))
            .collect()
    }

    /// Topmost feature under the pointer, searched in `sources`.
    pub fn feature_by_pointer(
        &self,
        adapter: &dyn MapAdapter,
        event: &PointerEvent,
        sources: &[SourceName],
    ) -> Option<&FeatureData> {
        let ids = adapter.query_features(ScreenQuery::Point(event.point), sources);
        self.resolve(ids, sources).into_iter().next()
    }

    /// Features rendered within a screen rectangle, searched in `sources`.
    pub fn features_by_screen_bounds(
        &self,
        adapter: &dyn MapAdapter,
        bounds: Rect,
        sources: &[SourceName],
    ) -> Vec<&FeatureData> {
        let ids = adapter.query_features(ScreenQuery::Bounds(bounds), sources);
        self.resolve(ids, sources)
    }

    /// Features rendered within the bounds of a GeoJSON shape.
    pub fn features_by_geojson_bounds(
        &self,
        adapter: &dyn MapAdapter,
        geojson: &Feature,
        sources: &[SourceName],
    ) -> Vec<&FeatureData> {
        let Some(bounds) = geojson.geometry.bounds() else {
            return Vec::new();
        };
        let screen = adapter.coord_bounds_to_screen_bounds(bounds);
        self.features_by_screen_bounds(adapter, screen, sources)
    }

    /// Queue or write a diff for a source.
    pub fn update_source(&mut self, source: SourceName, diff: SourceDiff) {
        self.update_manager.update_source(&mut self.sources, source, diff);
    }

    /// Start queueing diffs until [`Features::commit`].
    pub fn begin_transaction(&mut self) {
        self.update_manager.begin_transaction();
    }

    /// Flush queued diffs and stop queueing.
    pub fn commit(&mut self) {
        self.update_manager.commit(&mut self.sources);
    }

    pub fn is_transaction_active(&self) -> bool {
        self.update_manager.is_transaction_active()
    }

    pub(crate) fn begin_atomic(&mut self) {
        self.update_manager.begin_atomic();
    }

    pub(crate) fn finish_atomic(&mut self) {
        self.update_manager.finish_atomic(&mut self.sources);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{LayerType, MemoryAdapter, PartialLayerStyle};

    fn setup() -> (Features, MemoryAdapter) {
        let mut adapter = MemoryAdapter::new();
        let mut features = Features::new();
        features.init(&mut adapter, &Options::default()).unwrap();
        (features, adapter)
    }

    fn point(lng: f64, lat: f64) -> Feature {
        Feature::new(Geometry::Point { coordinates: [lng, lat] })
    }

    fn line() -> Feature {
        Feature::new(Geometry::LineString {
            coordinates: vec![[0.0, 0.0], [1.0, 1.0]],
        })
    }

    fn create(features: &mut Features, geojson: Feature) -> FeatureId {
        features
            .create_feature(CreateFeature::new(geojson, SourceName::Main))
            .map(|data| data.id().clone())
            .unwrap()
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let (mut features, _) = setup();
        let a = create(&mut features, point(0.0, 0.0));
        let b = create(&mut features, point(1.0, 0.0));
        assert_eq!(a.as_str(), "feature-1");
        assert_eq!(b.as_str(), "feature-2");
    }

    #[test]
    fn test_generated_ids_skip_taken_ids() {
        let (mut features, _) = setup();
        features
            .create_feature(CreateFeature::new(point(0.0, 0.0), SourceName::Main).with_id("feature-1"))
            .unwrap();
        let id = create(&mut features, point(0.0, 0.0));
        assert_eq!(id.as_str(), "feature-2");
    }

    #[test]
    fn test_embedded_id_property_is_used() {
        let (mut features, _) = setup();
        let geojson = point(0.0, 0.0).with_property(FEATURE_ID_PROPERTY, "embedded");
        assert_eq!(create(&mut features, geojson).as_str(), "embedded");
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let (mut features, adapter) = setup();
        let request = CreateFeature::new(point(0.0, 0.0), SourceName::Main).with_id("x");
        assert!(features.create_feature(request.clone()).is_some());
        assert!(features.create_feature(request).is_none());
        assert_eq!(features.len(), 1);
        assert_eq!(adapter.source_features(SourceName::Main).len(), 1);
    }

    #[test]
    fn test_missing_source_is_rejected() {
        let (mut features, _) = setup();
        let request = CreateFeature::new(point(0.0, 0.0), SourceName::Standby);
        assert!(features.create_feature(request).is_none());
        assert!(features.is_empty());
    }

    #[test]
    fn test_custom_and_uuid_generators() {
        let mut adapter = MemoryAdapter::new();
        let mut options = Options::default();
        options.settings.id_generator =
            IdGenerator::Custom(std::rc::Rc::new(|_: &Feature| FeatureId::new("custom")));
        let mut features = Features::new();
        features.init(&mut adapter, &options).unwrap();
        assert_eq!(create(&mut features, point(0.0, 0.0)).as_str(), "custom");
        // The generator keeps returning the same id.
        assert!(features
            .create_feature(CreateFeature::new(point(0.0, 0.0), SourceName::Main))
            .is_none());

        let mut adapter = MemoryAdapter::new();
        options.settings.id_generator = IdGenerator::Uuid;
        let mut features = Features::new();
        features.init(&mut adapter, &options).unwrap();
        let id = create(&mut features, point(0.0, 0.0));
        assert_eq!(id.as_str().len(), 36);
    }

    #[test]
    fn test_delete_cascades_to_children() {
        let (mut features, adapter) = setup();
        let parent = create(&mut features, line());
        let vertex = features
            .create_marker_feature(&parent, [0.0, 0.0], MarkerKind::Vertex, SourceName::Main)
            .map(|data| data.id().clone())
            .unwrap();
        let nested = features
            .create_marker_feature(&vertex, [0.0, 0.0], MarkerKind::Center, SourceName::Main)
            .map(|data| data.id().clone())
            .unwrap();
        assert_eq!(features.children_of(&parent), vec![vertex.clone()]);
        assert_eq!(
            features.get_any(&vertex).map(|data| data.shape()),
            Some(FeatureShape::Helper(HelperShape::VertexMarker))
        );

        assert!(features.delete(&parent));
        assert!(features.is_empty());
        assert!(!adapter.source_contains(SourceName::Main, &nested));
        assert!(adapter.source_features(SourceName::Main).is_empty());
        assert!(!features.delete(&parent));
    }

    #[test]
    fn test_change_source_atomic() {
        let (mut features, adapter) = setup();
        let id = create(&mut features, point(0.0, 0.0));
        adapter.clear_update_log();

        assert!(features.change_source(&id, SourceName::Temporary, true));
        assert!(features.has(SourceName::Temporary, &id));
        assert!(!features.has(SourceName::Main, &id));
        assert_eq!(adapter.update_count(SourceName::Main), 1);
        assert_eq!(adapter.update_count(SourceName::Temporary), 1);
        assert!(adapter.source_contains(SourceName::Temporary, &id));
        assert!(!adapter.source_contains(SourceName::Main, &id));
        assert_eq!(features.iter_temporary().count(), 1);
        assert_eq!(features.iter().count(), 0);
    }

    #[test]
    fn test_update_geometry_and_properties() {
        let (mut features, adapter) = setup();
        let id = create(&mut features, point(0.0, 0.0));

        let previous = features
            .update_geometry(&id, Geometry::Point { coordinates: [5.0, 5.0] })
            .unwrap();
        assert_eq!(previous.geometry, Geometry::Point { coordinates: [0.0, 0.0] });

        let mut properties = Properties::new();
        properties.insert("name".to_string(), Value::from("home"));
        properties.insert(FEATURE_ID_PROPERTY.to_string(), Value::from("hijack"));
        features.update_properties(&id, properties).unwrap();

        let stored = &adapter.source_features(SourceName::Main)[0];
        assert_eq!(stored.geometry, Geometry::Point { coordinates: [5.0, 5.0] });
        assert_eq!(stored.property_str("name"), Some("home"));
        assert_eq!(stored.property_str(FEATURE_ID_PROPERTY), Some(id.as_str()));
        assert!(features.update_geometry(&FeatureId::new("nope"), line().geometry).is_none());
    }

    #[test]
    fn test_import_counts_failures() {
        let (mut features, _) = setup();
        let json = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","geometry":{"type":"Point","coordinates":[1,2]},"properties":{}},
            {"type":"Feature","geometry":{"type":"MultiPoint","coordinates":[[1,2]]},"properties":{}},
            {"type":"Feature","geometry":{"type":"MultiPolygon","coordinates":[[[[0,0],[1,0],[1,1],[0,0]]]]},"properties":{"ref":"p1"}},
            {"type":"Feature","geometry":{"type":"Point","coordinates":[1,2]},"properties":{"shape":"text_marker"}}
        ]}"#;
        let result = features.import_geojson(GeoJson::from_json(json).unwrap(), Some("ref"));
        assert_eq!(result.stats, ImportStats { total: 4, success: 3, failed: 1 });
        assert_eq!(result.added_features[1].as_str(), "p1");
        assert_eq!(
            features.get_any(&FeatureId::new("p1")).map(|data| data.shape()),
            Some(ShapeName::Polygon.into())
        );
        assert_eq!(
            features.get_any(&result.added_features[2]).map(|data| data.shape()),
            Some(ShapeName::TextMarker.into())
        );
    }

    #[test]
    fn test_export_renames_id_and_filters() {
        let (mut features, _) = setup();
        let marker = create(&mut features, point(0.0, 0.0));
        let line_id = create(&mut features, line());
        features
            .create_marker_feature(&line_id, [0.0, 0.0], MarkerKind::Vertex, SourceName::Main)
            .unwrap();
        features
            .create_feature(CreateFeature::new(point(3.0, 3.0), SourceName::Temporary))
            .unwrap();

        let all = features.export_geojson(None, None);
        assert_eq!(all.features.len(), 2);

        let shapes = [FeatureShape::from(ShapeName::Line)];
        let lines = features.export_geojson(Some(&shapes[..]), Some("uid"));
        assert_eq!(lines.features.len(), 1);
        let exported = &lines.features[0];
        assert_eq!(exported.id, Some(line_id.clone()));
        assert_eq!(exported.property_str("uid"), Some(line_id.as_str()));
        assert!(exported.properties.get(FEATURE_ID_PROPERTY).is_none());
        assert_ne!(exported.id, Some(marker));
    }

    #[test]
    fn test_export_reads_renderer_content() {
        let (mut features, _) = setup();
        features.begin_transaction();
        create(&mut features, point(0.0, 0.0));
        assert!(features.export_geojson(None, None).features.is_empty());
        features.commit();
        assert_eq!(features.export_geojson(None, None).features.len(), 1);
    }

    #[test]
    fn test_source_geojson_missing_source() {
        let (mut features, _) = setup();
        assert!(matches!(
            features.source_geojson(SourceName::Standby),
            Err(Error::MissingSource(SourceName::Standby))
        ));
        assert!(features
            .set_source_geojson(SourceName::Standby, FeatureCollection::new())
            .is_err());
        assert!(features.source_geojson(SourceName::Main).unwrap().features.is_empty());
    }

    #[test]
    fn test_init_twice_is_a_no_op() {
        let (mut features, mut adapter) = setup();
        let layers = features.layers().len();
        features.init(&mut adapter, &Options::default()).unwrap();
        assert_eq!(features.layers().len(), layers);
        assert_eq!(features.source_names(), vec![SourceName::Main, SourceName::Temporary]);
    }

    #[test]
    fn test_init_fails_on_rejected_source() {
        let mut adapter = MemoryAdapter::new();
        adapter.reject_source(SourceName::Temporary);
        let mut features = Features::new();
        assert!(matches!(
            features.init(&mut adapter, &Options::default()),
            Err(Error::SourceCreation(SourceName::Temporary))
        ));
    }

    #[test]
    fn test_failed_init_removes_created_sources() {
        let mut adapter = MemoryAdapter::new();
        adapter.reject_source(SourceName::Temporary);
        let mut features = Features::new();
        for _ in 0..2 {
            assert!(matches!(
                features.init(&mut adapter, &Options::default()),
                Err(Error::SourceCreation(SourceName::Temporary))
            ));
            assert!(features.source_names().is_empty());
            assert!(!adapter.has_source(SourceName::Main));
            assert!(adapter.layer_ids().is_empty());
        }
    }

    #[test]
    fn test_failed_layer_creation_removes_created_layers() {
        let mut adapter = MemoryAdapter::new();
        let mut options = Options::default();
        options.settings.max_generic_layers = 1;
        let circle = PartialLayerStyle::new(LayerType::Circle);
        let per_source: IndexMap<_, _> =
            [(SourceName::Main, vec![circle.clone(), circle])].into_iter().collect();
        options.layer_styles.clear();
        options.layer_styles.insert(ShapeName::Marker.into(), per_source);

        let mut features = Features::new();
        assert!(matches!(
            features.init(&mut adapter, &options),
            Err(Error::LayerNamesExhausted { limit: 1, .. })
        ));
        assert!(features.layers().is_empty());
        assert!(adapter.layer_ids().is_empty());
        assert!(!adapter.has_source(SourceName::Main));
        assert!(!adapter.has_source(SourceName::Temporary));
    }

    #[test]
    fn test_destroy_drops_pending_transaction() {
        let (mut features, mut adapter) = setup();
        features.begin_transaction();
        create(&mut features, point(0.0, 0.0));
        features.destroy(&mut adapter);

        features.init(&mut adapter, &Options::default()).unwrap();
        assert!(!features.is_transaction_active());
        features.commit();
        assert!(adapter.source_features(SourceName::Main).is_empty());
        assert_eq!(adapter.update_count(SourceName::Main), 0);

        let id = create(&mut features, point(1.0, 1.0));
        assert_eq!(id.as_str(), "feature-1");
        assert_eq!(adapter.source_features(SourceName::Main).len(), 1);
    }

    #[test]
    fn test_spatial_queries_restricted_to_sources() {
        let (mut features, adapter) = setup();
        let main = create(&mut features, point(1.0, 1.0));
        features
            .create_feature(CreateFeature::new(point(1.0, 1.0), SourceName::Temporary))
            .unwrap();

        let event = PointerEvent::new(
            crate::events::PointerEventName::Click,
            adapter.project([1.0, 1.0]),
            [1.0, 1.0],
        );
        let hit = features.feature_by_pointer(&adapter, &event, &[SourceName::Main]);
        assert_eq!(hit.map(|data| data.id().clone()), Some(main));

        let area = Feature::new(Geometry::Polygon {
            coordinates: vec![vec![[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 0.0]]],
        });
        assert_eq!(
            features
                .features_by_geojson_bounds(&adapter, &area, &[SourceName::Temporary])
                .len(),
            1
        );
        assert_eq!(
            features
                .features_by_geojson_bounds(&adapter, &area, &[SourceName::Main, SourceName::Temporary])
                .len(),
            2
        );
    }

    #[test]
    fn test_delete_all_is_one_batch() {
        let (mut features, adapter) = setup();
        create(&mut features, point(0.0, 0.0));
        create(&mut features, point(1.0, 0.0));
        adapter.clear_update_log();

        features.delete_all();
        assert!(features.is_empty());
        assert_eq!(adapter.update_count(SourceName::Main), 1);
        assert_eq!(adapter.update_calls(SourceName::Main)[0].remove.len(), 2);
        assert!(adapter.source_features(SourceName::Main).is_empty());
    }
}
