//! The annotation context.

use crate::adapter::MapAdapter;
use crate::error::Result;
use crate::events::{
    BusEvent, ControlAction, ControlEventListener, DrawAction, DrawEventListener, EditEventListener,
    EventBus, EventContext, EventForwarder, Flow, HandlerId, HelperEventListener, PointerEvent,
    SystemEvent,
};
use crate::features::{
    CreateFeature, Feature, FeatureCollection, FeatureData, FeatureId, FeatureShape, FeatureSnapshot,
    Features, GeoJson, Geometry, ImportResult, Properties, ShapeName, SourceDiff, SourceName,
};
use crate::modes::draw::TEXT_PROPERTY;
use crate::modes::{ActionInstances, DrawModeName, ModeFlags, ModeName};
use crate::options::Options;
use kurbo::Rect;
use std::panic::{self, AssertUnwindSafe};

/// Owns the feature store, the renderer adapter, the event bus and the
/// running modes. Every component receives it explicitly.
pub struct MapMark {
    pub(crate) options: Options,
    pub(crate) adapter: Box<dyn MapAdapter>,
    pub(crate) features: Features,
    pub(crate) events: EventBus<MapMark>,
    pub(crate) actions: ActionInstances,
    listener_handlers: Vec<HandlerId>,
    loaded: bool,
}

impl EventContext for MapMark {
    fn event_bus(&self) -> &EventBus<Self> {
        &self.events
    }

    fn event_bus_mut(&mut self) -> &mut EventBus<Self> {
        &mut self.events
    }
}

impl MapMark {
    pub fn new(options: Options, adapter: impl MapAdapter + 'static) -> Self {
        Self {
            options,
            adapter: Box::new(adapter),
            features: Features::new(),
            events: EventBus::new(),
            actions: ActionInstances::new(),
            listener_handlers: Vec::new(),
            loaded: false,
        }
    }

    /// Create sources and layers, attach the listeners and fire `Loaded`.
    pub fn init(&mut self) -> Result<()> {
        if self.loaded {
            log::warn!("MapMark is already initialized");
            return Ok(());
        }

        self.features.init(self.adapter.as_mut(), &self.options)?;

        let mut handlers = DrawEventListener::attach(self);
        handlers.extend(EditEventListener::attach(self));
        handlers.extend(HelperEventListener::attach(self));
        handlers.extend(ControlEventListener::attach(self));
        handlers.extend(EventForwarder::attach(self));
        self.listener_handlers = handlers;

        self.loaded = true;
        log::debug!("MapMark loaded");
        self.fire(SystemEvent::Control(ControlAction::Loaded));
        Ok(())
    }

    /// End every mode, detach the listeners and remove sources and layers.
    pub fn destroy(&mut self) {
        for mode in self.actions.active_modes().into_iter().rev() {
            self.disable_mode(mode);
        }
        let handlers = std::mem::take(&mut self.listener_handlers);
        self.events.detach_all(&handlers);
        self.features.destroy(self.adapter.as_mut());
        self.loaded = false;
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn features(&self) -> &Features {
        &self.features
    }

    /// Direct access to the store. Mutations made here fire no events.
    pub fn features_mut(&mut self) -> &mut Features {
        &mut self.features
    }

    pub fn adapter(&self) -> &dyn MapAdapter {
        self.adapter.as_ref()
    }

    pub fn actions(&self) -> &ActionInstances {
        &self.actions
    }

    // Modes

    /// Start a mode unless it runs already.
    pub fn enable_mode(&mut self, mode: ModeName) {
        if !self.is_mode_enabled(mode) {
            self.fire(SystemEvent::mode_start(mode));
        }
    }

    /// End a mode if it runs.
    pub fn disable_mode(&mut self, mode: ModeName) {
        if self.is_mode_enabled(mode) {
            self.fire(SystemEvent::mode_end(mode));
        }
    }

    pub fn toggle_mode(&mut self, mode: ModeName) {
        if self.is_mode_enabled(mode) {
            self.disable_mode(mode);
        } else {
            self.enable_mode(mode);
        }
    }

    pub fn is_mode_enabled(&self, mode: ModeName) -> bool {
        self.actions.contains(mode.key())
    }

    pub fn active_modes(&self) -> Vec<ModeName> {
        self.actions.active_modes()
    }

    pub fn mode_flags(&self, mode: ModeName) -> Option<ModeFlags> {
        self.actions.flags(mode.key())
    }

    /// Change the flags of a running mode. Returns whether it runs.
    pub fn update_mode_flags(&self, mode: ModeName, update: impl FnOnce(&mut ModeFlags)) -> bool {
        self.actions.update_flags(mode.key(), update)
    }

    /// The text marker placed by the running text marker mode, if it waits
    /// for text.
    pub fn pending_text_marker(&self) -> Option<FeatureId> {
        let editing = self
            .mode_flags(ModeName::Draw(DrawModeName::TextMarker))
            .is_some_and(|flags| flags.action_in_progress);
        if !editing {
            return None;
        }
        self.features
            .iter_temporary()
            .find(|feature| feature.shape() == FeatureShape::Shape(ShapeName::TextMarker))
            .map(|feature| feature.id().clone())
    }

    /// Enter the text of the pending text marker. Returns whether one was
    /// waiting for text.
    pub fn set_text_marker_text(&mut self, text: &str) -> bool {
        let Some(id) = self.pending_text_marker() else {
            return false;
        };
        let mut properties = Properties::new();
        properties.insert(TEXT_PROPERTY.to_string(), text.into());
        self.features.update_properties(&id, properties).is_some()
    }

    /// Feed pointer input to the running modes.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> Flow {
        self.fire(BusEvent::Pointer(event))
    }

    // Features

    fn fire_feature_created(&mut self, feature: &FeatureSnapshot) {
        if let FeatureShape::Shape(shape) = feature.shape {
            self.fire(SystemEvent::Draw {
                mode: shape.into(),
                action: DrawAction::FeatureCreated {
                    feature: feature.clone(),
                },
            });
        }
    }

    /// Create a feature; drawn persistent features announce themselves.
    pub fn create_feature(&mut self, request: CreateFeature) -> Option<FeatureSnapshot> {
        let imported = request.imported;
        let snapshot = self.features.create_feature(request)?.snapshot();
        if !imported && snapshot.source != SourceName::Temporary {
            self.fire_feature_created(&snapshot);
        }
        Some(snapshot)
    }

    /// Add external GeoJSON as if it had been drawn.
    pub fn add_geojson_feature(
        &mut self,
        geojson: Feature,
        source: Option<SourceName>,
        use_default_source: bool,
    ) -> Option<FeatureSnapshot> {
        let snapshot = self
            .features
            .add_geojson_feature(geojson, source, use_default_source)?
            .snapshot();
        if snapshot.source != SourceName::Temporary {
            self.fire_feature_created(&snapshot);
        }
        Some(snapshot)
    }

    pub fn delete_feature(&mut self, id: &FeatureId) -> bool {
        self.features.delete(id)
    }

    pub fn change_source(&mut self, id: &FeatureId, target: SourceName, atomic: bool) -> bool {
        self.features.change_source(id, target, atomic)
    }

    pub fn update_feature_geometry(&mut self, id: &FeatureId, geometry: Geometry) -> Option<Feature> {
        self.features.update_geometry(id, geometry)
    }

    pub fn update_feature_properties(&mut self, id: &FeatureId, properties: Properties) -> Option<Feature> {
        self.features.update_properties(id, properties)
    }

    pub fn import_geojson(&mut self, geojson: GeoJson, id_property: Option<&str>) -> ImportResult {
        self.features.import_geojson(geojson, id_property)
    }

    pub fn export_geojson(
        &self,
        allowed_shapes: Option<&[FeatureShape]>,
        id_property: Option<&str>,
    ) -> FeatureCollection {
        self.features.export_geojson(allowed_shapes, id_property)
    }

    pub fn feature_by_pointer(&self, event: &PointerEvent, sources: &[SourceName]) -> Option<&FeatureData> {
        self.features.feature_by_pointer(self.adapter.as_ref(), event, sources)
    }

    pub fn features_by_screen_bounds(&self, bounds: Rect, sources: &[SourceName]) -> Vec<&FeatureData> {
        self.features
            .features_by_screen_bounds(self.adapter.as_ref(), bounds, sources)
    }

    pub fn features_by_geojson_bounds(&self, geojson: &Feature, sources: &[SourceName]) -> Vec<&FeatureData> {
        self.features
            .features_by_geojson_bounds(self.adapter.as_ref(), geojson, sources)
    }

    // Source updates

    pub fn update_source(&mut self, source: SourceName, diff: SourceDiff) {
        self.features.update_source(source, diff);
    }

    pub fn begin_transaction(&mut self) {
        self.features.begin_transaction();
    }

    pub fn commit(&mut self) {
        self.features.commit();
    }

    /// Run `f` with automatic source writes suspended, then write exactly one
    /// diff to every source, even if `f` panics. Inside an open transaction
    /// the writes wait for [`commit`](Self::commit).
    pub fn with_atomic_sources_update<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.features.begin_atomic();
        let result = panic::catch_unwind(AssertUnwindSafe(|| f(self)));
        self.features.finish_atomic();
        match result {
            Ok(value) => value,
            Err(payload) => panic::resume_unwind(payload),
        }
    }
}
