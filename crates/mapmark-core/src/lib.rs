//! MapMark Core Library
//!
//! Renderer-agnostic core of the MapMark map annotation toolkit: the feature
//! store, source synchronization, the event bus and the interaction modes.

pub mod adapter;
pub mod context;
pub mod error;
pub mod events;
pub mod features;
pub mod modes;
pub mod options;

pub use adapter::{MapAdapter, MapSource, MemoryAdapter};
pub use context::MapMark;
pub use error::{Error, Result};
pub use events::{BusEvent, EventContext, Flow, FwdEvent, PointerEvent, PointerEventName, SystemEvent};
pub use features::{
    CreateFeature, Feature, FeatureCollection, FeatureData, FeatureId, FeatureShape, Features,
    GeoJson, Geometry, ShapeName, SourceDiff, SourceName,
};
pub use modes::{ActionType, DrawModeName, EditModeName, HelperModeName, ModeFlags, ModeName};
pub use options::{IdGenerator, Options, Settings};
