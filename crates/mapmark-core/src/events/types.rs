//! Event payloads and channels.

use crate::features::{Feature, FeatureId, FeatureSnapshot, LngLat};
use crate::modes::{ActionType, DrawModeName, EditModeName, HelperModeName, ModeName};
use kurbo::Point;
use serde::Serialize;

/// Prefix of forwarded event names.
pub const EVENT_PREFIX: &str = "mm";

/// Pointer input kinds a mode can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerEventName {
    Click,
    DblClick,
    MouseDown,
    MouseUp,
    MouseMove,
    MouseEnter,
    MouseLeave,
    MouseOver,
    MouseOut,
    ContextMenu,
    TouchStart,
    TouchEnd,
    TouchMove,
    TouchCancel,
}

impl PointerEventName {
    pub const ALL: [PointerEventName; 14] = [
        PointerEventName::Click,
        PointerEventName::DblClick,
        PointerEventName::MouseDown,
        PointerEventName::MouseUp,
        PointerEventName::MouseMove,
        PointerEventName::MouseEnter,
        PointerEventName::MouseLeave,
        PointerEventName::MouseOver,
        PointerEventName::MouseOut,
        PointerEventName::ContextMenu,
        PointerEventName::TouchStart,
        PointerEventName::TouchEnd,
        PointerEventName::TouchMove,
        PointerEventName::TouchCancel,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PointerEventName::Click => "click",
            PointerEventName::DblClick => "dblclick",
            PointerEventName::MouseDown => "mousedown",
            PointerEventName::MouseUp => "mouseup",
            PointerEventName::MouseMove => "mousemove",
            PointerEventName::MouseEnter => "mouseenter",
            PointerEventName::MouseLeave => "mouseleave",
            PointerEventName::MouseOver => "mouseover",
            PointerEventName::MouseOut => "mouseout",
            PointerEventName::ContextMenu => "contextmenu",
            PointerEventName::TouchStart => "touchstart",
            PointerEventName::TouchEnd => "touchend",
            PointerEventName::TouchMove => "touchmove",
            PointerEventName::TouchCancel => "touchcancel",
        }
    }
}

/// Pointer input in both screen and geographic coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerEventName,
    pub point: Point,
    pub lng_lat: LngLat,
}

impl PointerEvent {
    pub fn new(kind: PointerEventName, point: Point, lng_lat: LngLat) -> Self {
        Self { kind, point, lng_lat }
    }
}

/// Actions of draw modes.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawAction {
    ModeStart,
    ModeEnd,
    /// Fired before a shape is created; handlers veto through the mode flags.
    BeforeFeatureCreate { geojson: Feature },
    FeatureCreated { feature: FeatureSnapshot },
}

/// Actions of edit modes, including the marker gesture protocol.
#[derive(Debug, Clone, PartialEq)]
pub enum EditAction {
    ModeStart,
    ModeEnd,
    MarkerCaptured {
        feature: FeatureId,
        lng_lat: LngLat,
    },
    MarkerMove {
        feature: FeatureId,
        lng_lat_start: LngLat,
        lng_lat_end: LngLat,
    },
    MarkerReleased {
        feature: FeatureId,
    },
    FeatureEditStart {
        feature: FeatureSnapshot,
    },
    FeatureUpdated {
        feature: FeatureSnapshot,
        old: Feature,
        new: Feature,
    },
    FeatureEditEnd {
        feature: FeatureSnapshot,
    },
    FeatureRemoved {
        feature: FeatureSnapshot,
    },
}

/// Actions of helper modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelperAction {
    ModeStart,
    ModeEnd,
}

/// Actions of the control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    /// A control asks to flip a mode on or off.
    ModeToggled { mode: ModeName },
    /// Initialization finished.
    Loaded,
}

/// Internal events exchanged between modes, listeners and the store.
#[derive(Debug, Clone, PartialEq)]
pub enum SystemEvent {
    Draw {
        mode: DrawModeName,
        action: DrawAction,
    },
    Edit {
        mode: EditModeName,
        action: EditAction,
    },
    Helper {
        mode: HelperModeName,
        action: HelperAction,
    },
    Control(ControlAction),
}

impl SystemEvent {
    /// Request to start a mode.
    pub fn mode_start(mode: ModeName) -> Self {
        match mode {
            ModeName::Draw(mode) => SystemEvent::Draw {
                mode,
                action: DrawAction::ModeStart,
            },
            ModeName::Edit(mode) => SystemEvent::Edit {
                mode,
                action: EditAction::ModeStart,
            },
            ModeName::Helper(mode) => SystemEvent::Helper {
                mode,
                action: HelperAction::ModeStart,
            },
        }
    }

    /// Request to end a mode.
    pub fn mode_end(mode: ModeName) -> Self {
        match mode {
            ModeName::Draw(mode) => SystemEvent::Draw {
                mode,
                action: DrawAction::ModeEnd,
            },
            ModeName::Edit(mode) => SystemEvent::Edit {
                mode,
                action: EditAction::ModeEnd,
            },
            ModeName::Helper(mode) => SystemEvent::Helper {
                mode,
                action: HelperAction::ModeEnd,
            },
        }
    }

    /// Mode the event concerns, if any.
    pub fn mode(&self) -> Option<ModeName> {
        match self {
            SystemEvent::Draw { mode, .. } => Some(ModeName::Draw(*mode)),
            SystemEvent::Edit { mode, .. } => Some(ModeName::Edit(*mode)),
            SystemEvent::Helper { mode, .. } => Some(ModeName::Helper(*mode)),
            SystemEvent::Control(_) => None,
        }
    }

    pub fn channel(&self) -> Channel {
        match self {
            SystemEvent::Draw { .. } => Channel::Draw,
            SystemEvent::Edit { .. } => Channel::Edit,
            SystemEvent::Helper { .. } => Channel::Helper,
            SystemEvent::Control(_) => Channel::Control,
        }
    }
}

/// Public events with stable names.
#[derive(Debug, Clone, PartialEq)]
pub enum FwdEvent {
    GlobalDrawModeToggled {
        enabled: bool,
        shape: DrawModeName,
    },
    DrawStart {
        shape: DrawModeName,
    },
    DrawEnd {
        shape: DrawModeName,
    },
    GlobalEditModeToggled {
        enabled: bool,
        mode: EditModeName,
    },
    GlobalHelperModeToggled {
        enabled: bool,
        mode: HelperModeName,
    },
    Create {
        feature: FeatureSnapshot,
    },
    Remove {
        mode: EditModeName,
        feature: FeatureSnapshot,
    },
    EditStart {
        mode: EditModeName,
        feature: FeatureSnapshot,
    },
    Edit {
        mode: EditModeName,
        feature: FeatureSnapshot,
        old: Feature,
        new: Feature,
    },
    EditEnd {
        mode: EditModeName,
        feature: FeatureSnapshot,
    },
    Loaded,
}

impl FwdEvent {
    /// Stable public name, e.g. `mm:create` or `mm:dragstart`.
    pub fn name(&self) -> String {
        let name = match self {
            FwdEvent::GlobalDrawModeToggled { .. } => "globaldrawmodetoggled".to_string(),
            FwdEvent::DrawStart { .. } => "drawstart".to_string(),
            FwdEvent::DrawEnd { .. } => "drawend".to_string(),
            FwdEvent::GlobalEditModeToggled { mode, .. } => format!("global{}modetoggled", mode.as_str()),
            FwdEvent::GlobalHelperModeToggled { mode, .. } => {
                format!("global{}modetoggled", mode.as_str())
            }
            FwdEvent::Create { .. } => "create".to_string(),
            FwdEvent::Remove { .. } => "remove".to_string(),
            FwdEvent::EditStart { mode, .. } => format!("{}start", mode.as_str()),
            FwdEvent::Edit { mode, .. } => mode.as_str().to_string(),
            FwdEvent::EditEnd { mode, .. } => format!("{}end", mode.as_str()),
            FwdEvent::Loaded => "loaded".to_string(),
        };
        format!("{}:{}", EVENT_PREFIX, name)
    }

    /// Action type of the mode behind the event.
    pub fn action_type(&self) -> Option<ActionType> {
        match self {
            FwdEvent::GlobalDrawModeToggled { .. }
            | FwdEvent::DrawStart { .. }
            | FwdEvent::DrawEnd { .. }
            | FwdEvent::Create { .. } => Some(ActionType::Draw),
            FwdEvent::GlobalEditModeToggled { .. }
            | FwdEvent::Remove { .. }
            | FwdEvent::EditStart { .. }
            | FwdEvent::Edit { .. }
            | FwdEvent::EditEnd { .. } => Some(ActionType::Edit),
            FwdEvent::GlobalHelperModeToggled { .. } => Some(ActionType::Helper),
            FwdEvent::Loaded => None,
        }
    }
}

/// Namespaced dispatch channels of the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Draw,
    Edit,
    Helper,
    Control,
    Forwarded,
    Pointer(PointerEventName),
}

/// Everything that travels over the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    System(SystemEvent),
    Forwarded(FwdEvent),
    Pointer(PointerEvent),
}

impl BusEvent {
    pub fn channel(&self) -> Channel {
        match self {
            BusEvent::System(event) => event.channel(),
            BusEvent::Forwarded(_) => Channel::Forwarded,
            BusEvent::Pointer(event) => Channel::Pointer(event.kind),
        }
    }
}

impl From<SystemEvent> for BusEvent {
    fn from(event: SystemEvent) -> Self {
        BusEvent::System(event)
    }
}

impl From<FwdEvent> for BusEvent {
    fn from(event: FwdEvent) -> Self {
        BusEvent::Forwarded(event)
    }
}

impl From<PointerEvent> for BusEvent {
    fn from(event: PointerEvent) -> Self {
        BusEvent::Pointer(event)
    }
}
