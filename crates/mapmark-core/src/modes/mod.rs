//! Interaction modes.
//!
//! A mode is started and ended by the lifecycle manager in response to mode
//! start/end events. While it runs, it receives the pointer events it asked
//! for and, for edit modes, the marker gesture events.

pub mod draw;
pub mod edit;
pub mod helper;
mod lifecycle;

pub use lifecycle::{ActionInstances, ActiveAction, end_action, start_action};

use crate::MapMark;
use crate::events::{EditAction, Flow, PointerEvent, PointerEventName};
use crate::features::ShapeName;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Draw,
    Edit,
    Helper,
}

impl ActionType {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::Draw => "draw",
            ActionType::Edit => "edit",
            ActionType::Helper => "helper",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Draw modes, one per public shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawModeName {
    Marker,
    Line,
    Polygon,
    Rectangle,
    TextMarker,
}

impl DrawModeName {
    pub const ALL: [DrawModeName; 5] = [
        DrawModeName::Marker,
        DrawModeName::Line,
        DrawModeName::Polygon,
        DrawModeName::Rectangle,
        DrawModeName::TextMarker,
    ];

    /// Shape created by this mode.
    pub fn shape(self) -> ShapeName {
        match self {
            DrawModeName::Marker => ShapeName::Marker,
            DrawModeName::Line => ShapeName::Line,
            DrawModeName::Polygon => ShapeName::Polygon,
            DrawModeName::Rectangle => ShapeName::Rectangle,
            DrawModeName::TextMarker => ShapeName::TextMarker,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.shape().as_str()
    }
}

impl From<ShapeName> for DrawModeName {
    fn from(shape: ShapeName) -> Self {
        match shape {
            ShapeName::Marker => DrawModeName::Marker,
            ShapeName::Line => DrawModeName::Line,
            ShapeName::Polygon => DrawModeName::Polygon,
            ShapeName::Rectangle => DrawModeName::Rectangle,
            ShapeName::TextMarker => DrawModeName::TextMarker,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditModeName {
    Drag,
    Delete,
}

impl EditModeName {
    pub const ALL: [EditModeName; 2] = [EditModeName::Drag, EditModeName::Delete];

    pub fn as_str(self) -> &'static str {
        match self {
            EditModeName::Drag => "drag",
            EditModeName::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HelperModeName {
    ShapeMarkers,
}

impl HelperModeName {
    pub fn as_str(self) -> &'static str {
        match self {
            HelperModeName::ShapeMarkers => "shape_markers",
        }
    }
}

/// Any mode, tagged by its kind. Serialized as `{"draw": "polygon"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeName {
    Draw(DrawModeName),
    Edit(EditModeName),
    Helper(HelperModeName),
}

impl ModeName {
    pub fn action_type(self) -> ActionType {
        match self {
            ModeName::Draw(_) => ActionType::Draw,
            ModeName::Edit(_) => ActionType::Edit,
            ModeName::Helper(_) => ActionType::Helper,
        }
    }

    /// Name of the mode without its kind.
    pub fn as_str(self) -> &'static str {
        match self {
            ModeName::Draw(mode) => mode.as_str(),
            ModeName::Edit(mode) => mode.as_str(),
            ModeName::Helper(mode) => mode.as_str(),
        }
    }

    pub fn key(self) -> ActionInstanceKey {
        ActionInstanceKey(self)
    }
}

impl fmt::Display for ModeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.action_type(), self.as_str())
    }
}

/// Key of a running mode, displayed as `<type>__<mode>` (e.g. `draw__polygon`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionInstanceKey(ModeName);

impl ActionInstanceKey {
    pub fn mode(self) -> ModeName {
        self.0
    }
}

impl fmt::Display for ActionInstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}__{}", self.0.action_type(), self.0.as_str())
    }
}

/// Mutable state of a running mode, read by collaborating code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeFlags {
    /// Cleared by before-create handlers to veto a pending creation.
    pub feature_create_allowed: bool,
    /// A gesture or a shape is in progress.
    pub action_in_progress: bool,
}

impl Default for ModeFlags {
    fn default() -> Self {
        Self {
            feature_create_allowed: true,
            action_in_progress: false,
        }
    }
}

/// Behavior of an interaction mode.
///
/// `on_end_action` must leave no temporary features or gesture state behind.
pub trait Mode {
    fn mode(&self) -> ModeName;

    /// Pointer events delivered to [`Mode::handle_pointer`] while running.
    fn pointer_events(&self) -> &'static [PointerEventName] {
        &[]
    }

    fn on_start_action(&mut self, ctx: &mut MapMark);

    fn on_end_action(&mut self, ctx: &mut MapMark);

    fn handle_pointer(&mut self, _ctx: &mut MapMark, _event: &PointerEvent) -> Flow {
        Flow::Next
    }

    /// Marker gesture events (`MarkerCaptured`, `MarkerMove`,
    /// `MarkerReleased`) addressed to this edit mode.
    fn handle_edit_event(&mut self, _ctx: &mut MapMark, _action: &EditAction) -> Flow {
        Flow::Next
    }
}

/// A running mode tagged by its kind.
pub enum ActionInstance {
    Draw(Box<dyn Mode>),
    Edit(Box<dyn Mode>),
    Helper(Box<dyn Mode>),
}

impl ActionInstance {
    pub fn action_type(&self) -> ActionType {
        match self {
            ActionInstance::Draw(_) => ActionType::Draw,
            ActionInstance::Edit(_) => ActionType::Edit,
            ActionInstance::Helper(_) => ActionType::Helper,
        }
    }

    pub fn mode(&self) -> &dyn Mode {
        match self {
            ActionInstance::Draw(mode) | ActionInstance::Edit(mode) | ActionInstance::Helper(mode) => {
                &**mode
            }
        }
    }

    pub fn mode_mut(&mut self) -> &mut dyn Mode {
        match self {
            ActionInstance::Draw(mode) | ActionInstance::Edit(mode) | ActionInstance::Helper(mode) => {
                &mut **mode
            }
        }
    }
}

impl fmt::Debug for ActionInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActionInstance({})", self.mode().mode())
    }
}

/// Build the mode object for a mode name. `None` if the mode has no
/// implementation.
pub fn create_instance(mode: ModeName) -> Option<ActionInstance> {
    match mode {
        ModeName::Draw(mode) => draw::create_draw_mode(mode).map(ActionInstance::Draw),
        ModeName::Edit(mode) => edit::create_edit_mode(mode).map(ActionInstance::Edit),
        ModeName::Helper(mode) => helper::create_helper_mode(mode).map(ActionInstance::Helper),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_instance_key() {
        assert_eq!(ModeName::Draw(DrawModeName::Polygon).key().to_string(), "draw__polygon");
        assert_eq!(ModeName::Edit(EditModeName::Drag).key().to_string(), "edit__drag");
        assert_eq!(
            ModeName::Helper(HelperModeName::ShapeMarkers).key().to_string(),
            "helper__shape_markers"
        );
    }

    #[test]
    fn test_mode_name_serde() {
        let mode: ModeName = serde_json::from_str(r#"{"draw":"text_marker"}"#).unwrap();
        assert_eq!(mode, ModeName::Draw(DrawModeName::TextMarker));
        assert_eq!(
            serde_json::to_string(&ModeName::Edit(EditModeName::Delete)).unwrap(),
            r#"{"edit":"delete"}"#
        );
    }

    #[test]
    fn test_factory() {
        let text = create_instance(ModeName::Draw(DrawModeName::TextMarker)).unwrap();
        assert_eq!(text.action_type(), ActionType::Draw);
        let instance = create_instance(ModeName::Edit(EditModeName::Drag)).unwrap();
        assert_eq!(instance.action_type(), ActionType::Edit);
        assert_eq!(instance.mode().mode(), ModeName::Edit(EditModeName::Drag));
    }
}
