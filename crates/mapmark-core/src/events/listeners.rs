//! Listeners turning mode start/end events into lifecycle calls.

use super::bus::{EventContext, Flow, Handler, HandlerId};
use super::types::{BusEvent, Channel, ControlAction, DrawAction, EditAction, HelperAction, SystemEvent};
use crate::MapMark;
use crate::modes::{ActionType, ModeName, end_action, start_action};
use std::rc::Rc;

/// Starts and ends draw modes.
pub struct DrawEventListener;

impl DrawEventListener {
    pub fn attach(ctx: &mut MapMark) -> Vec<HandlerId> {
        let handler: Handler<MapMark> = Rc::new(Self::handle);
        ctx.event_bus_mut().attach([(Channel::Draw, handler)])
    }

    fn handle(ctx: &mut MapMark, event: &BusEvent) -> Flow {
        let BusEvent::System(SystemEvent::Draw { mode, action }) = event else {
            return Flow::Next;
        };
        match action {
            DrawAction::ModeStart => start_action(ctx, ModeName::Draw(*mode)),
            DrawAction::ModeEnd => end_action(ctx, ModeName::Draw(*mode), ActionType::Draw),
            _ => {}
        }
        Flow::Next
    }
}

/// Starts and ends edit modes.
pub struct EditEventListener;

impl EditEventListener {
    pub fn attach(ctx: &mut MapMark) -> Vec<HandlerId> {
        let handler: Handler<MapMark> = Rc::new(Self::handle);
        ctx.event_bus_mut().attach([(Channel::Edit, handler)])
    }

    fn handle(ctx: &mut MapMark, event: &BusEvent) -> Flow {
        let BusEvent::System(SystemEvent::Edit { mode, action }) = event else {
            return Flow::Next;
        };
        match action {
            EditAction::ModeStart => start_action(ctx, ModeName::Edit(*mode)),
            EditAction::ModeEnd => end_action(ctx, ModeName::Edit(*mode), ActionType::Edit),
            _ => {}
        }
        Flow::Next
    }
}

/// Starts and ends helper modes.
pub struct HelperEventListener;

impl HelperEventListener {
    pub fn attach(ctx: &mut MapMark) -> Vec<HandlerId> {
        let handler: Handler<MapMark> = Rc::new(Self::handle);
        ctx.event_bus_mut().attach([(Channel::Helper, handler)])
    }

    fn handle(ctx: &mut MapMark, event: &BusEvent) -> Flow {
        let BusEvent::System(SystemEvent::Helper { mode, action }) = event else {
            return Flow::Next;
        };
        match action {
            HelperAction::ModeStart => start_action(ctx, ModeName::Helper(*mode)),
            HelperAction::ModeEnd => end_action(ctx, ModeName::Helper(*mode), ActionType::Helper),
        }
        Flow::Next
    }
}

/// Applies mode toggles requested by controls.
pub struct ControlEventListener;

impl ControlEventListener {
    pub fn attach(ctx: &mut MapMark) -> Vec<HandlerId> {
        let handler: Handler<MapMark> = Rc::new(Self::handle);
        ctx.event_bus_mut().attach([(Channel::Control, handler)])
    }

    fn handle(ctx: &mut MapMark, event: &BusEvent) -> Flow {
        if let BusEvent::System(SystemEvent::Control(ControlAction::ModeToggled { mode })) = event {
            ctx.toggle_mode(*mode);
        }
        Flow::Next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MemoryAdapter;
    use crate::modes::{DrawModeName, EditModeName, HelperModeName};
    use crate::options::Options;

    fn context() -> MapMark {
        let mut ctx = MapMark::new(Options::default(), MemoryAdapter::new());
        ctx.init().unwrap();
        ctx
    }

    #[test]
    fn test_mode_events_drive_lifecycle() {
        let mut ctx = context();
        let delete = ModeName::Edit(EditModeName::Delete);

        ctx.fire(SystemEvent::mode_start(delete));
        assert!(ctx.is_mode_enabled(delete));

        ctx.fire(SystemEvent::mode_end(delete));
        assert!(!ctx.is_mode_enabled(delete));
    }

    #[test]
    fn test_helper_listener() {
        let mut ctx = context();
        let markers = ModeName::Helper(HelperModeName::ShapeMarkers);
        ctx.fire(SystemEvent::mode_start(markers));
        assert_eq!(ctx.active_modes(), vec![markers]);
        ctx.fire(SystemEvent::mode_end(markers));
        assert!(ctx.active_modes().is_empty());
    }

    #[test]
    fn test_control_toggle() {
        let mut ctx = context();
        let marker = ModeName::Draw(DrawModeName::Marker);
        let toggle = SystemEvent::Control(ControlAction::ModeToggled { mode: marker });

        ctx.fire(toggle.clone());
        assert!(ctx.is_mode_enabled(marker));
        ctx.fire(toggle);
        assert!(!ctx.is_mode_enabled(marker));
    }

    #[test]
    fn test_detached_listeners_ignore_events() {
        let mut ctx = MapMark::new(Options::default(), MemoryAdapter::new());
        let ids = DrawEventListener::attach(&mut ctx);
        ctx.event_bus_mut().detach_all(&ids);

        ctx.fire(SystemEvent::mode_start(ModeName::Draw(DrawModeName::Line)));
        assert!(ctx.active_modes().is_empty());
    }
}
