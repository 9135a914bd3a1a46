//! Translation of internal events into the public forwarded vocabulary.

use super::bus::{EventContext, Flow, Handler, HandlerId};
use super::types::{
    BusEvent, Channel, ControlAction, DrawAction, EditAction, FwdEvent, HelperAction, SystemEvent,
};
use crate::MapMark;
use crate::modes::ModeName;
use indexmap::IndexSet;
use std::cell::RefCell;
use std::rc::Rc;

/// Republishes internal events on [`Channel::Forwarded`].
///
/// Attached after the lifecycle listeners, so a mode start or end is only
/// reported once the lifecycle took it into account. A start that was
/// refused or an end of a mode that never ran is not reported.
#[derive(Default)]
pub struct EventForwarder {
    reported: RefCell<IndexSet<ModeName>>,
}

impl EventForwarder {
    pub fn attach(ctx: &mut MapMark) -> Vec<HandlerId> {
        let forwarder = Rc::new(Self::default());
        let handlers: Vec<(Channel, Handler<MapMark>)> = [Channel::Draw, Channel::Edit, Channel::Helper, Channel::Control]
            .into_iter()
            .map(|channel| {
                let forwarder = forwarder.clone();
                let handler: Handler<MapMark> =
                    Rc::new(move |ctx: &mut MapMark, event: &BusEvent| forwarder.handle(ctx, event));
                (channel, handler)
            })
            .collect();
        ctx.event_bus_mut().attach(handlers)
    }

    fn handle(&self, ctx: &mut MapMark, event: &BusEvent) -> Flow {
        let BusEvent::System(event) = event else {
            return Flow::Next;
        };
        for forwarded in self.translate(ctx, event) {
            log::trace!("Forwarding {}", forwarded.name());
            ctx.fire(forwarded);
        }
        Flow::Next
    }

    /// Report a mode start if the mode now runs and was not reported yet.
    fn mode_started(&self, ctx: &MapMark, mode: ModeName) -> bool {
        ctx.is_mode_enabled(mode) && self.reported.borrow_mut().insert(mode)
    }

    /// Report a mode end if its start was reported and it stopped running.
    fn mode_ended(&self, ctx: &MapMark, mode: ModeName) -> bool {
        let ending = ctx
            .actions
            .get(mode.key())
            .is_none_or(|action| action.is_ending());
        ending && self.reported.borrow_mut().shift_remove(&mode)
    }

    /// Toggle events of `mode`, preceded by those of the modes depending on
    /// it. Companions are started and ended from inside their dependent's
    /// transition, so the dependent is reported first in both directions.
    fn mode_toggled(&self, ctx: &MapMark, mode: ModeName, enabled: bool) -> Vec<FwdEvent> {
        let report = |mode: ModeName| {
            if enabled {
                self.mode_started(ctx, mode)
            } else {
                self.mode_ended(ctx, mode)
            }
        };
        ctx.options
            .mode_relations
            .dependents_of(mode)
            .into_iter()
            .chain([mode])
            .filter(|mode| report(*mode))
            .flat_map(|mode| toggle_events(mode, enabled))
            .collect()
    }

    fn translate(&self, ctx: &MapMark, event: &SystemEvent) -> Vec<FwdEvent> {
        match event {
            SystemEvent::Draw { mode, action } => match action {
                DrawAction::ModeStart => self.mode_toggled(ctx, ModeName::Draw(*mode), true),
                DrawAction::ModeEnd => self.mode_toggled(ctx, ModeName::Draw(*mode), false),
                DrawAction::FeatureCreated { feature } => vec![FwdEvent::Create {
                    feature: feature.clone(),
                }],
                DrawAction::BeforeFeatureCreate { .. } => Vec::new(),
            },
            SystemEvent::Edit { mode, action } => {
                let mode = *mode;
                match action {
                    EditAction::ModeStart => self.mode_toggled(ctx, ModeName::Edit(mode), true),
                    EditAction::ModeEnd => self.mode_toggled(ctx, ModeName::Edit(mode), false),
                    EditAction::FeatureEditStart { feature } => vec![FwdEvent::EditStart {
                        mode,
                        feature: feature.clone(),
                    }],
                    EditAction::FeatureUpdated { feature, old, new } => vec![FwdEvent::Edit {
                        mode,
                        feature: feature.clone(),
                        old: old.clone(),
                        new: new.clone(),
                    }],
                    EditAction::FeatureEditEnd { feature } => vec![FwdEvent::EditEnd {
                        mode,
                        feature: feature.clone(),
                    }],
                    EditAction::FeatureRemoved { feature } => vec![FwdEvent::Remove {
                        mode,
                        feature: feature.clone(),
                    }],
                    _ => Vec::new(),
                }
            }
            SystemEvent::Helper { mode, action } => match action {
                HelperAction::ModeStart => self.mode_toggled(ctx, ModeName::Helper(*mode), true),
                HelperAction::ModeEnd => self.mode_toggled(ctx, ModeName::Helper(*mode), false),
            },
            SystemEvent::Control(ControlAction::Loaded) => vec![FwdEvent::Loaded],
            SystemEvent::Control(ControlAction::ModeToggled { .. }) => Vec::new(),
        }
    }
}

fn toggle_events(mode: ModeName, enabled: bool) -> Vec<FwdEvent> {
    match mode {
        ModeName::Draw(shape) => {
            let phase = if enabled {
                FwdEvent::DrawStart { shape }
            } else {
                FwdEvent::DrawEnd { shape }
            };
            vec![FwdEvent::GlobalDrawModeToggled { enabled, shape }, phase]
        }
        ModeName::Edit(mode) => vec![FwdEvent::GlobalEditModeToggled { enabled, mode }],
        ModeName::Helper(mode) => vec![FwdEvent::GlobalHelperModeToggled { enabled, mode }],
    }
}
