//! Starting and ending modes.
//!
//! Every running mode lives in [`ActionInstances`] under its
//! [`ActionInstanceKey`]; a key is either absent or maps to exactly one
//! instance. Exclusive siblings are ended before a mode's start hook runs and
//! companion modes are started after it, both through mode start/end events
//! so the forwarded vocabulary reports them.

use super::{ActionInstance, ActionInstanceKey, ActionType, Mode, ModeFlags, ModeName, create_instance};
use crate::MapMark;
use crate::events::{BusEvent, Channel, EditAction, EventContext, Flow, Handler, HandlerId, SystemEvent};
use indexmap::IndexMap;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// A running mode with its flags and attached handlers.
pub struct ActiveAction {
    key: ActionInstanceKey,
    instance: RefCell<ActionInstance>,
    flags: Cell<ModeFlags>,
    handlers: RefCell<Vec<HandlerId>>,
    /// End requested while the instance was busy handling an event.
    end_requested: Cell<Option<ActionType>>,
}

impl ActiveAction {
    pub(crate) fn new(key: ActionInstanceKey, instance: ActionInstance) -> Self {
        Self {
            key,
            instance: RefCell::new(instance),
            flags: Cell::new(ModeFlags::default()),
            handlers: RefCell::new(Vec::new()),
            end_requested: Cell::new(None),
        }
    }

    pub fn key(&self) -> ActionInstanceKey {
        self.key
    }

    pub fn flags(&self) -> ModeFlags {
        self.flags.get()
    }

    /// Kind of the stored instance, `None` while it is handling an event.
    pub fn action_type(&self) -> Option<ActionType> {
        self.instance.try_borrow().ok().map(|instance| instance.action_type())
    }

    /// Check if an end is waiting for the current handler to return.
    pub fn is_ending(&self) -> bool {
        self.end_requested.get().is_some()
    }
}

/// Running modes by key.
#[derive(Default)]
pub struct ActionInstances {
    instances: IndexMap<ActionInstanceKey, Rc<ActiveAction>>,
}

impl ActionInstances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: ActionInstanceKey) -> bool {
        self.instances.contains_key(&key)
    }

    pub fn get(&self, key: ActionInstanceKey) -> Option<Rc<ActiveAction>> {
        self.instances.get(&key).cloned()
    }

    /// Running modes in start order.
    pub fn active_modes(&self) -> Vec<ModeName> {
        self.instances.keys().map(|key| key.mode()).collect()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn flags(&self, key: ActionInstanceKey) -> Option<ModeFlags> {
        self.instances.get(&key).map(|action| action.flags.get())
    }

    /// Change the flags of a running mode. Returns whether it runs.
    pub fn update_flags(&self, key: ActionInstanceKey, update: impl FnOnce(&mut ModeFlags)) -> bool {
        let Some(action) = self.instances.get(&key) else {
            return false;
        };
        let mut flags = action.flags.get();
        update(&mut flags);
        action.flags.set(flags);
        true
    }

    pub(crate) fn insert(&mut self, action: Rc<ActiveAction>) {
        self.instances.insert(action.key, action);
    }

    fn remove(&mut self, key: ActionInstanceKey) -> Option<Rc<ActiveAction>> {
        self.instances.shift_remove(&key)
    }
}

/// Start a mode.
///
/// Starting a running mode is logged as an error and leaves it untouched;
/// a mode without implementation is ignored.
pub fn start_action(ctx: &mut MapMark, mode: ModeName) {
    let key = mode.key();
    if ctx.actions.contains(key) {
        log::error!("Action instance \"{}\" already exists", key);
        return;
    }
    let Some(instance) = create_instance(mode) else {
        log::debug!("No implementation for mode \"{}\"", mode);
        return;
    };

    end_exclusive_modes(ctx, mode);
    if ctx.actions.contains(key) {
        log::error!("Action instance \"{}\" was started while ending its exclusive modes", key);
        return;
    }

    let action = Rc::new(ActiveAction::new(key, instance));
    ctx.actions.insert(action.clone());
    attach_handlers(ctx, &action);

    log::debug!("Starting \"{}\"", key);
    if let Ok(mut instance) = action.instance.try_borrow_mut() {
        instance.mode_mut().on_start_action(ctx);
    }

    start_related_modes(ctx, mode);
    finish_deferred_end(ctx, &action);
}

/// End a mode, expecting an instance of kind `expected`.
///
/// A mode that is not running is ignored. An instance of another kind is
/// logged as an error and left in place.
pub fn end_action(ctx: &mut MapMark, mode: ModeName, expected: ActionType) {
    let key = mode.key();
    let Some(action) = ctx.actions.get(key) else {
        return;
    };

    let Ok(mut instance) = action.instance.try_borrow_mut() else {
        log::debug!("\"{}\" is handling an event, ending it afterwards", key);
        action.end_requested.set(Some(expected));
        return;
    };

    if instance.action_type() != expected {
        log::error!(
            "Wrong action instance for {} event \"{}\": {:?}",
            expected,
            key,
            *instance
        );
        return;
    }

    log::debug!("Ending \"{}\"", key);
    instance.mode_mut().on_end_action(ctx);
    drop(instance);

    let handlers = action.handlers.take();
    ctx.event_bus_mut().detach_all(&handlers);
    ctx.actions.remove(key);

    end_related_modes(ctx, mode);
}

fn end_exclusive_modes(ctx: &mut MapMark, mode: ModeName) {
    for other in ctx.options.mode_relations.exclusive_with(mode) {
        if ctx.actions.contains(other.key()) {
            ctx.fire(SystemEvent::mode_end(other));
        }
    }
}

fn start_related_modes(ctx: &mut MapMark, mode: ModeName) {
    for required in ctx.options.mode_relations.requirements_of(mode) {
        if !ctx.actions.contains(required.key()) {
            ctx.fire(SystemEvent::mode_start(required));
        }
    }
}

/// End companions that no running mode needs anymore.
fn end_related_modes(ctx: &mut MapMark, mode: ModeName) {
    let relations = ctx.options.mode_relations.clone();
    for required in relations.requirements_of(mode) {
        let still_needed = relations
            .dependents_of(required)
            .into_iter()
            .any(|dependent| ctx.actions.contains(dependent.key()));
        if ctx.actions.contains(required.key()) && !still_needed {
            ctx.fire(SystemEvent::mode_end(required));
        }
    }
}

fn attach_handlers(ctx: &mut MapMark, action: &Rc<ActiveAction>) {
    let (pointer_events, is_edit) = match action.instance.try_borrow() {
        Ok(instance) => (
            instance.mode().pointer_events(),
            matches!(*instance, ActionInstance::Edit(_)),
        ),
        Err(_) => return,
    };

    let mut handlers: Vec<(Channel, Handler<MapMark>)> = pointer_events
        .iter()
        .map(|kind| {
            let weak = Rc::downgrade(action);
            let handler: Handler<MapMark> = Rc::new(move |ctx: &mut MapMark, event: &BusEvent| {
                let BusEvent::Pointer(pointer) = event else {
                    return Flow::Next;
                };
                dispatch(ctx, &weak, |mode, ctx| mode.handle_pointer(ctx, pointer))
            });
            (Channel::Pointer(*kind), handler)
        })
        .collect();

    if is_edit {
        let weak = Rc::downgrade(action);
        let own_mode = action.key.mode();
        let handler: Handler<MapMark> = Rc::new(move |ctx: &mut MapMark, event: &BusEvent| {
            let BusEvent::System(SystemEvent::Edit { mode, action }) = event else {
                return Flow::Next;
            };
            let gesture = matches!(
                action,
                EditAction::MarkerCaptured { .. }
                    | EditAction::MarkerMove { .. }
                    | EditAction::MarkerReleased { .. }
            );
            if !gesture || ModeName::Edit(*mode) != own_mode {
                return Flow::Next;
            }
            dispatch(ctx, &weak, |instance, ctx| instance.handle_edit_event(ctx, action))
        });
        handlers.push((Channel::Edit, handler));
    }

    let ids = ctx.event_bus_mut().attach(handlers);
    *action.handlers.borrow_mut() = ids;
}

/// Run a handler of a mode, then any end requested meanwhile.
fn dispatch(
    ctx: &mut MapMark,
    action: &Weak<ActiveAction>,
    handle: impl FnOnce(&mut dyn Mode, &mut MapMark) -> Flow,
) -> Flow {
    let Some(action) = action.upgrade() else {
        return Flow::Next;
    };

    let flow = match action.instance.try_borrow_mut() {
        Ok(mut instance) => handle(instance.mode_mut(), ctx),
        Err(_) => {
            log::trace!("\"{}\" is busy, skipping event", action.key);
            return Flow::Next;
        }
    };

    finish_deferred_end(ctx, &action);
    flow
}

fn finish_deferred_end(ctx: &mut MapMark, action: &Rc<ActiveAction>) {
    let Some(expected) = action.end_requested.take() else {
        return;
    };
    let still_stored = ctx
        .actions
        .get(action.key)
        .is_some_and(|stored| Rc::ptr_eq(&stored, action));
    if still_stored {
        end_action(ctx, action.key.mode(), expected);
    }
}
