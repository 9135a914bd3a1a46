//! Synchronous publish/subscribe bus.

use super::types::{BusEvent, Channel};
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

/// Whether the remaining handlers of a firing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
    #[default]
    Next,
    Stop,
}

/// Handle of an attached handler, used to detach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Event handler operating on the context that owns the bus.
pub type Handler<C> = Rc<dyn Fn(&mut C, &BusEvent) -> Flow>;

/// Handlers per channel, in registration order.
pub struct EventBus<C> {
    handlers: IndexMap<Channel, Vec<(HandlerId, Handler<C>)>>,
    next_id: u64,
}

impl<C> Default for EventBus<C> {
    fn default() -> Self {
        Self {
            handlers: IndexMap::new(),
            next_id: 0,
        }
    }
}

impl<C> fmt::Debug for EventBus<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: Vec<(Channel, usize)> = self
            .handlers
            .iter()
            .map(|(channel, handlers)| (*channel, handlers.len()))
            .collect();
        f.debug_struct("EventBus").field("handlers", &counts).finish()
    }
}

impl<C> EventBus<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach handlers; a channel may get several.
    pub fn attach(&mut self, handlers: impl IntoIterator<Item = (Channel, Handler<C>)>) -> Vec<HandlerId> {
        handlers
            .into_iter()
            .map(|(channel, handler)| self.attach_one(channel, handler))
            .collect()
    }

    /// Attach one handler.
    pub fn attach_one(&mut self, channel: Channel, handler: Handler<C>) -> HandlerId {
        self.next_id += 1;
        let id = HandlerId(self.next_id);
        self.handlers.entry(channel).or_default().push((id, handler));
        id
    }

    /// Detach a handler. Returns whether it was attached.
    pub fn detach(&mut self, id: HandlerId) -> bool {
        for handlers in self.handlers.values_mut() {
            if let Some(index) = handlers.iter().position(|(handler_id, _)| *handler_id == id) {
                handlers.remove(index);
                return true;
            }
        }
        false
    }

    pub fn detach_all(&mut self, ids: &[HandlerId]) {
        for id in ids {
            self.detach(*id);
        }
    }

    pub fn handler_count(&self, channel: Channel) -> usize {
        self.handlers.get(&channel).map_or(0, Vec::len)
    }

    /// Handlers of a channel as of now.
    pub fn snapshot(&self, channel: Channel) -> Vec<Handler<C>> {
        self.handlers
            .get(&channel)
            .map(|handlers| handlers.iter().map(|(_, handler)| handler.clone()).collect())
            .unwrap_or_default()
    }
}

/// A context owning an [`EventBus`] over itself.
pub trait EventContext: Sized {
    fn event_bus(&self) -> &EventBus<Self>;

    fn event_bus_mut(&mut self) -> &mut EventBus<Self>;

    /// Run the handlers of the event's channel in registration order.
    ///
    /// The handler list is taken when the firing starts: handlers attached or
    /// detached by a running handler do not change it. Handlers may fire
    /// further events. Returns [`Flow::Stop`] if a handler stopped the firing.
    fn fire(&mut self, event: impl Into<BusEvent>) -> Flow {
        let event = event.into();
        let handlers = self.event_bus().snapshot(event.channel());
        for handler in handlers {
            if handler(self, &event) == Flow::Stop {
                return Flow::Stop;
            }
        }
        Flow::Next
    }
}
