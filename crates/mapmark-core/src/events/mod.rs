//! Event bus, event payloads and the listeners wiring them to modes.

mod bus;
mod forwarder;
mod listeners;
mod types;

pub use bus::{EventBus, EventContext, Flow, Handler, HandlerId};
pub use forwarder::EventForwarder;
pub use listeners::{ControlEventListener, DrawEventListener, EditEventListener, HelperEventListener};
pub use types::{
    BusEvent, Channel, ControlAction, DrawAction, EVENT_PREFIX, EditAction, FwdEvent, HelperAction,
    PointerEvent, PointerEventName, SystemEvent,
};
