//! Typed event bus between the transport client and its subscribers.
//!
//! The bus is single-threaded (WASM constraint) and uses interior mutability
//! via RefCell. Handlers are kept per [`EventKind`] in registration order.
//! `clear()` bumps a generation counter; handles from an older generation
//! are dead and their handlers never run again.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use news_types::{
    Result,
    event::{EventKind, TransportEvent},
};

pub type Handler = Rc<dyn Fn(&TransportEvent) -> Result<()>>;

/// Returned by `subscribe`; pass it to `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionHandle {
    kind: EventKind,
    id: u64,
    generation: u64,
}

impl SubscriptionHandle {
    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

#[derive(Default)]
struct Registry {
    generation: u64,
    next_id: u64,
    handlers: HashMap<EventKind, Vec<(u64, Handler)>>,
}

impl Registry {
    fn contains(&self, kind: EventKind, id: u64) -> bool {
        self.handlers
            .get(&kind)
            .is_some_and(|list| list.iter().any(|(hid, _)| *hid == id))
    }
}

/// Shared event bus: clone-cheap via Rc.
#[derive(Clone)]
pub struct EventBus {
    inner: Rc<RefCell<Registry>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Registry::default())),
        }
    }

    /// Register a handler for one kind of event.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionHandle
    where
        F: Fn(&TransportEvent) -> Result<()> + 'static,
    {
        let mut reg = self.inner.borrow_mut();
        reg.next_id += 1;
        let id = reg.next_id;
        let generation = reg.generation;
        reg.handlers
            .entry(kind)
            .or_default()
            .push((id, Rc::new(handler)));
        SubscriptionHandle { kind, id, generation }
    }

    /// Remove a handler. Returns false if it was already gone.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let mut reg = self.inner.borrow_mut();
        if handle.generation != reg.generation {
            return false;
        }
        match reg.handlers.get_mut(&handle.kind) {
            Some(list) => {
                let before = list.len();
                list.retain(|(id, _)| *id != handle.id);
                list.len() != before
            }
            None => false,
        }
    }

    /// Deliver an event to every handler of its kind, in registration order.
    /// A failing handler is logged and does not stop the others.
    /// Returns the number of handlers invoked.
    pub fn emit(&self, event: &TransportEvent) -> usize {
        let kind = event.kind();
        let (generation, handlers) = {
            let reg = self.inner.borrow();
            let list = reg.handlers.get(&kind).cloned().unwrap_or_default();
            (reg.generation, list)
        };

        let mut invoked = 0;
        for (id, handler) in handlers {
            // A handler may clear or unsubscribe while we dispatch.
            let live = {
                let reg = self.inner.borrow();
                reg.generation == generation && reg.contains(kind, id)
            };
            if !live {
                continue;
            }
            invoked += 1;
            if let Err(e) = handler(event) {
                log::warn!("{:?} handler #{} failed: {}", kind, id, e);
            }
        }
        invoked
    }

    /// Drop every handler and invalidate all outstanding handles.
    pub fn clear(&self) {
        let mut reg = self.inner.borrow_mut();
        reg.generation += 1;
        reg.handlers.clear();
    }

    pub fn is_active(&self, handle: &SubscriptionHandle) -> bool {
        let reg = self.inner.borrow();
        reg.generation == handle.generation && reg.contains(handle.kind, handle.id)
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.inner
            .borrow()
            .handlers
            .get(&kind)
            .map_or(0, Vec::len)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
