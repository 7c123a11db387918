//! Chat store: the single serialized entry point for state changes.
//!
//! The current [`ChatState`] lives behind an `Rc` and is replaced as a whole
//! on every action, so a reader holding a snapshot never sees a half-applied
//! update. Async work captures an [`Epoch`] before awaiting and applies its
//! result with `apply_if_current`; a session switch or teardown in between
//! makes the result stale and it is dropped.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use crate::assembly::{reduce, ChatAction, ChatState, Effect};
use crate::ports::RuntimePort;

pub type Watcher = Rc<dyn Fn(&Rc<ChatState>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Epoch(u64);

/// Shared store: clone-cheap via Rc.
#[derive(Clone)]
pub struct ChatStore {
    inner: Rc<StoreInner>,
}

struct StoreInner {
    state: RefCell<Rc<ChatState>>,
    watchers: RefCell<Vec<(u64, Watcher)>>,
    next_watcher: Cell<u64>,
    runtime: Rc<dyn RuntimePort>,
    typing_timeout_ms: u64,
}

impl ChatStore {
    pub fn new(runtime: Rc<dyn RuntimePort>, typing_timeout_ms: u64) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                state: RefCell::new(Rc::new(ChatState::default())),
                watchers: RefCell::new(Vec::new()),
                next_watcher: Cell::new(0),
                runtime,
                typing_timeout_ms,
            }),
        }
    }

    pub fn snapshot(&self) -> Rc<ChatState> {
        self.inner.state.borrow().clone()
    }

    pub fn epoch(&self) -> Epoch {
        Epoch(self.inner.state.borrow().epoch())
    }

    pub fn is_current(&self, epoch: Epoch) -> bool {
        self.epoch() == epoch
    }

    /// Run one action through the reducer and publish the result.
    pub fn apply(&self, action: ChatAction) {
        log::trace!("apply {:?}", action);
        let current = self.snapshot();
        let (next, effects) = reduce(&current, action);
        let next = Rc::new(next);
        *self.inner.state.borrow_mut() = next.clone();

        self.notify(&next);
        for effect in effects {
            self.run(effect);
        }
    }

    /// Apply only if no session switch or teardown happened since `epoch`.
    pub fn apply_if_current(&self, epoch: Epoch, action: ChatAction) -> bool {
        if !self.is_current(epoch) {
            log::debug!("Discarding stale result: {:?}", action);
            return false;
        }
        self.apply(action);
        true
    }

    /// Observe every new snapshot. Returns an id for `unwatch`.
    pub fn watch<F>(&self, watcher: F) -> u64
    where
        F: Fn(&Rc<ChatState>) + 'static,
    {
        let id = self.inner.next_watcher.get() + 1;
        self.inner.next_watcher.set(id);
        self.inner
            .watchers
            .borrow_mut()
            .push((id, Rc::new(watcher)));
        id
    }

    pub fn unwatch(&self, id: u64) {
        self.inner.watchers.borrow_mut().retain(|(wid, _)| *wid != id);
    }

    fn notify(&self, state: &Rc<ChatState>) {
        let watchers: Vec<Watcher> = self
            .inner
            .watchers
            .borrow()
            .iter()
            .map(|(_, w)| w.clone())
            .collect();
        for watcher in watchers {
            watcher(state);
        }
    }

    fn run(&self, effect: Effect) {
        match effect {
            Effect::ArmTypingWatchdog(ticket) => {
                let weak: Weak<StoreInner> = Rc::downgrade(&self.inner);
                let timer = self.inner.runtime.sleep(self.inner.typing_timeout_ms);
                self.inner.runtime.spawn(Box::pin(async move {
                    timer.await;
                    if let Some(inner) = weak.upgrade() {
                        ChatStore { inner }.apply(ChatAction::TypingWatchdogExpired(ticket));
                    }
                }));
            }
        }
    }
}
