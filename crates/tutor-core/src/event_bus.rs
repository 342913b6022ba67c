//! Queue between the managers and the UI.
//!
//! Managers push `TutorEvent`s while their futures run; the app drains the
//! queue once per frame. Single-threaded, so a `RefCell` is enough.

use std::cell::RefCell;
use std::rc::Rc;
use tutor_types::event::{Notice, TutorEvent};

/// Shared event bus: clone-cheap via Rc. Clones share one queue.
#[derive(Clone, Default)]
pub struct EventBus {
    queue: Rc<RefCell<Vec<TutorEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: TutorEvent) {
        log::trace!("event: {:?}", event);
        self.queue.borrow_mut().push(event);
    }

    /// Shorthand for emitting a toast.
    pub fn notify(&self, notice: Notice) {
        self.emit(TutorEvent::Notice(notice));
    }

    /// Take everything queued so far, oldest first.
    pub fn drain(&self) -> Vec<TutorEvent> {
        std::mem::take(&mut *self.queue.borrow_mut())
    }

    pub fn has_pending(&self) -> bool {
        !self.queue.borrow().is_empty()
    }
}
