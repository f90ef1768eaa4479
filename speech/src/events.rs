//! Observer registration for reader events.

use crate::{ReaderState, SynthesisError};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Kinds of events a reader emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReaderEventKind {
    /// The utterance reported a synthesis error.
    Error,
    /// The reader moved to a new [`ReaderState`].
    State,
}

impl ReaderEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReaderEventKind::Error => "error",
            ReaderEventKind::State => "state",
        }
    }
}

impl fmt::Display for ReaderEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event emitted by a reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderEvent {
    /// Forwarded unmodified from the utterance.
    Error(SynthesisError),
    State(ReaderState),
}

impl ReaderEvent {
    pub fn kind(&self) -> ReaderEventKind {
        match self {
            ReaderEvent::Error(_) => ReaderEventKind::Error,
            ReaderEvent::State(_) => ReaderEventKind::State,
        }
    }
}

/// Callback subscribed to reader events.
pub type ReaderHandler = Arc<dyn Fn(&ReaderEvent) + Send + Sync>;

/// Identifies one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Synchronous event emitter.
#[derive(Default)]
pub struct Emitter {
    inner: Mutex<EmitterInner>,
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("handlers", &self.inner.lock().handlers.len())
            .finish()
    }
}

#[derive(Default)]
struct EmitterInner {
    next_id: u64,
    handlers: Vec<(ReaderEventKind, SubscriptionId, ReaderHandler)>,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `handler` to events of `kind`.
    pub fn on(&self, kind: ReaderEventKind, handler: ReaderHandler) -> SubscriptionId {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = SubscriptionId(inner.next_id);
        inner.handlers.push((kind, id, handler));
        id
    }

    /// Removes a subscription. Returns false if it was not registered.
    pub fn off(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.handlers.len();
        inner.handlers.retain(|(_, i, _)| *i != id);
        inner.handlers.len() != before
    }

    /// Calls every handler subscribed to the event's kind, in
    /// subscription order.
    pub fn emit(&self, event: &ReaderEvent) {
        let kind = event.kind();
        let targets: Vec<ReaderHandler> = self
            .inner
            .lock()
            .handlers
            .iter()
            .filter(|(k, _, _)| *k == kind)
            .map(|(_, _, h)| h.clone())
            .collect();
        for handler in targets {
            handler(event);
        }
    }
}
