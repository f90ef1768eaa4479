//! Utterances: one unit of text queued for synthesis, and the events it fires.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Platform error codes reported by a failed utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Canceled,
    Interrupted,
    AudioBusy,
    AudioHardware,
    Network,
    SynthesisUnavailable,
    SynthesisFailed,
    LanguageUnavailable,
    VoiceUnavailable,
    TextTooLong,
    InvalidArgument,
    NotAllowed,
}

impl ErrorCode {
    /// Returns the platform name of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Canceled => "canceled",
            ErrorCode::Interrupted => "interrupted",
            ErrorCode::AudioBusy => "audio-busy",
            ErrorCode::AudioHardware => "audio-hardware",
            ErrorCode::Network => "network",
            ErrorCode::SynthesisUnavailable => "synthesis-unavailable",
            ErrorCode::SynthesisFailed => "synthesis-failed",
            ErrorCode::LanguageUnavailable => "language-unavailable",
            ErrorCode::VoiceUnavailable => "voice-unavailable",
            ErrorCode::TextTooLong => "text-too-long",
            ErrorCode::InvalidArgument => "invalid-argument",
            ErrorCode::NotAllowed => "not-allowed",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error signal fired by an utterance when synthesis fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("synthesis error: {code} at char {char_index}")]
pub struct SynthesisError {
    /// What went wrong.
    pub code: ErrorCode,
    /// Index of the character being spoken when the error occurred.
    pub char_index: usize,
    /// Time spent speaking before the error.
    pub elapsed: Duration,
}

impl SynthesisError {
    /// Creates an error at the beginning of the utterance.
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            char_index: 0,
            elapsed: Duration::ZERO,
        }
    }
}

/// The kinds of signals an utterance fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UtteranceEventKind {
    Start,
    Pause,
    Resume,
    End,
    Error,
}

impl UtteranceEventKind {
    /// Returns the event name.
    pub fn as_str(&self) -> &'static str {
        match self {
            UtteranceEventKind::Start => "start",
            UtteranceEventKind::Pause => "pause",
            UtteranceEventKind::Resume => "resume",
            UtteranceEventKind::End => "end",
            UtteranceEventKind::Error => "error",
        }
    }
}

impl fmt::Display for UtteranceEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lifecycle signal fired by an utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UtteranceEvent {
    Start,
    Pause,
    Resume,
    End,
    Error(SynthesisError),
}

impl UtteranceEvent {
    pub fn kind(&self) -> UtteranceEventKind {
        match self {
            UtteranceEvent::Start => UtteranceEventKind::Start,
            UtteranceEvent::Pause => UtteranceEventKind::Pause,
            UtteranceEvent::Resume => UtteranceEventKind::Resume,
            UtteranceEvent::End => UtteranceEventKind::End,
            UtteranceEvent::Error(_) => UtteranceEventKind::Error,
        }
    }
}

/// Callback attached to an utterance.
pub type UtteranceListener = Arc<dyn Fn(&UtteranceEvent) + Send + Sync>;

/// Identifies one registered listener so it can be removed precisely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// A unit of text to be spoken, acting as an event target for its
/// lifecycle signals.
pub trait Utterance: Send + Sync + fmt::Debug {
    /// The text to speak.
    fn text(&self) -> &str;

    /// BCP 47 language tag.
    fn lang(&self) -> &str;

    /// Registers a listener for one kind of event.
    fn add_listener(&self, kind: UtteranceEventKind, listener: UtteranceListener) -> ListenerId;

    /// Removes a listener previously returned by [`Utterance::add_listener`].
    /// Returns false if no such listener was registered for `kind`.
    fn remove_listener(&self, kind: UtteranceEventKind, id: ListenerId) -> bool;

    /// Fires an event at every listener registered for its kind.
    fn dispatch(&self, event: &UtteranceEvent);

    /// Logs the utterance right before it is handed to the synthesizer.
    ///
    /// Some engines drop `end` events for utterances that were never
    /// inspected by the host (chromium issue 369472). Backends that wrap
    /// such an engine override this to log the native object.
    fn inspect(&self) {
        tracing::debug!(utterance = ?self, "utterance: inspect");
    }
}

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// The standard in-process utterance.
pub struct SpeechUtterance {
    text: String,
    lang: String,
    listeners: Mutex<Vec<(UtteranceEventKind, ListenerId, UtteranceListener)>>,
}

impl SpeechUtterance {
    pub fn new(text: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            lang: lang.into(),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Number of listeners currently attached.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

impl fmt::Debug for SpeechUtterance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechUtterance")
            .field("text", &self.text)
            .field("lang", &self.lang)
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl Utterance for SpeechUtterance {
    fn text(&self) -> &str {
        &self.text
    }

    fn lang(&self) -> &str {
        &self.lang
    }

    fn add_listener(&self, kind: UtteranceEventKind, listener: UtteranceListener) -> ListenerId {
        let id = ListenerId(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((kind, id, listener));
        id
    }

    fn remove_listener(&self, kind: UtteranceEventKind, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        match listeners.iter().position(|(k, i, _)| *k == kind && *i == id) {
            Some(idx) => {
                listeners.remove(idx);
                true
            }
            None => false,
        }
    }

    fn dispatch(&self, event: &UtteranceEvent) {
        let kind = event.kind();
        // Snapshot so listeners may detach while being called.
        let targets: Vec<UtteranceListener> = self
            .listeners
            .lock()
            .iter()
            .filter(|(k, _, _)| *k == kind)
            .map(|(_, _, l)| l.clone())
            .collect();
        for listener in targets {
            listener(event);
        }
    }
}
