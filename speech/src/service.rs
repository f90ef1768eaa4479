//! Hands out readers bound to the platform synthesizer.

use crate::schedule::KEEP_ALIVE_INTERVAL;
use crate::{
    Reader, ReaderEventKind, ReaderHandler, ReaderState, SubscriptionId, SynthesisApi,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Default language for new utterances.
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Error type for reader construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReaderError {
    #[error("[SpeechReader] text must be a non-empty string")]
    EmptyText,
    #[error("[SpeechReader] language must be a valid BCP 47 tag")]
    EmptyLanguage,
}

/// What callers drive: a live [`Reader`] or the inert [`NullReader`].
pub trait Playback: Send + Sync {
    fn play(&self);
    fn pause(&self);
    fn resume(&self);
    fn cancel(&self);
    fn destroy(&self);

    fn state(&self) -> ReaderState;
    fn is_playing(&self) -> bool;
    fn is_paused(&self) -> bool;
    fn is_playable(&self) -> bool;

    fn on(&self, kind: ReaderEventKind, handler: ReaderHandler) -> SubscriptionId;
    fn off(&self, id: SubscriptionId) -> bool;
}

impl Playback for Reader {
    fn play(&self) {
        Reader::play(self)
    }
    fn pause(&self) {
        Reader::pause(self)
    }
    fn resume(&self) {
        Reader::resume(self)
    }
    fn cancel(&self) {
        Reader::cancel(self)
    }
    fn destroy(&self) {
        Reader::destroy(self)
    }
    fn state(&self) -> ReaderState {
        Reader::state(self)
    }
    fn is_playing(&self) -> bool {
        Reader::is_playing(self)
    }
    fn is_paused(&self) -> bool {
        Reader::is_paused(self)
    }
    fn is_playable(&self) -> bool {
        Reader::is_playable(self)
    }
    fn on(&self, kind: ReaderEventKind, handler: ReaderHandler) -> SubscriptionId {
        Reader::on(self, kind, handler)
    }
    fn off(&self, id: SubscriptionId) -> bool {
        Reader::off(self, id)
    }
}

/// Stand-in returned when speech synthesis is unavailable.
/// Every operation does nothing and it is never playable.
#[derive(Debug, Default)]
pub struct NullReader {
    events: crate::Emitter,
}

impl Playback for NullReader {
    fn play(&self) {}
    fn pause(&self) {}
    fn resume(&self) {}
    fn cancel(&self) {}
    fn destroy(&self) {}
    fn state(&self) -> ReaderState {
        ReaderState::Idle
    }
    fn is_playing(&self) -> bool {
        false
    }
    fn is_paused(&self) -> bool {
        false
    }
    fn is_playable(&self) -> bool {
        false
    }
    fn on(&self, kind: ReaderEventKind, handler: ReaderHandler) -> SubscriptionId {
        self.events.on(kind, handler)
    }
    fn off(&self, id: SubscriptionId) -> bool {
        self.events.off(id)
    }
}

/// Creates readers for text, one utterance per reader.
///
/// Only the most recently created reader stays wired: creating a new one
/// tears down the previous one.
pub struct SpeechReader {
    api: Option<SynthesisApi>,
    lang: Mutex<String>,
    keep_alive: Mutex<Duration>,
    last: Mutex<Option<Reader>>,
}

impl SpeechReader {
    /// Creates the service. `None` means the platform has no synthesizer.
    pub fn new(api: Option<SynthesisApi>) -> Self {
        Self {
            api,
            lang: Mutex::new(DEFAULT_LANGUAGE.to_string()),
            keep_alive: Mutex::new(KEEP_ALIVE_INTERVAL),
            last: Mutex::new(None),
        }
    }

    /// A service for a platform without speech synthesis.
    pub fn unavailable() -> Self {
        Self::new(None)
    }

    pub fn is_available(&self) -> bool {
        self.api.is_some()
    }

    /// Sets the language for new readers.
    pub fn set_language(&self, lang: &str) -> Result<(), ReaderError> {
        let lang = lang.trim();
        if lang.is_empty() {
            return Err(ReaderError::EmptyLanguage);
        }
        *self.lang.lock() = lang.to_string();
        Ok(())
    }

    pub fn language(&self) -> String {
        self.lang.lock().clone()
    }

    /// Sets the keep-alive interval for new readers.
    pub fn set_keep_alive(&self, interval: Duration) {
        *self.keep_alive.lock() = interval;
    }

    /// Creates a reader for `text` in the configured language.
    pub fn get_new_reader(&self, text: &str) -> Result<Arc<dyn Playback>, ReaderError> {
        self.get_new_reader_with_language(text, None)
    }

    /// Creates a reader for `text`, overriding the language when given.
    pub fn get_new_reader_with_language(
        &self,
        text: &str,
        lang: Option<&str>,
    ) -> Result<Arc<dyn Playback>, ReaderError> {
        if text.trim().is_empty() {
            return Err(ReaderError::EmptyText);
        }
        let lang = match lang {
            Some(l) if l.trim().is_empty() => return Err(ReaderError::EmptyLanguage),
            Some(l) => l.trim().to_string(),
            None => self.language(),
        };

        let Some(api) = &self.api else {
            debug!("speech reader: synthesis unavailable, returning inert reader");
            return Ok(Arc::new(NullReader::default()));
        };

        let utterance = api.utterances.build(text, &lang);
        let reader = Reader::with_keep_alive(
            utterance,
            api.synthesizer.clone(),
            *self.keep_alive.lock(),
        );

        if let Some(previous) = self.last.lock().replace(reader.clone()) {
            previous.destroy();
        }
        info!(lang = %lang, chars = text.len(), "speech reader: new reader");

        Ok(Arc::new(reader))
    }

    /// The most recently created reader, if any.
    pub fn last_reader(&self) -> Option<Reader> {
        self.last.lock().clone()
    }
}

impl Default for SpeechReader {
    fn default() -> Self {
        Self::unavailable()
    }
}
