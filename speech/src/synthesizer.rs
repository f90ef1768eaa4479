//! The platform speech synthesizer.

use crate::{SpeechUtterance, Utterance};
use std::sync::Arc;

/// Interface for the process-wide speech synthesizer.
///
/// The synthesizer holds at most one active utterance. Implementations
/// report progress by dispatching events on the utterance, either
/// synchronously from these calls or later from their own tasks.
pub trait Synthesizer: Send + Sync {
    /// Queues the utterance for speaking.
    fn speak(&self, utterance: Arc<dyn Utterance>);

    /// Pauses the current utterance.
    fn pause(&self);

    /// Resumes a paused utterance.
    fn resume(&self);

    /// Stops output and drops every queued utterance.
    fn cancel(&self);
}

/// Constructs utterances for a synthesizer.
pub trait UtteranceBuilder: Send + Sync {
    fn build(&self, text: &str, lang: &str) -> Arc<dyn Utterance>;
}

/// Builds [`SpeechUtterance`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpeechUtteranceBuilder;

impl UtteranceBuilder for SpeechUtteranceBuilder {
    fn build(&self, text: &str, lang: &str) -> Arc<dyn Utterance> {
        Arc::new(SpeechUtterance::new(text, lang))
    }
}

/// The synthesis capability handed to a [`crate::SpeechReader`].
#[derive(Clone)]
pub struct SynthesisApi {
    pub synthesizer: Arc<dyn Synthesizer>,
    pub utterances: Arc<dyn UtteranceBuilder>,
}

impl SynthesisApi {
    pub fn new(synthesizer: Arc<dyn Synthesizer>, utterances: Arc<dyn UtteranceBuilder>) -> Self {
        Self {
            synthesizer,
            utterances,
        }
    }

    /// Uses [`SpeechUtterance`] for utterances.
    pub fn with_synthesizer(synthesizer: Arc<dyn Synthesizer>) -> Self {
        Self::new(synthesizer, Arc::new(SpeechUtteranceBuilder))
    }
}
