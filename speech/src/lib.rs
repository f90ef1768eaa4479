//! Text-to-speech reader handles over a platform speech synthesizer.
//!
//! This crate provides:
//! - [`Utterance`] and [`SpeechUtterance`]: one unit of text and its lifecycle events
//! - [`Synthesizer`]: the shared platform synthesizer
//! - [`Reader`]: play/pause/resume/cancel for one utterance, with a keep-alive timer
//! - [`SpeechReader`]: the factory that hands out readers
//!
//! # Example
//!
//! ```rust,ignore
//! use speak_speech::{SpeechReader, SynthesisApi, ReaderEventKind};
//!
//! let service = SpeechReader::new(Some(SynthesisApi::with_synthesizer(synth)));
//! service.set_language("en-GB")?;
//!
//! let reader = service.get_new_reader("hello world")?;
//! reader.on(ReaderEventKind::Error, Arc::new(|e: &ReaderEvent| eprintln!("{e:?}")));
//! reader.play();
//! ```

mod events;
mod reader;
mod schedule;
mod service;
mod synthesizer;
mod utterance;

pub use events::*;
pub use reader::*;
pub use schedule::{KEEP_ALIVE_INTERVAL, defer, next_tick};
pub use service::*;
pub use synthesizer::*;
pub use utterance::*;

#[cfg(test)]
mod tests;
