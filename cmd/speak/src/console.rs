//! A synthesizer that "speaks" by printing words to the terminal.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use speak_speech::{Synthesizer, Utterance, UtteranceEvent};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Prints one word of the active utterance at a time, at a fixed rate.
///
/// Holds at most one utterance: speaking a new one cancels the old one.
pub struct ConsoleSynthesizer {
    word_delay: Duration,
    active: Arc<Mutex<Option<Active>>>,
    sink: Arc<dyn Fn(&str) + Send + Sync>,
}

struct Active {
    id: u64,
    utterance: Arc<dyn Utterance>,
    paused: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ConsoleSynthesizer {
    /// Speaks at `words_per_minute`, printing to stdout.
    pub fn new(words_per_minute: u32) -> Self {
        Self::with_sink(
            words_per_minute,
            Arc::new(|word: &str| {
                let mut out = std::io::stdout().lock();
                let _ = write!(out, "{} ", word);
                let _ = out.flush();
            }),
        )
    }

    /// Speaks at `words_per_minute`, handing each word to `sink`.
    pub fn with_sink(words_per_minute: u32, sink: Arc<dyn Fn(&str) + Send + Sync>) -> Self {
        let wpm = u64::from(words_per_minute.max(1));
        Self {
            word_delay: Duration::from_millis(60_000 / wpm),
            active: Arc::new(Mutex::new(None)),
            sink,
        }
    }

    fn take_active(&self) -> Option<Active> {
        self.active.lock().take()
    }
}

impl Synthesizer for ConsoleSynthesizer {
    fn speak(&self, utterance: Arc<dyn Utterance>) {
        if let Some(old) = self.take_active() {
            old.task.abort();
            old.utterance.dispatch(&UtteranceEvent::End);
        }

        let (paused_tx, mut paused_rx) = watch::channel(false);
        let id = next_id();
        let word_delay = self.word_delay;
        let active = self.active.clone();
        let sink = self.sink.clone();
        let target = utterance.clone();

        debug!(id, lang = utterance.lang(), "console: speak");
        let task = tokio::spawn(async move {
            target.dispatch(&UtteranceEvent::Start);
            let text = target.text().to_string();
            for word in text.split_whitespace() {
                if !wait_unpaused(&mut paused_rx).await {
                    return;
                }
                tokio::time::sleep(word_delay).await;
                // A pause during the delay holds the word back too.
                if !wait_unpaused(&mut paused_rx).await {
                    return;
                }
                sink(word);
            }

            let finished = {
                let mut slot = active.lock();
                match slot.as_ref() {
                    Some(a) if a.id == id => slot.take().is_some(),
                    _ => false,
                }
            };
            if finished {
                target.dispatch(&UtteranceEvent::End);
            }
        });

        *self.active.lock() = Some(Active {
            id,
            utterance,
            paused: paused_tx,
            task,
        });
    }

    fn pause(&self) {
        let utterance = {
            let slot = self.active.lock();
            match slot.as_ref() {
                Some(a) if !*a.paused.borrow() => {
                    let _ = a.paused.send(true);
                    a.utterance.clone()
                }
                _ => return,
            }
        };
        utterance.dispatch(&UtteranceEvent::Pause);
    }

    fn resume(&self) {
        let utterance = {
            let slot = self.active.lock();
            match slot.as_ref() {
                Some(a) if *a.paused.borrow() => {
                    let _ = a.paused.send(false);
                    a.utterance.clone()
                }
                _ => return,
            }
        };
        utterance.dispatch(&UtteranceEvent::Resume);
    }

    fn cancel(&self) {
        if let Some(old) = self.take_active() {
            debug!(id = old.id, "console: cancel");
            old.task.abort();
            old.utterance.dispatch(&UtteranceEvent::End);
        }
    }
}

/// Waits until not paused. Returns false if the synthesizer dropped the
/// utterance meanwhile.
async fn wait_unpaused(paused: &mut watch::Receiver<bool>) -> bool {
    while *paused.borrow_and_update() {
        if paused.changed().await.is_err() {
            return false;
        }
    }
    true
}

fn next_id() -> u64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}
