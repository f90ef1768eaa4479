//! The reader: play/pause/resume/cancel for one utterance.
//!
//! A [`Reader`] is bound to exactly one utterance and the shared
//! synthesizer for its whole life. It listens to the utterance's
//! `start`, `resume`, `end` and `error` signals, keeps the synthesizer
//! alive with a periodic pause/resume while playing, and reports state
//! changes and errors to subscribers.
//!
//! Every operation is synchronous. `speak` and `resume` are issued to the
//! synthesizer on the next scheduler turn, so all operations must be
//! called from within a Tokio runtime.

use crate::schedule::{KEEP_ALIVE_INTERVAL, KeepAlive, defer};
use crate::{
    Emitter, ListenerId, ReaderEvent, ReaderEventKind, ReaderHandler, SubscriptionId,
    Synthesizer, Utterance, UtteranceEvent, UtteranceEventKind,
};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Lifecycle state of a reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReaderState {
    /// Not playing and never paused. Initial state.
    #[default]
    Idle,
    Playing,
    Paused,
    /// The utterance finished.
    Ended,
    /// Terminal. The reader can never play again.
    Canceled,
}

impl ReaderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReaderState::Idle => "idle",
            ReaderState::Playing => "playing",
            ReaderState::Paused => "paused",
            ReaderState::Ended => "ended",
            ReaderState::Canceled => "canceled",
        }
    }
}

impl fmt::Display for ReaderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handle to one utterance's playback. Clones share the same reader.
///
/// Dropping the last handle tears the reader down.
#[derive(Clone)]
pub struct Reader {
    shared: Arc<Shared>,
}

struct Shared {
    utterance: Arc<dyn Utterance>,
    synth: Arc<dyn Synthesizer>,
    keep_alive: Duration,
    state: Mutex<State>,
    events: Emitter,
}

#[derive(Default)]
struct State {
    phase: ReaderState,
    did_play: bool,
    /// Set by teardown. Pending next-turn commands check it.
    torn_down: bool,
    /// Bumped by every `resume()`; only the latest deferred resume runs.
    resume_gen: u64,
    timer: Option<KeepAlive>,
    listeners: Option<Vec<(UtteranceEventKind, ListenerId)>>,
}

impl Reader {
    /// Binds a reader to `utterance` and the shared `synth`.
    pub fn new(utterance: Arc<dyn Utterance>, synth: Arc<dyn Synthesizer>) -> Self {
        Self::with_keep_alive(utterance, synth, KEEP_ALIVE_INTERVAL)
    }

    /// Like [`Reader::new`] with a custom keep-alive interval.
    pub fn with_keep_alive(
        utterance: Arc<dyn Utterance>,
        synth: Arc<dyn Synthesizer>,
        keep_alive: Duration,
    ) -> Self {
        let shared = Arc::new(Shared {
            utterance,
            synth,
            keep_alive,
            state: Mutex::new(State::default()),
            events: Emitter::new(),
        });
        let listeners = attach_listeners(&shared);
        shared.state.lock().listeners = Some(listeners);
        Self { shared }
    }

    /// Starts speaking. After the first call this is [`Reader::resume`].
    pub fn play(&self) {
        {
            let mut state = self.shared.state.lock();
            if state.phase == ReaderState::Canceled {
                warn!("reader: play on a canceled reader");
                return;
            }
            if state.torn_down {
                warn!("reader: play on a destroyed reader");
                return;
            }
            if state.did_play {
                drop(state);
                self.resume();
                return;
            }
            state.did_play = true;
        }

        let shared = &self.shared;
        info!(lang = shared.utterance.lang(), chars = shared.utterance.text().len(), "reader: play");

        // At most one utterance is audible process-wide.
        shared.synth.cancel();
        shared.utterance.inspect();

        let weak = Arc::downgrade(shared);
        defer(move || {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            {
                let state = shared.state.lock();
                if state.phase == ReaderState::Canceled || state.torn_down {
                    debug!(state = %state.phase, "reader: gone before speak");
                    return;
                }
            }
            shared.synth.speak(shared.utterance.clone());
        });

        self.start_timer();
    }

    /// Pauses speaking and stops the keep-alive timer.
    pub fn pause(&self) {
        let shared = &self.shared;
        // Clear the timer before pausing so no pending fire can resume.
        clear_timer(shared);
        {
            let state = shared.state.lock();
            if state.phase == ReaderState::Canceled || state.torn_down {
                return;
            }
        }
        shared.synth.pause();
        set_phase(shared, ReaderState::Paused);
        debug!("reader: pause");
    }

    /// Resumes a paused reader. Does nothing unless paused.
    pub fn resume(&self) {
        let shared = &self.shared;
        let generation = {
            let mut state = shared.state.lock();
            if state.phase != ReaderState::Paused || state.torn_down {
                warn!(state = %state.phase, torn_down = state.torn_down, "reader: resume ignored");
                return;
            }
            // Report playing now rather than waiting for the platform.
            state.phase = ReaderState::Playing;
            state.resume_gen += 1;
            state.resume_gen
        };
        shared.events.emit(&ReaderEvent::State(ReaderState::Playing));

        shared.utterance.inspect();
        let weak = Arc::downgrade(shared);
        defer(move || {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            {
                let state = shared.state.lock();
                if state.phase != ReaderState::Playing
                    || state.torn_down
                    || state.resume_gen != generation
                {
                    debug!(state = %state.phase, "reader: deferred resume superseded");
                    return;
                }
            }
            shared.synth.resume();
        });

        self.start_timer();
        debug!("reader: resume");
    }

    /// Stops speaking for good. Safe to call any number of times.
    pub fn cancel(&self) {
        let shared = &self.shared;
        clear_timer(shared);
        detach_listeners(shared);
        if shared.state.lock().phase == ReaderState::Canceled {
            return;
        }
        shared.synth.cancel();
        set_phase(shared, ReaderState::Canceled);
        info!("reader: cancel");
    }

    /// Detaches the utterance listeners and stops the timer without
    /// touching the synthesizer. Safe to combine with [`Reader::cancel`]
    /// in any order.
    ///
    /// A destroyed reader never speaks, pauses or resumes again, including
    /// a `speak` or `resume` still waiting for the next turn.
    pub fn destroy(&self) {
        self.shared.state.lock().torn_down = true;
        clear_timer(&self.shared);
        detach_listeners(&self.shared);
    }

    pub fn state(&self) -> ReaderState {
        self.shared.state.lock().phase
    }

    pub fn is_playing(&self) -> bool {
        self.state() == ReaderState::Playing
    }

    pub fn is_paused(&self) -> bool {
        self.state() == ReaderState::Paused
    }

    /// False once the reader has been canceled.
    pub fn is_playable(&self) -> bool {
        self.state() != ReaderState::Canceled
    }

    /// Whether [`Reader::play`] has been called.
    pub fn did_play(&self) -> bool {
        self.shared.state.lock().did_play
    }

    /// Whether the keep-alive timer is armed.
    pub fn has_keep_alive(&self) -> bool {
        self.shared.state.lock().timer.is_some()
    }

    pub fn utterance(&self) -> &Arc<dyn Utterance> {
        &self.shared.utterance
    }

    /// Subscribes to reader events.
    pub fn on(&self, kind: ReaderEventKind, handler: ReaderHandler) -> SubscriptionId {
        self.shared.events.on(kind, handler)
    }

    /// Removes a subscription.
    pub fn off(&self, id: SubscriptionId) -> bool {
        self.shared.events.off(id)
    }

    fn start_timer(&self) {
        let shared = &self.shared;
        let timer = KeepAlive::start(shared.synth.clone(), shared.utterance.clone(), shared.keep_alive);
        if let Some(old) = shared.state.lock().timer.replace(timer) {
            old.stop();
        }
    }
}

impl fmt::Debug for Reader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Reader")
            .field("utterance", &self.shared.utterance)
            .field("state", &state.phase)
            .field("did_play", &state.did_play)
            .field("keep_alive", &state.timer.is_some())
            .finish()
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        state.torn_down = true;
        if let Some(timer) = state.timer.take() {
            timer.stop();
        }
        if let Some(listeners) = state.listeners.take() {
            for (kind, id) in listeners {
                self.utterance.remove_listener(kind, id);
            }
        }
    }
}

fn attach_listeners(shared: &Arc<Shared>) -> Vec<(UtteranceEventKind, ListenerId)> {
    let utter = &shared.utterance;

    let weak = Arc::downgrade(shared);
    let on_play = Arc::new(move |_: &UtteranceEvent| {
        if let Some(shared) = weak.upgrade() {
            if shared.state.lock().phase == ReaderState::Canceled {
                return;
            }
            set_phase(&shared, ReaderState::Playing);
        }
    });

    let weak = Arc::downgrade(shared);
    let on_end = Arc::new(move |_: &UtteranceEvent| {
        if let Some(shared) = weak.upgrade() {
            clear_timer(&shared);
            detach_listeners(&shared);
            set_phase(&shared, ReaderState::Ended);
            info!("reader: end");
        }
    });

    let weak: Weak<Shared> = Arc::downgrade(shared);
    let on_error = Arc::new(move |event: &UtteranceEvent| {
        let UtteranceEvent::Error(err) = event else {
            return;
        };
        if let Some(shared) = weak.upgrade() {
            // The timer keeps running; the subscriber decides what to do.
            warn!(code = %err.code, "reader: synthesis error");
            shared.events.emit(&ReaderEvent::Error(err.clone()));
        }
    });

    vec![
        (UtteranceEventKind::Start, utter.add_listener(UtteranceEventKind::Start, on_play.clone())),
        (UtteranceEventKind::Resume, utter.add_listener(UtteranceEventKind::Resume, on_play)),
        (UtteranceEventKind::End, utter.add_listener(UtteranceEventKind::End, on_end)),
        (UtteranceEventKind::Error, utter.add_listener(UtteranceEventKind::Error, on_error)),
    ]
}

fn detach_listeners(shared: &Shared) {
    let listeners = shared.state.lock().listeners.take();
    for (kind, id) in listeners.into_iter().flatten() {
        shared.utterance.remove_listener(kind, id);
    }
}

fn clear_timer(shared: &Shared) {
    let timer = shared.state.lock().timer.take();
    if let Some(timer) = timer {
        timer.stop();
    }
}

fn set_phase(shared: &Shared, phase: ReaderState) {
    let changed = {
        let mut state = shared.state.lock();
        let changed = state.phase != phase;
        state.phase = phase;
        changed
    };
    if changed {
        shared.events.emit(&ReaderEvent::State(phase));
    }
}
