//! Scenario tests for readers driving a recording synthesizer.

use super::*;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Recording Synthesizer
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Speak(String),
    Pause,
    Resume,
    Cancel,
}

#[derive(Default)]
struct RecordingSynthesizer {
    commands: Mutex<Vec<Command>>,
}

impl RecordingSynthesizer {
    fn commands(&self) -> Vec<Command> {
        self.commands.lock().clone()
    }

    fn count(&self, cmd: &Command) -> usize {
        self.commands.lock().iter().filter(|c| *c == cmd).count()
    }

    fn speaks(&self) -> usize {
        self.commands
            .lock()
            .iter()
            .filter(|c| matches!(c, Command::Speak(_)))
            .count()
    }

    fn clear(&self) {
        self.commands.lock().clear();
    }
}

impl Synthesizer for RecordingSynthesizer {
    fn speak(&self, utterance: Arc<dyn Utterance>) {
        self.commands.lock().push(Command::Speak(utterance.text().to_string()));
    }

    fn pause(&self) {
        self.commands.lock().push(Command::Pause);
    }

    fn resume(&self) {
        self.commands.lock().push(Command::Resume);
    }

    fn cancel(&self) {
        self.commands.lock().push(Command::Cancel);
    }
}

fn setup(text: &str) -> (Reader, Arc<SpeechUtterance>, Arc<RecordingSynthesizer>) {
    let synth = Arc::new(RecordingSynthesizer::default());
    let utter = Arc::new(SpeechUtterance::new(text, "en-US"));
    let reader = Reader::new(utter.clone(), synth.clone());
    (reader, utter, synth)
}

/// Lets every deferred task run without reaching the next keep-alive fire.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

fn record_events(reader: &Reader, kind: ReaderEventKind) -> Arc<Mutex<Vec<ReaderEvent>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let s = seen.clone();
    reader.on(kind, Arc::new(move |e: &ReaderEvent| s.lock().push(e.clone())));
    seen
}

// ============================================================================
// Play
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_play_cancels_then_speaks() {
    let (reader, utter, synth) = setup("hello world");

    reader.play();
    // speak waits for the next turn
    assert_eq!(synth.commands(), vec![Command::Cancel]);
    assert!(reader.did_play());
    assert!(reader.has_keep_alive());

    settle().await;
    assert_eq!(
        synth.commands(),
        vec![Command::Cancel, Command::Speak("hello world".to_string())]
    );
    assert!(!reader.is_playing());

    utter.dispatch(&UtteranceEvent::Start);
    assert!(reader.is_playing());
    assert!(!reader.is_paused());
}

#[tokio::test(start_paused = true)]
async fn test_second_play_is_resume() {
    let (reader, utter, synth) = setup("testing");

    reader.play();
    settle().await;
    utter.dispatch(&UtteranceEvent::Start);

    reader.play();
    settle().await;
    assert_eq!(synth.speaks(), 1);
    assert_eq!(synth.count(&Command::Resume), 0);

    reader.pause();
    reader.play();
    settle().await;
    assert_eq!(synth.speaks(), 1);
    assert_eq!(synth.count(&Command::Resume), 1);
    assert!(reader.is_playing());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_before_next_turn_skips_speak() {
    let (reader, _utter, synth) = setup("testing");

    reader.play();
    reader.cancel();
    settle().await;
    assert_eq!(synth.speaks(), 0);
    assert!(!reader.has_keep_alive());
}

#[tokio::test(start_paused = true)]
async fn test_play_after_cancel_does_nothing() {
    let (reader, _utter, synth) = setup("testing");

    reader.cancel();
    synth.clear();
    reader.play();
    settle().await;
    assert!(synth.commands().is_empty());
    assert!(!reader.is_playable());
    assert!(!reader.did_play());
}

// ============================================================================
// Pause / Resume
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_pause_sets_state_and_clears_timer() {
    let (reader, utter, synth) = setup("testing");

    reader.play();
    settle().await;
    utter.dispatch(&UtteranceEvent::Start);

    reader.pause();
    assert!(reader.is_paused());
    assert!(!reader.is_playing());
    assert!(!reader.has_keep_alive());
    assert_eq!(synth.count(&Command::Pause), 1);
}

#[tokio::test(start_paused = true)]
async fn test_pause_suppresses_pending_keepalive() {
    let (reader, utter, synth) = setup("testing");

    reader.play();
    settle().await;
    utter.dispatch(&UtteranceEvent::Start);

    tokio::time::sleep(Duration::from_secs(9)).await;
    reader.pause();
    tokio::time::sleep(Duration::from_secs(30)).await;

    assert_eq!(synth.count(&Command::Pause), 1);
    assert_eq!(synth.count(&Command::Resume), 0);
    assert!(reader.is_paused());
}

#[tokio::test(start_paused = true)]
async fn test_resume_when_not_paused_is_noop() {
    let (reader, utter, synth) = setup("testing");

    reader.resume();
    settle().await;
    assert!(synth.commands().is_empty());
    assert_eq!(reader.state(), ReaderState::Idle);
    assert!(!reader.has_keep_alive());

    reader.play();
    settle().await;
    utter.dispatch(&UtteranceEvent::Start);
    synth.clear();

    reader.resume();
    settle().await;
    assert!(synth.commands().is_empty());
    assert!(reader.is_playing());
}

#[tokio::test(start_paused = true)]
async fn test_resume_is_optimistic_and_deferred() {
    let (reader, utter, synth) = setup("testing");

    reader.play();
    settle().await;
    utter.dispatch(&UtteranceEvent::Start);
    reader.pause();
    synth.clear();

    reader.resume();
    assert!(reader.is_playing());
    assert!(!reader.is_paused());
    assert!(reader.has_keep_alive());
    assert!(synth.commands().is_empty());

    settle().await;
    assert_eq!(synth.commands(), vec![Command::Resume]);
}

#[tokio::test(start_paused = true)]
async fn test_pause_right_after_resume_skips_resume() {
    let (reader, utter, synth) = setup("testing");

    reader.play();
    settle().await;
    utter.dispatch(&UtteranceEvent::Start);
    reader.pause();
    synth.clear();

    reader.resume();
    reader.pause();
    tokio::time::sleep(Duration::from_secs(25)).await;
    assert_eq!(synth.commands(), vec![Command::Pause]);
    assert!(reader.is_paused());
}

#[tokio::test(start_paused = true)]
async fn test_repeated_resume_in_one_turn_sends_one() {
    let (reader, utter, synth) = setup("testing");

    reader.play();
    settle().await;
    utter.dispatch(&UtteranceEvent::Start);
    reader.pause();
    synth.clear();

    reader.resume();
    reader.pause();
    reader.resume();
    settle().await;
    assert_eq!(synth.commands(), vec![Command::Pause, Command::Resume]);
    assert!(reader.is_playing());
    reader.cancel();
}

// ============================================================================
// Cancel / Teardown
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_cancel_is_idempotent() {
    let (reader, utter, synth) = setup("testing");

    reader.cancel();
    assert!(!reader.is_playable());
    reader.cancel();
    assert!(!reader.is_playable());

    assert_eq!(synth.count(&Command::Cancel), 1);
    assert_eq!(utter.listener_count(), 0);
    assert!(!reader.is_playing());
    assert!(!reader.is_paused());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_and_destroy_in_any_order() {
    let (reader, utter, synth) = setup("testing");
    reader.play();
    settle().await;
    reader.destroy();
    reader.cancel();
    reader.destroy();
    assert_eq!(utter.listener_count(), 0);
    assert!(!reader.has_keep_alive());

    let (reader, utter, _) = setup("testing");
    reader.play();
    reader.cancel();
    reader.destroy();
    assert_eq!(utter.listener_count(), 0);

    synth.clear();
    tokio::time::sleep(Duration::from_secs(25)).await;
    assert!(synth.commands().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_destroy_before_next_turn_skips_speak() {
    let (reader, utter, synth) = setup("testing");

    reader.play();
    reader.destroy();
    settle().await;
    assert_eq!(synth.commands(), vec![Command::Cancel]);
    assert_eq!(utter.listener_count(), 0);
    assert!(!reader.has_keep_alive());

    // A destroyed handle no longer drives the shared synthesizer.
    reader.play();
    reader.pause();
    reader.resume();
    tokio::time::sleep(Duration::from_secs(25)).await;
    assert_eq!(synth.commands(), vec![Command::Cancel]);
}

#[tokio::test(start_paused = true)]
async fn test_destroy_before_next_turn_skips_resume() {
    let (reader, utter, synth) = setup("testing");

    reader.play();
    settle().await;
    utter.dispatch(&UtteranceEvent::Start);
    reader.pause();
    synth.clear();

    reader.resume();
    reader.destroy();
    settle().await;
    assert!(synth.commands().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_canceled_reader_ignores_signals() {
    let (reader, utter, _synth) = setup("testing");
    reader.cancel();
    utter.dispatch(&UtteranceEvent::Start);
    assert_eq!(reader.state(), ReaderState::Canceled);

    reader.pause();
    reader.resume();
    assert_eq!(reader.state(), ReaderState::Canceled);
}

// ============================================================================
// Utterance Signals
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_end_stops_timer_and_detaches() {
    let (reader, utter, synth) = setup("testing");

    reader.play();
    settle().await;
    utter.dispatch(&UtteranceEvent::Start);
    utter.dispatch(&UtteranceEvent::End);

    assert!(!reader.is_playing());
    assert_eq!(reader.state(), ReaderState::Ended);
    assert!(!reader.has_keep_alive());
    assert_eq!(utter.listener_count(), 0);
    assert!(reader.is_playable());

    synth.clear();
    tokio::time::sleep(Duration::from_secs(25)).await;
    assert!(synth.commands().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_error_is_forwarded_and_timer_keeps_running() {
    let (reader, utter, synth) = setup("testing");
    let errors = record_events(&reader, ReaderEventKind::Error);

    reader.play();
    settle().await;
    utter.dispatch(&UtteranceEvent::Start);

    let err = SynthesisError {
        code: ErrorCode::AudioBusy,
        char_index: 7,
        elapsed: Duration::from_millis(1200),
    };
    utter.dispatch(&UtteranceEvent::Error(err.clone()));

    assert_eq!(*errors.lock(), vec![ReaderEvent::Error(err)]);
    assert!(reader.has_keep_alive());
    assert!(reader.is_playing());

    tokio::time::sleep(Duration::from_millis(10_500)).await;
    assert_eq!(synth.count(&Command::Pause), 1);
    assert_eq!(synth.count(&Command::Resume), 1);
    reader.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_state_events() {
    let (reader, utter, _synth) = setup("testing");
    let states = record_events(&reader, ReaderEventKind::State);

    reader.play();
    settle().await;
    utter.dispatch(&UtteranceEvent::Start);
    utter.dispatch(&UtteranceEvent::Start);
    reader.pause();
    reader.resume();
    reader.cancel();

    assert_eq!(
        *states.lock(),
        vec![
            ReaderEvent::State(ReaderState::Playing),
            ReaderEvent::State(ReaderState::Paused),
            ReaderEvent::State(ReaderState::Playing),
            ReaderEvent::State(ReaderState::Canceled),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_handler_may_call_back_into_reader() {
    let (reader, utter, synth) = setup("testing");

    let r = reader.clone();
    reader.on(
        ReaderEventKind::Error,
        Arc::new(move |_: &ReaderEvent| r.cancel()),
    );

    reader.play();
    settle().await;
    utter.dispatch(&UtteranceEvent::Error(SynthesisError::new(ErrorCode::Network)));

    assert!(!reader.is_playable());
    assert!(!reader.has_keep_alive());
    assert_eq!(synth.count(&Command::Cancel), 2);
}

// ============================================================================
// Keep-Alive
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_keepalive_rearms_while_playing() {
    let (reader, utter, synth) = setup("hello world");

    reader.play();
    settle().await;
    utter.dispatch(&UtteranceEvent::Start);

    tokio::time::sleep(Duration::from_millis(20_500)).await;
    assert!(synth.count(&Command::Pause) >= 2);
    assert!(synth.count(&Command::Resume) >= 2);

    let cmds = synth.commands();
    let cycles: Vec<_> = cmds
        .iter()
        .filter(|c| matches!(c, Command::Pause | Command::Resume))
        .collect();
    for pair in cycles.chunks(2) {
        assert_eq!(pair, [&Command::Pause, &Command::Resume]);
    }
    assert!(reader.has_keep_alive());
    reader.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_custom_keepalive_interval() {
    let synth = Arc::new(RecordingSynthesizer::default());
    let utter = Arc::new(SpeechUtterance::new("testing", "en-US"));
    let reader = Reader::with_keep_alive(utter, synth.clone(), Duration::from_secs(2));

    reader.play();
    tokio::time::sleep(Duration::from_millis(6_500)).await;
    assert_eq!(synth.count(&Command::Pause), 3);
    reader.cancel();
}

/// Calls `pause()` on the bound reader from inside the first
/// synthesizer pause, i.e. between the two halves of a keep-alive fire.
#[derive(Default)]
struct PauseHookSynthesizer {
    inner: RecordingSynthesizer,
    reader: Mutex<Option<Reader>>,
}

impl Synthesizer for PauseHookSynthesizer {
    fn speak(&self, utterance: Arc<dyn Utterance>) {
        self.inner.speak(utterance);
    }

    fn pause(&self) {
        self.inner.pause();
        let reader = self.reader.lock().take();
        if let Some(reader) = reader {
            reader.pause();
        }
    }

    fn resume(&self) {
        self.inner.resume();
    }

    fn cancel(&self) {
        self.inner.cancel();
    }
}

#[tokio::test(start_paused = true)]
async fn test_pause_during_keepalive_fire_skips_its_resume() {
    let synth = Arc::new(PauseHookSynthesizer::default());
    let utter = Arc::new(SpeechUtterance::new("testing", "en-US"));
    let reader = Reader::new(utter.clone(), synth.clone());
    *synth.reader.lock() = Some(reader.clone());

    reader.play();
    settle().await;
    utter.dispatch(&UtteranceEvent::Start);

    tokio::time::sleep(Duration::from_millis(30_500)).await;
    assert_eq!(
        synth.inner.commands(),
        vec![
            Command::Cancel,
            Command::Speak("testing".to_string()),
            Command::Pause,
            Command::Pause,
        ]
    );
    assert!(reader.is_paused());
    assert!(!reader.has_keep_alive());
}

// ============================================================================
// Speech Reader Service
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_service_builds_utterance_in_language() {
    let synth = Arc::new(RecordingSynthesizer::default());
    let service = SpeechReader::new(Some(SynthesisApi::with_synthesizer(synth.clone())));
    assert!(service.is_available());
    service.set_language("de-DE").unwrap();

    let reader = service.get_new_reader("hallo welt").unwrap();
    assert!(reader.is_playable());
    assert!(!reader.is_playing());

    let last = service.last_reader().unwrap();
    assert_eq!(last.utterance().text(), "hallo welt");
    assert_eq!(last.utterance().lang(), "de-DE");

    reader.play();
    settle().await;
    assert_eq!(
        synth.commands(),
        vec![Command::Cancel, Command::Speak("hallo welt".to_string())]
    );

    let other = service.get_new_reader_with_language("bonjour", Some("fr-FR")).unwrap();
    drop(other);
    assert_eq!(service.last_reader().unwrap().utterance().lang(), "fr-FR");
    assert!(!last.has_keep_alive());
}

#[tokio::test(start_paused = true)]
async fn test_service_superseding_in_same_turn_skips_speak() {
    let synth = Arc::new(RecordingSynthesizer::default());
    let service = SpeechReader::new(Some(SynthesisApi::with_synthesizer(synth.clone())));

    let first = service.get_new_reader("first").unwrap();
    let first_reader = service.last_reader().unwrap();
    first.play();
    let _second = service.get_new_reader("second").unwrap();
    settle().await;

    assert_eq!(synth.commands(), vec![Command::Cancel]);
    assert!(!first_reader.has_keep_alive());
}

#[tokio::test(start_paused = true)]
async fn test_service_supersedes_previous_reader() {
    let synth = Arc::new(RecordingSynthesizer::default());
    let service = SpeechReader::new(Some(SynthesisApi::with_synthesizer(synth.clone())));
    service.set_keep_alive(Duration::from_secs(5));

    let first = service.get_new_reader("first").unwrap();
    first.play();
    settle().await;
    let first_utter = service.last_reader().unwrap().utterance().clone();

    let _second = service.get_new_reader("second").unwrap();

    // The first reader is torn down: no listeners, no keep-alive.
    first_utter.dispatch(&UtteranceEvent::Start);
    assert!(!first.is_playing());

    synth.clear();
    tokio::time::sleep(Duration::from_secs(12)).await;
    assert!(synth.commands().is_empty());
}
