//! Read text aloud through the console synthesizer.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use serde::Serialize;
use speak_cli::output::{print_error, print_info, Output, OutputFormat};
use speak_speech::{
    Playback, ReaderEvent, ReaderEventKind, ReaderState, SpeechReader, SynthesisApi,
};
use tokio::sync::mpsc;

use super::{get_context, print_verbose};
use crate::console::ConsoleSynthesizer;
use crate::Cli;

/// Read text aloud.
///
/// Press Ctrl-C to cancel.
#[derive(Args)]
pub struct SayCommand {
    /// Text to read
    #[arg(required = true)]
    text: Vec<String>,

    /// BCP 47 language tag (overrides context)
    #[arg(long)]
    lang: Option<String>,

    /// Speaking rate in words per minute (overrides context)
    #[arg(long)]
    wpm: Option<u32>,

    /// Pause after this many seconds
    #[arg(long)]
    pause_after: Option<f64>,

    /// Resume this many seconds after pausing
    #[arg(long, requires = "pause_after")]
    resume_after: Option<f64>,
}

/// Summary printed once reading stops.
#[derive(Debug, Serialize)]
struct SaySummary {
    language: String,
    words: usize,
    state: String,
    errors: Vec<String>,
}

impl SayCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let ctx = get_context(cli)?;
        let text = self.text.join(" ");
        let wpm = self.wpm.unwrap_or_else(|| ctx.words_per_minute());

        let synth = Arc::new(ConsoleSynthesizer::new(wpm));
        let service = SpeechReader::new(Some(SynthesisApi::with_synthesizer(synth)));
        service.set_language(self.lang.as_deref().unwrap_or(ctx.language()))?;
        service.set_keep_alive(ctx.keep_alive());

        print_verbose(
            cli,
            &format!(
                "language={} wpm={} keep_alive={}s",
                service.language(),
                wpm,
                ctx.keep_alive().as_secs()
            ),
        );

        let reader = service.get_new_reader(&text)?;
        let (tx, mut rx) = mpsc::unbounded_channel();
        for kind in [ReaderEventKind::State, ReaderEventKind::Error] {
            let tx = tx.clone();
            reader.on(
                kind,
                Arc::new(move |event: &ReaderEvent| {
                    let _ = tx.send(event.clone());
                }),
            );
        }
        drop(tx);

        reader.play();

        let pause_at = self.pause_after.map(secs);
        let resume_in = self.resume_after.map(secs);
        let pause_timer = sleep_opt(pause_at);
        tokio::pin!(pause_timer);
        let resume_timer = sleep_opt(None);
        tokio::pin!(resume_timer);

        let mut errors = Vec::new();
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    println!();
                    print_info("canceled");
                    reader.cancel();
                    break;
                }
                _ = &mut pause_timer => {
                    reader.pause();
                    print_info("paused");
                    pause_timer.set(sleep_opt(None));
                    if resume_in.is_some() {
                        resume_timer.set(sleep_opt(resume_in));
                    }
                }
                _ = &mut resume_timer => {
                    print_info("resumed");
                    reader.resume();
                    resume_timer.set(sleep_opt(None));
                }
                event = rx.recv() => match event {
                    Some(ReaderEvent::State(ReaderState::Ended)) => {
                        println!();
                        break;
                    }
                    Some(ReaderEvent::State(state)) => {
                        print_verbose(cli, &format!("state: {}", state));
                    }
                    Some(ReaderEvent::Error(err)) => {
                        print_error(&err.to_string());
                        errors.push(err.to_string());
                    }
                    None => break,
                },
            }
        }

        let summary = SaySummary {
            language: service.language(),
            words: text.split_whitespace().count(),
            state: reader.state().to_string(),
            errors,
        };
        reader.destroy();

        Output::new(OutputFormat::from_json_flag(cli.json), cli.output.clone()).write(&summary)
    }
}

fn secs(s: f64) -> Duration {
    Duration::from_secs_f64(s.max(0.0))
}

/// Sleeps for `d`, or forever when `None`.
async fn sleep_opt(d: Option<Duration>) {
    match d {
        Some(d) => tokio::time::sleep(d).await,
        None => std::future::pending().await,
    }
}
