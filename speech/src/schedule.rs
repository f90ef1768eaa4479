//! Next-turn deferral and the keep-alive timer.
//!
//! Chromium stops firing `end` for utterances longer than roughly fifteen
//! seconds (issue 369472). Pausing and resuming the synthesizer every few
//! seconds keeps it alive. Issuing `speak`/`resume` in the same scheduler
//! turn as the preceding calls also drops events on those engines, so both
//! are pushed to the next turn.

use crate::{Synthesizer, Utterance};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Interval between keep-alive pause/resume cycles.
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(10);

/// Completes on the next turn of the scheduler.
pub fn next_tick() -> impl Future<Output = ()> {
    tokio::task::yield_now()
}

/// Runs `f` on the next turn of the scheduler.
///
/// Must be called from within a Tokio runtime.
pub fn defer<F>(f: F) -> JoinHandle<()>
where
    F: FnOnce() + Send + 'static,
{
    tokio::spawn(async move {
        next_tick().await;
        f();
    })
}

/// Periodic pause/resume task that re-arms itself until stopped.
pub(crate) struct KeepAlive {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl KeepAlive {
    /// Arms the timer. The first fire happens one `period` from now.
    pub(crate) fn start(
        synth: Arc<dyn Synthesizer>,
        utterance: Arc<dyn Utterance>,
        period: Duration,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => return,
                    _ = tokio::time::sleep(period) => {}
                }
                if token.is_cancelled() {
                    return;
                }

                debug!(period_ms = period.as_millis() as u64, "keepalive: pause/resume");
                synth.pause();
                utterance.inspect();
                next_tick().await;

                // An explicit pause may have landed between the two halves.
                if token.is_cancelled() {
                    return;
                }
                synth.resume();
            }
        });

        Self { cancel, handle }
    }

    /// Stops the timer. No pause or resume is issued after this returns.
    pub(crate) fn stop(self) {
        drop(self);
    }
}

impl Drop for KeepAlive {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}
