//! Per-client tick loops

use crate::source::SharedSource;
use eeg_core::{EegError, MetricMessage};
use eeg_processing::MetricPipeline;
use eeg_simulation::MetricSimulator;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn, Level};

/// Sequential client number, used in logs and for simulator seeds
pub type ClientId = u64;

/// Live-mode resources one client ticks against
pub struct LiveSession {
    pub source: SharedSource,
    pub pipeline: Arc<Mutex<MetricPipeline>>,
    pub required_samples: usize,
}

impl LiveSession {
    /// Acquire, check length, process; `None` means nothing to send this tick
    async fn tick(&self, client: ClientId, waiting: &mut bool) -> Option<MetricMessage> {
        let acquired = {
            let mut source = self.source.lock().await;
            source.acquire_window(self.required_samples)
        };

        let window = match acquired {
            Ok(window) => window,
            Err(e) => {
                log_skipped(client, "acquisition", &e);
                return None;
            }
        };

        if !window.has_at_least(self.required_samples) {
            if !*waiting {
                info!(
                    client,
                    available = window.samples_per_channel(),
                    required = self.required_samples,
                    "Insufficient buffered data; skipping ticks until the window fills"
                );
                *waiting = true;
            }
            return None;
        }
        *waiting = false;

        let outcome = {
            let mut pipeline = self.pipeline.lock().await;
            pipeline.process_guarded(&window)
        };

        match outcome {
            Ok(message) => message,
            Err(e) => {
                log_skipped(client, "processing", &e);
                None
            }
        }
    }
}

/// Severity of a skipped tick: expected per-tick failures stay at warn
fn skip_level(error: &EegError) -> Level {
    if error.is_per_tick() {
        Level::WARN
    } else {
        Level::ERROR
    }
}

fn log_skipped(client: ClientId, stage: &str, error: &EegError) {
    if skip_level(error) == Level::WARN {
        warn!(client, stage, error = %error, "Tick skipped");
    } else {
        error!(client, stage, error = %error, "Tick failed; skipping");
    }
}

/// What a client's loop produces each tick
pub enum ClientSession {
    Simulated(MetricSimulator),
    Live(LiveSession),
}

/// Drive one client until its transport closes or shutdown is signalled
///
/// Messages go to `tx` in tick order; the transport task owns the socket.
pub async fn run_session(
    client: ClientId,
    mut session: ClientSession,
    tick: Duration,
    tx: mpsc::Sender<MetricMessage>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut waiting = false;

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            _ = ticker.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            _ = tx.closed() => {
                debug!(client, "Transport closed; ending session");
                return;
            }
        }

        let message = match &mut session {
            ClientSession::Simulated(simulator) => Some(simulator.next_message()),
            ClientSession::Live(live) => live.tick(client, &mut waiting).await,
        };

        if let Some(message) = message {
            debug!(client, focus = message.focus, stress = message.stress, alert = message.alert, "Tick");
            if tx.send(message).await.is_err() {
                debug!(client, reason = %EegError::TransportClosed, "Ending session");
                return;
            }
        }
    }

    debug!(client, "Session stopped by shutdown");
}
