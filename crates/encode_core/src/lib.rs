//! Lifecycle tracking for an external video-encoding job.
//!
//! The backend (the process actually running the encoder) is a black
//! box behind [`JobBackend`]: it accepts a start and a stop command
//! and emits lifecycle events on four named channels. This crate
//! consumes those events and folds them into a single consistent
//! [`EncodeState`] that callers observe through a watch channel.

pub mod bridge;
pub mod reducer;

use std::mem;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::{broadcast, watch};

use shared::domain::EncodeStatus;
use shared::protocol::{EncodeParams, EventChannel, JobEvent};

pub use bridge::Subscription;
pub use reducer::{transition, Action, EncodeState, MAX_LOG_LINES};

const STOP_FAILED_PREFIX: &str = "停止失败: ";

/// Command-and-event contract of the external encoding backend.
///
/// `start_job` resolves with a human-readable acknowledgment; the real
/// outcome arrives later on the `encode-complete` or `encode-error`
/// channel. `listen` is the asynchronous attach: its resolution is the
/// acknowledgment the bridge waits on.
#[async_trait]
pub trait JobBackend: Send + Sync {
    async fn start_job(&self, params: EncodeParams) -> Result<String>;
    async fn stop_job(&self) -> Result<()>;
    async fn listen(&self, channel: EventChannel) -> Result<broadcast::Receiver<JobEvent>>;
}

/// Orchestrates one encode lifecycle against a [`JobBackend`].
///
/// Owns the authoritative [`EncodeState`]; every transition runs
/// inside the watch channel's modify closure, so event filtering reads
/// exactly the state the transition consumes. Dropping the session
/// cancels all four channel subscriptions together.
pub struct EncodeSession {
    backend: Arc<dyn JobBackend>,
    state_tx: Arc<watch::Sender<EncodeState>>,
    _subscriptions: Vec<Subscription>,
}

impl EncodeSession {
    /// Subscribes to the four backend channels exactly once and
    /// returns the session. Must be called within a tokio runtime.
    pub fn new(backend: Arc<dyn JobBackend>) -> Self {
        let (state_tx, _) = watch::channel(EncodeState::default());
        let state_tx = Arc::new(state_tx);

        let subscriptions = EventChannel::ALL
            .into_iter()
            .map(|channel| {
                let tx = Arc::clone(&state_tx);
                bridge::subscribe(Arc::clone(&backend), channel, move |event| {
                    apply_event(&tx, event);
                })
            })
            .collect();

        Self {
            backend,
            state_tx,
            _subscriptions: subscriptions,
        }
    }

    /// Starts a new run: transitions to running first, then issues the
    /// backend command. A rejected command surfaces as an error state;
    /// completion arrives later via the `encode-complete` event.
    pub async fn start(&self, params: EncodeParams) {
        dispatch(&self.state_tx, Action::Start);
        match self.backend.start_job(params).await {
            Ok(ack) => tracing::info!(ack = %ack, "encode job started"),
            Err(err) => {
                tracing::warn!(error = %err, "start command rejected");
                dispatch(&self.state_tx, Action::Error(err.to_string()));
            }
        }
    }

    /// Requests cancellation of the active job. Best effort: success
    /// only means the backend accepted the request.
    pub async fn stop(&self) {
        match self.backend.stop_job().await {
            Ok(()) => dispatch(&self.state_tx, Action::Stop),
            Err(err) => {
                tracing::warn!(error = %err, "stop command rejected");
                dispatch(
                    &self.state_tx,
                    Action::Error(format!("{STOP_FAILED_PREFIX}{err}")),
                );
            }
        }
    }

    /// Discards all history and returns to the initial idle state.
    pub fn reset(&self) {
        dispatch(&self.state_tx, Action::Reset);
    }

    /// Latest state snapshot.
    pub fn state(&self) -> EncodeState {
        self.state_tx.borrow().clone()
    }

    /// Watch handle for observing state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<EncodeState> {
        self.state_tx.subscribe()
    }
}

fn dispatch(state_tx: &watch::Sender<EncodeState>, action: Action) {
    state_tx.send_modify(|state| *state = transition(mem::take(state), action));
}

/// Folds one backend event into the state. Progress and log events
/// are dropped unless the run is live; the check happens inside the
/// same modify closure as the transition, so the filtered status can
/// never be stale.
fn apply_event(state_tx: &watch::Sender<EncodeState>, event: JobEvent) {
    state_tx.send_if_modified(|state| {
        let action = match event {
            JobEvent::Progress(progress) => {
                if state.status != EncodeStatus::Running {
                    tracing::trace!("dropping progress event outside running state");
                    return false;
                }
                Action::Progress(progress)
            }
            JobEvent::Log(line) => {
                if state.status != EncodeStatus::Running {
                    tracing::trace!("dropping log event outside running state");
                    return false;
                }
                Action::Log(line)
            }
            JobEvent::Complete(output_path) => Action::Complete(output_path),
            JobEvent::Error(message) => Action::Error(message),
        };
        *state = transition(mem::take(state), action);
        true
    });
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
