//! Subscription bridge between a backend event channel and a callback.
//!
//! Attaching to a channel is asynchronous: the backend's `listen` call
//! resolves some time after `subscribe` returns. The returned
//! [`Subscription`] handle may be cancelled at any point, including
//! before that attach acknowledgment resolves, and guarantees that no
//! callback invocation reaches the caller after `cancel` returns.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use shared::protocol::{EventChannel, JobEvent};

use crate::JobBackend;

/// Two-state cancellation latch shared between the handle and the
/// delivery task. The `cancelled` flag covers the attach-pending
/// window; `wake` unblocks the delivery loop once attached.
struct Latch {
    cancelled: Mutex<bool>,
    wake: Notify,
}

/// Owned handle for one channel subscription. Dropping it cancels.
pub struct Subscription {
    latch: Arc<Latch>,
    _task: JoinHandle<()>,
}

impl Subscription {
    /// Cancels the subscription. After this returns, no further
    /// callback fires: delivery takes the latch lock around each
    /// invocation, so acquiring it here excludes any in-flight one.
    ///
    /// If the attach acknowledgment has not resolved yet, the flag is
    /// observed the moment it does and the listener is torn down
    /// without ever delivering.
    pub fn cancel(&self) {
        *self.latch.cancelled.lock() = true;
        self.latch.wake.notify_one();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Subscribes `callback` to one named channel of `backend`'s event
/// stream. The backend hands out a receiver for its whole event bus;
/// the bridge narrows it to `channel`.
pub fn subscribe<F>(backend: Arc<dyn JobBackend>, channel: EventChannel, callback: F) -> Subscription
where
    F: Fn(JobEvent) + Send + 'static,
{
    let latch = Arc::new(Latch {
        cancelled: Mutex::new(false),
        wake: Notify::new(),
    });

    let task_latch = Arc::clone(&latch);
    let task = tokio::spawn(async move {
        let mut rx = match backend.listen(channel).await {
            Ok(rx) => rx,
            Err(err) => {
                tracing::warn!(channel = channel.name(), error = %err, "failed to attach event listener");
                return;
            }
        };

        // Attach acknowledged. A cancel that raced the acknowledgment
        // tears down here, before any delivery.
        if *task_latch.cancelled.lock() {
            tracing::debug!(channel = channel.name(), "subscription cancelled before attach resolved");
            return;
        }

        loop {
            tokio::select! {
                _ = task_latch.wake.notified() => break,
                received = rx.recv() => match received {
                    Ok(event) => {
                        if event.channel() != channel {
                            continue;
                        }
                        let cancelled = task_latch.cancelled.lock();
                        if *cancelled {
                            break;
                        }
                        callback(event);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(channel = channel.name(), skipped, "event listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        // Receiver drops here, which is the detach.
    });

    Subscription {
        latch,
        _task: task,
    }
}

#[cfg(test)]
#[path = "tests/bridge_tests.rs"]
mod tests;
