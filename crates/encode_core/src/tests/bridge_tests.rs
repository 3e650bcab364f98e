use super::*;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::{broadcast, oneshot, Mutex as AsyncMutex};
use tokio::time::sleep;

use shared::domain::EncodeProgress;
use shared::protocol::EncodeParams;

/// Backend fake whose attach acknowledgment can be held back behind a
/// oneshot gate, to exercise the cancel-before-ready race.
struct TestBackend {
    events: broadcast::Sender<JobEvent>,
    attach_gate: AsyncMutex<Option<oneshot::Receiver<()>>>,
}

impl TestBackend {
    fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            events,
            attach_gate: AsyncMutex::new(None),
        }
    }

    fn gated() -> (Self, oneshot::Sender<()>) {
        let mut backend = Self::new();
        let (release, gate) = oneshot::channel();
        backend.attach_gate = AsyncMutex::new(Some(gate));
        (backend, release)
    }
}

#[async_trait]
impl JobBackend for TestBackend {
    async fn start_job(&self, _params: EncodeParams) -> Result<String> {
        Ok(String::new())
    }

    async fn stop_job(&self) -> Result<()> {
        Ok(())
    }

    async fn listen(&self, _channel: EventChannel) -> Result<broadcast::Receiver<JobEvent>> {
        let gate = self.attach_gate.lock().await.take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        Ok(self.events.subscribe())
    }
}

fn sample_progress() -> JobEvent {
    JobEvent::Progress(EncodeProgress {
        frame: 1,
        fps: 24.0,
        time: "00:00:01".into(),
        speed: "1.0x".into(),
        percentage: 1,
    })
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 2s");
}

#[tokio::test]
async fn delivers_only_events_for_the_subscribed_channel() {
    let backend = Arc::new(TestBackend::new());
    let delivered = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&delivered);
    let sub = subscribe(
        Arc::clone(&backend) as Arc<dyn JobBackend>,
        EventChannel::Progress,
        move |event| {
            assert_eq!(event.channel(), EventChannel::Progress);
            counter.fetch_add(1, Ordering::SeqCst);
        },
    );

    wait_until(|| backend.events.receiver_count() == 1).await;
    backend.events.send(JobEvent::Log("noise".into())).expect("send");
    backend.events.send(sample_progress()).expect("send");
    backend.events.send(JobEvent::Error("noise".into())).expect("send");

    wait_until(|| delivered.load(Ordering::SeqCst) == 1).await;
    sleep(Duration::from_millis(50)).await;
    assert_eq!(delivered.load(Ordering::SeqCst), 1);

    drop(sub);
}

#[tokio::test]
async fn cancel_before_attach_resolves_delivers_nothing_and_detaches() {
    let (backend, release) = TestBackend::gated();
    let backend = Arc::new(backend);
    let delivered = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&delivered);
    let sub = subscribe(
        Arc::clone(&backend) as Arc<dyn JobBackend>,
        EventChannel::Progress,
        move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        },
    );

    sub.cancel();
    release.send(()).expect("release attach gate");

    // The attach resolves, sees the latch, and drops the receiver
    // without ever delivering. Sends may race the teardown and find
    // no receiver at all; either way nothing reaches the callback.
    wait_until(|| backend.events.receiver_count() == 0).await;
    let _ = backend.events.send(sample_progress());
    sleep(Duration::from_millis(50)).await;
    assert_eq!(delivered.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn no_callback_after_cancel_even_with_queued_events() {
    let backend = Arc::new(TestBackend::new());
    let delivered = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&delivered);
    let sub = subscribe(
        Arc::clone(&backend) as Arc<dyn JobBackend>,
        EventChannel::Progress,
        move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        },
    );

    wait_until(|| backend.events.receiver_count() == 1).await;
    backend.events.send(sample_progress()).expect("send");
    wait_until(|| delivered.load(Ordering::SeqCst) == 1).await;

    sub.cancel();
    let seen_at_cancel = delivered.load(Ordering::SeqCst);

    for _ in 0..5 {
        backend.events.send(sample_progress()).expect("send");
    }
    sleep(Duration::from_millis(50)).await;
    assert_eq!(delivered.load(Ordering::SeqCst), seen_at_cancel);

    // Teardown releases the broadcast receiver: nothing leaks.
    wait_until(|| backend.events.receiver_count() == 0).await;
}

#[tokio::test]
async fn dropping_the_handle_cancels_the_subscription() {
    let backend = Arc::new(TestBackend::new());
    let sub = subscribe(
        Arc::clone(&backend) as Arc<dyn JobBackend>,
        EventChannel::Log,
        |_| {},
    );

    wait_until(|| backend.events.receiver_count() == 1).await;
    drop(sub);
    wait_until(|| backend.events.receiver_count() == 0).await;
}
