//! Scripted stand-in for the real encoder backend.
//!
//! Emits a plausible timeline of log and progress events ending in a
//! completion event, without spawning any external process. Lets the
//! CLI exercise the whole lifecycle, including mid-run stops.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::time::sleep;

use encode_core::JobBackend;
use shared::domain::EncodeProgress;
use shared::protocol::{EncodeParams, EventChannel, JobEvent};

const FRAMES_PER_TICK: u64 = 240;

pub struct SimulatedBackend {
    events: broadcast::Sender<JobEvent>,
    running: Arc<AtomicBool>,
    ticks: u64,
    tick: Duration,
}

impl SimulatedBackend {
    pub fn new(ticks: u64, tick: Duration) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            events,
            running: Arc::new(AtomicBool::new(false)),
            ticks,
            tick,
        }
    }

    fn output_path(params: &EncodeParams) -> String {
        let stem = Path::new(&params.video_path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        format!(
            "{}/{}_sub.{}",
            params.output_dir.trim_end_matches('/'),
            stem,
            params.output_format
        )
    }
}

#[async_trait]
impl JobBackend for SimulatedBackend {
    async fn start_job(&self, params: EncodeParams) -> Result<String> {
        params.validate()?;
        if self.running.swap(true, Ordering::SeqCst) {
            bail!("已有编码任务在运行");
        }

        let events = self.events.clone();
        let running = Arc::clone(&self.running);
        let ticks = self.ticks;
        let tick = self.tick;
        let output_path = Self::output_path(&params);
        let ack = format!("编码已开始，输出文件: {output_path}");
        let codec = params.video_codec;

        tokio::spawn(async move {
            let _ = events.send(JobEvent::Log(format!(
                "ffmpeg -i {} -c:v {codec} -crf {}",
                params.video_path, params.crf
            )));
            for step in 1..=ticks {
                sleep(tick).await;
                if !running.load(Ordering::SeqCst) {
                    tracing::debug!("simulated job interrupted by stop request");
                    return;
                }
                let percentage = ((step * 100) / ticks).min(100) as u8;
                let frame = step * FRAMES_PER_TICK;
                let _ = events.send(JobEvent::Progress(EncodeProgress {
                    frame,
                    fps: 60.0,
                    time: format!("00:00:{:02}", step.min(59)),
                    speed: "2.4x".into(),
                    percentage,
                }));
                let _ = events.send(JobEvent::Log(format!(
                    "frame={frame} fps=60 speed=2.4x"
                )));
            }
            running.store(false, Ordering::SeqCst);
            let _ = events.send(JobEvent::Complete(output_path));
        });

        Ok(ack)
    }

    async fn stop_job(&self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn listen(&self, _channel: EventChannel) -> Result<broadcast::Receiver<JobEvent>> {
        Ok(self.events.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::protocol::{OutputFormat, SubtitleEncoding, SubtitleStyle, VideoCodec};

    fn params() -> EncodeParams {
        EncodeParams {
            video_path: "/media/movie.mkv".into(),
            subtitle_path: "/media/movie.ass".into(),
            output_dir: "/media/out/".into(),
            output_format: OutputFormat::Mp4,
            video_codec: VideoCodec::Libx264,
            crf: 23,
            subtitle_encoding: SubtitleEncoding::Utf8,
            subtitle_style: SubtitleStyle::Default,
            subtitle_style_name: None,
        }
    }

    #[test]
    fn output_path_joins_dir_stem_and_format() {
        assert_eq!(
            SimulatedBackend::output_path(&params()),
            "/media/out/movie_sub.mp4"
        );
    }

    #[tokio::test]
    async fn second_start_is_rejected_while_running() {
        let backend = SimulatedBackend::new(50, Duration::from_millis(20));
        backend.start_job(params()).await.expect("first start");
        let second = backend.start_job(params()).await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn invalid_params_are_rejected_before_any_run() {
        let backend = SimulatedBackend::new(1, Duration::from_millis(1));
        let mut bad = params();
        bad.crf = 99;
        assert!(backend.start_job(bad).await.is_err());
        // The failed start must not leave the running flag set.
        backend.start_job(params()).await.expect("start after rejection");
    }
}
