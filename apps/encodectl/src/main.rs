use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use encode_core::EncodeSession;
use shared::domain::EncodeStatus;
use shared::protocol::{
    EncodeParams, OutputFormat, SubtitleEncoding, SubtitleStyle, VideoCodec,
};

mod config;
mod sim;

use config::load_settings;
use sim::SimulatedBackend;

/// Drives one simulated encode run and prints the observed lifecycle.
#[derive(Parser, Debug)]
struct Args {
    /// Source video file
    #[arg(long)]
    video: String,
    /// Subtitle file to burn in
    #[arg(long)]
    subtitle: String,
    /// Destination directory (defaults to configured output_dir)
    #[arg(long)]
    output_dir: Option<String>,
    /// Container format: mp4|mkv|avi|mov
    #[arg(long)]
    format: Option<OutputFormat>,
    /// Video codec: libx264|libx265|copy
    #[arg(long)]
    codec: Option<VideoCodec>,
    /// Quality factor 0..=51
    #[arg(long)]
    crf: Option<u8>,
    /// Subtitle text encoding: utf8|gbk|big5
    #[arg(long, default_value = "utf8")]
    subtitle_encoding: SubtitleEncoding,
    /// Request a stop after this many milliseconds
    #[arg(long)]
    stop_after_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let settings = load_settings();

    let params = EncodeParams {
        video_path: args.video,
        subtitle_path: args.subtitle,
        output_dir: args.output_dir.unwrap_or_else(|| settings.output_dir.clone()),
        output_format: match args.format {
            Some(format) => format,
            None => settings.output_format.parse()?,
        },
        video_codec: match args.codec {
            Some(codec) => codec,
            None => settings.video_codec.parse()?,
        },
        crf: args.crf.unwrap_or(settings.crf),
        subtitle_encoding: args.subtitle_encoding,
        subtitle_style: SubtitleStyle::Default,
        subtitle_style_name: None,
    };

    let backend = Arc::new(SimulatedBackend::new(20, Duration::from_millis(150)));
    let session = Arc::new(EncodeSession::new(backend));
    let mut state_rx = session.subscribe_state();

    if let Some(delay_ms) = args.stop_after_ms {
        let session = Arc::clone(&session);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            session.stop().await;
        });
    }

    session.start(params).await;

    let mut printed_logs = 0;
    loop {
        let state = state_rx.borrow_and_update().clone();
        for line in state.logs.iter().skip(printed_logs) {
            println!("{line}");
        }
        printed_logs = state.logs.len();
        if let Some(progress) = &state.progress {
            println!(
                "  frame={} fps={} time={} speed={} {}%",
                progress.frame, progress.fps, progress.time, progress.speed, progress.percentage
            );
        }
        if state.status.is_terminal() {
            match state.status {
                EncodeStatus::Completed => {
                    println!("done: {}", state.output_path.as_deref().unwrap_or("<unknown>"));
                }
                EncodeStatus::Error => {
                    println!("failed: {}", state.error.as_deref().unwrap_or("<unknown>"));
                }
                EncodeStatus::Stopped => println!("stopped"),
                _ => {}
            }
            break;
        }
        state_rx.changed().await?;
    }

    Ok(())
}
