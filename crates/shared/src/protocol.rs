use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{
    domain::EncodeProgress,
    error::{ParamsError, UnsupportedValue},
};

pub const MAX_CRF: u8 = 51;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Mp4,
    Mkv,
    Avi,
    Mov,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mkv => "mkv",
            Self::Avi => "avi",
            Self::Mov => "mov",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = UnsupportedValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mp4" => Ok(Self::Mp4),
            "mkv" => Ok(Self::Mkv),
            "avi" => Ok(Self::Avi),
            "mov" => Ok(Self::Mov),
            other => Err(UnsupportedValue::new("output_format", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    Libx264,
    Libx265,
    Copy,
}

impl VideoCodec {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Libx264 => "libx264",
            Self::Libx265 => "libx265",
            Self::Copy => "copy",
        }
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoCodec {
    type Err = UnsupportedValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "libx264" => Ok(Self::Libx264),
            "libx265" => Ok(Self::Libx265),
            "copy" => Ok(Self::Copy),
            other => Err(UnsupportedValue::new("video_codec", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleEncoding {
    Utf8,
    Gbk,
    Big5,
}

impl FromStr for SubtitleEncoding {
    type Err = UnsupportedValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "utf8" => Ok(Self::Utf8),
            "gbk" => Ok(Self::Gbk),
            "big5" => Ok(Self::Big5),
            other => Err(UnsupportedValue::new("subtitle_encoding", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleStyle {
    Default,
    Custom,
}

impl FromStr for SubtitleStyle {
    type Err = UnsupportedValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Self::Default),
            "custom" => Ok(Self::Custom),
            other => Err(UnsupportedValue::new("subtitle_style", other)),
        }
    }
}

/// Full parameter set for one encode run, as accepted by the job
/// backend's start command. Field names match the original IPC wire
/// shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodeParams {
    pub video_path: String,
    pub subtitle_path: String,
    pub output_dir: String,
    pub output_format: OutputFormat,
    pub video_codec: VideoCodec,
    pub crf: u8,
    pub subtitle_encoding: SubtitleEncoding,
    pub subtitle_style: SubtitleStyle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle_style_name: Option<String>,
}

impl EncodeParams {
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.video_path.trim().is_empty() {
            return Err(ParamsError::MissingVideoPath);
        }
        if self.subtitle_path.trim().is_empty() {
            return Err(ParamsError::MissingSubtitlePath);
        }
        if self.output_dir.trim().is_empty() {
            return Err(ParamsError::MissingOutputDir);
        }
        if self.crf > MAX_CRF {
            return Err(ParamsError::CrfOutOfRange(self.crf));
        }
        Ok(())
    }
}

/// The four named event channels the job backend emits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventChannel {
    Progress,
    Log,
    Complete,
    Error,
}

impl EventChannel {
    pub const ALL: [EventChannel; 4] = [Self::Progress, Self::Log, Self::Complete, Self::Error];

    pub fn name(self) -> &'static str {
        match self {
            Self::Progress => "encode-progress",
            Self::Log => "encode-log",
            Self::Complete => "encode-complete",
            Self::Error => "encode-error",
        }
    }
}

impl fmt::Display for EventChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One lifecycle event from the job backend. The serialized form is
/// tagged with the channel name so it matches the original event wire
/// shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "payload")]
pub enum JobEvent {
    #[serde(rename = "encode-progress")]
    Progress(EncodeProgress),
    #[serde(rename = "encode-log")]
    Log(String),
    /// Payload is the final output file path.
    #[serde(rename = "encode-complete")]
    Complete(String),
    /// Payload is a human-readable error message.
    #[serde(rename = "encode-error")]
    Error(String),
}

impl JobEvent {
    pub fn channel(&self) -> EventChannel {
        match self {
            Self::Progress(_) => EventChannel::Progress,
            Self::Log(_) => EventChannel::Log,
            Self::Complete(_) => EventChannel::Complete,
            Self::Error(_) => EventChannel::Error,
        }
    }
}
