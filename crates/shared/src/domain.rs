use serde::{Deserialize, Serialize};

/// Lifecycle status of an encode run. Exactly one holds at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EncodeStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Error,
    Stopped,
}

impl EncodeStatus {
    /// Terminal statuses are only left via a new start or a reset;
    /// stale progress/log events never overwrite them.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Stopped)
    }
}

/// Progress snapshot pushed by the job backend. Replaced wholesale on
/// each update, never merged field by field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeProgress {
    pub frame: u64,
    pub fps: f64,
    /// Elapsed stream time as reported by the encoder, opaque here.
    pub time: String,
    /// Encoding speed multiplier as reported by the encoder, opaque here.
    pub speed: String,
    /// Completion percentage in `0..=100`.
    pub percentage: u8,
}
