use thiserror::Error;

/// Validation failures for encode parameters, raised at the backend
/// boundary before any job is started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamsError {
    #[error("video path must not be empty")]
    MissingVideoPath,
    #[error("subtitle path must not be empty")]
    MissingSubtitlePath,
    #[error("output directory must not be empty")]
    MissingOutputDir,
    #[error("crf {0} is outside the supported range 0..=51")]
    CrfOutOfRange(u8),
}

/// Returned when parsing an enum-valued parameter from user input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported value '{value}' for {field}")]
pub struct UnsupportedValue {
    pub field: &'static str,
    pub value: String,
}

impl UnsupportedValue {
    pub fn new(field: &'static str, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}
