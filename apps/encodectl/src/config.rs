use std::{collections::HashMap, fs};

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub output_format: String,
    pub video_codec: String,
    pub crf: u8,
    pub output_dir: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_format: "mp4".into(),
            video_codec: "libx264".into(),
            crf: 23,
            output_dir: ".".into(),
        }
    }
}

/// Defaults, overridden by an optional `encodectl.toml` next to the
/// working directory, overridden again by environment variables.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("encodectl.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("output_format") {
                settings.output_format = v.clone();
            }
            if let Some(v) = file_cfg.get("video_codec") {
                settings.video_codec = v.clone();
            }
            if let Some(v) = file_cfg.get("output_dir") {
                settings.output_dir = v.clone();
            }
            if let Some(v) = file_cfg.get("crf") {
                if let Ok(parsed) = v.parse::<u8>() {
                    settings.crf = parsed;
                }
            }
        }
    }

    if let Ok(v) = std::env::var("ENCODECTL_OUTPUT_FORMAT") {
        settings.output_format = v;
    }
    if let Ok(v) = std::env::var("ENCODECTL_VIDEO_CODEC") {
        settings.video_codec = v;
    }
    if let Ok(v) = std::env::var("ENCODECTL_OUTPUT_DIR") {
        settings.output_dir = v;
    }
    if let Ok(v) = std::env::var("ENCODECTL_CRF") {
        if let Ok(parsed) = v.parse::<u8>() {
            settings.crf = parsed;
        }
    }

    settings
}
