//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CastmateError, CastmateResult};

/// Frame rates offered by the frame-rate menu.
pub const FRAMERATE_PRESETS: [u32; 4] = [15, 24, 30, 60];

/// Downsize ratios offered by the downsize menu.
pub const DOWNSIZE_PRESETS: [f64; 4] = [1.00, 0.75, 0.50, 0.33];

/// Highest frame rate accepted from configuration.
pub const MAX_FRAMERATE: u32 = 120;

/// Global engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default capture settings for new sessions.
    pub capture: CaptureDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default capture parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureDefaults {
    /// Frame rate passed to the capture service. `None` leaves the
    /// service's own default in place.
    pub framerate: Option<u32>,

    /// Output scale factor in `(0, 1]`.
    pub downsize_ratio: f64,

    /// How the returned file name is corrected after a capture.
    pub output_naming: OutputNaming,
}

/// Policy for renaming the capture service's output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputNaming {
    /// Always apply the extension of the profile that produced the file.
    #[default]
    Uniform,
    /// Leave the service's name alone when no audio was recorded.
    SkipWithoutAudio,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "castmate=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for CaptureDefaults {
    fn default() -> Self {
        Self {
            framerate: Some(30),
            downsize_ratio: 1.0,
            output_naming: OutputNaming::Uniform,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl CaptureDefaults {
    /// Validate the configured values.
    pub fn validate(&self) -> CastmateResult<()> {
        if let Some(fps) = self.framerate {
            validate_framerate(fps)?;
        }
        validate_downsize_ratio(self.downsize_ratio)
    }
}

/// Frame rates must be between 1 and [`MAX_FRAMERATE`].
pub fn validate_framerate(fps: u32) -> CastmateResult<()> {
    if fps == 0 || fps > MAX_FRAMERATE {
        return Err(CastmateError::config(format!(
            "framerate must be between 1 and {MAX_FRAMERATE}, got {fps}"
        )));
    }
    Ok(())
}

/// Downsize ratios must be finite and in `(0, 1]`.
pub fn validate_downsize_ratio(ratio: f64) -> CastmateResult<()> {
    if !ratio.is_finite() || ratio <= 0.0 || ratio > 1.0 {
        return Err(CastmateError::config(format!(
            "downsize ratio must be in (0, 1], got {ratio}"
        )));
    }
    Ok(())
}

impl EngineConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load and validate config from an explicit path.
    pub fn load_from(path: &Path) -> CastmateResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.capture.validate()?;
        Ok(config)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("castmate").join("config.json")
}
