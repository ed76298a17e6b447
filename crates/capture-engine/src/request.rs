//! Capture requests, service options and results.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Option key carrying the assembled pipeline description.
pub const PIPELINE_KEY: &str = "pipeline";

/// Option key carrying the frame rate.
pub const FRAMERATE_KEY: &str = "framerate";

/// What part of the screen to record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureRegion {
    /// The whole screen. The size is only used to compute downscaled output dimensions.
    FullScreen { width: u32, height: u32 },
    /// A rectangle in screen coordinates.
    Area {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },
}

impl CaptureRegion {
    /// Size of the recorded picture before downscaling.
    pub fn dimensions(&self) -> (u32, u32) {
        match *self {
            Self::FullScreen { width, height } | Self::Area { width, height, .. } => {
                (width, height)
            }
        }
    }
}

/// Typed value of a service option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    I32(i32),
    Str(String),
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i32> for OptionValue {
    fn from(value: i32) -> Self {
        Self::I32(value)
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Options handed to the capture service.
///
/// The engine writes `pipeline` and `framerate`; anything else the host put
/// in (for example `draw-cursor`) is passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureOptions(BTreeMap<String, OptionValue>);

impl CaptureOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.0.get(key)
    }

    pub fn set_pipeline(&mut self, pipeline: impl Into<String>) {
        self.insert(PIPELINE_KEY, OptionValue::Str(pipeline.into()));
    }

    pub fn pipeline(&self) -> Option<&str> {
        match self.get(PIPELINE_KEY) {
            Some(OptionValue::Str(pipeline)) => Some(pipeline),
            _ => None,
        }
    }

    pub fn set_framerate(&mut self, framerate: i32) {
        self.insert(FRAMERATE_KEY, framerate);
    }

    pub fn framerate(&self) -> Option<i32> {
        match self.get(FRAMERATE_KEY) {
            Some(OptionValue::I32(framerate)) => Some(*framerate),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A single capture request.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRequest {
    pub region: CaptureRegion,
    /// File name template without extension; the service picks the final name.
    pub filename_stem: String,
    pub options: CaptureOptions,
}

impl CaptureRequest {
    pub fn full_screen(width: u32, height: u32, filename_stem: impl Into<String>) -> Self {
        Self {
            region: CaptureRegion::FullScreen { width, height },
            filename_stem: filename_stem.into(),
            options: CaptureOptions::new(),
        }
    }

    pub fn area(x: i32, y: i32, width: u32, height: u32, filename_stem: impl Into<String>) -> Self {
        Self {
            region: CaptureRegion::Area {
                x,
                y,
                width,
                height,
            },
            filename_stem: filename_stem.into(),
            options: CaptureOptions::new(),
        }
    }

    pub fn with_options(mut self, options: CaptureOptions) -> Self {
        self.options = options;
        self
    }
}

/// Outcome of a capture, as reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureResult {
    pub success: bool,
    /// File written by the service, renamed to the profile's extension on success.
    pub path: PathBuf,
    /// Profile whose pipeline the service accepted.
    pub profile_id: String,
}
