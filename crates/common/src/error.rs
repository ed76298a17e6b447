//! Error types shared across Castmate crates.

/// Top-level error type for Castmate operations.
#[derive(Debug, thiserror::Error)]
pub enum CastmateError {
    #[error("Capture error: {message}")]
    Capture { message: String },

    #[error("Tried all {attempted} pipeline configurations and all of them failed")]
    AllConfigurationsFailed { attempted: usize },

    #[error("Capture cancelled: session was torn down")]
    Cancelled,

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Audio device error: {message}")]
    Device { message: String },

    #[error("D-Bus error: {message}")]
    Dbus { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using CastmateError.
pub type CastmateResult<T> = Result<T, CastmateError>;

impl CastmateError {
    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn device(msg: impl Into<String>) -> Self {
        Self::Device {
            message: msg.into(),
        }
    }

    pub fn dbus(msg: impl Into<String>) -> Self {
        Self::Dbus {
            message: msg.into(),
        }
    }

    /// Whether the fallback loop may move on to the next profile after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::AllConfigurationsFailed { .. } | Self::Cancelled
        )
    }
}
