use thiserror::Error;

use super::types::WindowHandle;

/// A specialized `Result` type for native desktop operations.
pub type PlatformResult<T> = Result<T, PlatformError>;

/// The error type for everything that crosses the native boundary.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Failed to enumerate monitors: {description}")]
    MonitorEnumerationFailed { description: String },

    #[error("No monitors found")]
    NoMonitors,

    #[error("Failed to enumerate windows: {description}")]
    WindowEnumerationFailed { description: String },

    #[error("Screen capture failed: {description}")]
    CaptureFailed { description: String },

    #[error("Window {handle} is no longer available")]
    WindowGone { handle: WindowHandle },

    #[error("Could not translate ({x},{y}) into client coordinates of window {handle}")]
    ClientTranslationFailed { handle: WindowHandle, x: i32, y: i32 },

    #[error("Input injection failed: {description}")]
    InjectionFailed { description: String },

    #[error("This operation is not supported on this platform: {operation}")]
    Unsupported { operation: String },
}

impl PlatformError {
    pub fn capture(description: impl std::fmt::Display) -> Self {
        PlatformError::CaptureFailed {
            description: description.to_string(),
        }
    }

    pub fn injection(description: impl std::fmt::Display) -> Self {
        PlatformError::InjectionFailed {
            description: description.to_string(),
        }
    }
}
