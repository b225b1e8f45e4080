use thiserror::Error;

use super::capture::NotAvailable;
use crate::platform::PlatformError;
use crate::template_matching::template::TemplateError;

/// A specialized `Result` type for control loop operations.
pub type ClickerResult<T> = Result<T, ClickerError>;

/// The error type for configuring and running the control loop.
#[derive(Debug, Error)]
pub enum ClickerError {
    #[error("No target images loaded. Add at least one image.")]
    EmptyTemplateSet,

    #[error("{operation} requires a target window")]
    MissingTargetWindow { operation: &'static str },

    #[error("Confidence threshold {value} is outside (0, 1]")]
    InvalidThreshold { value: f32 },

    #[error("Click interval {value}s must be a finite, non-negative number of seconds")]
    InvalidCooldown { value: f64 },

    #[error("A {region} region cannot be used in {mode} capture mode")]
    RegionModeMismatch {
        region: &'static str,
        mode: &'static str,
    },

    #[error("Selected region is empty")]
    EmptySelection,

    #[error("Error: Window not found")]
    WindowNotFound,

    #[error(transparent)]
    Unavailable(#[from] NotAvailable),

    #[error("Capture failed: {source}")]
    Capture { source: PlatformError },

    #[error("Click dispatch failed: {source}")]
    Dispatch { source: PlatformError },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Failed to start control loop worker: {source}")]
    Worker {
        #[from]
        source: std::io::Error,
    },

    #[error("Control loop is no longer running")]
    LoopGone,

    #[error("Iteration panicked: {description}")]
    Panicked { description: String },
}

impl ClickerError {
    /// Errors that reject a configuration before the loop starts.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ClickerError::EmptyTemplateSet
                | ClickerError::MissingTargetWindow { .. }
                | ClickerError::InvalidThreshold { .. }
                | ClickerError::InvalidCooldown { .. }
                | ClickerError::RegionModeMismatch { .. }
                | ClickerError::EmptySelection
                | ClickerError::WindowNotFound
        )
    }

    /// Build from a caught panic payload.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let description = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        ClickerError::Panicked { description }
    }
}
