//! Capture source: resolves the capture rectangle each frame and grabs it

use image::RgbImage;
use thiserror::Error;

use super::config::{CaptureConfig, CaptureMode, LogicalRegion};
use super::region;
use crate::platform::{Desktop, PlatformError, ScreenPoint, ScreenRect, WindowHandle, WindowState};

/// Why no frame can be taken right now.
#[derive(Debug, Error)]
pub enum NotAvailable {
    #[error("Target window lost or closed.")]
    WindowLost,

    #[error("Target window is minimized")]
    Minimized,

    #[error("Capture area {0} is outside the desktop")]
    OutOfBounds(ScreenRect),

    #[error("Desktop query failed: {0}")]
    Desktop(#[from] PlatformError),
}

impl NotAvailable {
    /// Only a lost window ends the run; everything else is retried.
    pub fn is_terminal(&self) -> bool {
        matches!(self, NotAvailable::WindowLost)
    }
}

/// One captured still and where it sits on the desktop.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
    pub origin: ScreenPoint,
}

/// Resolve the absolute, desktop-clipped rectangle for this frame.
pub fn resolve_rect<D: Desktop + ?Sized>(
    capture: &CaptureConfig,
    window: Option<WindowHandle>,
    desktop: &D,
) -> Result<ScreenRect, NotAvailable> {
    let wanted = match capture.mode {
        CaptureMode::WindowRelative => {
            let handle = window.ok_or(NotAvailable::WindowLost)?;
            let window_rect = match desktop.window_state(handle)? {
                WindowState::Lost => return Err(NotAvailable::WindowLost),
                WindowState::Minimized => return Err(NotAvailable::Minimized),
                WindowState::Visible(rect) => rect,
            };
            match &capture.region {
                Some(region) => {
                    region::to_absolute(region, Some(window_rect)).unwrap_or(window_rect)
                }
                None => window_rect,
            }
        }
        CaptureMode::FixedRegion => match &capture.region {
            Some(LogicalRegion::Fixed(rect)) => *rect,
            // Mode switches clear the region, so a relative one here is stale.
            Some(LogicalRegion::Relative(_)) | None => desktop.virtual_desktop()?,
        },
    };

    let bounds = desktop.virtual_desktop()?;
    region::clip_to_desktop(wanted, bounds).ok_or(NotAvailable::OutOfBounds(wanted))
}

/// Grab `rect` as one independent frame.
pub fn capture<D: Desktop + ?Sized>(desktop: &D, rect: ScreenRect) -> Result<Frame, PlatformError> {
    let image = desktop.grab(rect)?;
    if image.dimensions() != (rect.width, rect.height) {
        return Err(PlatformError::capture(format!(
            "expected {}x{} frame, got {}x{}",
            rect.width,
            rect.height,
            image.width(),
            image.height()
        )));
    }
    Ok(Frame {
        image,
        origin: rect.origin(),
    })
}
