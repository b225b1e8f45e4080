// Core desktop types and traits
use image::RgbImage;
use std::fmt;

use super::error::PlatformResult;

/// Opaque identifier of a top-level window (HWND on Windows, the window
/// server id elsewhere). Only valid while the window exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub u64);

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// A point in absolute (virtual desktop) physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
}

impl ScreenPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A point relative to a window's client area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientPoint {
    pub x: i32,
    pub y: i32,
}

/// A rectangle in absolute (virtual desktop) physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl ScreenRect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build from edge coordinates, `None` when the area is empty.
    pub fn from_edges(left: i64, top: i64, right: i64, bottom: i64) -> Option<Self> {
        if right <= left || bottom <= top {
            return None;
        }
        Some(Self {
            x: i32::try_from(left).ok()?,
            y: i32::try_from(top).ok()?,
            width: u32::try_from(right - left).ok()?,
            height: u32::try_from(bottom - top).ok()?,
        })
    }

    pub fn origin(&self) -> ScreenPoint {
        ScreenPoint::new(self.x, self.y)
    }

    pub fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Overlapping area of two rectangles, `None` when they do not overlap.
    pub fn intersect(&self, other: &ScreenRect) -> Option<ScreenRect> {
        Self::from_edges(
            (self.x as i64).max(other.x as i64),
            (self.y as i64).max(other.y as i64),
            self.right().min(other.right()),
            self.bottom().min(other.bottom()),
        )
    }

    /// Smallest rectangle containing both.
    pub fn union(&self, other: &ScreenRect) -> ScreenRect {
        Self::from_edges(
            (self.x as i64).min(other.x as i64),
            (self.y as i64).min(other.y as i64),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
        .unwrap_or(*self)
    }
}

impl fmt::Display for ScreenRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{} {}x{}", self.x, self.y, self.width, self.height)
    }
}

/// Result of looking up a tracked window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    /// The window no longer exists.
    Lost,
    /// The window exists but is iconified.
    Minimized,
    /// The window's current outer rectangle.
    Visible(ScreenRect),
}

/// A window offered for selection.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowInfo {
    pub handle: WindowHandle,
    pub title: String,
    pub rect: ScreenRect,
}

/// Queued mouse messages used for background clicks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseMessage {
    LeftButtonDown,
    LeftButtonUp,
}

/// Read side of the desktop: monitors, windows and pixels.
pub trait Desktop {
    /// Current state of a tracked window. Fails when the windows cannot be
    /// enumerated at all.
    fn window_state(&self, handle: WindowHandle) -> PlatformResult<WindowState>;

    /// Bounding box of all monitors.
    fn virtual_desktop(&self) -> PlatformResult<ScreenRect>;

    /// Grab exactly `rect` as an RGB frame.
    fn grab(&self, rect: ScreenRect) -> PlatformResult<RgbImage>;

    /// Visible, titled windows with a non-empty area, sorted by title.
    fn list_windows(&self) -> PlatformResult<Vec<WindowInfo>>;
}

/// Write side of the desktop: pointer input.
pub trait Pointer {
    /// Move the real pointer to `point` and press-release the primary button.
    fn click(&mut self, point: ScreenPoint) -> PlatformResult<()>;

    /// Translate an absolute point into `window`'s client coordinates.
    fn screen_to_client(&self, window: WindowHandle, point: ScreenPoint)
    -> PlatformResult<ClientPoint>;

    /// Queue a mouse message on `window` without waiting for it to be handled.
    fn post_mouse_message(
        &self,
        window: WindowHandle,
        message: MouseMessage,
        at: ClientPoint,
    ) -> PlatformResult<()>;
}
