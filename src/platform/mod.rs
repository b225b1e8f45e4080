// Platform module - native desktop boundary
// This module provides the traits the control loop uses to look at the screen
// and to click on it, plus the native implementations behind them.

pub mod error;
pub mod input;
pub mod screen;
pub mod types;

// Re-export the main types and functions for easy access
pub use error::{PlatformError, PlatformResult};
pub use input::NativePointer;
pub use screen::XcapDesktop;
pub use types::{
    ClientPoint, Desktop, MouseMessage, Pointer, ScreenPoint, ScreenRect, WindowHandle,
    WindowInfo, WindowState,
};
