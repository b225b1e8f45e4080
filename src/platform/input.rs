//! Pointer input: synthetic clicks through `enigo`, queued window messages
//! through Win32 where available

use enigo::{Button, Coordinate, Direction, Enigo, Mouse, Settings};

use super::error::{PlatformError, PlatformResult};
use super::types::{ClientPoint, MouseMessage, Pointer, ScreenPoint, WindowHandle};

/// Pointer implementation for the local desktop session.
///
/// The `Enigo` connection is opened per click so the pointer can be moved to
/// the loop's worker thread on every platform.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativePointer;

impl NativePointer {
    pub fn new() -> Self {
        Self
    }
}

impl Pointer for NativePointer {
    fn click(&mut self, point: ScreenPoint) -> PlatformResult<()> {
        let mut enigo = Enigo::new(&Settings::default()).map_err(PlatformError::injection)?;
        enigo
            .move_mouse(point.x, point.y, Coordinate::Abs)
            .map_err(PlatformError::injection)?;
        enigo
            .button(Button::Left, Direction::Click)
            .map_err(PlatformError::injection)?;
        Ok(())
    }

    fn screen_to_client(
        &self,
        window: WindowHandle,
        point: ScreenPoint,
    ) -> PlatformResult<ClientPoint> {
        win32::screen_to_client(window, point)
    }

    fn post_mouse_message(
        &self,
        window: WindowHandle,
        message: MouseMessage,
        at: ClientPoint,
    ) -> PlatformResult<()> {
        win32::post_mouse_message(window, message, at)
    }
}

/// Pack client coordinates the way mouse messages expect them in `lParam`.
pub fn pack_client_point(at: ClientPoint) -> isize {
    let x = (at.x as u32) & 0xFFFF;
    let y = (at.y as u32) & 0xFFFF;
    ((y << 16) | x) as i32 as isize
}

#[cfg(target_os = "windows")]
mod win32 {
    use super::{ClientPoint, MouseMessage, PlatformError, PlatformResult, ScreenPoint, WindowHandle};
    use windows::Win32::Foundation::{HWND, LPARAM, POINT, WPARAM};
    use windows::Win32::Graphics::Gdi::ScreenToClient;
    use windows::Win32::UI::WindowsAndMessaging::{
        IsWindow, PostMessageW, WM_LBUTTONDOWN, WM_LBUTTONUP,
    };

    // MK_LBUTTON
    const LEFT_BUTTON_HELD: usize = 0x0001;

    fn hwnd(window: WindowHandle) -> HWND {
        HWND(window.0 as usize as *mut core::ffi::c_void)
    }

    pub fn screen_to_client(window: WindowHandle, point: ScreenPoint) -> PlatformResult<ClientPoint> {
        let handle = hwnd(window);
        let mut p = POINT {
            x: point.x,
            y: point.y,
        };
        // SAFETY: `p` is a valid, writable POINT for the duration of the call.
        let ok = unsafe { IsWindow(handle).as_bool() && ScreenToClient(handle, &mut p).as_bool() };
        if !ok {
            return Err(PlatformError::ClientTranslationFailed {
                handle: window,
                x: point.x,
                y: point.y,
            });
        }
        Ok(ClientPoint { x: p.x, y: p.y })
    }

    pub fn post_mouse_message(
        window: WindowHandle,
        message: MouseMessage,
        at: ClientPoint,
    ) -> PlatformResult<()> {
        let (msg, wparam) = match message {
            MouseMessage::LeftButtonDown => (WM_LBUTTONDOWN, LEFT_BUTTON_HELD),
            MouseMessage::LeftButtonUp => (WM_LBUTTONUP, 0),
        };
        let lparam = super::pack_client_point(at);
        // SAFETY: PostMessageW only queues the message; an invalid handle is
        // reported through the returned error.
        unsafe { PostMessageW(hwnd(window), msg, WPARAM(wparam), LPARAM(lparam)) }
            .map_err(|e| match e.code().0 {
                // ERROR_INVALID_WINDOW_HANDLE as HRESULT
                code if code == 0x8007_0578_u32 as i32 => PlatformError::WindowGone { handle: window },
                _ => PlatformError::injection(e),
            })
    }
}

#[cfg(not(target_os = "windows"))]
mod win32 {
    use super::{ClientPoint, MouseMessage, PlatformError, PlatformResult, ScreenPoint, WindowHandle};

    pub fn screen_to_client(_window: WindowHandle, _point: ScreenPoint) -> PlatformResult<ClientPoint> {
        Err(PlatformError::Unsupported {
            operation: "screen-to-client translation".to_string(),
        })
    }

    pub fn post_mouse_message(
        _window: WindowHandle,
        _message: MouseMessage,
        _at: ClientPoint,
    ) -> PlatformResult<()> {
        Err(PlatformError::Unsupported {
            operation: "background window messages".to_string(),
        })
    }
}
