//! Click dispatch: synthetic global click or queued window messages

use super::config::DispatchMode;
use super::error::{ClickerError, ClickerResult};
use crate::platform::{MouseMessage, PlatformError, Pointer, ScreenPoint, WindowHandle};

/// Performs accepted clicks through a `Pointer`.
#[derive(Debug)]
pub struct ClickDispatcher<P: Pointer> {
    pointer: P,
}

impl<P: Pointer> ClickDispatcher<P> {
    pub fn new(pointer: P) -> Self {
        Self { pointer }
    }

    pub fn pointer(&self) -> &P {
        &self.pointer
    }

    /// Click `point` using `mode`.
    ///
    /// Message injection translates the point into `target`'s client area and
    /// posts a button-down/button-up pair without moving the real pointer.
    pub fn dispatch(
        &mut self,
        point: ScreenPoint,
        mode: DispatchMode,
        target: Option<WindowHandle>,
    ) -> ClickerResult<()> {
        match mode {
            DispatchMode::SyntheticGlobalClick => self
                .pointer
                .click(point)
                .map_err(|source| ClickerError::Dispatch { source }),
            DispatchMode::WindowMessageInjection => {
                let window = target.ok_or(ClickerError::MissingTargetWindow {
                    operation: "Background click",
                })?;
                self.post_click(window, point)
                    .map_err(|source| ClickerError::Dispatch { source })
            }
        }
    }

    fn post_click(&self, window: WindowHandle, point: ScreenPoint) -> Result<(), PlatformError> {
        let client = self.pointer.screen_to_client(window, point)?;
        log::debug!(
            "📨 Posting click to window {} at client ({},{})",
            window,
            client.x,
            client.y
        );
        self.pointer
            .post_mouse_message(window, MouseMessage::LeftButtonDown, client)?;
        self.pointer
            .post_mouse_message(window, MouseMessage::LeftButtonUp, client)
    }
}
