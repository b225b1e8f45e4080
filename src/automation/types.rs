// Types and enums for the control loop
use image::RgbImage;

use super::config::DispatchConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

#[derive(Debug, Clone)]
pub enum LoopCommand {
    Stop,
    UpdateDispatch(DispatchConfig), // replaces the whole config before the next iteration
}

#[derive(Debug, Clone)]
pub enum ClickerEvent {
    Log(String),
    Started,
    Stopped,
    StateChanged(LoopState),
    MatchFound { template: String, x: i32, y: i32 },
    DebugFrame(DebugFrame),
}

/// Annotated copy of one captured frame, tightly packed RGB8.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugFrame {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl DebugFrame {
    pub fn from_image(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            rgb: image.into_raw(),
        }
    }

    pub fn to_image(&self) -> Option<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.rgb.clone())
    }
}
