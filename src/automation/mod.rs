// Automation module
// This module provides the perception-action control loop: it captures a
// screen region or window, looks for the loaded templates and clicks on them.

pub mod agent;
pub mod annotate;
pub mod capture;
pub mod channels;
pub mod config;
pub mod decision;
pub mod dispatch;
pub mod error;
pub mod fsm;
pub mod region;
pub mod types;


// Re-export the main types and functions for easy access
pub use agent::{ClickerHandle, start};
pub use capture::{Frame, NotAvailable};
pub use channels::{ClickerEvents, DEBUG_FRAME_SLOTS, EventSender, create_clicker_channels};
pub use config::{
    CaptureConfig, CaptureMode, DispatchConfig, DispatchMode, LogicalRegion, LoopTiming,
    RelativeRect, RunConfig,
};
pub use decision::{AcceptedMatch, CooldownTable, DecisionParams};
pub use dispatch::ClickDispatcher;
pub use error::{ClickerError, ClickerResult};
pub use fsm::ClickerLoop;
pub use region::UiRect;
pub use types::{ClickerEvent, DebugFrame, LoopCommand, LoopState};
