// Communication channels for the control loop
use tokio::sync::mpsc;

use super::types::{ClickerEvent, DebugFrame, LoopCommand};

/// Debug frames that may wait for the owner; newer frames are dropped
/// while the slots are full.
pub const DEBUG_FRAME_SLOTS: usize = 2;

/// Sending half of the event stream, held by the control loop.
///
/// Log, lifecycle and match events are never dropped. Debug frames go
/// through a small bounded queue and are discarded when the owner lags.
#[derive(Debug, Clone)]
pub struct EventSender {
    events: mpsc::UnboundedSender<ClickerEvent>,
    frames: mpsc::Sender<DebugFrame>,
}

impl EventSender {
    /// Queue `event` for the owner. A closed receiver is ignored.
    pub fn send(&self, event: ClickerEvent) {
        match event {
            ClickerEvent::DebugFrame(frame) => {
                if let Err(mpsc::error::TrySendError::Full(_)) = self.frames.try_send(frame) {
                    log::trace!("Owner is behind, debug frame dropped");
                }
            }
            event => {
                let _ = self.events.send(event);
            }
        }
    }
}

/// Receiving half of the event stream.
#[derive(Debug)]
pub struct ClickerEvents {
    events: mpsc::UnboundedReceiver<ClickerEvent>,
    frames: mpsc::Receiver<DebugFrame>,
}

impl ClickerEvents {
    /// Next event, or `None` once the loop has exited and everything queued
    /// has been received. Queued events come before queued debug frames.
    pub async fn recv(&mut self) -> Option<ClickerEvent> {
        tokio::select! {
            biased;
            Some(event) = self.events.recv() => Some(event),
            Some(frame) = self.frames.recv() => Some(ClickerEvent::DebugFrame(frame)),
            else => None,
        }
    }
}

/// Helper function to create control loop channels
///
/// Commands are unbounded so the owner never waits on the loop.
pub fn create_clicker_channels() -> (
    mpsc::UnboundedSender<LoopCommand>,
    mpsc::UnboundedReceiver<LoopCommand>,
    EventSender,
    ClickerEvents,
) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (frame_tx, frame_rx) = mpsc::channel(DEBUG_FRAME_SLOTS);
    (
        cmd_tx,
        cmd_rx,
        EventSender {
            events: event_tx,
            frames: frame_tx,
        },
        ClickerEvents {
            events: event_rx,
            frames: frame_rx,
        },
    )
}
