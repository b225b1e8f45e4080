//! Owner-facing surface: start a control loop on its own worker, stop it

use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::mpsc;

use super::channels::{ClickerEvents, create_clicker_channels};
use super::config::{CaptureMode, DispatchConfig, RunConfig};
use super::error::{ClickerError, ClickerResult};
use super::fsm::ClickerLoop;
use super::types::LoopCommand;
use crate::platform::{Desktop, Pointer};
use crate::template_matching::TemplateSet;

/// Validate `config` and start a control loop on a dedicated worker thread.
///
/// Returns the handle used to steer the loop and the stream of its events.
/// The stream ends once the worker has stopped.
pub fn start<D, P>(
    templates: Arc<TemplateSet>,
    config: RunConfig,
    desktop: D,
    pointer: P,
) -> ClickerResult<(ClickerHandle, ClickerEvents)>
where
    D: Desktop + Send + 'static,
    P: Pointer + Send + 'static,
{
    config.validate(&templates)?;

    let capture_mode = config.capture.mode;
    let (command_tx, command_rx, event_tx, event_rx) = create_clicker_channels();
    let clicker = ClickerLoop::new(templates, config, desktop, pointer, command_rx, event_tx);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let worker = std::thread::Builder::new()
        .name("clicker-loop".to_string())
        .spawn(move || runtime.block_on(clicker.run()))?;

    Ok((
        ClickerHandle {
            command_tx,
            worker: Some(worker),
            capture_mode,
        },
        event_rx,
    ))
}

/// Handle to a running control loop. Dropping it asks the loop to stop
/// without waiting for it.
#[derive(Debug)]
pub struct ClickerHandle {
    command_tx: mpsc::UnboundedSender<LoopCommand>,
    worker: Option<JoinHandle<()>>,
    capture_mode: CaptureMode,
}

impl ClickerHandle {
    /// Replace the dispatch config; takes effect on the next iteration.
    pub fn update_dispatch(&self, config: DispatchConfig) -> ClickerResult<()> {
        config.validate(self.capture_mode)?;
        self.command_tx
            .send(LoopCommand::UpdateDispatch(config))
            .map_err(|_| ClickerError::LoopGone)
    }

    /// Ask the loop to stop after its current iteration, without waiting.
    pub fn request_stop(&self) {
        let _ = self.command_tx.send(LoopCommand::Stop);
    }

    /// Stop the loop and block until it has stopped.
    ///
    /// Waits at most for the in-flight iteration to complete.
    pub fn stop(mut self) -> ClickerResult<()> {
        self.request_stop();
        match self.worker.take() {
            Some(worker) => worker.join().map_err(ClickerError::from_panic),
            None => Ok(()),
        }
    }
}

impl Drop for ClickerHandle {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.request_stop();
        }
    }
}
