// Control loop state machine: capture, match, decide, dispatch, pace
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use log::Level;
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

use super::annotate::annotate;
use super::capture::{self, NotAvailable};
use super::channels::EventSender;
use super::config::{CaptureConfig, DispatchConfig, LoopTiming, RunConfig};
use super::decision::{self, CooldownTable, DecisionParams};
use super::dispatch::ClickDispatcher;
use super::error::ClickerError;
use super::types::{ClickerEvent, DebugFrame, LoopCommand, LoopState};
use crate::platform::{Desktop, Pointer};
use crate::template_matching::{MatchEngine, TemplateSet};

/// Transient condition the loop is currently waiting out, logged on change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Waiting {
    Minimized,
    OutOfBounds,
}

/// What to do after one iteration.
enum Next {
    /// Wait until the given deadline, then iterate again
    Continue(Instant),
    /// The run is over
    Finish,
}

pub struct ClickerLoop<D: Desktop, P: Pointer> {
    state: LoopState,
    templates: Arc<TemplateSet>,
    dispatch: DispatchConfig,
    capture: CaptureConfig,
    timing: LoopTiming,
    desktop: D,
    dispatcher: ClickDispatcher<P>,
    cooldowns: CooldownTable,
    waiting: Option<Waiting>,
    stop_requested: bool,
    command_rx: mpsc::UnboundedReceiver<LoopCommand>,
    event_tx: EventSender,
}

impl<D: Desktop, P: Pointer> ClickerLoop<D, P> {
    pub fn new(
        templates: Arc<TemplateSet>,
        config: RunConfig,
        desktop: D,
        pointer: P,
        command_rx: mpsc::UnboundedReceiver<LoopCommand>,
        event_tx: EventSender,
    ) -> Self {
        Self {
            state: LoopState::Idle,
            templates,
            dispatch: config.dispatch,
            capture: config.capture,
            timing: config.timing,
            desktop,
            dispatcher: ClickDispatcher::new(pointer),
            cooldowns: CooldownTable::new(),
            waiting: None,
            stop_requested: false,
            command_rx,
            event_tx,
        }
    }

    fn emit(&self, event: ClickerEvent) {
        self.event_tx.send(event);
    }

    /// Write to the log and forward the same line to the owner.
    fn report(&self, level: Level, message: String) {
        log::log!(level, "{}", message);
        self.emit(ClickerEvent::Log(message));
    }

    fn change_state(&mut self, new_state: LoopState) {
        if self.state != new_state {
            log::debug!("🖱️ Clicker state: {:?} -> {:?}", self.state, new_state);
            self.state = new_state;
            self.emit(ClickerEvent::StateChanged(new_state));
        }
    }

    fn process_command(&mut self, command: LoopCommand) {
        match command {
            LoopCommand::Stop => {
                if !self.stop_requested {
                    log::debug!("⏹️ Stop requested");
                    self.stop_requested = true;
                    self.change_state(LoopState::Stopping);
                }
            }
            LoopCommand::UpdateDispatch(config) => {
                log::debug!(
                    "⚙️ Dispatch config updated: confidence {:.2}, interval {:.2}s, multi {}, mode {}",
                    config.confidence_threshold,
                    config.cooldown.as_secs_f64(),
                    config.allow_multiple_clicks,
                    config.dispatch_mode
                );
                self.dispatch = config;
            }
        }
    }

    fn owner_gone(&mut self) {
        if !self.stop_requested {
            log::debug!("Command channel closed, stopping");
            self.stop_requested = true;
            self.change_state(LoopState::Stopping);
        }
    }

    /// Apply every queued command without waiting.
    fn drain_commands(&mut self) {
        loop {
            match self.command_rx.try_recv() {
                Ok(command) => self.process_command(command),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.owner_gone();
                    break;
                }
            }
        }
    }

    /// Sleep until `deadline`, handling commands as they arrive.
    ///
    /// Returns early once a stop is requested.
    async fn pause_until(&mut self, deadline: Instant) {
        let sleep = tokio::time::sleep_until(deadline);
        tokio::pin!(sleep);

        while !self.stop_requested {
            tokio::select! {
                _ = &mut sleep => return,
                command = self.command_rx.recv() => match command {
                    Some(command) => self.process_command(command),
                    None => self.owner_gone(),
                },
            }
        }
    }

    /// One capture-match-decide-dispatch pass.
    fn iterate(&mut self, now: Instant) -> Result<(), ClickerError> {
        let dispatch = self.dispatch.clone();

        let rect = capture::resolve_rect(&self.capture, dispatch.target_window, &self.desktop)?;
        let frame = capture::capture(&self.desktop, rect)
            .map_err(|source| ClickerError::Capture { source })?;

        let engine = MatchEngine::new(dispatch.match_method);
        let results = engine.match_all(&frame.image, &self.templates);

        let accepted = decision::decide(
            &results,
            &DecisionParams::from(&dispatch),
            frame.origin,
            now.into_std(),
            &mut self.cooldowns,
        );

        for m in &accepted {
            self.report(Level::Info, format!("Click: {} ({:.2})", m.name, m.score));
            match self.dispatcher.dispatch(
                m.screen_point,
                dispatch.dispatch_mode,
                dispatch.target_window,
            ) {
                Ok(()) => self.emit(ClickerEvent::MatchFound {
                    template: m.name.clone(),
                    x: m.screen_point.x,
                    y: m.screen_point.y,
                }),
                Err(e) => self.report(Level::Warn, format!("Error: {e}")),
            }
        }

        if dispatch.debug_frames {
            let annotated = annotate(&frame.image, &results, dispatch.confidence_threshold);
            self.emit(ClickerEvent::DebugFrame(DebugFrame::from_image(annotated)));
        }

        Ok(())
    }

    fn wait_for(&mut self, waiting: Waiting, message: String, retry: Duration) -> Next {
        if self.waiting != Some(waiting) {
            self.report(Level::Info, message);
            self.waiting = Some(waiting);
        }
        Next::Continue(Instant::now() + retry)
    }

    /// Turn one iteration's outcome into the next step.
    fn settle(&mut self, started: Instant, outcome: Result<(), ClickerError>) -> Next {
        match outcome {
            Ok(()) => {
                self.waiting = None;
                Next::Continue(started + self.timing.frame_period)
            }
            Err(ClickerError::Unavailable(reason)) => match reason {
                NotAvailable::WindowLost => {
                    self.report(Level::Warn, NotAvailable::WindowLost.to_string());
                    Next::Finish
                }
                NotAvailable::Minimized => {
                    let retry = self.timing.minimized_retry;
                    let message = "Target window minimized, waiting".to_string();
                    self.wait_for(Waiting::Minimized, message, retry)
                }
                NotAvailable::OutOfBounds(rect) => {
                    let retry = self.timing.out_of_bounds_retry;
                    self.wait_for(
                        Waiting::OutOfBounds,
                        format!("Capture area {rect} is off screen, waiting"),
                        retry,
                    )
                }
                NotAvailable::Desktop(e) => {
                    self.report(Level::Warn, format!("Error: {e}"));
                    Next::Continue(Instant::now() + self.timing.error_retry)
                }
            },
            Err(e) => {
                self.report(Level::Warn, format!("Error: {e}"));
                Next::Continue(Instant::now() + self.timing.error_retry)
            }
        }
    }

    /// Run until stopped or the tracked window disappears.
    pub async fn run(mut self) {
        self.report(
            Level::Info,
            format!("Worker started. Mode: {}", self.dispatch.dispatch_mode),
        );
        self.change_state(LoopState::Running);
        self.emit(ClickerEvent::Started);

        loop {
            self.drain_commands();
            if self.stop_requested {
                break;
            }

            let started = Instant::now();
            let outcome = catch_unwind(AssertUnwindSafe(|| self.iterate(started)))
                .unwrap_or_else(|payload| Err(ClickerError::from_panic(payload)));

            match self.settle(started, outcome) {
                Next::Continue(deadline) => self.pause_until(deadline).await,
                Next::Finish => break,
            }
        }

        self.change_state(LoopState::Stopped);
        log::info!("Worker stopped.");
        self.emit(ClickerEvent::Stopped);
    }
}
