use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use parking_lot::Mutex;
use serde_json::json;

use crate::bus::Subscription;
use crate::error::{BlocksError, Result};
use crate::geometry::{Rect, Size};
use crate::layout::Plot;
use crate::logging::{LogLevel, Logger, json_kv};
use crate::metrics::RunnerMetrics;
use crate::node::Node;
use crate::render::Painter;
use crate::runtime::{LayoutCommand, RunnerConfig, RunnerState, Shared, emit};
use crate::terminal::Terminal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exit {
    Requested,
    Interrupted,
    Fault,
}

impl Exit {
    fn label(self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::Interrupted => "interrupted",
            Self::Fault => "fault",
        }
    }
}

/// Body of the render thread, the only writer to the terminal.
pub(crate) struct RenderLoop {
    root: Arc<Node>,
    terminal: Box<dyn Terminal>,
    painter: Painter,
    wake: Subscription,
    commands: Receiver<LayoutCommand>,
    shared: Arc<Shared>,
    wait_interval: Duration,
    logger: Option<Logger>,
    metrics: Option<Arc<Mutex<RunnerMetrics>>>,
    metrics_interval: Duration,
    metrics_target: String,
    last_size: Option<Size>,
    cycles: u64,
    started: Instant,
    last_metrics_emit: Instant,
}

impl RenderLoop {
    pub(crate) fn new(
        root: Arc<Node>,
        terminal: Box<dyn Terminal>,
        wake: Subscription,
        commands: Receiver<LayoutCommand>,
        shared: Arc<Shared>,
        config: &RunnerConfig,
    ) -> Self {
        let now = Instant::now();
        Self {
            root,
            terminal,
            painter: Painter::new(config.repaint),
            wake,
            commands,
            shared,
            wait_interval: config.wait_interval,
            logger: config.logger.clone(),
            metrics: config.metrics_handle(),
            metrics_interval: config.metrics_interval,
            metrics_target: config.metrics_target.clone(),
            last_size: None,
            cycles: 0,
            started: now,
            last_metrics_emit: now,
        }
    }

    pub(crate) fn run(mut self) {
        let exit = match self.terminal.enter() {
            Ok(()) => self.serve(),
            Err(err) => {
                self.fault(&err);
                Exit::Fault
            }
        };
        self.shutdown(exit);
    }

    fn serve(&mut self) -> Exit {
        // the first cycle paints without waiting for a notification
        let mut pending = true;
        loop {
            if self.shared.stop.load(Ordering::Acquire) {
                return Exit::Requested;
            }
            if self.shared.interrupt.load(Ordering::Acquire) {
                self.log(LogLevel::Info, "interrupt_received", std::iter::empty());
                return Exit::Interrupted;
            }

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.tick(pending)));
            let failure = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(err)) => Some(err),
                Err(payload) => Some(BlocksError::Panicked(panic_message(payload))),
            };
            if let Some(err) = failure {
                self.fault(&err);
                return Exit::Fault;
            }
            self.maybe_emit_metrics();

            pending = match self.wake.receiver().recv_timeout(self.wait_interval) {
                Ok(()) => {
                    self.record(RunnerMetrics::record_wake);
                    true
                }
                Err(RecvTimeoutError::Timeout) => false,
                Err(RecvTimeoutError::Disconnected) => return Exit::Requested,
            };
        }
    }

    /// Runs a cycle when notified, when layout commands are queued, or when
    /// the surface changed size since the last cycle.
    fn tick(&mut self, pending: bool) -> Result<()> {
        let size = self.terminal.size()?;
        let resized = self.last_size != Some(size);
        if pending || resized || !self.commands.is_empty() {
            self.cycle(size, resized)?;
        }
        Ok(())
    }

    fn cycle(&mut self, size: Size, resized: bool) -> Result<()> {
        let bus = self.root.bus().clone();
        let _tree = bus.lock_tree();
        self.apply_commands();

        if resized {
            if let Some(previous) = self.last_size {
                self.log(
                    LogLevel::Info,
                    "resized",
                    [
                        json_kv("from_width", json!(previous.width)),
                        json_kv("from_height", json!(previous.height)),
                        json_kv("width", json!(size.width)),
                        json_kv("height", json!(size.height)),
                    ],
                );
            }
            self.terminal.clear()?;
            self.painter.invalidate();
            self.last_size = Some(size);
        }

        let frames = Plot::build(&self.root)?.render(Rect::from_size(size))?;
        let stats = self.painter.paint(self.terminal.as_mut(), &frames)?;
        self.cycles += 1;
        self.record(|metrics| metrics.record_cycle(stats));
        self.log(
            LogLevel::Debug,
            "cycle_completed",
            [
                json_kv("cycle", json!(self.cycles)),
                json_kv("frames", json!(frames.len())),
                json_kv("painted", json!(stats.painted)),
                json_kv("skipped", json!(stats.skipped)),
            ],
        );
        Ok(())
    }

    fn apply_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            let label = command.label();
            match command.apply(&self.root) {
                Ok(()) => {
                    self.record(|metrics| metrics.record_command(true));
                    self.log(
                        LogLevel::Info,
                        "layout_command_applied",
                        [json_kv("command", json!(label))],
                    );
                }
                Err(err) => {
                    self.record(|metrics| metrics.record_command(false));
                    self.log(
                        LogLevel::Warn,
                        "layout_command_rejected",
                        [
                            json_kv("command", json!(label)),
                            json_kv("error", json!(err.to_string())),
                        ],
                    );
                }
            }
        }
    }

    fn fault(&mut self, err: &BlocksError) {
        self.record(RunnerMetrics::record_fault);
        let size = self.last_size.unwrap_or_default();
        self.log(
            LogLevel::Error,
            "render_fault",
            [
                json_kv("cycle", json!(self.cycles + 1)),
                json_kv("width", json!(size.width)),
                json_kv("height", json!(size.height)),
                json_kv("error", json!(err.to_string())),
            ],
        );
    }

    fn shutdown(&mut self, exit: Exit) {
        self.shared.stop.store(true, Ordering::Release);
        self.shared.set_state(RunnerState::Stopped);
        self.terminal.clear().ok();
        self.terminal.flush().ok();
        self.terminal.leave().ok();
        self.emit_metrics_snapshot();
        self.log(
            LogLevel::Info,
            "runner_stopped",
            [
                json_kv("reason", json!(exit.label())),
                json_kv("cycles", json!(self.cycles)),
                json_kv("uptime_ms", json!(self.started.elapsed().as_millis() as u64)),
            ],
        );
    }

    fn maybe_emit_metrics(&mut self) {
        if self.metrics.is_none() || self.metrics_interval.is_zero() {
            return;
        }
        let now = Instant::now();
        if now.duration_since(self.last_metrics_emit) < self.metrics_interval {
            return;
        }
        self.last_metrics_emit = now;
        self.emit_metrics_snapshot();
    }

    fn emit_metrics_snapshot(&self) {
        if let (Some(logger), Some(metrics)) = (self.logger.as_ref(), self.metrics.as_ref()) {
            let snapshot = metrics
                .lock()
                .snapshot(self.started.elapsed(), self.root.bus().stats());
            let _ = logger.log_event(snapshot.to_log_event(&self.metrics_target));
        }
    }

    fn record(&self, update: impl FnOnce(&mut RunnerMetrics)) {
        if let Some(metrics) = self.metrics.as_ref() {
            let mut guard = metrics.lock();
            update(&mut *guard);
        }
    }

    fn log<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, serde_json::Value)>,
    {
        emit(self.logger.as_ref(), level, message, fields);
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
