//! The runner: one render thread that owns the terminal, plus an optional
//! input thread.
//!
//! Application threads never write to the terminal. They mutate nodes, which
//! publish dirty notifications on their bus, or enqueue [`LayoutCommand`]s;
//! the render thread coalesces whatever arrived into a single
//! rebuild-and-repaint cycle. Every wait is bounded, so a stop request is
//! always observed within one wait interval.

mod commands;
mod input;
mod render_loop;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use parking_lot::Mutex;
use serde_json::json;

use crate::arrangement::{Arrangement, NodeId};
use crate::bus::{Subscription, Waker};
use crate::error::{ConfigurationError, Result, SchedulerError};
use crate::logging::{LogLevel, Logger, event_with_fields, json_kv};
use crate::metrics::RunnerMetrics;
use crate::node::Node;
use crate::render::RepaintMode;
use crate::terminal::{KeySource, Terminal};

pub use commands::LayoutCommand;
pub use input::InputBinding;

use input::InputLoop;
use render_loop::RenderLoop;

/// Log target for runner events.
pub const RUNNER_TARGET: &str = "room_blocks::runner";

const JOIN_POLL: Duration = Duration::from_millis(5);

/// Configuration knobs for the runner.
#[derive(Clone)]
pub struct RunnerConfig {
    /// Longest the render loop sleeps without a notification.
    pub wait_interval: Duration,
    /// Longest a single key read blocks.
    pub input_poll: Duration,
    /// How long `stop` waits for each background thread.
    pub join_timeout: Duration,
    pub repaint: RepaintMode,
    /// Optional structured logger used by both threads.
    pub logger: Option<Logger>,
    /// Metrics accumulator used for periodic snapshots.
    pub metrics: Option<Arc<Mutex<RunnerMetrics>>>,
    /// Interval between metrics snapshot emissions. Zero disables snapshots.
    pub metrics_interval: Duration,
    /// Target field used when emitting metrics snapshots.
    pub metrics_target: String,
    /// Text leaf that receives typed keys.
    pub input: Option<InputBinding>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            wait_interval: Duration::from_millis(100),
            input_poll: Duration::from_millis(50),
            join_timeout: Duration::from_secs(1),
            repaint: RepaintMode::Full,
            logger: None,
            metrics: None,
            metrics_interval: Duration::from_secs(5),
            metrics_target: format!("{RUNNER_TARGET}.metrics"),
            input: None,
        }
    }
}

impl RunnerConfig {
    /// Enable metrics collection if it has not already been configured.
    pub fn enable_metrics(&mut self) {
        if self.metrics.is_none() {
            self.metrics = Some(Arc::new(Mutex::new(RunnerMetrics::new())));
        }
    }

    /// Access the shared metrics handle if metrics are enabled.
    pub fn metrics_handle(&self) -> Option<Arc<Mutex<RunnerMetrics>>> {
        self.metrics.as_ref().map(Arc::clone)
    }
}

/// Lifecycle of a runner. `Stopped` is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunnerState {
    Idle = 0,
    Rendering = 1,
    Stopped = 2,
}

impl RunnerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Rendering,
            _ => Self::Stopped,
        }
    }
}

/// Flags shared by the runner handle and its threads.
pub(crate) struct Shared {
    state: AtomicU8,
    pub(crate) stop: AtomicBool,
    pub(crate) interrupt: AtomicBool,
    pub(crate) waker: Waker,
}

impl Shared {
    pub(crate) fn state(&self) -> RunnerState {
        RunnerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: RunnerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub(crate) fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
        self.waker.wake();
    }

    pub(crate) fn request_interrupt(&self) {
        self.interrupt.store(true, Ordering::Release);
        self.waker.wake();
    }
}

pub(crate) fn emit<I>(logger: Option<&Logger>, level: LogLevel, message: &str, fields: I)
where
    I: IntoIterator<Item = (String, serde_json::Value)>,
{
    if let Some(logger) = logger {
        let event = event_with_fields(level, RUNNER_TARGET, message, fields);
        let _ = logger.log_event(event);
    }
}

/// Cloneable, non-blocking stop trigger.
///
/// Only flips a flag and posts a wake, so it is safe to call from any
/// thread, including signal-handling threads and input callbacks.
#[derive(Clone)]
pub struct StopHandle {
    shared: Arc<Shared>,
}

impl StopHandle {
    pub fn request_stop(&self) {
        self.shared.request_stop();
    }

    /// Ask for a repaint without changing any node.
    pub fn request_repaint(&self) {
        self.shared.waker.wake();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.shared.stop.load(Ordering::Acquire)
    }
}

/// Resources handed to the threads on start.
struct Pending {
    terminal: Box<dyn Terminal>,
    keys: Option<Box<dyn KeySource>>,
    wake: Subscription,
    commands: Receiver<LayoutCommand>,
    done: Sender<()>,
}

/// Drives one node tree on one terminal.
///
/// The runner subscribes to the root node's bus; every node in the tree is
/// expected to publish on that same bus.
pub struct Runner {
    root: Arc<Node>,
    config: RunnerConfig,
    shared: Arc<Shared>,
    commands: Sender<LayoutCommand>,
    pending: Mutex<Option<Pending>>,
    workers: Mutex<Vec<(&'static str, JoinHandle<()>)>>,
    done: Receiver<()>,
}

impl Runner {
    pub fn new<T>(root: Arc<Node>, terminal: T, config: RunnerConfig) -> Self
    where
        T: Terminal + 'static,
    {
        let wake = root.bus().subscribe();
        let (commands_tx, commands_rx) = unbounded();
        let (done_tx, done_rx) = unbounded();
        let shared = Arc::new(Shared {
            state: AtomicU8::new(RunnerState::Idle as u8),
            stop: AtomicBool::new(false),
            interrupt: AtomicBool::new(false),
            waker: wake.waker(),
        });
        Self {
            root,
            config,
            shared,
            commands: commands_tx,
            pending: Mutex::new(Some(Pending {
                terminal: Box::new(terminal),
                keys: None,
                wake,
                commands: commands_rx,
                done: done_tx,
            })),
            workers: Mutex::new(Vec::new()),
            done: done_rx,
        }
    }

    /// Read keys from `keys` on a dedicated input thread once started.
    pub fn with_keys<K>(mut self, keys: K) -> Self
    where
        K: KeySource + 'static,
    {
        if let Some(pending) = self.pending.get_mut() {
            pending.keys = Some(Box::new(keys));
        }
        self
    }

    pub fn root(&self) -> &Arc<Node> {
        &self.root
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn state(&self) -> RunnerState {
        self.shared.state()
    }

    pub fn is_stopped(&self) -> bool {
        self.state() == RunnerState::Stopped
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Spawn the render thread, and the input thread when a key source was
    /// given or the terminal supplies one for its raw mode. The first cycle
    /// paints without waiting for a notification.
    pub fn start(&self) -> Result<()> {
        if let Some(binding) = &self.config.input {
            if !binding.node.is_leaf() {
                return Err(ConfigurationError::NotALeaf.into());
            }
        }
        if self.shared.stop.load(Ordering::Acquire) {
            self.shared.set_state(RunnerState::Stopped);
            return Err(SchedulerError::Stopped.into());
        }
        match self.shared.state.compare_exchange(
            RunnerState::Idle as u8,
            RunnerState::Rendering as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {}
            Err(current) if current == RunnerState::Rendering as u8 => {
                return Err(SchedulerError::AlreadyStarted.into());
            }
            Err(_) => return Err(SchedulerError::Stopped.into()),
        }
        let Some(pending) = self.pending.lock().take() else {
            return Err(SchedulerError::Stopped.into());
        };

        let mut terminal = pending.terminal;
        let (keys, key_source) = match pending.keys {
            Some(keys) => (Some(keys), "configured"),
            None => match terminal.raw_keys() {
                Some(keys) => (Some(keys), "terminal"),
                None => (None, "none"),
            },
        };
        let render_loop = RenderLoop::new(
            Arc::clone(&self.root),
            terminal,
            pending.wake,
            pending.commands,
            Arc::clone(&self.shared),
            &self.config,
        );
        let done = pending.done;
        let render = thread::Builder::new()
            .name("room-render".into())
            .spawn(move || {
                render_loop.run();
                drop(done);
            })
            .map_err(|source| {
                self.shared.set_state(RunnerState::Stopped);
                SchedulerError::Spawn {
                    name: "room-render",
                    source,
                }
            })?;
        self.workers.lock().push(("room-render", render));

        if let Some(keys) = keys {
            let input_loop = InputLoop::new(
                keys,
                Arc::clone(&self.shared),
                self.config.input.clone(),
                self.config.input_poll,
                self.config.logger.clone(),
            );
            let spawned = thread::Builder::new()
                .name("room-input".into())
                .spawn(move || input_loop.run());
            match spawned {
                Ok(handle) => self.workers.lock().push(("room-input", handle)),
                Err(source) => {
                    self.stop();
                    return Err(SchedulerError::Spawn {
                        name: "room-input",
                        source,
                    }
                    .into());
                }
            }
        }

        self.log(
            LogLevel::Info,
            "runner_started",
            [
                json_kv("wait_interval_ms", json!(self.config.wait_interval.as_millis() as u64)),
                json_kv("repaint", json!(format!("{:?}", self.config.repaint).to_lowercase())),
                json_kv("keys", json!(key_source)),
            ],
        );
        Ok(())
    }

    /// Stop rendering and wait, bounded by `join_timeout` per thread, for the
    /// threads to exit. The render thread clears the surface and restores the
    /// terminal on its way out. Idempotent.
    pub fn stop(&self) {
        let previous = RunnerState::from_u8(
            self.shared
                .state
                .swap(RunnerState::Stopped as u8, Ordering::AcqRel),
        );
        self.shared.request_stop();
        if previous == RunnerState::Idle {
            // never started: release the terminal and the done channel
            self.pending.lock().take();
            self.log(
                LogLevel::Info,
                "runner_stopped",
                [json_kv("reason", json!("never_started"))],
            );
        }
        self.join_workers();
    }

    /// Block until the render thread has finished its cleanup, or `timeout`
    /// elapses. Returns whether it finished.
    pub fn wait_stopped(&self, timeout: Duration) -> bool {
        match self.done.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
            Err(RecvTimeoutError::Timeout) => false,
        }
    }

    /// Ask for a repaint without changing any node.
    pub fn request_repaint(&self) {
        self.shared.waker.wake();
    }

    /// Queue a layout command for the render loop.
    pub fn enqueue(&self, command: LayoutCommand) -> Result<()> {
        if self.is_stopped() {
            return Err(SchedulerError::Stopped.into());
        }
        self.commands
            .send(command)
            .map_err(|_| SchedulerError::Stopped)?;
        self.shared.waker.wake();
        Ok(())
    }

    /// Replace the root's arrangement wholesale.
    pub fn load(&self, arrangement: Arrangement) -> Result<()> {
        self.enqueue(LayoutCommand::Load(arrangement))
    }

    pub fn update_node(&self, id: impl Into<NodeId>, node: Arc<Node>) -> Result<()> {
        self.enqueue(LayoutCommand::Replace {
            id: id.into(),
            node,
        })
    }

    pub fn add_right(&self, id: impl Into<NodeId>, node: Arc<Node>) -> Result<()> {
        self.enqueue(LayoutCommand::AddRight {
            id: id.into(),
            node,
        })
    }

    pub fn add_under(&self, id: impl Into<NodeId>, node: Arc<Node>) -> Result<()> {
        self.enqueue(LayoutCommand::AddUnder {
            id: id.into(),
            node,
        })
    }

    fn join_workers(&self) {
        let workers: Vec<_> = self.workers.lock().drain(..).collect();
        let current = thread::current().id();
        for (name, handle) in workers {
            if handle.thread().id() == current {
                continue;
            }
            let deadline = Instant::now() + self.config.join_timeout;
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(JOIN_POLL);
            }
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                self.log(
                    LogLevel::Warn,
                    "join_timed_out",
                    [
                        json_kv("thread", json!(name)),
                        json_kv(
                            "timeout_ms",
                            json!(self.config.join_timeout.as_millis() as u64),
                        ),
                    ],
                );
            }
        }
    }

    fn log<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, serde_json::Value)>,
    {
        emit(self.config.logger.as_ref(), level, message, fields);
    }
}

impl Drop for Runner {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::DirtyBus;
    use crate::error::BlocksError;
    use crate::layout::SizePref;
    use crate::logging::MemorySink;
    use crate::terminal::{Key, MemoryKeys, MemoryTerminal};
    use serde_json::Value;

    const WAIT: Duration = Duration::from_secs(2);

    fn wait_until(mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + WAIT;
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        done()
    }

    fn config(sink: &MemorySink) -> RunnerConfig {
        RunnerConfig {
            wait_interval: Duration::from_millis(20),
            input_poll: Duration::from_millis(10),
            logger: Some(Logger::new(sink.clone())),
            ..RunnerConfig::default()
        }
    }

    struct Tree {
        bus: DirtyBus,
        left: Arc<Node>,
        root: Arc<Node>,
    }

    /// `left` fixed at four columns beside `right`.
    fn tree() -> Tree {
        let bus = DirtyBus::new();
        let left = Node::text("left")
            .width(SizePref::fixed(4))
            .bus(bus.clone())
            .build();
        let right = Node::text("right").bus(bus.clone()).build();
        let arrangement = Arrangement::new(
            crate::arrangement::Shape::row_of(["a", "b"]),
            [("a", left.clone()), ("b", right)],
        )
        .unwrap();
        let root = Node::composite(arrangement).bus(bus.clone()).build();
        Tree { bus, left, root }
    }

    fn row(terminal: &MemoryTerminal, y: u16) -> String {
        terminal.row(y).unwrap_or_default()
    }

    #[test]
    fn paints_on_start_and_after_mutation() {
        let sink = MemorySink::new();
        let tree = tree();
        let terminal = MemoryTerminal::new(10, 2);
        let runner = Runner::new(tree.root.clone(), terminal.clone(), config(&sink));
        runner.start().unwrap();

        assert!(wait_until(|| row(&terminal, 0) == "leftright "));
        assert_eq!(row(&terminal, 1), " ".repeat(10));
        assert!(terminal.is_entered());

        tree.left.set_text("LEFT").unwrap();
        assert!(wait_until(|| row(&terminal, 0) == "LEFTright "));

        runner.stop();
        assert!(!terminal.is_entered());
        assert!(terminal.rows().iter().all(|line| line.trim().is_empty()));
    }

    #[test]
    fn resize_repaints_without_a_notification() {
        let sink = MemorySink::new();
        let tree = tree();
        let terminal = MemoryTerminal::new(10, 2);
        let runner = Runner::new(tree.root.clone(), terminal.clone(), config(&sink));
        runner.start().unwrap();
        assert!(wait_until(|| row(&terminal, 0) == "leftright "));

        terminal.resize(6, 1);
        assert!(wait_until(|| row(&terminal, 0) == "leftri"));
        assert_eq!(terminal.rows().len(), 1);

        let resized = sink.find("resized").unwrap();
        assert_eq!(resized.field("from_width"), Some(&Value::from(10)));
        assert_eq!(resized.field("width"), Some(&Value::from(6)));
        runner.stop();
    }

    #[test]
    fn bursts_of_mutations_coalesce() {
        let sink = MemorySink::new();
        let tree = tree();
        let terminal = MemoryTerminal::new(10, 1);
        let mut config = config(&sink);
        config.enable_metrics();
        let metrics = config.metrics_handle().unwrap();
        let runner = Runner::new(tree.root.clone(), terminal.clone(), config);
        runner.start().unwrap();
        assert!(wait_until(|| row(&terminal, 0) == "leftright "));
        let before = metrics.lock().cycles();

        {
            let _tree = tree.bus.lock_tree();
            for i in 0..50 {
                tree.left.set_text(format!("{:04}", i)).unwrap();
            }
        }
        assert!(wait_until(|| row(&terminal, 0) == "0049right "));
        assert!(tree.bus.stats().coalesced > 0);
        assert!(metrics.lock().cycles() - before < 50);
        runner.stop();
    }

    #[test]
    fn stop_is_idempotent_and_final() {
        let sink = MemorySink::new();
        let tree = tree();
        let terminal = MemoryTerminal::new(10, 1);
        let runner = Runner::new(tree.root.clone(), terminal.clone(), config(&sink));
        runner.start().unwrap();
        assert!(matches!(
            runner.start(),
            Err(BlocksError::Scheduler(SchedulerError::AlreadyStarted))
        ));

        runner.stop();
        runner.stop();
        assert!(runner.is_stopped());
        assert!(runner.wait_stopped(Duration::ZERO));
        assert_eq!(sink.count("runner_stopped"), 1);
        assert!(matches!(
            runner.start(),
            Err(BlocksError::Scheduler(SchedulerError::Stopped))
        ));
        assert!(runner.load(Arrangement::single("x", tree.left.clone())).is_err());
    }

    #[test]
    fn stopping_an_idle_runner_leaves_the_terminal_alone() {
        let tree = tree();
        let terminal = MemoryTerminal::new(4, 1);
        let runner = Runner::new(tree.root.clone(), terminal.clone(), RunnerConfig::default());
        runner.stop();
        assert_eq!(runner.state(), RunnerState::Stopped);
        assert_eq!(terminal.clear_count(), 0);
        assert!(!terminal.is_entered());
        assert!(runner.start().is_err());
    }

    #[test]
    fn interrupt_key_stops_the_runner() {
        let sink = MemorySink::new();
        let tree = tree();
        let terminal = MemoryTerminal::new(10, 1);
        let (keys, source) = MemoryKeys::channel();
        let runner = Runner::new(tree.root.clone(), terminal.clone(), config(&sink))
            .with_keys(source);
        runner.start().unwrap();
        assert!(wait_until(|| row(&terminal, 0) == "leftright "));

        keys.send(Key::Interrupt).unwrap();
        assert!(runner.wait_stopped(WAIT));
        assert!(runner.is_stopped());
        assert!(!terminal.is_entered());
        let stopped = sink.find("runner_stopped").unwrap();
        assert_eq!(stopped.field("reason"), Some(&Value::from("interrupted")));
    }

    #[test]
    fn raw_mode_terminal_is_interruptible_without_configured_keys() {
        let sink = MemorySink::new();
        let tree = tree();
        let (keys, source) = MemoryKeys::channel();
        let terminal = MemoryTerminal::new(10, 1).with_raw_keys(source);
        let runner = Runner::new(tree.root.clone(), terminal.clone(), config(&sink));
        runner.start().unwrap();
        assert!(wait_until(|| row(&terminal, 0) == "leftright "));
        let started = sink.find("runner_started").unwrap();
        assert_eq!(started.field("keys"), Some(&Value::from("terminal")));

        keys.send(Key::Interrupt).unwrap();
        assert!(runner.wait_stopped(WAIT));
        assert!(!terminal.is_entered());
        let stopped = sink.find("runner_stopped").unwrap();
        assert_eq!(stopped.field("reason"), Some(&Value::from("interrupted")));
    }

    #[test]
    fn terminal_failure_stops_with_a_fault() {
        let sink = MemorySink::new();
        let tree = tree();
        let terminal = MemoryTerminal::new(10, 1);
        terminal.fail_prints(true);
        let runner = Runner::new(tree.root.clone(), terminal.clone(), config(&sink));
        runner.start().unwrap();

        assert!(runner.wait_stopped(WAIT));
        assert!(runner.is_stopped());
        let fault = sink.find("render_fault").unwrap();
        assert_eq!(fault.field("cycle"), Some(&Value::from(1)));
        let stopped = sink.find("runner_stopped").unwrap();
        assert_eq!(stopped.field("reason"), Some(&Value::from("fault")));
    }

    /// Terminal whose writes panic, standing in for a buggy provider.
    struct PanickingTerminal(MemoryTerminal);

    impl Terminal for PanickingTerminal {
        fn size(&self) -> Result<crate::geometry::Size> {
            self.0.size()
        }

        fn enter(&mut self) -> Result<()> {
            self.0.enter()
        }

        fn leave(&mut self) -> Result<()> {
            self.0.leave()
        }

        fn clear(&mut self) -> Result<()> {
            self.0.clear()
        }

        fn print_at(&mut self, _x: u16, _y: u16, _display: &str) -> Result<()> {
            panic!("print exploded");
        }

        fn flush(&mut self) -> Result<()> {
            self.0.flush()
        }
    }

    #[test]
    fn panic_inside_a_cycle_stops_with_a_fault() {
        let sink = MemorySink::new();
        let tree = tree();
        let terminal = MemoryTerminal::new(10, 1);
        let runner = Runner::new(
            tree.root.clone(),
            PanickingTerminal(terminal.clone()),
            config(&sink),
        );
        runner.start().unwrap();

        assert!(runner.wait_stopped(WAIT));
        assert!(runner.is_stopped());
        assert!(!terminal.is_entered());
        let fault = sink.find("render_fault").unwrap();
        let error = fault.field("error").and_then(Value::as_str).unwrap();
        assert!(error.contains("print exploded"), "{error}");
        let stopped = sink.find("runner_stopped").unwrap();
        assert_eq!(stopped.field("reason"), Some(&Value::from("fault")));

        // the tree lock was released while unwinding
        drop(tree.bus.lock_tree());
    }

    #[test]
    fn metrics_snapshots_are_emitted_periodically() {
        let sink = MemorySink::new();
        let tree = tree();
        let terminal = MemoryTerminal::new(10, 1);
        let mut config = config(&sink);
        config.enable_metrics();
        config.metrics_interval = Duration::from_millis(10);
        let target = config.metrics_target.clone();
        let runner = Runner::new(tree.root.clone(), terminal.clone(), config);
        runner.start().unwrap();

        let snapshot = || {
            sink.events()
                .into_iter()
                .find(|event| event.target == target && event.message == "runner_metrics")
        };
        assert!(wait_until(|| snapshot().is_some()));
        let event = snapshot().unwrap();
        assert!(event.field("cycles").and_then(Value::as_u64).unwrap() >= 1);
        assert!(event.field("dirty_published").is_some());
        runner.stop();
    }

    #[test]
    fn typed_keys_echo_into_the_input_leaf() {
        let sink = MemorySink::new();
        let bus = DirtyBus::new();
        let output = Node::text("out").bus(bus.clone()).build();
        let input = Node::text("").bus(bus.clone()).build();
        let arrangement = Arrangement::new(
            crate::arrangement::Shape::column_of(["out", "in"]),
            [("out", output), ("in", input.clone())],
        )
        .unwrap();
        let root = Node::composite(arrangement).bus(bus).build();

        let terminal = MemoryTerminal::new(5, 2);
        let (submit_tx, submit_rx) = unbounded();
        let (keys, source) = MemoryKeys::channel();
        let mut config = config(&sink);
        config.input = Some(InputBinding::new(input.clone()).with_submit(submit_tx));
        let runner = Runner::new(root, terminal.clone(), config).with_keys(source);
        runner.start().unwrap();

        for key in [Key::Char('h'), Key::Char('i')] {
            keys.send(key).unwrap();
        }
        assert!(wait_until(|| row(&terminal, 1) == "hi   "));

        keys.send(Key::Enter).unwrap();
        assert_eq!(submit_rx.recv_timeout(WAIT).unwrap(), "hi");
        assert!(wait_until(|| row(&terminal, 1) == "     "));
        assert_eq!(row(&terminal, 0), "out  ");
        runner.stop();
    }

    #[test]
    fn input_binding_must_target_a_leaf() {
        let tree = tree();
        let config = RunnerConfig {
            input: Some(InputBinding::new(tree.root.clone())),
            ..RunnerConfig::default()
        };
        let runner = Runner::new(tree.root.clone(), MemoryTerminal::new(4, 1), config);
        assert!(matches!(
            runner.start(),
            Err(BlocksError::Configuration(ConfigurationError::NotALeaf))
        ));
        assert_eq!(runner.state(), RunnerState::Idle);
    }

    #[test]
    fn layout_commands_apply_on_the_render_thread() {
        let sink = MemorySink::new();
        let tree = tree();
        let terminal = MemoryTerminal::new(12, 1);
        let runner = Runner::new(tree.root.clone(), terminal.clone(), config(&sink));
        runner.start().unwrap();
        assert!(wait_until(|| row(&terminal, 0).starts_with("leftright")));

        let extra = Node::text("++")
            .width(SizePref::fixed(2))
            .bus(tree.bus.clone())
            .build();
        runner.add_right("c", extra).unwrap();
        assert!(wait_until(|| row(&terminal, 0) == "leftright ++"));

        let stray = Node::text("?").bus(tree.bus.clone()).build();
        runner.update_node("missing", stray).unwrap();
        assert!(wait_until(|| sink.find("layout_command_rejected").is_some()));
        let rejected = sink.find("layout_command_rejected").unwrap();
        assert_eq!(rejected.field("command"), Some(&Value::from("replace")));
        assert_eq!(row(&terminal, 0), "leftright ++");
        runner.stop();
    }

    #[test]
    fn stop_handle_is_usable_from_other_threads() {
        let tree = tree();
        let terminal = MemoryTerminal::new(10, 1);
        let runner = Runner::new(tree.root.clone(), terminal.clone(), RunnerConfig::default());
        runner.start().unwrap();
        let handle = runner.stop_handle();
        thread::spawn(move || handle.request_stop()).join().unwrap();
        assert!(runner.wait_stopped(WAIT));
        assert!(runner.is_stopped());
    }
}
