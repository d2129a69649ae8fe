use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use crossbeam_channel::Sender;
use serde_json::json;

use crate::error::ConfigurationError;
use crate::logging::{LogLevel, Logger, json_kv};
use crate::node::Node;
use crate::runtime::{Shared, emit};
use crate::terminal::{Key, KeySource};

/// Routes typed keys into a text leaf.
///
/// Printable keys are appended, Backspace and Delete remove the last
/// character and Escape clears. Enter clears the leaf and sends what it held
/// over `submit`.
#[derive(Debug, Clone)]
pub struct InputBinding {
    pub node: Arc<Node>,
    pub submit: Option<Sender<String>>,
}

impl InputBinding {
    pub fn new(node: Arc<Node>) -> Self {
        Self { node, submit: None }
    }

    pub fn with_submit(mut self, submit: Sender<String>) -> Self {
        self.submit = Some(submit);
        self
    }

    pub fn apply(&self, key: Key) -> Result<(), ConfigurationError> {
        match key {
            Key::Char(ch) => self.node.push_str(ch.encode_utf8(&mut [0; 4])),
            Key::Backspace | Key::Delete => self.node.pop_char().map(|_| ()),
            Key::Escape => self.node.set_text(""),
            Key::Enter => {
                let line = self.node.take_text()?;
                if let Some(submit) = &self.submit {
                    let _ = submit.send(line);
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// Body of the input thread.
pub(crate) struct InputLoop {
    keys: Box<dyn KeySource>,
    shared: Arc<Shared>,
    binding: Option<InputBinding>,
    poll: Duration,
    logger: Option<Logger>,
}

impl InputLoop {
    pub(crate) fn new(
        keys: Box<dyn KeySource>,
        shared: Arc<Shared>,
        binding: Option<InputBinding>,
        poll: Duration,
        logger: Option<Logger>,
    ) -> Self {
        Self {
            keys,
            shared,
            binding,
            poll,
            logger,
        }
    }

    pub(crate) fn run(mut self) {
        while !self.shared.stop.load(Ordering::Acquire) {
            match self.keys.read_key(self.poll) {
                Ok(Some(key)) => self.handle(key),
                Ok(None) => {}
                Err(err) => {
                    emit(
                        self.logger.as_ref(),
                        LogLevel::Warn,
                        "input_loop_failed",
                        [json_kv("error", json!(err.to_string()))],
                    );
                    break;
                }
            }
        }
    }

    fn handle(&self, key: Key) {
        match key {
            Key::Interrupt => self.shared.request_interrupt(),
            Key::Resize(size) => {
                emit(
                    self.logger.as_ref(),
                    LogLevel::Debug,
                    "resize_signal",
                    [
                        json_kv("width", json!(size.width)),
                        json_kv("height", json!(size.height)),
                    ],
                );
                self.shared.waker.wake();
            }
            other => {
                let Some(binding) = &self.binding else {
                    return;
                };
                if let Err(err) = binding.apply(other) {
                    emit(
                        self.logger.as_ref(),
                        LogLevel::Warn,
                        "input_rejected",
                        [json_kv("error", json!(err.to_string()))],
                    );
                }
            }
        }
    }
}
