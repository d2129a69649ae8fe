//! Interactive sample: a framed log panel beside a ticking counter, with an
//! input line underneath. Type and press Enter to append to the log, `quit`
//! or Ctrl-C to leave. Set `ROOM_BLOCKS_LOG=<path>` to write runner events
//! to a file.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, unbounded};
use room_blocks::{
    Arrangement, CrosstermKeys, CrosstermTerminal, FileSink, FrameStyle, HJust, InputBinding,
    Logger, Node, Result, Runner, RunnerConfig, Shape, SizePref, StyleSheet, VJust,
};

const LOG_LINES: usize = 200;

fn main() -> Result<()> {
    let header = Node::text("{bold}{cyan}room blocks{normal} sample")
        .height(SizePref::fixed(1))
        .hjust(HJust::Center)
        .build();
    let log = Node::text("").vjust(VJust::End).build();
    let counter = Node::text("0")
        .hjust(HJust::Center)
        .vjust(VJust::Center)
        .build();
    let prompt = Node::text("{green}>{normal} ")
        .width(SizePref::fixed(2))
        .height(SizePref::fixed(1))
        .build();
    let input = Node::text("").height(SizePref::fixed(1)).build();

    let log_frame = Node::framed(log.clone(), FrameStyle::default().with_title("log"))?;
    let counter_frame = Node::framed(
        counter.clone(),
        FrameStyle::default()
            .with_title("{yellow}ticks{normal}")
            .with_title_sep("-"),
    )?;
    counter_frame.node().set_width_pref(SizePref::fixed(16));

    let arrangement = Arrangement::new(
        Shape::column([
            Shape::leaf("header"),
            Shape::row_of(["log", "ticks"]),
            Shape::row_of(["prompt", "input"]),
        ]),
        [
            ("header", header),
            ("log", log_frame.node().clone()),
            ("ticks", counter_frame.node().clone()),
            ("prompt", prompt),
            ("input", input.clone()),
        ],
    )?;
    let root = Node::composite(arrangement).build();

    let (submit_tx, submit_rx) = unbounded();
    let mut config = RunnerConfig {
        input: Some(InputBinding::new(input).with_submit(submit_tx)),
        ..RunnerConfig::default()
    };
    if let Ok(path) = std::env::var("ROOM_BLOCKS_LOG") {
        config.logger = Some(Logger::new(FileSink::new(path, 1 << 20)?));
        config.enable_metrics();
    }

    let terminal = CrosstermTerminal::new(StyleSheet::standard());
    let runner = Runner::new(Arc::clone(&root), terminal, config).with_keys(CrosstermKeys::new());
    runner.start()?;

    let stop = runner.stop_handle();
    let ticker = thread::spawn(move || {
        let mut ticks = 0u64;
        while !stop.is_stop_requested() {
            thread::sleep(Duration::from_millis(250));
            ticks += 1;
            let _ = counter.set_text(ticks.to_string());
        }
    });

    let mut lines: Vec<String> = Vec::new();
    while !runner.is_stopped() {
        match submit_rx.recv_timeout(Duration::from_millis(100)) {
            Ok(line) if line.trim() == "quit" => break,
            Ok(line) => {
                lines.push(line);
                if lines.len() > LOG_LINES {
                    lines.remove(0);
                }
                log.set_text(lines.join("\n"))?;
                log_frame.set_title(format!("log ({})", lines.len()))?;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    runner.stop();
    let _ = ticker.join();
    Ok(())
}
