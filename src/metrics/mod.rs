use crate::bus::BusStats;
use crate::logging::{LogEvent, LogFields, LogLevel};
use crate::render::PaintStats;
use serde_json::json;
use std::time::Duration;

/// Render loop counters.
#[derive(Debug, Default, Clone)]
pub struct RunnerMetrics {
    wakes: u64,
    cycles: u64,
    frames_painted: u64,
    frames_skipped: u64,
    commands_applied: u64,
    commands_rejected: u64,
    faults: u64,
}

impl RunnerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_wake(&mut self) {
        self.wakes = self.wakes.saturating_add(1);
    }

    pub fn record_cycle(&mut self, paint: PaintStats) {
        self.cycles = self.cycles.saturating_add(1);
        self.frames_painted = self.frames_painted.saturating_add(paint.painted as u64);
        self.frames_skipped = self.frames_skipped.saturating_add(paint.skipped as u64);
    }

    pub fn record_command(&mut self, applied: bool) {
        if applied {
            self.commands_applied = self.commands_applied.saturating_add(1);
        } else {
            self.commands_rejected = self.commands_rejected.saturating_add(1);
        }
    }

    pub fn record_fault(&mut self) {
        self.faults = self.faults.saturating_add(1);
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn faults(&self) -> u64 {
        self.faults
    }

    pub fn snapshot(&self, uptime: Duration, bus: BusStats) -> MetricSnapshot {
        MetricSnapshot {
            uptime_ms: uptime.as_millis() as u64,
            wakes: self.wakes,
            cycles: self.cycles,
            frames_painted: self.frames_painted,
            frames_skipped: self.frames_skipped,
            commands_applied: self.commands_applied,
            commands_rejected: self.commands_rejected,
            faults: self.faults,
            dirty_published: bus.published,
            dirty_coalesced: bus.coalesced,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSnapshot {
    pub uptime_ms: u64,
    pub wakes: u64,
    pub cycles: u64,
    pub frames_painted: u64,
    pub frames_skipped: u64,
    pub commands_applied: u64,
    pub commands_rejected: u64,
    pub faults: u64,
    pub dirty_published: u64,
    pub dirty_coalesced: u64,
}

impl MetricSnapshot {
    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(LogLevel::Info, target, "runner_metrics", self.as_fields())
    }

    pub fn as_fields(&self) -> LogFields {
        let mut map = LogFields::new();
        map.insert("uptime_ms".to_string(), json!(self.uptime_ms));
        map.insert("wakes".to_string(), json!(self.wakes));
        map.insert("cycles".to_string(), json!(self.cycles));
        map.insert("frames_painted".to_string(), json!(self.frames_painted));
        map.insert("frames_skipped".to_string(), json!(self.frames_skipped));
        map.insert("commands_applied".to_string(), json!(self.commands_applied));
        map.insert("commands_rejected".to_string(), json!(self.commands_rejected));
        map.insert("faults".to_string(), json!(self.faults));
        map.insert("dirty_published".to_string(), json!(self.dirty_published));
        map.insert("dirty_coalesced".to_string(), json!(self.dirty_coalesced));
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_carries_counters_and_bus_stats() {
        let mut metrics = RunnerMetrics::new();
        metrics.record_wake();
        metrics.record_cycle(PaintStats {
            painted: 3,
            skipped: 1,
        });
        metrics.record_command(false);

        let snapshot = metrics.snapshot(
            Duration::from_millis(1500),
            BusStats {
                published: 7,
                coalesced: 5,
            },
        );
        assert_eq!(snapshot.cycles, 1);
        assert_eq!(snapshot.frames_painted, 3);
        assert_eq!(snapshot.commands_rejected, 1);

        let event = snapshot.to_log_event("room_blocks::runner");
        assert_eq!(event.message, "runner_metrics");
        assert_eq!(event.field("dirty_coalesced"), Some(&json!(5)));
        assert_eq!(event.field("uptime_ms"), Some(&json!(1500)));
    }
}
