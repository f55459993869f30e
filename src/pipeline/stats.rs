use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters shared by the gate and the analyzer of one session.
#[derive(Debug, Default)]
pub struct PipelineStats {
    frames_delivered: AtomicU64,
    frames_dropped: AtomicU64,
    frames_malformed: AtomicU64,
    decodes_succeeded: AtomicU64,
    decodes_failed: AtomicU64,
    decode_time_us: AtomicU64,
    updates_published: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatsSnapshot {
    pub frames_delivered: u64,
    pub frames_dropped: u64,
    pub frames_malformed: u64,
    pub decodes_succeeded: u64,
    pub decodes_failed: u64,
    pub average_decode_us: u64,
    pub updates_published: u64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_delivered(&self) {
        self.frames_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.frames_malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode(&self, succeeded: bool, elapsed: Duration) {
        if succeeded {
            self.decodes_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.decodes_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.decode_time_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_update(&self) {
        self.updates_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let decodes_succeeded = self.decodes_succeeded.load(Ordering::Relaxed);
        let decodes_failed = self.decodes_failed.load(Ordering::Relaxed);
        let decodes = decodes_succeeded + decodes_failed;
        StatsSnapshot {
            frames_delivered: self.frames_delivered.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            frames_malformed: self.frames_malformed.load(Ordering::Relaxed),
            decodes_succeeded,
            decodes_failed,
            average_decode_us: self
                .decode_time_us
                .load(Ordering::Relaxed)
                .checked_div(decodes)
                .unwrap_or(0),
            updates_published: self.updates_published.load(Ordering::Relaxed),
        }
    }
}
