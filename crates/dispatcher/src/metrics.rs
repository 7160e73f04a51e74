//! 每个 sink 的投递统计
//!
//! 生产侧 (`SinkHandle::try_send`) 记录入队结果，worker 侧记录写入结果，
//! 两侧只通过原子计数共享状态。

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Result of offering one output to a sink queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Queued for the worker
    Queued,
    /// None of the sink's channels had a record in this output
    Filtered,
    /// Queue at capacity; output discarded
    Dropped,
    /// Worker already gone
    Closed,
}

impl SendOutcome {
    pub fn is_queued(self) -> bool {
        self == Self::Queued
    }
}

#[derive(Debug, Default)]
pub struct SinkMetrics {
    queue_len: AtomicUsize,
    written: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
    filtered: AtomicU64,
}

impl SinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 生产侧：记录一次入队尝试
    pub fn record_offer(&self, outcome: SendOutcome, queue_len: usize) {
        match outcome {
            SendOutcome::Queued => self.queue_len.store(queue_len, Ordering::Relaxed),
            SendOutcome::Filtered => {
                self.filtered.fetch_add(1, Ordering::Relaxed);
            }
            SendOutcome::Dropped => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            SendOutcome::Closed => {}
        }
    }

    /// worker 侧：记录一次写入结果
    pub fn record_write(&self, ok: bool, queue_len: usize) {
        self.queue_len.store(queue_len, Ordering::Relaxed);
        let counter = if ok { &self.written } else { &self.failed };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn write_count(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    pub fn failure_count(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn filtered_count(&self) -> u64 {
        self.filtered.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len(),
            write_count: self.write_count(),
            failure_count: self.failure_count(),
            dropped_count: self.dropped_count(),
            filtered_count: self.filtered_count(),
        }
    }
}

/// Point-in-time copy of [`SinkMetrics`], used in run summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub write_count: u64,
    pub failure_count: u64,
    pub dropped_count: u64,
    pub filtered_count: u64,
}

impl MetricsSnapshot {
    /// Outputs the sink was responsible for (everything not filtered out)
    pub fn offered(&self) -> u64 {
        self.write_count + self.failure_count + self.dropped_count
    }

    /// Fraction of offered outputs that reached the sink; 1.0 when nothing was offered
    pub fn delivery_ratio(&self) -> f64 {
        match self.offered() {
            0 => 1.0,
            n => self.write_count as f64 / n as f64,
        }
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "written {}, failed {}, dropped {}, filtered {} ({:.1}% delivered)",
            self.write_count,
            self.failure_count,
            self.dropped_count,
            self.filtered_count,
            self.delivery_ratio() * 100.0
        )
    }
}
