//! Backpressure configuration and metrics

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Behaviour when the frame channel is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DropPolicy {
    /// Drop the frame that does not fit (live cameras)
    #[default]
    DropNewest,
    /// Wait for room (recorded data, lossless)
    Block,
}

/// Backpressure configuration
#[derive(Debug, Clone)]
pub struct BackpressureConfig {
    /// Channel capacity
    pub channel_capacity: usize,

    /// Drop policy when full
    pub drop_policy: DropPolicy,
}

impl Default for BackpressureConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 16,
            drop_policy: DropPolicy::DropNewest,
        }
    }
}

impl BackpressureConfig {
    /// Create new backpressure configuration
    pub fn new(channel_capacity: usize, drop_policy: DropPolicy) -> Self {
        Self {
            channel_capacity,
            drop_policy,
        }
    }
}

/// Ingestion metrics
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Frames handed to the channel
    pub frames_emitted: AtomicU64,

    /// Frames dropped because the channel was full
    pub frames_dropped: AtomicU64,

    /// Frames skipped because an image could not be loaded
    pub decode_errors: AtomicU64,

    /// Current queue length
    pub queue_len: AtomicUsize,
}

impl IngestionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record frame emitted
    pub fn record_emitted(&self, source: &'static str) {
        self.frames_emitted.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("stereo_odom_source_frames_total", "source" => source).increment(1);
    }

    /// Record frame dropped
    pub fn record_dropped(&self, source: &'static str) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("stereo_odom_source_dropped_total", "source" => source).increment(1);
    }

    /// Record decode error
    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Update queue length
    pub fn update_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_emitted: self.frames_emitted.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            queue_len: self.queue_len.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Frames handed to the channel
    pub frames_emitted: u64,

    /// Frames dropped because the channel was full
    pub frames_dropped: u64,

    /// Frames skipped because an image could not be loaded
    pub decode_errors: u64,

    /// Current queue length
    pub queue_len: usize,
}
