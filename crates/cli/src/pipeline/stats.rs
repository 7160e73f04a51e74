//! Pipeline statistics.

use std::fmt;
use std::time::Duration;

use dispatcher::MetricsSnapshot as SinkSnapshot;
use ingestion::MetricsSnapshot as SourceSnapshot;
use observability::OdometryMetricsAggregator;
use odometer::OdometerStats;

/// Why the processing loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopReason {
    /// Source closed (frame count reached or recording finished)
    #[default]
    SourceExhausted,
    MaxFrames,
    Timeout,
    /// Ctrl-C / SIGTERM
    Signal,
    DispatcherClosed,
    /// Unrecoverable odometer error
    Fatal,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::SourceExhausted => "source exhausted",
            Self::MaxFrames => "max frames reached",
            Self::Timeout => "timeout",
            Self::Signal => "shutdown signal",
            Self::DispatcherClosed => "dispatcher closed",
            Self::Fatal => "fatal error",
        };
        f.write_str(text)
    }
}

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Stereo frames taken from the source
    pub frames_received: u64,

    /// Outputs handed to the dispatcher
    pub outputs_published: u64,

    /// Total duration of the pipeline run
    pub duration: Duration,

    pub stop_reason: StopReason,

    /// `mock` or `replay`
    pub source_kind: &'static str,

    /// Number of configured sinks
    pub active_sinks: usize,

    /// Odometer counters
    pub odometer: OdometerStats,

    /// Frame source counters
    pub source: SourceSnapshot,

    /// Per-sink counters at shutdown
    pub sink_metrics: Vec<(String, SinkSnapshot)>,

    /// Output statistics
    pub odometry: OdometryMetricsAggregator,
}

impl PipelineStats {
    /// Frames processed per second
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.frames_received as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Pipeline Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Stopped by: {}", self.stop_reason);
        println!("   ├─ Frames received: {}", self.frames_received);
        println!("   ├─ Outputs published: {}", self.outputs_published);
        println!("   ├─ FPS: {:.2}", self.fps());
        println!(
            "   ├─ Source: {} (emitted {}, dropped {}, decode errors {})",
            self.source_kind,
            self.source.frames_emitted,
            self.source.frames_dropped,
            self.source.decode_errors
        );
        println!("   └─ Active sinks: {}", self.active_sinks);

        let odom = &self.odometer;
        println!("\n🧭 Odometer");
        println!("   ├─ Processed: {}", odom.frames_processed);
        println!("   ├─ Succeeded: {}", odom.frames_succeeded);
        println!("   ├─ Motion failures: {}", odom.motion_failures);
        println!("   ├─ Format errors: {}", odom.format_errors);
        println!("   └─ Transform fallbacks: {}", odom.tf_fallbacks);

        let summary = self.odometry.summary();
        println!("\n📈 Motion");
        println!("   ├─ Frame dt (ms): {}", summary.frame_dt_ms);
        println!("   ├─ Linear speed (m/s): {}", summary.linear_speed);
        println!("   ├─ Angular speed (rad/s): {}", summary.angular_speed);
        println!("   ├─ Path length: {:.3} m", summary.path_length);
        match summary.final_position {
            Some([x, y, z]) => println!("   └─ Final position: ({:.3}, {:.3}, {:.3})", x, y, z),
            None => println!("   └─ Final position: N/A"),
        }

        if !summary.failure_counts.is_empty() {
            let mut counts: Vec<_> = summary.failure_counts.iter().collect();
            counts.sort();
            println!("\n⚠️  Failures by status");
            for (status, count) in counts {
                println!("   ├─ {}: {}", status, count);
            }
        }

        if !self.sink_metrics.is_empty() {
            println!("\n📤 Sinks");
            for (name, m) in &self.sink_metrics {
                println!("   ├─ {}: {}", name, m);
            }
        }

        println!();
    }
}
