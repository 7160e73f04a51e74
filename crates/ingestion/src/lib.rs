//! # Ingestion
//!
//! Stereo frame ingestion module.
//!
//! Responsibilities:
//! - Produce synchronized `StereoFrame`s from a mock generator or a recording
//! - Convert color buffers to mono8
//! - Backpressure management and drop policy
//! - Send to downstream via async-channel
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{FrameSource, IngestionMetrics};
//!
//! let source = FrameSource::from_config(&blueprint.source)?;
//! let rx = source.start(source.default_backpressure(), Arc::new(IngestionMetrics::new()));
//! while let Ok(frame) = rx.recv().await {
//!     // Process stereo pair
//! }
//! ```

mod config;
mod convert;
mod error;
mod mock;
mod replay;
mod source;

// Re-exports
pub use config::{BackpressureConfig, DropPolicy, IngestionMetrics, MetricsSnapshot};
pub use contracts::StereoFrame;
pub use convert::to_mono8;
pub use error::{IngestionError, Result};
pub use mock::MockStereoSource;
pub use replay::{load_image, record_sequence, FrameEntry, RecordedCalibration, ReplaySource};
pub use source::FrameSource;
