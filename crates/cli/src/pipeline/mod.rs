//! Pipeline orchestration module.

mod orchestrator;
mod stats;

pub use orchestrator::{apply_overrides, Pipeline, PipelineConfig};
pub use stats::{PipelineStats, StopReason};
