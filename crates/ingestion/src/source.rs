//! Unified frame source built from configuration

use std::sync::Arc;

use async_channel::Receiver;
use contracts::{SourceConfig, StereoFrame};
use tracing::{info, instrument};

use crate::config::{BackpressureConfig, DropPolicy, IngestionMetrics};
use crate::error::Result;
use crate::mock::MockStereoSource;
use crate::replay::ReplaySource;

/// Stereo frame source selected by `source.kind`
pub enum FrameSource {
    Mock(MockStereoSource),
    Replay(ReplaySource),
}

impl FrameSource {
    /// Create the source described by the configuration.
    ///
    /// # Errors
    /// Replay sequences that cannot be opened
    #[instrument(name = "frame_source_from_config", skip(config))]
    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        let source = match config {
            SourceConfig::Mock(mock) => Self::Mock(MockStereoSource::new(mock.clone())),
            SourceConfig::Replay(replay) => Self::Replay(ReplaySource::open(replay.clone())?),
        };
        info!(kind = source.kind(), "frame source ready");
        Ok(source)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Mock(_) => "mock",
            Self::Replay(_) => "replay",
        }
    }

    /// Backpressure suited to the source: live sources drop, recordings block
    pub fn default_backpressure(&self) -> BackpressureConfig {
        match self {
            Self::Mock(_) => BackpressureConfig::new(4, DropPolicy::DropNewest),
            Self::Replay(_) => BackpressureConfig::new(4, DropPolicy::Block),
        }
    }

    /// Start producing frames
    pub fn start(
        &self,
        backpressure: BackpressureConfig,
        metrics: Arc<IngestionMetrics>,
    ) -> Receiver<StereoFrame> {
        match self {
            Self::Mock(source) => source.start(backpressure, Some(metrics)),
            Self::Replay(source) => source.start(backpressure, Some(metrics)),
        }
    }

    /// Stop producing frames; the channel closes once drained
    pub fn stop(&self) {
        match self {
            Self::Mock(source) => source.stop(),
            Self::Replay(source) => source.stop(),
        }
    }

    pub fn is_running(&self) -> bool {
        match self {
            Self::Mock(source) => source.is_running(),
            Self::Replay(source) => source.is_running(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{MockSourceConfig, ReplaySourceConfig};

    #[tokio::test]
    async fn test_mock_from_config() {
        let config = SourceConfig::Mock(MockSourceConfig {
            frequency_hz: 500.0,
            frame_count: Some(2),
            ..MockSourceConfig::default()
        });
        let source = FrameSource::from_config(&config).unwrap();
        assert_eq!(source.kind(), "mock");

        let metrics = Arc::new(IngestionMetrics::new());
        let rx = source.start(
            BackpressureConfig::new(4, DropPolicy::Block),
            metrics.clone(),
        );
        let mut count = 0;
        while let Ok(frame) = rx.recv().await {
            assert_eq!(frame.left.width, 640);
            count += 1;
        }
        assert_eq!(count, 2);
    }

    #[test]
    fn test_replay_requires_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let config = SourceConfig::Replay(ReplaySourceConfig {
            path: dir.path().to_path_buf(),
            speed_multiplier: 1.0,
            loop_playback: false,
        });
        assert!(FrameSource::from_config(&config).is_err());
    }
}
