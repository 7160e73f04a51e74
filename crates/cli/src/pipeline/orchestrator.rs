//! Pipeline orchestrator - frame source → odometer → dispatcher.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{FrameId, OdometerBlueprint, OdometryOutput};
use ingestion::{FrameSource, IngestionMetrics};
use observability::{record_processing_latency_ms, record_queue_depth};
use odometer::{MockEngineFactory, StaticTransformBuffer, StereoOdometer};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::{PipelineStats, StopReason};
use crate::cli::RunArgs;
use crate::error::CliError;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The run configuration
    pub blueprint: OdometerBlueprint,

    /// Maximum number of stereo frames to process (None = unlimited)
    pub max_frames: Option<u64>,

    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Channel buffer size between odometer and dispatcher
    pub buffer_size: usize,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Apply command-line overrides to a loaded blueprint
pub fn apply_overrides(blueprint: &mut OdometerBlueprint, args: &RunArgs) {
    if let Some(publish_tf) = args.publish_tf {
        info!(publish_tf, "Overriding publish_tf from CLI");
        blueprint.odometer.publish_tf = publish_tf;
    }
    let frames = &mut blueprint.frames;
    for (value, slot) in [
        (&args.odom_frame, &mut frames.odom_frame_id),
        (&args.base_link_frame, &mut frames.base_link_frame_id),
        (&args.sensor_frame, &mut frames.sensor_frame_id),
    ] {
        if let Some(name) = value {
            info!(from = %slot, to = %name, "Overriding frame id from CLI");
            *slot = FrameId::from(name.as_str());
        }
    }
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a new pipeline with the given configuration
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline until the source is exhausted, a limit is reached,
    /// `shutdown` resolves, or the odometer fails unrecoverably.
    pub async fn run<S>(self, shutdown: S) -> Result<PipelineStats>
    where
        S: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        if let Some(port) = self.config.metrics_port {
            let addr = observability::init_metrics(port)?;
            info!(%addr, "Metrics endpoint available");
        }

        // Odometer
        let offsets = StaticTransformBuffer::from_configs(&blueprint.static_transforms)
            .map_err(|e| CliError::setup("static transforms", e))?;
        info!(static_transforms = offsets.len(), "Transform buffer ready");

        let odometer_config = blueprint.to_odometer_config();
        info!(
            odom = %odometer_config.frames.odom_frame_id,
            base_link = %odometer_config.frames.base_link_frame_id,
            sensor = %odometer_config.frames.sensor_frame_id,
            publish_tf = odometer_config.publish_tf,
            "Odometer configured"
        );
        let mut odometer =
            StereoOdometer::new(odometer_config, MockEngineFactory::new(), Arc::new(offsets));

        // Frame source
        let source = FrameSource::from_config(&blueprint.source)
            .map_err(|e| CliError::setup("frame source", e))?;
        let source_metrics = Arc::new(IngestionMetrics::new());

        // Dispatcher
        let (output_tx, output_rx) = mpsc::channel::<OdometryOutput>(self.config.buffer_size);
        if blueprint.sinks.is_empty() {
            warn!("No sinks configured - odometry outputs will be dropped");
        }
        let dispatcher = dispatcher::create_dispatcher(blueprint.sinks.clone(), output_rx)
            .await
            .context("Failed to create dispatcher")?;
        let dispatcher_handle = dispatcher.spawn();

        let mut stats = PipelineStats {
            source_kind: source.kind(),
            active_sinks: blueprint.sinks.len(),
            ..Default::default()
        };

        let frames_rx = source.start(source.default_backpressure(), Arc::clone(&source_metrics));
        info!(
            source = source.kind(),
            max_frames = ?self.config.max_frames,
            "Pipeline running"
        );

        let deadline = async {
            match self.config.timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(shutdown);
        tokio::pin!(deadline);

        let mut fatal: Option<CliError> = None;

        let reason = loop {
            let frame = tokio::select! {
                biased;
                _ = &mut shutdown => break StopReason::Signal,
                _ = &mut deadline => break StopReason::Timeout,
                frame = frames_rx.recv() => match frame {
                    Ok(frame) => frame,
                    Err(_) => break StopReason::SourceExhausted,
                },
            };

            stats.frames_received += 1;
            record_queue_depth("frames", frames_rx.len());
            let started = Instant::now();

            match odometer.process(&frame) {
                Ok(output) => {
                    record_processing_latency_ms(started.elapsed().as_secs_f64() * 1000.0);
                    stats.odometry.record_output(&output);
                    debug!(
                        sequence = output.sequence,
                        stamp = output.stamp(),
                        x = output.odometry.pose.position.x,
                        y = output.odometry.pose.position.y,
                        z = output.odometry.pose.position.z,
                        "Odometry output produced"
                    );
                    if output_tx.send(output).await.is_err() {
                        warn!("Dispatcher channel closed");
                        break StopReason::DispatcherClosed;
                    }
                    stats.outputs_published += 1;
                }
                Err(e) if e.is_frame_local() => {
                    stats.odometry.record_failure(e.status_label());
                }
                Err(e) => {
                    error!(error = %e, sequence = frame.sequence, "Odometer failed");
                    fatal = Some(CliError::Odometer {
                        sequence: frame.sequence,
                        source: e,
                    });
                    break StopReason::Fatal;
                }
            }

            if let Some(max) = self.config.max_frames {
                if stats.frames_received >= max {
                    info!(frames = stats.frames_received, "Reached max frames limit");
                    break StopReason::MaxFrames;
                }
            }
        };

        info!(reason = %reason, "Shutting down pipeline...");
        source.stop();
        drop(frames_rx);
        drop(output_tx);

        // Wait for sinks to flush
        match tokio::time::timeout(Duration::from_secs(5), dispatcher_handle).await {
            Ok(Ok(sink_metrics)) => stats.sink_metrics = sink_metrics,
            Ok(Err(e)) => warn!(error = %e, "Dispatcher task failed"),
            Err(_) => warn!("Dispatcher did not finish within 5s"),
        }

        stats.stop_reason = reason;
        stats.odometer = odometer.stats();
        stats.source = source_metrics.snapshot();
        stats.duration = start_time.elapsed();

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            fps = format!("{:.2}", stats.fps()),
            "Pipeline shutdown complete"
        );

        match fatal {
            Some(err) => Err(err.into()),
            None => Ok(stats),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        MockSourceConfig, OutputChannel, SinkConfig, SinkType, SourceConfig,
        StaticTransformConfig,
    };
    use std::collections::HashMap;

    fn mock_blueprint(frame_count: u64) -> OdometerBlueprint {
        OdometerBlueprint {
            source: SourceConfig::Mock(MockSourceConfig {
                frequency_hz: 200.0,
                frame_count: Some(frame_count),
                ..MockSourceConfig::default()
            }),
            ..OdometerBlueprint::default()
        }
    }

    fn config(blueprint: OdometerBlueprint) -> PipelineConfig {
        PipelineConfig {
            blueprint,
            max_frames: None,
            timeout: Some(Duration::from_secs(10)),
            buffer_size: 16,
            metrics_port: None,
        }
    }

    #[tokio::test]
    async fn test_pipeline_runs_mock_source_to_completion() {
        let dir = tempfile::tempdir().unwrap();
        let mut blueprint = mock_blueprint(5);
        blueprint.static_transforms.push(StaticTransformConfig {
            parent: "/base_link".into(),
            child: "/camera".into(),
            translation: [0.2, 0.0, 0.5],
            rotation: [0.0, 0.0, 0.0, 1.0],
        });
        blueprint.sinks.push(SinkConfig {
            name: "file".to_string(),
            sink_type: SinkType::File,
            queue_capacity: 16,
            channels: OutputChannel::ALL.to_vec(),
            params: HashMap::from([(
                "base_path".to_string(),
                dir.path().display().to_string(),
            )]),
        });

        let stats = Pipeline::new(config(blueprint))
            .run(std::future::pending())
            .await
            .unwrap();

        assert_eq!(stats.stop_reason, StopReason::SourceExhausted);
        assert_eq!(stats.frames_received + stats.source.frames_dropped, 5);
        assert!(stats.outputs_published > 0);
        assert_eq!(stats.outputs_published, stats.odometer.frames_succeeded);
        assert_eq!(stats.odometer.tf_fallbacks, 0);
        assert_eq!(stats.sink_metrics.len(), 1);

        let trajectory = std::fs::read_to_string(dir.path().join("trajectory.txt")).unwrap();
        assert_eq!(trajectory.lines().count() as u64, stats.outputs_published);
    }

    #[tokio::test]
    async fn test_pipeline_honors_max_frames() {
        let mut pipeline_config = config(mock_blueprint(50));
        pipeline_config.max_frames = Some(3);

        let stats = Pipeline::new(pipeline_config)
            .run(std::future::pending())
            .await
            .unwrap();

        assert_eq!(stats.stop_reason, StopReason::MaxFrames);
        assert_eq!(stats.frames_received, 3);
    }

    #[tokio::test]
    async fn test_pipeline_stops_on_shutdown_signal() {
        let stats = Pipeline::new(config(OdometerBlueprint::default()))
            .run(tokio::time::sleep(Duration::from_millis(50)))
            .await
            .unwrap();

        assert_eq!(stats.stop_reason, StopReason::Signal);
    }

    #[tokio::test]
    async fn test_pipeline_rejects_invalid_static_transform() {
        let mut blueprint = mock_blueprint(1);
        blueprint.static_transforms.push(StaticTransformConfig {
            parent: "/base_link".into(),
            child: "/camera".into(),
            translation: [0.0; 3],
            rotation: [0.0; 4],
        });

        let result = Pipeline::new(config(blueprint))
            .run(std::future::pending())
            .await;
        let err = result.err().unwrap();
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::Setup { stage: "static transforms", .. })
        ));
    }

    #[test]
    fn test_apply_overrides() {
        let mut blueprint = OdometerBlueprint::default();
        let args = RunArgs {
            config: "config.toml".into(),
            publish_tf: Some(false),
            odom_frame: Some("/world".to_string()),
            base_link_frame: None,
            sensor_frame: Some("stereo".to_string()),
            max_frames: 0,
            timeout: 0,
            dry_run: false,
            buffer_size: 100,
            metrics_port: 0,
        };

        apply_overrides(&mut blueprint, &args);

        assert!(!blueprint.odometer.publish_tf);
        assert_eq!(blueprint.frames.odom_frame_id, "world");
        assert_eq!(blueprint.frames.base_link_frame_id, "base_link");
        assert_eq!(blueprint.frames.sensor_frame_id, "/stereo");
    }
}
