//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置到里程计的契约测试
//! - 模拟 e2e 测试 (mock 源 -> 里程计 -> dispatcher)
//! - 录制回放往返测试

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{OutputChannel, SourceConfig};

    const RIG_TOML: &str = r#"
[frames]
odom_frame_id = "/odom"
base_link_frame_id = "/base_link"
sensor_frame_id = "/camera"

[odometer]
publish_tf = true
tf_warn_interval_s = 10.0
[odometer.engine.options]
"feature-window-size" = "9"

[[static_transforms]]
parent = "/base_link"
child = "/camera"
translation = [0.1, 0.0, 0.5]
rotation = [0.0, 0.0, 0.0, 1.0]

[source]
kind = "mock"
frequency_hz = 10.0

[[sinks]]
name = "log"
sink_type = "log"
"#;

    #[test]
    fn test_documented_config_loads() {
        let blueprint = ConfigLoader::load_from_str(RIG_TOML, ConfigFormat::Toml).unwrap();
        assert_eq!(blueprint.version, contracts::ConfigVersion::V1);
        assert_eq!(blueprint.static_transforms.len(), 1);
        assert!(matches!(blueprint.source, SourceConfig::Mock(_)));
        assert_eq!(blueprint.sinks[0].channels, OutputChannel::ALL.to_vec());

        let config = blueprint.to_odometer_config();
        assert_eq!(config.engine_options.get("feature-window-size"), Some("9"));
        assert!(config.publish_tf);
    }

    #[test]
    fn test_config_survives_toml_and_json_round_trip() {
        let blueprint = ConfigLoader::load_from_str(RIG_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&blueprint).unwrap();
        let reparsed = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(reparsed.to_odometer_config(), blueprint.to_odometer_config());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use approx::assert_relative_eq;
    use contracts::{
        MockSourceConfig, Odometry, OdometerBlueprint, OdometryOutput, OutputChannel, SinkConfig,
        SinkType, StaticTransformConfig, StereoFrame,
    };
    use dispatcher::create_dispatcher;
    use ingestion::{BackpressureConfig, DropPolicy, MockStereoSource};
    use observability::OdometryMetricsAggregator;
    use odometer::{MockEngineFactory, StaticTransformBuffer, StereoOdometer};
    use tokio::sync::mpsc;

    const FREQUENCY_HZ: f64 = 20.0;
    const STEP_X: f64 = 0.05;

    fn blueprint(publish_tf: bool) -> OdometerBlueprint {
        let mut blueprint = OdometerBlueprint::default();
        blueprint.odometer.publish_tf = publish_tf;
        blueprint
            .odometer
            .engine
            .options
            .set("mock-step-x", STEP_X.to_string());
        blueprint.static_transforms.push(StaticTransformConfig {
            parent: "/base_link".into(),
            child: "/camera".into(),
            translation: [0.1, 0.0, 0.5],
            rotation: [0.0, 0.0, 0.0, 1.0],
        });
        blueprint
    }

    fn odometer_for(blueprint: &OdometerBlueprint) -> StereoOdometer<MockEngineFactory> {
        let offsets = StaticTransformBuffer::from_configs(&blueprint.static_transforms).unwrap();
        StereoOdometer::new(
            blueprint.to_odometer_config(),
            MockEngineFactory::new(),
            Arc::new(offsets),
        )
    }

    fn mock_source(frame_count: u64) -> MockStereoSource {
        MockStereoSource::new(MockSourceConfig {
            frequency_hz: FREQUENCY_HZ,
            frame_count: Some(frame_count),
            ..MockSourceConfig::default()
        })
    }

    fn file_sink(name: &str, dir: &std::path::Path, channels: Vec<OutputChannel>) -> SinkConfig {
        SinkConfig {
            name: name.to_string(),
            sink_type: SinkType::File,
            queue_capacity: 64,
            channels,
            params: HashMap::from([("base_path".to_string(), dir.display().to_string())]),
        }
    }

    /// Drive `frames` through the odometer, forwarding successes to `tx`
    async fn drive(
        odometer: &mut StereoOdometer<MockEngineFactory>,
        rx: async_channel::Receiver<StereoFrame>,
        tx: &mpsc::Sender<OdometryOutput>,
        aggregator: &mut OdometryMetricsAggregator,
    ) {
        while let Ok(frame) = rx.recv().await {
            match odometer.process(&frame) {
                Ok(output) => {
                    aggregator.record_output(&output);
                    tx.send(output).await.unwrap();
                }
                Err(e) => {
                    assert!(e.is_frame_local(), "unexpected fatal error: {e}");
                    aggregator.record_failure(e.status_label());
                }
            }
        }
    }

    /// End-to-end: MockStereoSource -> StereoOdometer -> Dispatcher (file sink)
    #[tokio::test]
    async fn test_e2e_mock_pipeline_writes_trajectory() {
        let dir = tempfile::tempdir().unwrap();
        let mut blueprint = blueprint(true);
        blueprint
            .sinks
            .push(file_sink("file", dir.path(), OutputChannel::ALL.to_vec()));

        let (tx, rx) = mpsc::channel(64);
        let dispatcher = create_dispatcher(blueprint.sinks.clone(), rx).await.unwrap();
        let dispatcher_handle = dispatcher.spawn();

        let source = mock_source(6);
        let frames_rx = source.start(BackpressureConfig::new(8, DropPolicy::Block), None);

        let mut odometer = odometer_for(&blueprint);
        let mut aggregator = OdometryMetricsAggregator::new();
        tokio::time::timeout(
            Duration::from_secs(5),
            drive(&mut odometer, frames_rx, &tx, &mut aggregator),
        )
        .await
        .expect("pipeline timed out");

        drop(tx);
        let sink_metrics = tokio::time::timeout(Duration::from_secs(2), dispatcher_handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sink_metrics[0].1.write_count, 6);

        let stats = odometer.stats();
        assert_eq!(stats.frames_processed, 6);
        assert_eq!(stats.frames_succeeded, 6);
        assert_eq!(stats.tf_fallbacks, 0);

        // Pure translation: the base frame moves exactly like the camera
        let odometry: Vec<Odometry> = std::fs::read_to_string(dir.path().join("odometry.jsonl"))
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(odometry.len(), 6);
        for (k, record) in odometry.iter().enumerate() {
            assert_eq!(record.header.frame_id, "odom");
            assert_eq!(record.child_frame_id, "base_link");
            assert_relative_eq!(record.header.stamp, k as f64 / FREQUENCY_HZ, epsilon = 1e-12);
        }
        assert!(odometry[0].twist.is_none());
        let twist = odometry[1].twist.unwrap();
        assert_relative_eq!(twist.linear.x, STEP_X * FREQUENCY_HZ, epsilon = 1e-9);
        assert_relative_eq!(twist.angular.z, 0.0);

        let trajectory = std::fs::read_to_string(dir.path().join("trajectory.txt")).unwrap();
        let last: Vec<f64> = trajectory
            .lines()
            .last()
            .unwrap()
            .split(' ')
            .map(|f| f.parse().unwrap())
            .collect();
        assert_relative_eq!(last[1], 6.0 * STEP_X, epsilon = 1e-6);

        let transforms = std::fs::read_to_string(dir.path().join("transform.jsonl")).unwrap();
        assert_eq!(transforms.lines().count(), 6);

        let summary = aggregator.summary();
        assert_eq!(summary.total_outputs, 6);
        assert_relative_eq!(summary.path_length, 5.0 * STEP_X, epsilon = 1e-9);
    }

    /// Transform-only sinks receive nothing when publish_tf is disabled
    #[tokio::test]
    async fn test_e2e_transform_sink_idle_without_publish_tf() {
        let dir = tempfile::tempdir().unwrap();
        let mut blueprint = blueprint(false);
        blueprint
            .sinks
            .push(file_sink("tf", dir.path(), vec![OutputChannel::Transform]));

        let (tx, rx) = mpsc::channel(16);
        let dispatcher_handle = create_dispatcher(blueprint.sinks.clone(), rx)
            .await
            .unwrap()
            .spawn();

        let source = mock_source(4);
        let frames_rx = source.start(BackpressureConfig::new(8, DropPolicy::Block), None);
        let mut odometer = odometer_for(&blueprint);
        let mut aggregator = OdometryMetricsAggregator::new();
        drive(&mut odometer, frames_rx, &tx, &mut aggregator).await;
        drop(tx);

        let sink_metrics = dispatcher_handle.await.unwrap();
        assert_eq!(sink_metrics[0].1.write_count, 0);
        assert_eq!(sink_metrics[0].1.filtered_count, 4);

        let transforms = std::fs::read_to_string(dir.path().join("transform.jsonl")).unwrap();
        assert!(transforms.is_empty());
    }

    /// Periodic engine failures drop frames without resetting the pose
    #[tokio::test]
    async fn test_e2e_engine_failures_are_frame_local() {
        let mut blueprint = blueprint(true);
        blueprint
            .odometer
            .engine
            .options
            .set("mock-failure-every", "3");

        let (tx, mut rx) = mpsc::channel(16);
        let source = mock_source(9);
        let frames_rx = source.start(BackpressureConfig::new(16, DropPolicy::Block), None);
        let mut odometer = odometer_for(&blueprint);
        let mut aggregator = OdometryMetricsAggregator::new();
        drive(&mut odometer, frames_rx, &tx, &mut aggregator).await;
        drop(tx);

        let mut outputs = Vec::new();
        while let Some(output) = rx.recv().await {
            outputs.push(output);
        }

        assert_eq!(outputs.len(), 6);
        assert_eq!(aggregator.total_failures(), 3);
        assert_eq!(
            aggregator.failure_counts.get("INSUFFICIENT_INLIERS"),
            Some(&3)
        );
        assert_eq!(odometer.stats().motion_failures, 3);

        // Sequences 2, 5, 8 failed; the pose keeps growing across the gaps
        let sequences: Vec<u64> = outputs.iter().map(|o| o.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 3, 4, 6, 7]);
        let xs: Vec<f64> = outputs
            .iter()
            .map(|o| o.odometry.pose.position.x)
            .collect();
        for pair in xs.windows(2) {
            assert!(pair[1] > pair[0]);
        }
        assert_relative_eq!(xs[5], 6.0 * STEP_X, epsilon = 1e-9);
    }
}

#[cfg(test)]
mod replay_tests {
    use std::sync::Arc;

    use approx::assert_relative_eq;
    use contracts::{MockSourceConfig, OdometerBlueprint, ReplaySourceConfig, StereoFrame};
    use ingestion::{record_sequence, BackpressureConfig, DropPolicy, MockStereoSource, ReplaySource};
    use odometer::{MockEngineFactory, StaticTransformBuffer, StereoOdometer};

    /// Recorded mock frames replay with identical timestamps and calibration
    #[tokio::test]
    async fn test_replay_round_trip_through_odometer() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockStereoSource::new(MockSourceConfig {
            frequency_hz: 10.0,
            frame_count: Some(4),
            ..MockSourceConfig::default()
        });
        let recorded: Vec<StereoFrame> = (0..4).map(|i| mock.frame(i)).collect();
        record_sequence(dir.path(), &recorded).unwrap();

        let replay = ReplaySource::open(ReplaySourceConfig {
            path: dir.path().to_path_buf(),
            speed_multiplier: 0.0,
            loop_playback: false,
        })
        .unwrap();
        assert_eq!(replay.len(), 4);
        assert_relative_eq!(
            replay.calibration().right.tx,
            recorded[0].right_info.tx,
            epsilon = 1e-9
        );

        let mut odometer = StereoOdometer::new(
            OdometerBlueprint::default().to_odometer_config(),
            MockEngineFactory::new(),
            Arc::new(StaticTransformBuffer::new()),
        );

        let rx = replay.start(BackpressureConfig::new(4, DropPolicy::Block), None);
        let mut stamps = Vec::new();
        while let Ok(frame) = rx.recv().await {
            assert_eq!(frame.left.data, recorded[stamps.len()].left.data);
            let output = odometer.process(&frame).unwrap();
            stamps.push(output.stamp());
        }

        assert_eq!(stamps.len(), recorded.len());
        for (stamp, frame) in stamps.iter().zip(&recorded) {
            assert_relative_eq!(*stamp, frame.timestamp, epsilon = 1e-9);
        }
        // No base_link <- camera transform: every frame falls back
        assert_eq!(odometer.stats().tf_fallbacks, 4);
    }
}
