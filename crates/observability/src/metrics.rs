//! 里程计指标收集模块
//!
//! 基于 `OdometryOutput` 聚合运行统计，并提供流水线级别的指标记录函数。
//! 每帧的计数与速度直方图由 odometer 自身记录。

use std::collections::HashMap;

use contracts::OdometryOutput;
use metrics::{gauge, histogram};

/// 记录单帧处理耗时 (从收到图像对到产出结果)
pub fn record_processing_latency_ms(latency_ms: f64) {
    histogram!("stereo_odom_processing_latency_ms").record(latency_ms);
}

/// 记录阶段间队列深度
pub fn record_queue_depth(stage: &'static str, depth: usize) {
    gauge!("stereo_odom_queue_depth", "stage" => stage).set(depth as f64);
}

/// 里程计指标聚合器
///
/// 在内存中聚合指标，便于运行结束时输出摘要。
#[derive(Debug, Clone, Default)]
pub struct OdometryMetricsAggregator {
    /// 成功输出的帧数
    pub total_outputs: u64,

    /// 携带 odom -> base_link 变换的帧数
    pub outputs_with_transform: u64,

    /// 速度未知的帧数 (首帧 / dt <= 0)
    pub outputs_without_twist: u64,

    /// 按状态统计的失败次数
    pub failure_counts: HashMap<String, u64>,

    /// 帧间隔统计 (毫秒)
    pub dt_stats: RunningStats,

    /// 线速度统计 (m/s)
    pub linear_speed_stats: RunningStats,

    /// 角速度统计 (rad/s)
    pub angular_speed_stats: RunningStats,

    /// 累计路径长度 (米)
    pub path_length: f64,

    last_stamp: Option<f64>,
    last_position: Option<[f64; 3]>,
}

impl OdometryMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一帧成功输出
    pub fn record_output(&mut self, output: &OdometryOutput) {
        self.total_outputs += 1;
        if output.transform.is_some() {
            self.outputs_with_transform += 1;
        }

        let stamp = output.stamp();
        if let Some(last) = self.last_stamp {
            let dt = stamp - last;
            if dt > 0.0 {
                self.dt_stats.push(dt * 1000.0);
            }
        }
        self.last_stamp = Some(stamp);

        match output.odometry.twist {
            Some(twist) => {
                let l = twist.linear;
                let a = twist.angular;
                self.linear_speed_stats
                    .push((l.x * l.x + l.y * l.y + l.z * l.z).sqrt());
                self.angular_speed_stats
                    .push((a.x * a.x + a.y * a.y + a.z * a.z).sqrt());
            }
            None => self.outputs_without_twist += 1,
        }

        let p = output.odometry.pose.position;
        let position = [p.x, p.y, p.z];
        if let Some(last) = self.last_position {
            let d: f64 = position
                .iter()
                .zip(last.iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum();
            self.path_length += d.sqrt();
        }
        self.last_position = Some(position);
    }

    /// 记录一次失败 (状态名，例如 `INSUFFICIENT_INLIERS`)
    pub fn record_failure(&mut self, status: &str) {
        *self.failure_counts.entry(status.to_string()).or_insert(0) += 1;
    }

    /// 失败总数
    pub fn total_failures(&self) -> u64 {
        self.failure_counts.values().sum()
    }

    /// 生成摘要报告
    pub fn summary(&self) -> OdometrySummary {
        let total_failures = self.total_failures();
        let attempted = self.total_outputs + total_failures;
        OdometrySummary {
            total_outputs: self.total_outputs,
            total_failures,
            outputs_with_transform: self.outputs_with_transform,
            outputs_without_twist: self.outputs_without_twist,
            failure_rate: if attempted > 0 {
                total_failures as f64 / attempted as f64 * 100.0
            } else {
                0.0
            },
            frame_dt_ms: StatsSummary::from(&self.dt_stats),
            linear_speed: StatsSummary::from(&self.linear_speed_stats),
            angular_speed: StatsSummary::from(&self.angular_speed_stats),
            path_length: self.path_length,
            final_position: self.last_position,
            failure_counts: self.failure_counts.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct OdometrySummary {
    pub total_outputs: u64,
    pub total_failures: u64,
    pub outputs_with_transform: u64,
    pub outputs_without_twist: u64,
    pub failure_rate: f64,
    pub frame_dt_ms: StatsSummary,
    pub linear_speed: StatsSummary,
    pub angular_speed: StatsSummary,
    pub path_length: f64,
    pub final_position: Option<[f64; 3]>,
    pub failure_counts: HashMap<String, u64>,
}

impl std::fmt::Display for OdometrySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Odometry Summary ===")?;
        writeln!(f, "Outputs: {}", self.total_outputs)?;
        writeln!(
            f,
            "Failures: {} ({:.2}%)",
            self.total_failures, self.failure_rate
        )?;
        writeln!(f, "Outputs with transform: {}", self.outputs_with_transform)?;
        writeln!(f, "Outputs without velocity: {}", self.outputs_without_twist)?;
        writeln!(f, "Frame dt (ms): {}", self.frame_dt_ms)?;
        writeln!(f, "Linear speed (m/s): {}", self.linear_speed)?;
        writeln!(f, "Angular speed (rad/s): {}", self.angular_speed)?;
        writeln!(f, "Path length: {:.3} m", self.path_length)?;
        if let Some([x, y, z]) = self.final_position {
            writeln!(f, "Final position: ({:.3}, {:.3}, {:.3})", x, y, z)?;
        }

        if !self.failure_counts.is_empty() {
            let mut counts: Vec<_> = self.failure_counts.iter().collect();
            counts.sort();
            writeln!(f, "Failures by status:")?;
            for (status, count) in counts {
                writeln!(f, "  {}: {}", status, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        FrameId, Header, Odometry, Pose, PoseStamped, Quaternion, Twist, Vector3,
        COVARIANCE_LEN,
    };

    fn output(sequence: u64, x: f64, twist: Option<Twist>) -> OdometryOutput {
        let stamp = sequence as f64 * 0.1;
        let pose = Pose {
            position: Vector3 { x, y: 0.0, z: 0.0 },
            orientation: Quaternion::default(),
        };
        OdometryOutput {
            sequence,
            odometry: Odometry {
                header: Header {
                    stamp,
                    frame_id: FrameId::from("/odom"),
                },
                child_frame_id: FrameId::from("/base_link"),
                pose,
                twist,
                twist_covariance: vec![0.0; COVARIANCE_LEN],
            },
            pose: PoseStamped {
                header: Header {
                    stamp,
                    frame_id: FrameId::from("/base_link"),
                },
                pose,
            },
            transform: None,
        }
    }

    fn forward(speed: f64) -> Option<Twist> {
        Some(Twist {
            linear: Vector3 {
                x: speed,
                y: 0.0,
                z: 0.0,
            },
            angular: Vector3::default(),
        })
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();

        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_tracks_path_and_speed() {
        let mut aggregator = OdometryMetricsAggregator::new();

        aggregator.record_output(&output(0, 0.0, None));
        aggregator.record_output(&output(1, 0.1, forward(1.0)));
        aggregator.record_failure("INSUFFICIENT_INLIERS");
        aggregator.record_output(&output(3, 0.3, forward(1.0)));

        let summary = aggregator.summary();
        assert_eq!(summary.total_outputs, 3);
        assert_eq!(summary.total_failures, 1);
        assert_eq!(summary.outputs_without_twist, 1);
        assert_eq!(summary.linear_speed.count, 2);
        assert!((summary.linear_speed.mean - 1.0).abs() < 1e-12);
        assert!((summary.path_length - 0.3).abs() < 1e-12);
        assert!((summary.frame_dt_ms.max - 200.0).abs() < 1e-9);
        assert!((summary.failure_rate - 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = OdometryMetricsAggregator::new();
        aggregator.record_output(&output(0, 0.0, None));
        aggregator.record_failure("NO_DATA");

        let text = aggregator.summary().to_string();
        assert!(text.contains("Outputs: 1"));
        assert!(text.contains("50.00%"));
        assert!(text.contains("NO_DATA: 1"));
        assert!(text.contains("Linear speed (m/s): N/A"));
    }

    #[test]
    fn test_reset() {
        let mut aggregator = OdometryMetricsAggregator::new();
        aggregator.record_output(&output(0, 1.0, None));
        aggregator.reset();
        assert_eq!(aggregator.total_outputs, 0);
        assert!(aggregator.summary().final_position.is_none());
    }
}
