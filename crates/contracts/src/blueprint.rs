//! OdometerBlueprint - Config Loader 输出
//!
//! 描述完整的运行配置：坐标系、里程计参数、静态变换、帧来源、输出路由。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::{CameraInfo, CameraIntrinsics, EngineOptions, FrameConfig, FrameId, OdometerConfig};

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的运行配置蓝图
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OdometerBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 坐标系名称
    #[serde(default)]
    pub frames: FrameConfig,

    /// 里程计参数
    #[serde(default)]
    pub odometer: OdometerSettings,

    /// 静态坐标变换 (传感器安装位姿)
    #[serde(default)]
    pub static_transforms: Vec<StaticTransformConfig>,

    /// 图像帧来源
    #[serde(default)]
    pub source: SourceConfig,

    /// 输出路由配置
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

/// 里程计参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OdometerSettings {
    /// 是否发布 odom -> base_link 变换
    #[serde(default = "default_publish_tf")]
    pub publish_tf: bool,

    /// 变换缺失告警的最小间隔 (秒)
    #[serde(default = "default_tf_warn_interval")]
    pub tf_warn_interval_s: f64,

    /// 引擎参数
    #[serde(default)]
    pub engine: EngineSettings,
}

impl Default for OdometerSettings {
    fn default() -> Self {
        Self {
            publish_tf: default_publish_tf(),
            tf_warn_interval_s: default_tf_warn_interval(),
            engine: EngineSettings::default(),
        }
    }
}

fn default_publish_tf() -> bool {
    true
}

fn default_tf_warn_interval() -> f64 {
    10.0
}

/// 引擎参数 (原样传给引擎)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default)]
    pub options: EngineOptions,
}

/// 静态变换：child 在 parent 中的位姿
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticTransformConfig {
    pub parent: FrameId,
    pub child: FrameId,

    /// 平移 (x, y, z) 单位：米
    #[serde(default)]
    pub translation: [f64; 3],

    /// 旋转四元数 (x, y, z, w)
    #[serde(default = "identity_rotation")]
    pub rotation: [f64; 4],
}

fn identity_rotation() -> [f64; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

/// 图像帧来源
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// 合成图像 (无需相机)
    Mock(MockSourceConfig),
    /// 从录制目录回放
    Replay(ReplaySourceConfig),
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::Mock(MockSourceConfig::default())
    }
}

/// Mock 来源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockSourceConfig {
    /// 帧率 (Hz)，必须 > 0
    #[serde(default = "default_frequency")]
    pub frequency_hz: f64,

    /// 生成帧数上限 (None = 无限)
    #[serde(default)]
    pub frame_count: Option<u64>,

    /// 相机内参 (左右相同)
    #[serde(default = "default_intrinsics")]
    pub intrinsics: CameraIntrinsics,

    /// 基线 (米)
    #[serde(default = "default_baseline")]
    pub baseline: f64,
}

impl Default for MockSourceConfig {
    fn default() -> Self {
        Self {
            frequency_hz: default_frequency(),
            frame_count: None,
            intrinsics: default_intrinsics(),
            baseline: default_baseline(),
        }
    }
}

impl MockSourceConfig {
    /// 左右相机标定记录
    pub fn camera_infos(&self) -> (CameraInfo, CameraInfo) {
        CameraInfo::rectified_pair(self.intrinsics, self.baseline)
    }
}

fn default_frequency() -> f64 {
    10.0
}

fn default_intrinsics() -> CameraIntrinsics {
    CameraIntrinsics {
        fx: 500.0,
        fy: 500.0,
        cx: 320.0,
        cy: 240.0,
        width: 640,
        height: 480,
    }
}

fn default_baseline() -> f64 {
    0.12
}

/// Replay 来源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaySourceConfig {
    /// 录制目录 (包含 frames.jsonl 与 calibration.json)
    pub path: PathBuf,

    /// 回放速度倍率 (1.0 = 原速, 0 = 不限速)
    #[serde(default = "default_speed")]
    pub speed_multiplier: f64,

    /// 是否循环回放
    #[serde(default)]
    pub loop_playback: bool,
}

fn default_speed() -> f64 {
    1.0
}

/// 输出通道
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputChannel {
    /// 位姿 + 速度 + 协方差
    Odometry,
    /// 仅位姿
    Pose,
    /// odom -> base_link 变换
    Transform,
}

impl OutputChannel {
    pub const ALL: [OutputChannel; 3] = [Self::Odometry, Self::Pose, Self::Transform];
}

/// Sink 输出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink 名称
    pub name: String,

    /// Sink 类型
    pub sink_type: SinkType,

    /// 队列容量
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// 订阅的输出通道
    #[serde(default = "default_channels")]
    pub channels: Vec<OutputChannel>,

    /// 类型特定参数
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

fn default_channels() -> Vec<OutputChannel> {
    OutputChannel::ALL.to_vec()
}

/// Sink 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// 日志输出
    Log,
    /// 文件输出
    File,
    /// 网络输出 (UDP)
    Network,
}

impl OdometerBlueprint {
    /// Build the runtime odometer configuration
    pub fn to_odometer_config(&self) -> OdometerConfig {
        OdometerConfig {
            frames: self.frames.clone(),
            publish_tf: self.odometer.publish_tf,
            tf_warn_interval_s: self.odometer.tf_warn_interval_s,
            engine_options: self.odometer.engine.options.clone(),
        }
    }

    /// Human-readable source kind
    pub fn source_kind(&self) -> &'static str {
        match self.source {
            SourceConfig::Mock(_) => "mock",
            SourceConfig::Replay(_) => "replay",
        }
    }
}
