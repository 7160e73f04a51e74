//! Odometer configuration contracts that can be shared across crates.

use serde::{Deserialize, Serialize};

use crate::{EngineOptions, FrameId};

/// Runtime odometer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OdometerConfig {
    /// Frame names
    #[serde(default)]
    pub frames: FrameConfig,

    /// Compose the sensor pose into the base frame and emit a transform
    #[serde(default = "default_publish_tf")]
    pub publish_tf: bool,

    /// Minimum spacing (seconds of frame time) between repeated warnings
    /// about an unavailable sensor-to-base offset
    #[serde(default = "default_tf_warn_interval")]
    pub tf_warn_interval_s: f64,

    /// Fixed options handed to the engine at construction
    #[serde(default)]
    pub engine_options: EngineOptions,
}

impl Default for OdometerConfig {
    fn default() -> Self {
        Self {
            frames: FrameConfig::default(),
            publish_tf: default_publish_tf(),
            tf_warn_interval_s: default_tf_warn_interval(),
            engine_options: EngineOptions::default(),
        }
    }
}

/// Coordinate frame names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameConfig {
    /// Odometry origin (parent of the published transform)
    #[serde(default = "default_odom_frame")]
    pub odom_frame_id: FrameId,

    /// Robot base (child of the published transform)
    #[serde(default = "default_base_link_frame")]
    pub base_link_frame_id: FrameId,

    /// Camera mount point
    #[serde(default = "default_sensor_frame")]
    pub sensor_frame_id: FrameId,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            odom_frame_id: default_odom_frame(),
            base_link_frame_id: default_base_link_frame(),
            sensor_frame_id: default_sensor_frame(),
        }
    }
}

fn default_publish_tf() -> bool {
    true
}

fn default_tf_warn_interval() -> f64 {
    10.0
}

fn default_odom_frame() -> FrameId {
    "/odom".into()
}

fn default_base_link_frame() -> FrameId {
    "/base_link".into()
}

fn default_sensor_frame() -> FrameId {
    "/camera".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OdometerConfig::default();
        assert_eq!(config.frames.odom_frame_id.as_str(), "/odom");
        assert_eq!(config.frames.base_link_frame_id.as_str(), "/base_link");
        assert_eq!(config.frames.sensor_frame_id.as_str(), "/camera");
        assert!(config.publish_tf);
        assert_eq!(config.tf_warn_interval_s, 10.0);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: OdometerConfig = serde_json::from_str(r#"{ "publish_tf": false }"#).unwrap();
        assert!(!config.publish_tf);
        assert_eq!(config.frames, FrameConfig::default());
    }
}
