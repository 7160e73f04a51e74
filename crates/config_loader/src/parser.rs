//! 配置解析：TOML 为主，JSON 可选

use std::path::Path;

use contracts::{ContractError, OdometerBlueprint};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// 由路径扩展名推断格式
    pub fn from_path(path: &Path) -> Result<Self, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse(format!(
                "cannot determine config format of {}",
                path.display()
            ))
        })?;
        Self::from_extension(ext)
            .ok_or_else(|| ContractError::config_parse(format!("unsupported config format: .{ext}")))
    }
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<OdometerBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<OdometerBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<OdometerBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{OutputChannel, SinkType, SourceConfig};

    #[test]
    fn test_parse_toml_minimal() {
        let content = r#"
[frames]
sensor_frame_id = "/stereo/left"

[[static_transforms]]
parent = "/base_link"
child = "/stereo/left"
translation = [0.2, 0.0, 1.1]

[source]
kind = "mock"
frequency_hz = 15.0

[[sinks]]
name = "log_sink"
sink_type = "log"
"#;
        let result = parse_toml(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert_eq!(bp.frames.sensor_frame_id, "stereo/left");
        assert_eq!(bp.frames.odom_frame_id, "odom");
        assert_eq!(bp.static_transforms.len(), 1);
        assert_eq!(bp.static_transforms[0].rotation, [0.0, 0.0, 0.0, 1.0]);
        match &bp.source {
            SourceConfig::Mock(mock) => assert_eq!(mock.frequency_hz, 15.0),
            SourceConfig::Replay(_) => panic!("expected mock source"),
        }
        assert_eq!(bp.sinks[0].sink_type, SinkType::Log);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "odometer": {
                "publish_tf": false,
                "engine": { "options": { "max-pyramid-level": "3" } }
            },
            "source": { "kind": "replay", "path": "/data/run1", "loop_playback": true },
            "sinks": [{ "name": "traj", "sink_type": "file", "channels": ["pose"] }]
        }"#;
        let result = parse_json(content);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let bp = result.unwrap();
        assert!(!bp.odometer.publish_tf);
        assert_eq!(bp.odometer.engine.options.get("max-pyramid-level"), Some("3"));
        assert_eq!(bp.sinks[0].channels, vec![OutputChannel::Pose]);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_unknown_source_kind_rejected() {
        let content = r#"
[source]
kind = "camera_driver"
"#;
        assert!(matches!(
            parse_toml(content),
            Err(ContractError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
        assert!(ConfigFormat::from_path(Path::new("rig")).is_err());
        assert_eq!(
            ConfigFormat::from_path(Path::new("/etc/rig.json")).unwrap(),
            ConfigFormat::Json
        );
    }
}
