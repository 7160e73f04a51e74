//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{OdometerBlueprint, SourceConfig};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    frames: FramesInfo,
    odometer: OdometerInfo,
    source: SourceInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    static_transforms: Vec<TransformInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct FramesInfo {
    odom: String,
    base_link: String,
    sensor: String,
}

#[derive(Serialize)]
struct OdometerInfo {
    publish_tf: bool,
    tf_warn_interval_s: f64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    engine_options: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct SourceInfo {
    kind: String,
    detail: String,
}

#[derive(Serialize)]
struct TransformInfo {
    parent: String,
    child: String,
    translation: [f64; 3],
    rotation: [f64; 4],
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    channels: Vec<String>,
    queue_capacity: usize,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(&args.config).into());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&blueprint, args);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn describe_source(source: &SourceConfig) -> String {
    match source {
        SourceConfig::Mock(mock) => format!(
            "{} Hz, {}, {}x{} px, baseline {} m",
            mock.frequency_hz,
            mock.frame_count
                .map(|n| format!("{} frames", n))
                .unwrap_or_else(|| "unbounded".to_string()),
            mock.intrinsics.width,
            mock.intrinsics.height,
            mock.baseline
        ),
        SourceConfig::Replay(replay) => format!(
            "{} (x{}{})",
            replay.path.display(),
            replay.speed_multiplier,
            if replay.loop_playback { ", looping" } else { "" }
        ),
    }
}

fn build_config_info(blueprint: &OdometerBlueprint, args: &InfoArgs) -> ConfigInfo {
    let static_transforms = if args.transforms {
        blueprint
            .static_transforms
            .iter()
            .map(|tf| TransformInfo {
                parent: tf.parent.to_string(),
                child: tf.child.to_string(),
                translation: tf.translation,
                rotation: tf.rotation,
            })
            .collect()
    } else {
        Vec::new()
    };

    let sinks = if args.sinks {
        blueprint
            .sinks
            .iter()
            .map(|s| SinkInfo {
                name: s.name.clone(),
                sink_type: format!("{:?}", s.sink_type),
                channels: s.channels.iter().map(|c| format!("{:?}", c)).collect(),
                queue_capacity: s.queue_capacity,
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        frames: FramesInfo {
            odom: blueprint.frames.odom_frame_id.to_string(),
            base_link: blueprint.frames.base_link_frame_id.to_string(),
            sensor: blueprint.frames.sensor_frame_id.to_string(),
        },
        odometer: OdometerInfo {
            publish_tf: blueprint.odometer.publish_tf,
            tf_warn_interval_s: blueprint.odometer.tf_warn_interval_s,
            engine_options: blueprint
                .odometer
                .engine
                .options
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        },
        source: SourceInfo {
            kind: blueprint.source_kind().to_string(),
            detail: describe_source(&blueprint.source),
        },
        static_transforms,
        sinks,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Stereo Odometry Configuration                  ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📍 Frames");
    println!("   ├─ Version: {}", info.version);
    println!("   ├─ Odometry: {}", info.frames.odom);
    println!("   ├─ Base link: {}", info.frames.base_link);
    println!("   └─ Sensor: {}", info.frames.sensor);

    println!("\n⚙️  Odometer");
    println!("   ├─ Publish TF: {}", info.odometer.publish_tf);
    if info.odometer.engine_options.is_empty() {
        println!("   └─ TF warning interval: {}s", info.odometer.tf_warn_interval_s);
    } else {
        println!("   ├─ TF warning interval: {}s", info.odometer.tf_warn_interval_s);
        println!("   └─ Engine options:");
        for (key, value) in &info.odometer.engine_options {
            println!("        {} = {}", key, value);
        }
    }

    println!("\n📷 Source");
    println!("   └─ {}: {}", info.source.kind, info.source.detail);

    if !info.static_transforms.is_empty() {
        println!("\n🔗 Static transforms ({})", info.static_transforms.len());
        for (i, tf) in info.static_transforms.iter().enumerate() {
            let prefix = if i + 1 == info.static_transforms.len() { "└─" } else { "├─" };
            println!(
                "   {} {} -> {} t={:?} q={:?}",
                prefix, tf.parent, tf.child, tf.translation, tf.rotation
            );
        }
    }

    if !info.sinks.is_empty() {
        println!("\n📤 Sinks ({})", info.sinks.len());
        for (i, sink) in info.sinks.iter().enumerate() {
            let prefix = if i + 1 == info.sinks.len() { "└─" } else { "├─" };
            println!(
                "   {} {} ({}) {:?}",
                prefix, sink.name, sink.sink_type, sink.channels
            );
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_config_info_hides_sections_by_default() {
        let mut blueprint = OdometerBlueprint::default();
        blueprint
            .odometer
            .engine
            .options
            .set("max-pyramid-level", "3");
        let args = InfoArgs {
            config: "config.toml".into(),
            json: true,
            transforms: false,
            sinks: false,
        };

        let info = build_config_info(&blueprint, &args);
        assert!(info.static_transforms.is_empty());
        assert_eq!(info.source.kind, "mock");
        assert_eq!(
            info.odometer.engine_options.get("max-pyramid-level").map(String::as_str),
            Some("3")
        );

        let json = serde_json::to_value(&info).unwrap();
        assert!(json.get("sinks").is_none());
        assert_eq!(json["frames"]["odom"], "/odom");
    }

    #[test]
    fn test_describe_mock_source() {
        let text = describe_source(&SourceConfig::default());
        assert!(text.contains("10 Hz"));
        assert!(text.contains("unbounded"));
    }
}
