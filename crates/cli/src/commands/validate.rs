//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{OdometerBlueprint, OutputChannel};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    source: String,
    odom_frame: String,
    base_link_frame: String,
    sensor_frame: String,
    publish_tf: bool,
    static_transform_count: usize,
    sink_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(summarize(&blueprint)),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

fn summarize(blueprint: &OdometerBlueprint) -> ConfigSummary {
    ConfigSummary {
        version: format!("{:?}", blueprint.version),
        source: blueprint.source_kind().to_string(),
        odom_frame: blueprint.frames.odom_frame_id.to_string(),
        base_link_frame: blueprint.frames.base_link_frame_id.to_string(),
        sensor_frame: blueprint.frames.sensor_frame_id.to_string(),
        publish_tf: blueprint.odometer.publish_tf,
        static_transform_count: blueprint.static_transforms.len(),
        sink_count: blueprint.sinks.len(),
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &OdometerBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();
    let frames = &blueprint.frames;

    if blueprint.sinks.is_empty() {
        warnings.push("No sinks configured - odometry outputs will be dropped".to_string());
    }

    if frames.sensor_frame_id != frames.base_link_frame_id {
        let linked = blueprint.static_transforms.iter().any(|tf| {
            (tf.parent == frames.base_link_frame_id && tf.child == frames.sensor_frame_id)
                || (tf.parent == frames.sensor_frame_id && tf.child == frames.base_link_frame_id)
        });
        if !linked {
            warnings.push(format!(
                "No static transform between '{}' and '{}' - base pose falls back to the camera pose",
                frames.base_link_frame_id, frames.sensor_frame_id
            ));
        }
    }

    if !blueprint.odometer.publish_tf {
        for sink in &blueprint.sinks {
            if sink.channels.contains(&OutputChannel::Transform) {
                warnings.push(format!(
                    "Sink '{}' subscribes to transforms but publish_tf is disabled",
                    sink.name
                ));
            }
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Source: {}", summary.source);
            println!(
                "  Frames: {} -> {} (camera {})",
                summary.odom_frame, summary.base_link_frame, summary.sensor_frame
            );
            println!("  Publish TF: {}", summary.publish_tf);
            println!("  Static transforms: {}", summary.static_transform_count);
            println!("  Sinks: {}", summary.sink_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
