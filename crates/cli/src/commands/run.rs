//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{error, info, warn};

use contracts::OdometerBlueprint;

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{apply_overrides, Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(&args.config).into());
    }

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    apply_overrides(&mut blueprint, args);
    // Overrides may break invariants the file satisfied
    config_loader::ConfigLoader::validate(&blueprint)
        .context("Configuration invalid after CLI overrides")?;

    info!(
        source = blueprint.source_kind(),
        static_transforms = blueprint.static_transforms.len(),
        sinks = blueprint.sinks.len(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let pipeline_config = PipelineConfig {
        blueprint,
        max_frames: (args.max_frames > 0).then_some(args.max_frames),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        buffer_size: args.buffer_size.max(1),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    };

    info!("Starting pipeline...");

    let stats = Pipeline::new(pipeline_config)
        .run(shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    info!(
        frames = stats.frames_received,
        outputs = stats.outputs_published,
        duration_secs = stats.duration.as_secs_f64(),
        fps = format!("{:.2}", stats.fps()),
        reason = %stats.stop_reason,
        "Pipeline completed"
    );
    stats.print_summary();

    info!("Stereo odometry finished");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    warn!("Received shutdown signal, stopping pipeline...");
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &OdometerBlueprint) {
    let frames = &blueprint.frames;
    println!("\n=== Configuration Summary ===\n");
    println!("Frames:");
    println!("  odom: {}", frames.odom_frame_id);
    println!("  base_link: {}", frames.base_link_frame_id);
    println!("  sensor: {}", frames.sensor_frame_id);

    println!("\nOdometer:");
    println!("  publish_tf: {}", blueprint.odometer.publish_tf);
    println!(
        "  tf warning interval: {}s",
        blueprint.odometer.tf_warn_interval_s
    );
    for (key, value) in blueprint.odometer.engine.options.iter() {
        println!("  {} = {}", key, value);
    }

    println!("\nSource: {}", blueprint.source_kind());

    if !blueprint.static_transforms.is_empty() {
        println!("\nStatic transforms ({}):", blueprint.static_transforms.len());
        for tf in &blueprint.static_transforms {
            println!("  - {} -> {}", tf.parent, tf.child);
        }
    }

    if !blueprint.sinks.is_empty() {
        println!("\nSinks ({}):", blueprint.sinks.len());
        for sink in &blueprint.sinks {
            println!("  - {} ({:?}) {:?}", sink.name, sink.sink_type, sink.channels);
        }
    }

    println!();
}
