//! StereoOdometer: per-frame pipeline.

use std::sync::Arc;

use contracts::{
    ContractError, EngineFactory, FrameOffsetSource, OdometerConfig, OdometryOutput, StereoFrame,
    StereoCalibration,
};
use tracing::{error, instrument, trace, warn};

use crate::composer::FrameComposer;
use crate::gate::EngineGate;
use crate::integrator::{IntegratedMotion, MotionIntegrator};
use crate::publisher::OutputAdapter;

/// Frame counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OdometerStats {
    /// Frames handed to `process`
    pub frames_processed: u64,
    /// Frames that produced output
    pub frames_succeeded: u64,
    /// Frames that produced no output
    pub frames_failed: u64,
    /// Of the failures: image layout mismatches
    pub format_errors: u64,
    /// Of the failures: non-success engine status
    pub motion_failures: u64,
    /// Successful frames composed with an identity fallback offset
    pub tf_fallbacks: u64,
}

/// Stereo visual odometer.
///
/// Frames must be fed in capture order from a single caller. A failed frame
/// leaves the pose, the engine and the last timestamp untouched; check
/// [`ContractError::is_frame_local`] to decide whether to continue.
pub struct StereoOdometer<F: EngineFactory> {
    config: OdometerConfig,
    gate: EngineGate<F>,
    integrator: MotionIntegrator,
    composer: FrameComposer,
    adapter: OutputAdapter,
    offsets: Arc<dyn FrameOffsetSource>,
    stats: OdometerStats,
}

impl<F: EngineFactory> StereoOdometer<F> {
    pub fn new(config: OdometerConfig, factory: F, offsets: Arc<dyn FrameOffsetSource>) -> Self {
        let gate = EngineGate::new(factory, config.engine_options.clone());
        let composer = FrameComposer::new(&config.frames, config.tf_warn_interval_s);
        let adapter = OutputAdapter::new(config.frames.clone());

        Self {
            config,
            gate,
            integrator: MotionIntegrator::new(),
            composer,
            adapter,
            offsets,
            stats: OdometerStats::default(),
        }
    }

    /// Process one synchronized stereo pair.
    ///
    /// # Errors
    /// - `Calibration` / `EngineInit`: the engine could not be built (fatal)
    /// - `FrameFormat` / `MotionEstimation`: this frame is dropped
    #[instrument(
        name = "stereo_odometer_process",
        skip(self, frame),
        fields(sequence = frame.sequence, timestamp = frame.timestamp)
    )]
    pub fn process(&mut self, frame: &StereoFrame) -> Result<OdometryOutput, ContractError> {
        self.stats.frames_processed += 1;

        let motion = match self.integrate(frame) {
            Ok(motion) => motion,
            Err(err) => {
                self.record_failure(frame.sequence, &err);
                return Err(err);
            }
        };

        let base_transform = if self.config.publish_tf {
            let fallbacks_before = self.composer.fallback_count();
            let base = self
                .composer
                .to_base(self.offsets.as_ref(), &motion.pose, motion.timestamp);
            if self.composer.fallback_count() > fallbacks_before {
                self.stats.tf_fallbacks += 1;
            }
            Some(base)
        } else {
            None
        };

        let output = self
            .adapter
            .emit(frame.sequence, &motion, base_transform.as_ref());
        self.record_success(&motion);
        Ok(output)
    }

    fn integrate(&mut self, frame: &StereoFrame) -> Result<IntegratedMotion, ContractError> {
        let engine = self
            .gate
            .ensure_engine(&frame.left_info, &frame.right_info)?;
        self.integrator
            .integrate(engine, &frame.left, &frame.right, frame.timestamp)
    }

    fn record_failure(&mut self, sequence: u64, err: &ContractError) {
        self.stats.frames_failed += 1;
        metrics::counter!("stereo_odom_frames_total", "status" => err.status_label()).increment(1);
        match err {
            ContractError::MotionEstimation { status } => {
                self.stats.motion_failures += 1;
                metrics::counter!("stereo_odom_motion_failures_total", "status" => status.as_str())
                    .increment(1);
                error!(sequence, status = %status, "motion estimation failed, frame dropped");
            }
            ContractError::FrameFormat { message } => {
                self.stats.format_errors += 1;
                metrics::counter!("stereo_odom_frame_format_errors_total").increment(1);
                warn!(sequence, %message, "stereo pair rejected");
            }
            other => {
                warn!(error = %other, "odometer unavailable");
            }
        }
    }

    fn record_success(&mut self, motion: &IntegratedMotion) {
        self.stats.frames_succeeded += 1;
        metrics::counter!("stereo_odom_frames_total", "status" => "SUCCESS").increment(1);

        if let Some(dt) = motion.dt {
            metrics::histogram!("stereo_odom_frame_dt_ms").record(dt * 1000.0);
        }
        if let Some(velocity) = motion.velocity {
            metrics::histogram!("stereo_odom_linear_speed").record(velocity.linear.norm());
            metrics::histogram!("stereo_odom_angular_speed").record(velocity.angular.norm());
        }

        let position = motion.pose.translation.vector;
        metrics::gauge!("stereo_odom_position_x").set(position.x);
        metrics::gauge!("stereo_odom_position_y").set(position.y);
        metrics::gauge!("stereo_odom_position_z").set(position.z);

        trace!(
            x = position.x,
            y = position.y,
            z = position.z,
            has_velocity = motion.velocity.is_some(),
            "pose updated"
        );
    }

    pub fn stats(&self) -> OdometerStats {
        self.stats
    }

    pub fn config(&self) -> &OdometerConfig {
        &self.config
    }

    /// Whether the engine has been constructed
    pub fn is_initialized(&self) -> bool {
        self.gate.is_ready()
    }

    pub fn calibration(&self) -> Option<&StereoCalibration> {
        self.gate.calibration()
    }

    pub fn engine(&self) -> Option<&F::Engine> {
        self.gate.engine()
    }

    /// Timestamp of the last successful frame
    pub fn last_timestamp(&self) -> Option<f64> {
        self.integrator.last_timestamp()
    }
}
