//! Motion integrator.
//!
//! Feeds one image pair to the engine and turns its output into pose,
//! velocity and covariance for the frame.

use contracts::{ContractError, MonoImage, MotionEngine, PixelEncoding, COVARIANCE_LEN};
use nalgebra::{Isometry3, Matrix6, Vector3};
use tracing::{debug, instrument};

/// Velocity derived from the incremental motion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity {
    /// m/s
    pub linear: Vector3<f64>,
    /// rad/s
    pub angular: Vector3<f64>,
}

/// Result of one successful integration step
#[derive(Debug, Clone, PartialEq)]
pub struct IntegratedMotion {
    pub timestamp: f64,
    /// Absolute sensor pose since engine construction
    pub pose: Isometry3<f64>,
    /// Motion since the previous frame
    pub motion: Isometry3<f64>,
    /// Time since the previous successful frame
    pub dt: Option<f64>,
    /// `None` on the first success or when `dt <= 0`
    pub velocity: Option<Velocity>,
    /// Outward row-major layout, see [`reindex_covariance`]
    pub covariance: [f64; COVARIANCE_LEN],
}

/// Tracks the timestamp of the last successful frame.
#[derive(Debug, Clone, Default)]
pub struct MotionIntegrator {
    last_timestamp: Option<f64>,
}

impl MotionIntegrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timestamp of the last successful frame
    pub fn last_timestamp(&self) -> Option<f64> {
        self.last_timestamp
    }

    /// Run the engine on one pair.
    ///
    /// # Errors
    /// - `FrameFormat` if the pair does not fit the engine's buffer layout
    /// - `MotionEstimation` if the engine reports anything but success;
    ///   the last timestamp is left untouched
    #[instrument(name = "motion_integrate", level = "debug", skip(self, engine, left, right))]
    pub fn integrate<E: MotionEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        left: &MonoImage,
        right: &MonoImage,
        timestamp: f64,
    ) -> Result<IntegratedMotion, ContractError> {
        validate_pair(left, right)?;

        engine.set_secondary_image(right);
        let status = engine.process_primary_image(left);
        if !status.is_success() {
            return Err(ContractError::MotionEstimation { status });
        }

        let pose = engine.pose();
        let motion = engine.motion_estimate();
        let covariance = reindex_covariance(&engine.motion_covariance());

        let dt = self.last_timestamp.map(|last| timestamp - last);
        let velocity = match dt {
            Some(dt) if dt > 0.0 => Some(velocity_from(&motion, dt)),
            Some(dt) => {
                debug!(dt, "non-positive frame interval, velocity unavailable");
                None
            }
            None => None,
        };
        self.last_timestamp = Some(timestamp);

        Ok(IntegratedMotion {
            timestamp,
            pose,
            motion,
            dt,
            velocity,
            covariance,
        })
    }
}

fn velocity_from(motion: &Isometry3<f64>, dt: f64) -> Velocity {
    Velocity {
        linear: motion.translation.vector / dt,
        angular: motion.rotation.scaled_axis() / dt,
    }
}

/// Lay the engine covariance out for publication.
///
/// Outward index `j * 6 + i` receives source element `(i, j)`, so the
/// published row-major block is the transpose of the engine's matrix.
pub fn reindex_covariance(source: &Matrix6<f64>) -> [f64; COVARIANCE_LEN] {
    let mut out = [0.0; COVARIANCE_LEN];
    for i in 0..6 {
        for j in 0..6 {
            out[j * 6 + i] = source[(i, j)];
        }
    }
    out
}

/// Check that a pair matches the engine's mono8 buffer layout.
///
/// # Errors
/// `FrameFormat` describing the first mismatch found
pub fn validate_pair(left: &MonoImage, right: &MonoImage) -> Result<(), ContractError> {
    validate_image("left", left)?;
    validate_image("right", right)?;

    if (left.width, left.height, left.step) != (right.width, right.height, right.step) {
        return Err(ContractError::frame_format(format!(
            "left {}x{} (step {}) and right {}x{} (step {}) differ",
            left.width, left.height, left.step, right.width, right.height, right.step
        )));
    }
    Ok(())
}

fn validate_image(side: &str, image: &MonoImage) -> Result<(), ContractError> {
    if image.encoding != PixelEncoding::Mono8 {
        return Err(ContractError::frame_format(format!(
            "{side} image encoding is {:?}, expected mono8",
            image.encoding
        )));
    }
    if image.width == 0 || image.height == 0 {
        return Err(ContractError::frame_format(format!(
            "{side} image is empty ({}x{})",
            image.width, image.height
        )));
    }
    if image.step != image.width {
        return Err(ContractError::frame_format(format!(
            "{side} image step {} != width {}",
            image.step, image.width
        )));
    }

    let required = image.step as usize * image.height as usize;
    if image.data.len() < required {
        return Err(ContractError::frame_format(format!(
            "{side} image buffer holds {} bytes, needs {required}",
            image.data.len()
        )));
    }
    Ok(())
}
