//! Sensor-to-base frame composition.

use contracts::{FrameConfig, FrameId, FrameOffsetSource, LookupTime};
use nalgebra::Isometry3;
use tracing::{debug, warn};

use crate::throttle::WarnThrottle;

/// Express a pose measured in the sensor frame in the base frame.
///
/// `sensor_to_base` is the pose of the sensor in the base frame; the result
/// is `sensor_to_base * sensor_pose * sensor_to_base⁻¹`.
pub fn compose(sensor_pose: &Isometry3<f64>, sensor_to_base: &Isometry3<f64>) -> Isometry3<f64> {
    sensor_to_base * sensor_pose * sensor_to_base.inverse()
}

/// Resolves the sensor mount offset and composes poses with it.
///
/// An unavailable offset degrades to identity with a throttled warning; it
/// never fails the frame.
#[derive(Debug, Clone)]
pub struct FrameComposer {
    base_frame: FrameId,
    sensor_frame: FrameId,
    throttle: WarnThrottle,
    fallbacks: u64,
}

impl FrameComposer {
    pub fn new(frames: &FrameConfig, warn_interval_s: f64) -> Self {
        Self {
            base_frame: frames.base_link_frame_id.clone(),
            sensor_frame: frames.sensor_frame_id.clone(),
            throttle: WarnThrottle::new(warn_interval_s),
            fallbacks: 0,
        }
    }

    /// Latest sensor-to-base offset, or identity if unavailable.
    pub fn resolve_offset(&mut self, source: &dyn FrameOffsetSource, timestamp: f64) -> Isometry3<f64> {
        let lookup = source
            .can_resolve(&self.base_frame, &self.sensor_frame)
            .and_then(|()| {
                source
                    .resolve(&self.base_frame, &self.sensor_frame, LookupTime::Latest)
                    .map_err(|e| e.to_string())
            });

        match lookup {
            Ok(offset) => offset,
            Err(reason) => {
                self.fallbacks += 1;
                metrics::counter!("stereo_odom_tf_fallback_total").increment(1);
                debug!(
                    base = %self.base_frame,
                    sensor = %self.sensor_frame,
                    %reason,
                    "sensor offset lookup failed"
                );
                if self.throttle.should_emit(timestamp) {
                    warn!(
                        base = %self.base_frame,
                        sensor = %self.sensor_frame,
                        "transform from sensor to base frame unavailable, assuming identity"
                    );
                }
                Isometry3::identity()
            }
        }
    }

    /// Sensor pose expressed in the base frame.
    pub fn to_base(
        &mut self,
        source: &dyn FrameOffsetSource,
        sensor_pose: &Isometry3<f64>,
        timestamp: f64,
    ) -> Isometry3<f64> {
        let offset = self.resolve_offset(source, timestamp);
        compose(sensor_pose, &offset)
    }

    /// Frames that fell back to identity
    pub fn fallback_count(&self) -> u64 {
        self.fallbacks
    }

    /// Fallback warnings swallowed by the throttle
    pub fn suppressed_warnings(&self) -> u64 {
        self.throttle.suppressed()
    }
}
