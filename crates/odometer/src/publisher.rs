//! Output adapter.
//!
//! Converts one integration result into the three outward records. All of
//! them come from the same evaluation and carry the same stamp.

use contracts::{
    FrameConfig, FrameId, Header, Odometry, OdometryOutput, Pose, PoseStamped, TransformStamped,
    Twist,
};
use nalgebra::Isometry3;

use crate::integrator::IntegratedMotion;

#[derive(Debug, Clone)]
pub struct OutputAdapter {
    frames: FrameConfig,
}

impl OutputAdapter {
    pub fn new(frames: FrameConfig) -> Self {
        Self { frames }
    }

    /// Build the records for one frame.
    ///
    /// `base_transform` is the pose of the base in the odometry frame; the
    /// transform record is emitted only when it is present.
    pub fn emit(
        &self,
        sequence: u64,
        motion: &IntegratedMotion,
        base_transform: Option<&Isometry3<f64>>,
    ) -> OdometryOutput {
        let pose = Pose::from(motion.pose);

        let odometry = Odometry {
            header: self.header(motion.timestamp, &self.frames.odom_frame_id),
            child_frame_id: self.frames.base_link_frame_id.clone(),
            pose,
            twist: motion.velocity.map(|v| Twist {
                linear: v.linear.into(),
                angular: v.angular.into(),
            }),
            twist_covariance: motion.covariance.to_vec(),
        };

        let pose_stamped = PoseStamped {
            header: self.header(motion.timestamp, &odometry.child_frame_id),
            pose,
        };

        let transform = base_transform.map(|base| TransformStamped {
            header: self.header(motion.timestamp, &self.frames.odom_frame_id),
            child_frame_id: self.frames.base_link_frame_id.clone(),
            transform: Pose::from(*base),
        });

        OdometryOutput {
            sequence,
            odometry,
            pose: pose_stamped,
            transform,
        }
    }

    fn header(&self, stamp: f64, frame_id: &FrameId) -> Header {
        Header {
            stamp,
            frame_id: frame_id.clone(),
        }
    }
}
