//! OdometryOutput - Odometer output
//!
//! Outward message shapes. One `OdometryOutput` is produced per successful
//! frame; its three records are derived from the same pipeline evaluation
//! and share one timestamp.

use nalgebra::{Isometry3, Translation3, UnitQuaternion};
use serde::{Deserialize, Serialize};

use crate::FrameId;

/// Number of entries in a 6x6 covariance block
pub const COVARIANCE_LEN: usize = 36;

/// Message header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// Timestamp (seconds)
    pub stamp: f64,
    /// Reference frame
    pub frame_id: FrameId,
}

/// 3D vector
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Orientation quaternion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            w: 1.0,
        }
    }
}

/// Position + orientation
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vector3,
    pub orientation: Quaternion,
}

/// Linear + angular velocity
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Twist {
    /// m/s
    pub linear: Vector3,
    /// rad/s
    pub angular: Vector3,
}

/// Odometry record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Odometry {
    pub header: Header,
    pub child_frame_id: FrameId,
    pub pose: Pose,
    /// `None` when the velocity is unknown (first frame, non-positive dt)
    pub twist: Option<Twist>,
    /// 6x6 row-major covariance over (linear, angular) velocity
    pub twist_covariance: Vec<f64>,
}

/// Pose-only record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseStamped {
    pub header: Header,
    pub pose: Pose,
}

/// Transform-tree record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformStamped {
    pub header: Header,
    pub child_frame_id: FrameId,
    pub transform: Pose,
}

/// Everything emitted for one successful frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OdometryOutput {
    /// Sequence number of the source frame
    pub sequence: u64,
    pub odometry: Odometry,
    pub pose: PoseStamped,
    /// Present only when transform publishing is enabled
    pub transform: Option<TransformStamped>,
}

impl OdometryOutput {
    pub fn stamp(&self) -> f64 {
        self.odometry.header.stamp
    }
}

impl From<nalgebra::Vector3<f64>> for Vector3 {
    fn from(v: nalgebra::Vector3<f64>) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

impl From<Vector3> for nalgebra::Vector3<f64> {
    fn from(v: Vector3) -> Self {
        nalgebra::Vector3::new(v.x, v.y, v.z)
    }
}

impl From<UnitQuaternion<f64>> for Quaternion {
    fn from(q: UnitQuaternion<f64>) -> Self {
        Self {
            x: q.i,
            y: q.j,
            z: q.k,
            w: q.w,
        }
    }
}

impl From<Quaternion> for UnitQuaternion<f64> {
    fn from(q: Quaternion) -> Self {
        UnitQuaternion::from_quaternion(nalgebra::Quaternion::new(q.w, q.x, q.y, q.z))
    }
}

impl From<Isometry3<f64>> for Pose {
    fn from(iso: Isometry3<f64>) -> Self {
        Self {
            position: iso.translation.vector.into(),
            orientation: iso.rotation.into(),
        }
    }
}

impl From<Pose> for Isometry3<f64> {
    fn from(pose: Pose) -> Self {
        let translation: nalgebra::Vector3<f64> = pose.position.into();
        Isometry3::from_parts(Translation3::from(translation), pose.orientation.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pose_isometry_conversion() {
        let iso = Isometry3::new(
            nalgebra::Vector3::new(1.0, -2.0, 0.5),
            nalgebra::Vector3::new(0.0, 0.0, std::f64::consts::FRAC_PI_2),
        );
        let pose = Pose::from(iso);
        assert_relative_eq!(pose.position.x, 1.0);
        assert_relative_eq!(pose.orientation.z, std::f64::consts::FRAC_1_SQRT_2, epsilon = 1e-12);

        let back: Isometry3<f64> = pose.into();
        assert_relative_eq!(back, iso, epsilon = 1e-12);
    }

    #[test]
    fn test_default_quaternion_is_identity() {
        let q: UnitQuaternion<f64> = Quaternion::default().into();
        assert_relative_eq!(q, UnitQuaternion::identity());
    }
}
