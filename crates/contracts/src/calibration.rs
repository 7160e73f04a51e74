//! Stereo calibration records
//!
//! `CameraInfo` is the raw per-camera record delivered alongside every image
//! pair. `StereoCalibration` is what the odometer derives from the first
//! pair of records and hands to the motion-estimation engine.

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::FrameId;

/// Per-camera calibration record of a rectified stereo pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraInfo {
    /// Optical frame of the camera
    #[serde(default)]
    pub frame_id: FrameId,

    /// Image width (pixels)
    pub width: u32,

    /// Image height (pixels)
    pub height: u32,

    /// Focal length x (pixels)
    pub fx: f64,

    /// Focal length y (pixels)
    pub fy: f64,

    /// Principal point x (pixels)
    pub cx: f64,

    /// Principal point y (pixels)
    pub cy: f64,

    /// Projection matrix entry `P[0][3]`: `-fx * baseline` for the right
    /// camera, 0 for the left camera
    #[serde(default)]
    pub tx: f64,
}

impl CameraInfo {
    /// Build a consistent left/right record pair for a rectified rig.
    pub fn rectified_pair(intrinsics: CameraIntrinsics, baseline: f64) -> (Self, Self) {
        let left = Self {
            frame_id: FrameId::default(),
            width: intrinsics.width,
            height: intrinsics.height,
            fx: intrinsics.fx,
            fy: intrinsics.fy,
            cx: intrinsics.cx,
            cy: intrinsics.cy,
            tx: 0.0,
        };
        let right = Self {
            tx: -intrinsics.fx * baseline,
            ..left.clone()
        };
        (left, right)
    }

    pub fn intrinsics(&self) -> CameraIntrinsics {
        CameraIntrinsics {
            fx: self.fx,
            fy: self.fy,
            cx: self.cx,
            cy: self.cy,
            width: self.width,
            height: self.height,
        }
    }
}

/// Optical parameters of one camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub width: u32,
    pub height: u32,
}

/// Right-to-left camera transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StereoExtrinsics {
    pub rotation: UnitQuaternion<f64>,
    pub translation: Vector3<f64>,
}

/// Rectified stereo calibration consumed by the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StereoCalibration {
    pub left: CameraIntrinsics,
    pub right: CameraIntrinsics,
    pub extrinsics: StereoExtrinsics,
    /// Distance between the camera centers (meters)
    pub baseline: f64,
}
