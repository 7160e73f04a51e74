//! Stereo calibration builder.
//!
//! Derives the engine calibration from the first pair of camera records.
//! The right camera's projection entry encodes the baseline as
//! `tx = -fx * baseline`.

use contracts::{CameraInfo, CameraIntrinsics, ContractError, StereoCalibration, StereoExtrinsics};
use nalgebra::{UnitQuaternion, Vector3};

/// Build a rectified stereo calibration from the left/right records.
///
/// Extrinsics are identity rotation and translation `(-baseline, 0, 0)`.
///
/// # Errors
/// `Calibration` if a camera has zero dimensions or non-finite intrinsics,
/// or the derived baseline is not finite.
pub fn build(left: &CameraInfo, right: &CameraInfo) -> Result<StereoCalibration, ContractError> {
    let left_intrinsics = checked_intrinsics("left", left)?;
    let right_intrinsics = checked_intrinsics("right", right)?;

    let baseline = -right.tx / right.fx;
    if !baseline.is_finite() {
        return Err(ContractError::calibration(
            "right",
            format!(
                "baseline is not finite (tx = {}, fx = {})",
                right.tx, right.fx
            ),
        ));
    }

    Ok(StereoCalibration {
        left: left_intrinsics,
        right: right_intrinsics,
        extrinsics: StereoExtrinsics {
            rotation: UnitQuaternion::identity(),
            translation: Vector3::new(-baseline, 0.0, 0.0),
        },
        baseline,
    })
}

/// Whether two records describe the same camera geometry.
pub(crate) fn same_geometry(a: &CameraInfo, b: &CameraInfo) -> bool {
    a.intrinsics() == b.intrinsics() && a.tx == b.tx
}

fn checked_intrinsics(camera: &str, info: &CameraInfo) -> Result<CameraIntrinsics, ContractError> {
    if info.width == 0 || info.height == 0 {
        return Err(ContractError::calibration(
            camera,
            format!("image dimensions must be > 0, got {}x{}", info.width, info.height),
        ));
    }

    let values = [
        ("fx", info.fx),
        ("fy", info.fy),
        ("cx", info.cx),
        ("cy", info.cy),
        ("tx", info.tx),
    ];
    if let Some((name, value)) = values.iter().find(|(_, v)| !v.is_finite()) {
        return Err(ContractError::calibration(
            camera,
            format!("{name} is not finite ({value})"),
        ));
    }

    Ok(info.intrinsics())
}
