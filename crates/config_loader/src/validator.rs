//! 配置校验模块
//!
//! 校验规则：
//! - 坐标系名称非空且互不相同
//! - tf_warn_interval_s > 0
//! - 静态变换数值有限、四元数非零、(parent, child) 不重复
//! - 帧来源参数合法 (frequency_hz > 0, 标定尺寸 > 0, baseline > 0, replay 路径非空)
//! - sink 名称非空且唯一，通道列表非空

use std::collections::HashSet;

use contracts::{ContractError, OdometerBlueprint, SourceConfig};

/// 校验 OdometerBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &OdometerBlueprint) -> Result<(), ContractError> {
    validate_frames(blueprint)?;
    validate_odometer(blueprint)?;
    validate_static_transforms(blueprint)?;
    validate_source(blueprint)?;
    validate_sinks(blueprint)?;
    Ok(())
}

/// 校验坐标系名称
fn validate_frames(blueprint: &OdometerBlueprint) -> Result<(), ContractError> {
    let frames = &blueprint.frames;
    let named = [
        ("frames.odom_frame_id", &frames.odom_frame_id),
        ("frames.base_link_frame_id", &frames.base_link_frame_id),
        ("frames.sensor_frame_id", &frames.sensor_frame_id),
    ];

    for (field, id) in named {
        if id.is_empty() {
            return Err(ContractError::config_validation(
                field,
                "frame id cannot be empty",
            ));
        }
    }

    if frames.odom_frame_id == frames.base_link_frame_id {
        return Err(ContractError::config_validation(
            "frames.base_link_frame_id",
            format!(
                "base_link_frame_id must differ from odom_frame_id ('{}')",
                frames.odom_frame_id
            ),
        ));
    }

    // sensor == base_link 合法：相当于单位安装变换
    if frames.sensor_frame_id == frames.odom_frame_id {
        return Err(ContractError::config_validation(
            "frames.sensor_frame_id",
            format!(
                "sensor_frame_id must differ from odom_frame_id ('{}')",
                frames.odom_frame_id
            ),
        ));
    }

    Ok(())
}

/// 校验里程计参数
fn validate_odometer(blueprint: &OdometerBlueprint) -> Result<(), ContractError> {
    let interval = blueprint.odometer.tf_warn_interval_s;
    if !(interval.is_finite() && interval > 0.0) {
        return Err(ContractError::config_validation(
            "odometer.tf_warn_interval_s",
            format!("tf_warn_interval_s must be > 0, got {interval}"),
        ));
    }
    Ok(())
}

/// 校验静态变换
fn validate_static_transforms(blueprint: &OdometerBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, transform) in blueprint.static_transforms.iter().enumerate() {
        if transform.parent.is_empty() || transform.child.is_empty() {
            return Err(ContractError::config_validation(
                format!("static_transforms[{idx}]"),
                "parent and child cannot be empty",
            ));
        }

        if transform.parent == transform.child {
            return Err(ContractError::config_validation(
                format!("static_transforms[{idx}]"),
                format!("parent and child are the same frame '{}'", transform.parent),
            ));
        }

        let mut values = transform
            .translation
            .iter()
            .chain(transform.rotation.iter());
        if values.any(|v| !v.is_finite()) {
            return Err(ContractError::config_validation(
                format!("static_transforms[{idx}]"),
                "translation and rotation must be finite",
            ));
        }

        let norm_sq: f64 = transform.rotation.iter().map(|v| v * v).sum();
        if norm_sq < 1e-12 {
            return Err(ContractError::config_validation(
                format!("static_transforms[{idx}].rotation"),
                "rotation quaternion must be non-zero",
            ));
        }

        if !seen.insert((transform.parent.clone(), transform.child.clone())) {
            return Err(ContractError::config_validation(
                format!(
                    "static_transforms[{}->{}]",
                    transform.parent, transform.child
                ),
                "duplicate static transform",
            ));
        }
    }
    Ok(())
}

/// 校验帧来源
fn validate_source(blueprint: &OdometerBlueprint) -> Result<(), ContractError> {
    match &blueprint.source {
        SourceConfig::Mock(mock) => {
            if !(mock.frequency_hz.is_finite() && mock.frequency_hz > 0.0) {
                return Err(ContractError::config_validation(
                    "source.frequency_hz",
                    format!("frequency_hz must be > 0, got {}", mock.frequency_hz),
                ));
            }
            let intrinsics = &mock.intrinsics;
            if intrinsics.width == 0 || intrinsics.height == 0 {
                return Err(ContractError::config_validation(
                    "source.intrinsics",
                    format!(
                        "image dimensions must be > 0, got {}x{}",
                        intrinsics.width, intrinsics.height
                    ),
                ));
            }
            if intrinsics.fx <= 0.0 || intrinsics.fy <= 0.0 {
                return Err(ContractError::config_validation(
                    "source.intrinsics",
                    "focal lengths must be > 0",
                ));
            }
            if !(mock.baseline.is_finite() && mock.baseline > 0.0) {
                return Err(ContractError::config_validation(
                    "source.baseline",
                    format!("baseline must be > 0, got {}", mock.baseline),
                ));
            }
        }
        SourceConfig::Replay(replay) => {
            if replay.path.as_os_str().is_empty() {
                return Err(ContractError::config_validation(
                    "source.path",
                    "replay path cannot be empty",
                ));
            }
            if !(replay.speed_multiplier.is_finite() && replay.speed_multiplier >= 0.0) {
                return Err(ContractError::config_validation(
                    "source.speed_multiplier",
                    format!(
                        "speed_multiplier must be >= 0, got {}",
                        replay.speed_multiplier
                    ),
                ));
            }
        }
    }
    Ok(())
}

/// 校验 sink 配置
fn validate_sinks(blueprint: &OdometerBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{}].name", idx),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
        if sink.channels.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{}].channels", sink.name),
                "sink must subscribe to at least one channel",
            ));
        }
        if sink.queue_capacity == 0 {
            return Err(ContractError::config_validation(
                format!("sinks[{}].queue_capacity", sink.name),
                "queue_capacity must be > 0",
            ));
        }
    }
    Ok(())
}
