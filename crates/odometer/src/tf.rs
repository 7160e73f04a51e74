//! In-memory static transform buffer.

use std::collections::HashMap;

use contracts::{ContractError, FrameId, FrameOffsetSource, LookupTime, StaticTransformConfig};
use nalgebra::{Isometry3, Quaternion, Translation3, UnitQuaternion};

/// Fixed transforms between named frames.
///
/// Each entry stores the pose of `child` in `parent`. Lookups succeed for a
/// stored pair in either direction and for a frame against itself.
#[derive(Debug, Clone, Default)]
pub struct StaticTransformBuffer {
    transforms: HashMap<(FrameId, FrameId), Isometry3<f64>>,
}

impl StaticTransformBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from configuration entries.
    ///
    /// # Errors
    /// `ConfigValidation` for a rotation that cannot be normalized
    pub fn from_configs(configs: &[StaticTransformConfig]) -> Result<Self, ContractError> {
        let mut buffer = Self::new();
        for (idx, config) in configs.iter().enumerate() {
            let [qx, qy, qz, qw] = config.rotation;
            let rotation = UnitQuaternion::try_new(Quaternion::new(qw, qx, qy, qz), 1e-9)
                .ok_or_else(|| {
                    ContractError::config_validation(
                        format!("static_transforms[{idx}].rotation"),
                        "rotation quaternion must be non-zero",
                    )
                })?;
            let [x, y, z] = config.translation;
            buffer.insert(
                config.parent.clone(),
                config.child.clone(),
                Isometry3::from_parts(Translation3::new(x, y, z), rotation),
            );
        }
        Ok(buffer)
    }

    /// Store the pose of `child` in `parent`, replacing any previous entry.
    pub fn insert(&mut self, parent: FrameId, child: FrameId, child_in_parent: Isometry3<f64>) {
        self.transforms.insert((parent, child), child_in_parent);
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    fn lookup(&self, target: &FrameId, source: &FrameId) -> Option<Isometry3<f64>> {
        if target == source {
            return Some(Isometry3::identity());
        }
        if let Some(direct) = self.transforms.get(&(target.clone(), source.clone())) {
            return Some(*direct);
        }
        self.transforms
            .get(&(source.clone(), target.clone()))
            .map(Isometry3::inverse)
    }
}

impl FrameOffsetSource for StaticTransformBuffer {
    fn can_resolve(&self, target: &FrameId, source: &FrameId) -> Result<(), String> {
        match self.lookup(target, source) {
            Some(_) => Ok(()),
            None => Err(format!(
                "no static transform between '{}' and '{}' ({} known)",
                target,
                source,
                self.transforms.len()
            )),
        }
    }

    fn resolve(
        &self,
        target: &FrameId,
        source: &FrameId,
        _time: LookupTime,
    ) -> Result<Isometry3<f64>, ContractError> {
        self.lookup(target, source).ok_or_else(|| {
            ContractError::frame_lookup(
                target.as_str(),
                source.as_str(),
                "frames are not connected",
            )
        })
    }
}
