//! FrameOffsetSource trait - spatial offset lookup between named frames

use nalgebra::Isometry3;

use crate::{ContractError, FrameId};

/// Point in time a lookup refers to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LookupTime {
    /// Latest available offset, regardless of its stamp
    Latest,
    /// Offset valid at the given timestamp (seconds)
    At(f64),
}

/// Source of rigid offsets between coordinate frames.
///
/// `resolve(target, source, _)` returns the pose of `source` expressed in
/// `target`, i.e. the transform mapping points from `source` into `target`.
/// Implementations must answer without blocking; callers fall back to
/// identity when the offset is unavailable.
pub trait FrameOffsetSource: Send + Sync {
    /// Cheap existence check, returning the reason on failure
    fn can_resolve(&self, target: &FrameId, source: &FrameId) -> Result<(), String>;

    /// Look up the offset
    fn resolve(
        &self,
        target: &FrameId,
        source: &FrameId,
        time: LookupTime,
    ) -> Result<Isometry3<f64>, ContractError>;
}
