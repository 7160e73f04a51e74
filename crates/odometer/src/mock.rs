//! Scripted motion engine for tests and the synthetic pipeline.
//!
//! `MockEngine` replays a queue of [`MockStep`]s, then repeats a default
//! step forever. Successful steps accumulate into the absolute pose the
//! same way a real tracker would.
//!
//! Options understood at construction:
//! - `mock-step-x`: forward translation per frame (meters)
//! - `mock-step-yaw`: yaw increment per frame (radians)
//! - `mock-failure-every`: every n-th frame reports `INSUFFICIENT_INLIERS`

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use contracts::{
    ContractError, EngineFactory, EngineOptions, MonoImage, MotionEngine, MotionStatus,
    StereoCalibration,
};
use nalgebra::{Isometry3, Matrix6, Vector3};

/// Outcome scripted for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct MockStep {
    pub status: MotionStatus,
    pub motion: Isometry3<f64>,
    pub covariance: Matrix6<f64>,
}

impl MockStep {
    /// Successful step with a small diagonal covariance
    pub fn success(motion: Isometry3<f64>) -> Self {
        Self {
            status: MotionStatus::Success,
            motion,
            covariance: Matrix6::identity() * 1e-3,
        }
    }

    /// Failed step
    pub fn failure(status: MotionStatus) -> Self {
        Self {
            status,
            motion: Isometry3::identity(),
            covariance: Matrix6::zeros(),
        }
    }

    pub fn with_covariance(mut self, covariance: Matrix6<f64>) -> Self {
        self.covariance = covariance;
        self
    }
}

impl Default for MockStep {
    fn default() -> Self {
        Self::success(Isometry3::identity())
    }
}

/// Factory producing [`MockEngine`]s
#[derive(Debug, Clone, Default)]
pub struct MockEngineFactory {
    script: Vec<MockStep>,
    default_step: MockStep,
    init_count: Arc<AtomicUsize>,
    init_failure: Option<String>,
}

impl MockEngineFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Steps replayed before the default step takes over
    pub fn with_script(mut self, script: Vec<MockStep>) -> Self {
        self.script = script;
        self
    }

    pub fn with_default_step(mut self, step: MockStep) -> Self {
        self.default_step = step;
        self
    }

    /// Make every `initialize` call fail
    pub fn fail_on_init(mut self, message: impl Into<String>) -> Self {
        self.init_failure = Some(message.into());
        self
    }

    /// Shared counter of `initialize` calls (successful or not)
    pub fn init_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.init_count)
    }

    pub fn init_count(&self) -> usize {
        self.init_count.load(Ordering::SeqCst)
    }

    fn default_step_from(&self, options: &EngineOptions) -> Result<MockStep, ContractError> {
        let step_x = options.parse::<f64>("mock-step-x")?;
        let step_yaw = options.parse::<f64>("mock-step-yaw")?;
        if step_x.is_none() && step_yaw.is_none() {
            return Ok(self.default_step.clone());
        }

        let motion = Isometry3::new(
            Vector3::new(step_x.unwrap_or(0.0), 0.0, 0.0),
            Vector3::new(0.0, 0.0, step_yaw.unwrap_or(0.0)),
        );
        Ok(MockStep {
            motion,
            ..self.default_step.clone()
        })
    }
}

impl EngineFactory for MockEngineFactory {
    type Engine = MockEngine;

    fn initialize(
        &self,
        calibration: &StereoCalibration,
        options: &EngineOptions,
    ) -> Result<MockEngine, ContractError> {
        let instance_id = self.init_count.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.init_failure {
            return Err(ContractError::engine_init(message.clone()));
        }

        let failure_every = options.parse::<u64>("mock-failure-every")?.filter(|n| *n > 0);
        let default_step = self.default_step_from(options)?;

        Ok(MockEngine {
            instance_id,
            calibration: *calibration,
            options: options.clone(),
            script: self.script.iter().cloned().collect(),
            default_step,
            failure_every,
            pose: Isometry3::identity(),
            motion: Isometry3::identity(),
            covariance: Matrix6::zeros(),
            secondary_ready: false,
            frames: 0,
        })
    }
}

/// Engine that replays scripted motion
#[derive(Debug)]
pub struct MockEngine {
    instance_id: usize,
    calibration: StereoCalibration,
    options: EngineOptions,
    script: VecDeque<MockStep>,
    default_step: MockStep,
    failure_every: Option<u64>,
    pose: Isometry3<f64>,
    motion: Isometry3<f64>,
    covariance: Matrix6<f64>,
    secondary_ready: bool,
    frames: u64,
}

impl MockEngine {
    /// Construction order among engines of the same factory
    pub fn instance_id(&self) -> usize {
        self.instance_id
    }

    pub fn calibration(&self) -> &StereoCalibration {
        &self.calibration
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Primary images seen so far
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl MotionEngine for MockEngine {
    fn set_secondary_image(&mut self, _image: &MonoImage) {
        self.secondary_ready = true;
    }

    fn process_primary_image(&mut self, _image: &MonoImage) -> MotionStatus {
        if !std::mem::take(&mut self.secondary_ready) {
            return MotionStatus::NoData;
        }
        self.frames += 1;

        let forced_failure = self
            .failure_every
            .is_some_and(|n| self.frames % n == 0);
        let step = self
            .script
            .pop_front()
            .unwrap_or_else(|| self.default_step.clone());

        if forced_failure {
            self.motion = Isometry3::identity();
            return MotionStatus::InsufficientInliers;
        }

        if step.status.is_success() {
            self.pose *= step.motion;
            self.motion = step.motion;
            self.covariance = step.covariance;
        } else {
            self.motion = Isometry3::identity();
        }
        step.status
    }

    fn pose(&self) -> Isometry3<f64> {
        self.pose
    }

    fn motion_estimate(&self) -> Isometry3<f64> {
        self.motion
    }

    fn motion_covariance(&self) -> Matrix6<f64> {
        self.covariance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use contracts::{CameraInfo, CameraIntrinsics};

    fn calibration() -> StereoCalibration {
        let (left, right) = CameraInfo::rectified_pair(
            CameraIntrinsics {
                fx: 500.0,
                fy: 500.0,
                cx: 320.0,
                cy: 240.0,
                width: 4,
                height: 2,
            },
            0.12,
        );
        crate::calibration::build(&left, &right).unwrap()
    }

    fn image() -> MonoImage {
        MonoImage::mono8(4, 2, vec![0u8; 8])
    }

    fn step(engine: &mut MockEngine) -> MotionStatus {
        engine.set_secondary_image(&image());
        engine.process_primary_image(&image())
    }

    #[test]
    fn test_script_then_default() {
        let forward = Isometry3::translation(0.5, 0.0, 0.0);
        let factory = MockEngineFactory::new()
            .with_script(vec![
                MockStep::success(forward),
                MockStep::failure(MotionStatus::OptimizationFailure),
            ])
            .with_default_step(MockStep::success(Isometry3::translation(0.0, 1.0, 0.0)));
        let mut engine = factory
            .initialize(&calibration(), &EngineOptions::new())
            .unwrap();

        assert_eq!(step(&mut engine), MotionStatus::Success);
        assert_eq!(step(&mut engine), MotionStatus::OptimizationFailure);
        assert_eq!(step(&mut engine), MotionStatus::Success);

        assert_relative_eq!(engine.pose().translation.vector, Vector3::new(0.5, 1.0, 0.0));
        assert_relative_eq!(
            engine.motion_estimate().translation.vector,
            Vector3::new(0.0, 1.0, 0.0)
        );
        assert_eq!(factory.init_count(), 1);
    }

    #[test]
    fn test_primary_without_secondary_is_no_data() {
        let mut engine = MockEngineFactory::new()
            .initialize(&calibration(), &EngineOptions::new())
            .unwrap();
        assert_eq!(engine.process_primary_image(&image()), MotionStatus::NoData);
        assert_eq!(engine.frames(), 0);
    }

    #[test]
    fn test_options_drive_default_motion() {
        let mut options = EngineOptions::new();
        options
            .set("mock-step-x", "0.1")
            .set("mock-failure-every", "3");
        let mut engine = MockEngineFactory::new()
            .initialize(&calibration(), &options)
            .unwrap();

        assert_eq!(step(&mut engine), MotionStatus::Success);
        assert_eq!(step(&mut engine), MotionStatus::Success);
        assert_eq!(step(&mut engine), MotionStatus::InsufficientInliers);
        assert_eq!(step(&mut engine), MotionStatus::Success);
        assert_relative_eq!(engine.pose().translation.x, 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_option_fails_init() {
        let mut options = EngineOptions::new();
        options.set("mock-step-yaw", "left");
        let err = MockEngineFactory::new()
            .initialize(&calibration(), &options)
            .unwrap_err();
        assert!(matches!(err, ContractError::EngineInit { .. }));
    }
}
