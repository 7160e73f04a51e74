//! Engine gate.
//!
//! Lazily constructs the motion engine from the first calibration seen and
//! hands the same instance to every later frame.

use contracts::{CameraInfo, ContractError, EngineFactory, EngineOptions, StereoCalibration};
use tracing::{info, instrument, warn};

use crate::calibration;

/// Gate state
enum GateState<E> {
    /// No frame processed yet
    Uninitialized,
    /// Engine constructed from the stored calibration
    Ready {
        engine: E,
        calibration: StereoCalibration,
        left: CameraInfo,
        right: CameraInfo,
    },
}

/// Owns the engine and its one-shot construction.
///
/// Recalibration is not supported: once the engine exists, differing camera
/// records are reported with a single warning and otherwise ignored.
pub struct EngineGate<F: EngineFactory> {
    factory: F,
    options: EngineOptions,
    state: GateState<F::Engine>,
    recalibration_warned: bool,
}

impl<F: EngineFactory> EngineGate<F> {
    pub fn new(factory: F, options: EngineOptions) -> Self {
        Self {
            factory,
            options,
            state: GateState::Uninitialized,
            recalibration_warned: false,
        }
    }

    /// Return the engine, constructing it on first use.
    ///
    /// # Errors
    /// `Calibration` or `EngineInit` when the first construction fails. The
    /// gate stays uninitialized so a later frame may retry.
    #[instrument(name = "engine_gate_ensure", level = "trace", skip_all)]
    pub fn ensure_engine(
        &mut self,
        left: &CameraInfo,
        right: &CameraInfo,
    ) -> Result<&mut F::Engine, ContractError> {
        match &self.state {
            GateState::Uninitialized => self.initialize(left, right)?,
            GateState::Ready {
                left: known_left,
                right: known_right,
                ..
            } => {
                let changed = !calibration::same_geometry(known_left, left)
                    || !calibration::same_geometry(known_right, right);
                if changed && !self.recalibration_warned {
                    self.recalibration_warned = true;
                    warn!(
                        left_frame = %left.frame_id,
                        right_frame = %right.frame_id,
                        "camera calibration changed after engine construction; keeping initial calibration"
                    );
                }
            }
        }

        match &mut self.state {
            GateState::Ready { engine, .. } => Ok(engine),
            GateState::Uninitialized => Err(ContractError::engine_init(
                "engine missing after initialization",
            )),
        }
    }

    fn initialize(&mut self, left: &CameraInfo, right: &CameraInfo) -> Result<(), ContractError> {
        let calibration = calibration::build(left, right)?;
        let engine = self.factory.initialize(&calibration, &self.options)?;

        metrics::counter!("stereo_odom_engine_init_total").increment(1);
        info!(
            width = calibration.left.width,
            height = calibration.left.height,
            fx = calibration.left.fx,
            baseline = calibration.baseline,
            options = self.options.len(),
            "motion engine initialized"
        );

        self.state = GateState::Ready {
            engine,
            calibration,
            left: left.clone(),
            right: right.clone(),
        };
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, GateState::Ready { .. })
    }

    /// Calibration the engine was built with
    pub fn calibration(&self) -> Option<&StereoCalibration> {
        match &self.state {
            GateState::Ready { calibration, .. } => Some(calibration),
            GateState::Uninitialized => None,
        }
    }

    pub fn engine(&self) -> Option<&F::Engine> {
        match &self.state {
            GateState::Ready { engine, .. } => Some(engine),
            GateState::Uninitialized => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockEngineFactory;
    use contracts::CameraIntrinsics;

    fn camera_pair(baseline: f64) -> (CameraInfo, CameraInfo) {
        CameraInfo::rectified_pair(
            CameraIntrinsics {
                fx: 500.0,
                fy: 500.0,
                cx: 320.0,
                cy: 240.0,
                width: 640,
                height: 480,
            },
            baseline,
        )
    }

    #[test]
    fn test_engine_constructed_once() {
        let factory = MockEngineFactory::new();
        let inits = factory.init_counter();
        let mut gate = EngineGate::new(factory, EngineOptions::new());
        let (left, right) = camera_pair(0.12);

        assert!(!gate.is_ready());
        for _ in 0..5 {
            gate.ensure_engine(&left, &right).unwrap();
        }
        assert!(gate.is_ready());
        assert_eq!(inits.load(std::sync::atomic::Ordering::SeqCst), 1);

        let calibration = gate.calibration().unwrap();
        assert!((calibration.extrinsics.translation.x + 0.12).abs() < 1e-12);
    }

    #[test]
    fn test_changed_calibration_keeps_engine() {
        let factory = MockEngineFactory::new();
        let inits = factory.init_counter();
        let mut gate = EngineGate::new(factory, EngineOptions::new());
        let (left, right) = camera_pair(0.12);
        let (left2, right2) = camera_pair(0.30);

        let first_id = gate.ensure_engine(&left, &right).unwrap().instance_id();
        let second_id = gate.ensure_engine(&left2, &right2).unwrap().instance_id();
        let third_id = gate.ensure_engine(&left2, &right2).unwrap().instance_id();

        assert_eq!(first_id, second_id);
        assert_eq!(second_id, third_id);
        assert_eq!(inits.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert!((gate.calibration().unwrap().baseline - 0.12).abs() < 1e-12);
        assert!(gate.recalibration_warned);
    }

    #[test]
    fn test_options_forwarded_to_factory() {
        let mut options = EngineOptions::new();
        options.set("mock-step-x", "0.25");
        let mut gate = EngineGate::new(MockEngineFactory::new(), options);
        let (left, right) = camera_pair(0.12);

        let engine = gate.ensure_engine(&left, &right).unwrap();
        assert_eq!(engine.options().get("mock-step-x"), Some("0.25"));
    }

    #[test]
    fn test_init_failure_leaves_gate_uninitialized() {
        let factory = MockEngineFactory::new().fail_on_init("rejected intrinsics");
        let inits = factory.init_counter();
        let mut gate = EngineGate::new(factory, EngineOptions::new());
        let (left, right) = camera_pair(0.12);

        let err = gate.ensure_engine(&left, &right).err().unwrap();
        assert!(matches!(err, ContractError::EngineInit { .. }));
        assert!(!err.is_frame_local());
        assert!(!gate.is_ready());
        assert_eq!(inits.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_bad_calibration_never_reaches_factory() {
        let factory = MockEngineFactory::new();
        let inits = factory.init_counter();
        let mut gate = EngineGate::new(factory, EngineOptions::new());
        let (mut left, right) = camera_pair(0.12);
        left.height = 0;

        let err = gate.ensure_engine(&left, &right).err().unwrap();
        assert!(matches!(err, ContractError::Calibration { .. }));
        assert_eq!(inits.load(std::sync::atomic::Ordering::SeqCst), 0);
    }
}
