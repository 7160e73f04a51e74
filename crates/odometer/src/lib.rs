//! # Odometer
//!
//! 双目视觉里程计位姿积分与坐标变换。
//!
//! 负责：
//! - 从首帧标定构造运动估计引擎 (仅一次)
//! - 位姿、速度、协方差积分
//! - 传感器位姿到 base 坐标系的合成
//! - 输出 `OdometryOutput`
//!
//! ## 使用示例
//!
//! ```ignore
//! use std::sync::Arc;
//! use odometer::{MockEngineFactory, OdometerConfig, StaticTransformBuffer, StereoOdometer};
//!
//! let offsets = Arc::new(StaticTransformBuffer::new());
//! let mut odometer = StereoOdometer::new(OdometerConfig::default(), MockEngineFactory::new(), offsets);
//!
//! match odometer.process(&frame) {
//!     Ok(output) => publish(output),
//!     Err(e) if e.is_frame_local() => {} // drop this frame
//!     Err(e) => return Err(e),
//! }
//! ```

pub mod calibration;
mod composer;
mod gate;
mod integrator;
pub mod mock;
mod odometer;
mod publisher;
mod throttle;
mod tf;

pub use composer::{compose, FrameComposer};
pub use gate::EngineGate;
pub use integrator::{reindex_covariance, validate_pair, IntegratedMotion, MotionIntegrator, Velocity};
pub use mock::{MockEngine, MockEngineFactory, MockStep};
pub use odometer::{OdometerStats, StereoOdometer};
pub use publisher::OutputAdapter;
pub use tf::StaticTransformBuffer;
pub use throttle::WarnThrottle;

// Re-export contracts types
pub use contracts::{OdometerConfig, OdometryOutput, StereoFrame};
