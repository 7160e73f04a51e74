//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Uses the capture timestamp of the stereo pair (seconds, f64) as primary clock
//! - "No previous timestamp" is `None`, never a zero sentinel
//!
//! ## Geometry
//! - Rigid transforms are `nalgebra::Isometry3<f64>` inside the pipeline and
//!   plain `Pose` records on the wire

mod blueprint;
mod calibration;
mod engine;
mod error;
mod frame_id;
mod frame_offset;
mod image;
mod messages;
mod odometer_config;
mod sink;

pub use blueprint::*;
pub use calibration::*;
pub use engine::*;
pub use error::*;
pub use frame_id::FrameId;
pub use frame_offset::{FrameOffsetSource, LookupTime};
pub use image::*;
pub use messages::*;
pub use odometer_config::*;
pub use sink::*;
