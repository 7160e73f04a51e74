//! Motion-estimation engine capability
//!
//! The visual-odometry engine is opaque to the odometer: it is constructed
//! once from a [`StereoCalibration`] through an [`EngineFactory`] and then
//! fed one image pair at a time through [`MotionEngine`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use nalgebra::{Isometry3, Matrix6};
use serde::{Deserialize, Serialize};

use crate::{ContractError, MonoImage, StereoCalibration};

/// Outcome of processing one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MotionStatus {
    NoData,
    Success,
    InsufficientInliers,
    OptimizationFailure,
    ReprojectionError,
}

impl MotionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoData => "NO_DATA",
            Self::Success => "SUCCESS",
            Self::InsufficientInliers => "INSUFFICIENT_INLIERS",
            Self::OptimizationFailure => "OPTIMIZATION_FAILURE",
            Self::ReprojectionError => "REPROJECTION_ERROR",
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl fmt::Display for MotionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine tuning options, passed through verbatim as key/value strings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngineOptions(BTreeMap<String, String>);

impl EngineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Parse an option value, returning `None` when the key is absent.
    ///
    /// # Errors
    /// `EngineInit` when the value does not parse as `T`
    pub fn parse<T: FromStr>(&self, key: &str) -> Result<Option<T>, ContractError> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(|_| {
                ContractError::engine_init(format!("invalid value '{raw}' for option '{key}'"))
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Constructed engine holding mutable tracking state.
///
/// Not safe for concurrent frames: every call takes `&mut self` and frames
/// must be fed in capture order.
pub trait MotionEngine: Send {
    /// Supply the right image to the stereo-depth stage
    fn set_secondary_image(&mut self, image: &MonoImage);

    /// Track the left image against the previous frame
    fn process_primary_image(&mut self, image: &MonoImage) -> MotionStatus;

    /// Absolute pose since engine initialization
    fn pose(&self) -> Isometry3<f64>;

    /// Motion between the previous and the current frame
    fn motion_estimate(&self) -> Isometry3<f64>;

    /// Covariance of the last motion estimate, engine-native layout
    fn motion_covariance(&self) -> Matrix6<f64>;
}

/// Builds a [`MotionEngine`] from calibration.
pub trait EngineFactory {
    type Engine: MotionEngine;

    /// # Errors
    /// `EngineInit` if the engine rejects the calibration or options
    fn initialize(
        &self,
        calibration: &StereoCalibration,
        options: &EngineOptions,
    ) -> Result<Self::Engine, ContractError>;
}
