//! Layered error definitions
//!
//! Categorized by source: config / calibration / engine / frame / sink.
//! Startup-class errors halt the pipeline, frame-class errors only drop the
//! frame they were raised for (see [`ContractError::is_frame_local`]).

use thiserror::Error;

use crate::MotionStatus;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Startup Errors =====
    /// Malformed or missing stereo calibration
    #[error("calibration error for camera '{camera}': {message}")]
    Calibration { camera: String, message: String },

    /// Motion-estimation engine could not be constructed
    #[error("engine initialization failed: {message}")]
    EngineInit { message: String },

    // ===== Per-frame Errors =====
    /// Image pair does not satisfy the engine's buffer layout
    #[error("frame format error: {message}")]
    FrameFormat { message: String },

    /// Engine reported a non-success status for this frame
    #[error("motion estimation failed: {status}")]
    MotionEstimation { status: MotionStatus },

    /// Spatial offset between two frames is not available
    #[error("transform from '{source_frame}' to '{target_frame}' unavailable: {message}")]
    FrameLookup {
        target_frame: String,
        source_frame: String,
        message: String,
    },

    // ===== Source Errors =====
    /// Frame source (mock / replay) error
    #[error("frame source '{source_name}' error: {message}")]
    Source {
        source_name: String,
        message: String,
    },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    /// Sink connection error
    #[error("sink '{sink_name}' connection error: {message}")]
    SinkConnection { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create calibration error
    pub fn calibration(camera: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Calibration {
            camera: camera.into(),
            message: message.into(),
        }
    }

    /// Create engine initialization error
    pub fn engine_init(message: impl Into<String>) -> Self {
        Self::EngineInit {
            message: message.into(),
        }
    }

    /// Create frame format error
    pub fn frame_format(message: impl Into<String>) -> Self {
        Self::FrameFormat {
            message: message.into(),
        }
    }

    /// Create frame lookup error
    pub fn frame_lookup(
        target_frame: impl Into<String>,
        source_frame: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::FrameLookup {
            target_frame: target_frame.into(),
            source_frame: source_frame.into(),
            message: message.into(),
        }
    }

    /// Create frame source error
    pub fn source(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Source {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Whether the error only invalidates the frame it was raised for.
    ///
    /// Frame-local errors leave the pose and engine state intact; the caller
    /// should log them and continue with the next frame.
    pub fn is_frame_local(&self) -> bool {
        matches!(
            self,
            Self::FrameFormat { .. } | Self::MotionEstimation { .. } | Self::FrameLookup { .. }
        )
    }

    /// Short status label used in logs and metrics
    pub fn status_label(&self) -> &'static str {
        match self {
            Self::MotionEstimation { status } => status.as_str(),
            Self::FrameFormat { .. } => "FRAME_FORMAT",
            Self::FrameLookup { .. } => "FRAME_LOOKUP",
            _ => "ENGINE_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_local_classification() {
        assert!(ContractError::frame_format("step mismatch").is_frame_local());
        assert!(ContractError::MotionEstimation {
            status: MotionStatus::InsufficientInliers
        }
        .is_frame_local());
        assert!(!ContractError::calibration("left", "zero width").is_frame_local());
        assert!(!ContractError::engine_init("bad intrinsics").is_frame_local());
    }

    #[test]
    fn test_status_label() {
        let err = ContractError::MotionEstimation {
            status: MotionStatus::NoData,
        };
        assert_eq!(err.status_label(), "NO_DATA");
        assert_eq!(ContractError::frame_format("x").status_label(), "FRAME_FORMAT");
        assert_eq!(ContractError::engine_init("x").status_label(), "ENGINE_ERROR");
    }

    #[test]
    fn test_motion_estimation_message_uses_status_name() {
        let err = ContractError::MotionEstimation {
            status: MotionStatus::ReprojectionError,
        };
        assert_eq!(err.to_string(), "motion estimation failed: REPROJECTION_ERROR");
    }
}
