//! StereoFrame - Ingestion output
//!
//! Synchronized rectified image pair plus the calibration records that
//! travelled with it.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::CameraInfo;

/// Pixel encoding of an image buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelEncoding {
    Mono8,
    Rgb8,
    Rgba8,
    Bgra8,
}

impl PixelEncoding {
    /// Bytes per pixel
    pub fn channels(self) -> u32 {
        match self {
            Self::Mono8 => 1,
            Self::Rgb8 => 3,
            Self::Rgba8 | Self::Bgra8 => 4,
        }
    }
}

/// Image buffer (row-major, `step` bytes per row)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonoImage {
    /// Image width (pixels)
    pub width: u32,

    /// Image height (pixels)
    pub height: u32,

    /// Row stride in bytes
    pub step: u32,

    /// Pixel encoding
    pub encoding: PixelEncoding,

    /// Raw pixel data (zero-copy)
    pub data: Bytes,
}

impl MonoImage {
    /// Create a tightly packed mono8 image.
    pub fn mono8(width: u32, height: u32, data: impl Into<Bytes>) -> Self {
        Self {
            width,
            height,
            step: width,
            encoding: PixelEncoding::Mono8,
            data: data.into(),
        }
    }
}

/// Synchronized stereo image pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StereoFrame {
    /// Source sequence number (for ordering/diagnostics)
    pub sequence: u64,

    /// Capture timestamp (seconds, f64) - primary clock
    pub timestamp: f64,

    /// Left (primary) rectified image
    pub left: MonoImage,

    /// Right (secondary) rectified image
    pub right: MonoImage,

    /// Left camera calibration
    pub left_info: CameraInfo,

    /// Right camera calibration
    pub right_info: CameraInfo,
}
