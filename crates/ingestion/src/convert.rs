//! Pixel conversion to 8-bit grayscale.

use bytes::Bytes;
use contracts::{MonoImage, PixelEncoding};

use crate::error::{IngestionError, Result};

/// Convert an image buffer to tightly packed mono8.
///
/// Color encodings are reduced to BT.601 luma. Row padding (`step` larger
/// than the packed row) is stripped. A packed mono8 input is returned
/// without copying.
pub fn to_mono8(image: &MonoImage) -> Result<MonoImage> {
    let channels = image.encoding.channels() as usize;
    let width = image.width as usize;
    let height = image.height as usize;
    let step = image.step as usize;
    let row_bytes = width * channels;

    if step < row_bytes {
        return Err(IngestionError::format(format!(
            "step {step} shorter than row of {width} {:?} pixels",
            image.encoding
        )));
    }
    let required = if height == 0 { 0 } else { step * (height - 1) + row_bytes };
    if image.data.len() < required {
        return Err(IngestionError::format(format!(
            "buffer holds {} bytes, {width}x{height} {:?} needs {required}",
            image.data.len(),
            image.encoding
        )));
    }

    if image.encoding == PixelEncoding::Mono8 && step == width {
        return Ok(MonoImage {
            data: image.data.slice(..width * height),
            ..image.clone()
        });
    }

    let mut out = Vec::with_capacity(width * height);
    for row in image.data.chunks(step).take(height) {
        let row = &row[..row_bytes];
        match image.encoding {
            PixelEncoding::Mono8 => out.extend_from_slice(row),
            PixelEncoding::Rgb8 => out.extend(row.chunks_exact(3).map(|p| luma(p[0], p[1], p[2]))),
            PixelEncoding::Rgba8 => out.extend(row.chunks_exact(4).map(|p| luma(p[0], p[1], p[2]))),
            PixelEncoding::Bgra8 => out.extend(row.chunks_exact(4).map(|p| luma(p[2], p[1], p[0]))),
        }
    }

    Ok(MonoImage::mono8(image.width, image.height, Bytes::from(out)))
}

/// BT.601 luma in 8.8 fixed point (weights sum to 256)
#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((77 * r as u32 + 150 * g as u32 + 29 * b as u32) >> 8) as u8
}
