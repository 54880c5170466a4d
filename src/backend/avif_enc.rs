//! AVIF encode adapter using ravif.

use alloc::string::ToString;
use alloc::vec::Vec;

use ravif::BitDepth;

use super::BackendError;
use crate::codec::EncodeSettings;
use crate::pixel::PixelData;
use crate::yuv::{ChromaUpsampling, YuvImage};

/// Encode one image. ravif takes 8-bit RGB(A), so planes are converted back
/// to RGB first; depths above 8 are still encoded at 10 bits.
pub(super) fn encode(image: &YuvImage, settings: &EncodeSettings) -> Result<Vec<u8>, BackendError> {
    let rgba = image
        .to_rgba16(ChromaUpsampling::Bilinear)
        .map_err(|e| BackendError::Encode(e.to_string()))?;
    let pixels = PixelData::Rgba16(rgba);

    let depth = if image.depth > 8 {
        BitDepth::Ten
    } else {
        BitDepth::Eight
    };
    let encoder = ravif::Encoder::new()
        .with_quality(quality_for(settings.max_quantizer))
        .with_alpha_quality(quality_for(settings.max_quantizer_alpha))
        .with_speed(settings.speed.clamp(1, 10))
        .with_bit_depth(depth)
        .with_num_threads(Some(settings.threads.max(1)));

    let result = if image.has_alpha() {
        encoder.encode_rgba(pixels.to_rgba8().as_ref())
    } else {
        encoder.encode_rgb(pixels.to_rgb8().as_ref())
    }
    .map_err(|e| BackendError::Encode(e.to_string()))?;

    tracing::debug!(
        bytes = result.avif_file.len(),
        color_bytes = result.color_byte_size,
        alpha_bytes = result.alpha_byte_size,
        "ravif encoded image"
    );
    Ok(result.avif_file)
}

/// Quality on ravif's 0..=100 scale for an AV1 quantizer ceiling.
fn quality_for(max_quantizer: u8) -> f32 {
    (100.0 - f32::from(max_quantizer.min(63)) * 100.0 / 63.0).clamp(0.0, 100.0)
}
