//! Resource limits for decode/encode operations.

use alloc::format;

use crate::error::CodecError;

/// Largest width or height accepted on either path.
pub const MAX_DIMENSION: u32 = 32768;

/// Dimension limits applied before any pixel buffer is allocated.
#[derive(Clone, Debug)]
pub struct Limits {
    /// Maximum image width in pixels.
    pub max_width: u32,
    /// Maximum image height in pixels.
    pub max_height: u32,
    /// Maximum total pixels (width × height). `None` means unbounded.
    pub max_pixels: Option<u64>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_width: MAX_DIMENSION,
            max_height: MAX_DIMENSION,
            max_pixels: None,
        }
    }
}

impl Limits {
    /// Check that an image is non-empty and within limits.
    pub fn check_dimensions(&self, width: u32, height: u32) -> Result<(), CodecError> {
        if width == 0 || height == 0 {
            return Err(CodecError::LimitExceeded(format!(
                "zero-area image ({width}x{height})"
            )));
        }

        if width > self.max_width || height > self.max_height {
            return Err(CodecError::LimitExceeded(format!(
                "image size {width}x{height} exceeds {}x{}",
                self.max_width, self.max_height
            )));
        }

        if let Some(max_pixels) = self.max_pixels
            && u64::from(width) * u64::from(height) > max_pixels
        {
            return Err(CodecError::LimitExceeded(format!(
                "pixel count of {width}x{height} exceeds {max_pixels}"
            )));
        }

        Ok(())
    }
}
