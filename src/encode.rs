//! Frame encoding.

use alloc::vec::Vec;

use crate::codec::Av1Codec;
use crate::config::EncoderConfig;
use crate::error::CodecError;
use crate::limits::Limits;
use crate::negotiate::EncodePlan;
use crate::pixel::Frame;
use crate::quality::Quality;

/// Encode request builder.
///
/// # Example
///
/// ```no_run
/// # fn demo<C: avif_imageio::Av1Codec>(codec: &C, frame: &avif_imageio::Frame) -> avif_imageio::Result<()> {
/// use avif_imageio::{EncodeRequest, Quality};
///
/// let bytes = EncodeRequest::new(codec)
///     .with_quality(Quality::new(80))
///     .encode(frame)?;
/// # let _ = bytes;
/// # Ok(())
/// # }
/// ```
pub struct EncodeRequest<'a, C: Av1Codec> {
    codec: &'a C,
    quality: Quality,
    config: EncoderConfig,
    limits: Limits,
}

impl<'a, C: Av1Codec> EncodeRequest<'a, C> {
    pub fn new(codec: &'a C) -> Self {
        Self {
            codec,
            quality: Quality::DEFAULT,
            config: EncoderConfig::default(),
            limits: Limits::default(),
        }
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Set threads and speed.
    pub fn with_config(mut self, config: EncoderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Plan without encoding.
    pub fn plan(&self, frame: &Frame) -> Result<EncodePlan, CodecError> {
        EncodePlan::new(frame, self.quality, &self.config, &self.limits)
    }

    /// Encode `frame` into a complete AVIF file.
    pub fn encode(self, frame: &Frame) -> Result<Vec<u8>, CodecError> {
        let plan = self.plan(frame)?;
        let image = plan.build_image(frame)?;
        let bytes = self.codec.encode(&image, &plan.settings).map_err(|e| {
            tracing::warn!(error = %e, "failed to encode AVIF image");
            CodecError::Encode(alloc::string::ToString::to_string(&e))
        })?;
        tracing::debug!(
            width = image.width,
            height = image.height,
            depth = image.depth,
            bytes = bytes.len(),
            "encoded AVIF image"
        );
        Ok(bytes)
    }
}
