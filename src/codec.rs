//! The seam between the handler and an AV1 codec backend.
//!
//! The handler never touches compressed AV1 data itself. A backend provides
//! container parsing and frame decoding through [`Av1Decoder`] and
//! single-image encoding through [`Av1Codec::encode`]. Backends report their
//! own error type, which the handler folds into `CodecError`.

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::config::{DecoderConfig, EncoderConfig};
use crate::yuv::YuvImage;

/// Encoder parameters derived from the quality setting and [`EncoderConfig`].
///
/// Quantizers use the AV1 scale: 0 is lossless, 63 is the coarsest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodeSettings {
    pub threads: usize,
    /// 0 = slowest, 10 = fastest.
    pub speed: u8,
    pub min_quantizer: u8,
    pub max_quantizer: u8,
    /// Only meaningful when the image carries alpha.
    pub min_quantizer_alpha: u8,
    pub max_quantizer_alpha: u8,
}

impl EncodeSettings {
    /// Settings for the given encoder config with lossless quantizers.
    pub fn new(config: &EncoderConfig) -> Self {
        Self {
            threads: config.threads,
            speed: config.speed,
            min_quantizer: 0,
            max_quantizer: 0,
            min_quantizer_alpha: 0,
            max_quantizer_alpha: 0,
        }
    }
}

/// An AV1 codec backend.
///
/// Implementations are cheap to clone and shareable; each handler creates
/// its own decoder.
pub trait Av1Codec {
    /// The backend's error type.
    type Error: core::error::Error + Send + Sync + 'static;

    /// Per-stream decoder state.
    type Decoder: Av1Decoder<Error = Self::Error>;

    /// Create a decoder.
    fn new_decoder(&self, config: &DecoderConfig) -> Result<Self::Decoder, Self::Error>;

    /// Encode one image into a complete AVIF file.
    fn encode(&self, image: &YuvImage, settings: &EncodeSettings) -> Result<Vec<u8>, Self::Error>;
}

/// A container decoder iterating over the frames of one AVIF file.
///
/// After [`parse`](Av1Decoder::parse) the decoder is positioned before the
/// first frame; [`next_image`](Av1Decoder::next_image) or
/// [`nth_image`](Av1Decoder::nth_image) decodes a frame and makes it
/// available through [`image`](Av1Decoder::image).
pub trait Av1Decoder {
    type Error: core::error::Error + Send + Sync + 'static;

    /// Parse the container. Called once per decoder.
    fn parse(&mut self, data: Arc<[u8]>) -> Result<(), Self::Error>;

    /// Decode the frame after the current one.
    fn next_image(&mut self) -> Result<(), Self::Error>;

    /// Decode frame `index` (0-based).
    fn nth_image(&mut self, index: u32) -> Result<(), Self::Error>;

    /// Rewind to before the first frame.
    fn reset(&mut self) -> Result<(), Self::Error>;

    /// The most recently decoded frame.
    fn image(&self) -> Option<&YuvImage>;

    /// Index of the current frame, `None` before the first decode.
    fn image_index(&self) -> Option<u32>;

    /// Frames in the container; 1 for still images.
    fn image_count(&self) -> u32;

    /// Display duration of the current frame, in seconds.
    fn image_duration(&self) -> f64;
}
