//! Bundled AV1 backend: zenavif for decoding, ravif for encoding.
//!
//! Each half sits behind its own feature (`avif-decode`, `avif-encode`).
//! With one half disabled, [`AvifCodec`] reports
//! [`BackendError::Unsupported`] for it.
//!
//! zenavif hands back RGB, not planes, so decoded images reach the handler
//! as full-range 4:4:4 identity-matrix planes (or luma-only for gray). Only
//! still images are supported; the decoder always reports one frame.

#[cfg(feature = "avif-decode")]
mod avif_dec;
#[cfg(feature = "avif-encode")]
mod avif_enc;

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::codec::{Av1Codec, Av1Decoder, EncodeSettings};
use crate::config::DecoderConfig;
use crate::yuv::YuvImage;

/// Errors reported by the bundled backend.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BackendError {
    #[error("zenavif: {0}")]
    Decode(String),
    #[error("ravif: {0}")]
    Encode(String),
    #[error("{0} support is not compiled in")]
    Unsupported(&'static str),
    #[error("frame {0} does not exist")]
    NoFrame(u32),
    #[error("no container has been parsed")]
    NotParsed,
}

/// AV1 codec backed by zenavif and ravif.
#[derive(Clone, Copy, Debug, Default)]
pub struct AvifCodec;

impl AvifCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Av1Codec for AvifCodec {
    type Error = BackendError;
    type Decoder = AvifDecoder;

    fn new_decoder(&self, _config: &DecoderConfig) -> Result<AvifDecoder, BackendError> {
        if cfg!(feature = "avif-decode") {
            Ok(AvifDecoder::default())
        } else {
            Err(BackendError::Unsupported("AVIF decoding"))
        }
    }

    #[cfg(feature = "avif-encode")]
    fn encode(&self, image: &YuvImage, settings: &EncodeSettings) -> Result<Vec<u8>, BackendError> {
        avif_enc::encode(image, settings)
    }

    #[cfg(not(feature = "avif-encode"))]
    fn encode(&self, _image: &YuvImage, _settings: &EncodeSettings) -> Result<Vec<u8>, BackendError> {
        Err(BackendError::Unsupported("AVIF encoding"))
    }
}

/// Still-image decoder over one AVIF file.
#[derive(Debug, Default)]
pub struct AvifDecoder {
    data: Option<Arc<[u8]>>,
    image: Option<YuvImage>,
}

impl AvifDecoder {
    #[cfg(feature = "avif-decode")]
    fn decode_first(&mut self) -> Result<(), BackendError> {
        let data = self.data.as_ref().ok_or(BackendError::NotParsed)?;
        if self.image.is_none() {
            self.image = Some(avif_dec::decode(data)?);
        }
        Ok(())
    }

    #[cfg(not(feature = "avif-decode"))]
    fn decode_first(&mut self) -> Result<(), BackendError> {
        Err(BackendError::Unsupported("AVIF decoding"))
    }
}

impl Av1Decoder for AvifDecoder {
    type Error = BackendError;

    fn parse(&mut self, data: Arc<[u8]>) -> Result<(), BackendError> {
        self.data = Some(data);
        self.image = None;
        Ok(())
    }

    fn next_image(&mut self) -> Result<(), BackendError> {
        match self.image {
            None => self.decode_first(),
            Some(_) => Err(BackendError::NoFrame(1)),
        }
    }

    fn nth_image(&mut self, index: u32) -> Result<(), BackendError> {
        if index != 0 {
            return Err(BackendError::NoFrame(index));
        }
        self.decode_first()
    }

    fn reset(&mut self) -> Result<(), BackendError> {
        self.image = None;
        Ok(())
    }

    fn image(&self) -> Option<&YuvImage> {
        self.image.as_ref()
    }

    fn image_index(&self) -> Option<u32> {
        self.image.as_ref().map(|_| 0)
    }

    fn image_count(&self) -> u32 {
        u32::from(self.data.is_some())
    }

    fn image_duration(&self) -> f64 {
        0.0
    }
}
