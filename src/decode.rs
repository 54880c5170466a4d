//! Lazy container parsing and frame navigation.

use alloc::string::ToString;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::codec::{Av1Codec, Av1Decoder};
use crate::config::CodecConfig;
use crate::error::CodecError;
use crate::negotiate::frame_from_yuv;
use crate::pixel::Frame;
use crate::sniff;
use crate::yuv::YuvImage;

/// Parse progress of a container.
///
/// `Error` is terminal: nothing resets it short of a new decoder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ParseState {
    #[default]
    NotParsed,
    Success,
    Error,
}

/// Decoder for one AVIF container: still image or sequence.
///
/// Created unparsed; [`parse`](Self::parse) runs once and decodes the first
/// frame. Sequences are walked with [`read`](Self::read), which returns the
/// current frame and advances on the next call, or with the explicit jump
/// methods.
pub struct ContainerDecoder<C: Av1Codec> {
    codec: C,
    config: CodecConfig,
    state: ParseState,
    decoder: Option<C::Decoder>,
    current: Option<Frame>,
    must_jump: bool,
    /// Size of the first frame as decoded; later frames must match.
    container_size: (u32, u32),
}

impl<C: Av1Codec> ContainerDecoder<C> {
    pub fn new(codec: C, config: CodecConfig) -> Self {
        Self {
            codec,
            config,
            state: ParseState::NotParsed,
            decoder: None,
            current: None,
            must_jump: false,
            container_size: (0, 0),
        }
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Mark the container unusable, e.g. when its bytes could not be read.
    pub fn fail(&mut self) {
        self.state = ParseState::Error;
        self.decoder = None;
        self.current = None;
    }

    /// Parse `data` and decode its first frame.
    ///
    /// Only the first call does work; later calls report the outcome of the
    /// first one.
    pub fn parse(&mut self, data: Vec<u8>) -> Result<(), CodecError> {
        match self.state {
            ParseState::Success => return Ok(()),
            ParseState::Error => return Err(CodecError::Terminal),
            ParseState::NotParsed => {}
        }
        match self.parse_inner(data) {
            Ok(()) => {
                self.state = ParseState::Success;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to parse AVIF container");
                self.fail();
                Err(e)
            }
        }
    }

    fn parse_inner(&mut self, data: Vec<u8>) -> Result<(), CodecError> {
        if !sniff::is_avif(&data) {
            return Err(CodecError::NotAvif);
        }

        let mut decoder = self
            .codec
            .new_decoder(&self.config.decoder)
            .map_err(CodecError::from_codec)?;
        decoder
            .parse(Arc::from(data))
            .map_err(|e| CodecError::Parse(e.to_string()))?;
        decoder
            .next_image()
            .map_err(|e| CodecError::Decode(e.to_string()))?;

        let image = decoder
            .image()
            .ok_or_else(|| CodecError::Decode("no image after decode".into()))?;
        self.config.limits.check_dimensions(image.width, image.height)?;
        self.container_size = (image.width, image.height);
        tracing::debug!(
            width = image.width,
            height = image.height,
            depth = image.depth,
            frames = decoder.image_count(),
            "parsed AVIF container"
        );

        self.decoder = Some(decoder);
        self.decode_current()
    }

    /// Convert the decoder's current image into the host frame.
    fn decode_current(&mut self) -> Result<(), CodecError> {
        let decoder = self.decoder.as_ref().ok_or(CodecError::Terminal)?;
        let is_sequence = decoder.image_count() >= 2;
        let image = decoder
            .image()
            .ok_or_else(|| CodecError::Decode("no image after decode".into()))?;
        self.current = Some(frame_from_yuv(image, is_sequence)?);
        self.must_jump = false;
        Ok(())
    }

    /// Run a navigation step; any failure poisons the decoder.
    fn navigate(
        &mut self,
        step: impl FnOnce(&mut C::Decoder) -> Result<(), C::Error>,
    ) -> Result<(), CodecError> {
        let result = self.navigate_inner(step);
        if let Err(e) = &result {
            tracing::warn!(error = %e, "failed to decode AVIF frame");
            self.fail();
        }
        result
    }

    fn navigate_inner(
        &mut self,
        step: impl FnOnce(&mut C::Decoder) -> Result<(), C::Error>,
    ) -> Result<(), CodecError> {
        let decoder = self.decoder.as_mut().ok_or(CodecError::Terminal)?;
        step(decoder).map_err(|e| CodecError::Decode(e.to_string()))?;
        let image = decoder
            .image()
            .ok_or_else(|| CodecError::Decode("no image after decode".into()))?;
        check_frame_size(image, self.container_size)?;
        self.decode_current()
    }

    fn ensure_success(&self) -> Result<&C::Decoder, CodecError> {
        match (self.state, &self.decoder) {
            (ParseState::Success, Some(decoder)) => Ok(decoder),
            _ => Err(CodecError::Terminal),
        }
    }

    /// Return the current frame. In sequences, the following call returns
    /// the next frame, wrapping after the last.
    pub fn read(&mut self) -> Result<Frame, CodecError> {
        self.ensure_success()?;
        if self.must_jump {
            self.jump_to_next_image()?;
        }
        let frame = self.current.clone().ok_or(CodecError::Terminal)?;
        if self.image_count() >= 2 {
            self.must_jump = true;
        }
        Ok(frame)
    }

    /// Advance to the next frame, wrapping to the first after the last.
    /// A no-op for still images.
    pub fn jump_to_next_image(&mut self) -> Result<(), CodecError> {
        let decoder = self.ensure_success()?;
        let count = decoder.image_count();
        if count < 2 {
            return Ok(());
        }
        let wrap = decoder.image_index().is_some_and(|i| i >= count - 1);
        self.navigate(|decoder| {
            if wrap {
                decoder.reset()?;
            }
            decoder.next_image()
        })
    }

    /// Decode frame `index`.
    ///
    /// Out-of-range indices fail without changing state. Jumping to the
    /// current frame does not decode it again.
    pub fn jump_to_image(&mut self, index: i64) -> Result<(), CodecError> {
        let decoder = self.ensure_success()?;
        let count = decoder.image_count();
        let out_of_range = CodecError::FrameOutOfRange { index, count };
        if count < 2 {
            return if index == 0 { Ok(()) } else { Err(out_of_range) };
        }
        let Ok(target) = u32::try_from(index) else {
            return Err(out_of_range);
        };
        if target >= count {
            return Err(out_of_range);
        }
        if decoder.image_index() == Some(target) {
            self.must_jump = false;
            return Ok(());
        }
        self.navigate(|decoder| decoder.nth_image(target))
    }

    /// Frames in the container; 0 unless parsing succeeded.
    pub fn image_count(&self) -> u32 {
        self.ensure_success().map_or(0, |d| d.image_count())
    }

    /// Index of the current frame: -1 before parsing, 0 after a failure.
    pub fn current_image_number(&self) -> i32 {
        match self.state {
            ParseState::NotParsed => -1,
            ParseState::Error => 0,
            ParseState::Success => self
                .decoder
                .as_ref()
                .and_then(|d| d.image_index())
                .map_or(0, |i| i32::try_from(i).unwrap_or(i32::MAX)),
        }
    }

    /// Display time of the current frame in milliseconds, at least 1 for
    /// sequences and 0 for stills.
    pub fn next_image_delay(&self) -> i32 {
        match self.ensure_success() {
            Ok(d) if d.image_count() >= 2 => ((1000.0 * d.image_duration()) as i32).max(1),
            _ => 0,
        }
    }

    /// 1 for sequences (play once), 0 otherwise.
    pub fn loop_count(&self) -> i32 {
        if self.image_count() >= 2 { 1 } else { 0 }
    }

    /// The frame `read` would return next, without advancing.
    pub fn current_frame(&self) -> Option<&Frame> {
        match self.state {
            ParseState::Success => self.current.as_ref(),
            _ => None,
        }
    }
}

fn check_frame_size(image: &YuvImage, expected: (u32, u32)) -> Result<(), CodecError> {
    let (expected_width, expected_height) = expected;
    if (image.width, image.height) != expected {
        return Err(CodecError::DimensionMismatch {
            width: image.width,
            height: image.height,
            expected_width,
            expected_height,
        });
    }
    Ok(())
}

impl<C: Av1Codec + core::fmt::Debug> core::fmt::Debug for ContainerDecoder<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ContainerDecoder")
            .field("codec", &self.codec)
            .field("state", &self.state)
            .field("current_image", &self.current_image_number())
            .field("must_jump", &self.must_jump)
            .finish_non_exhaustive()
    }
}
