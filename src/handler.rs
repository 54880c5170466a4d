//! The host-facing image I/O handler.

use alloc::string::{String, ToString};

use crate::codec::Av1Codec;
use crate::config::CodecConfig;
use crate::decode::{ContainerDecoder, ParseState};
use crate::encode::EncodeRequest;
use crate::error::CodecError;
use crate::format::ImageFormat;
use crate::pixel::Frame;
use crate::sniff::{self, MIN_SIGNATURE_LEN, SIGNATURE_PEEK_LEN};
use crate::quality::Quality;
use crate::stream::ImageStream;

/// Options a host can query or set on a handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ImageOption {
    /// Encode quality, 0 to 100.
    Quality,
    /// Size of the current frame.
    Size,
    /// Whether the container is a sequence.
    Animation,
}

/// Value of an [`ImageOption`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionValue {
    Int(i32),
    Size(u32, u32),
    Bool(bool),
}

/// Reads and writes one image stream.
///
/// Read-side queries parse the stream on first use. A failed parse is
/// permanent for the handler.
pub trait ImageIoHandler {
    /// Format name the handler was created for.
    fn format(&self) -> &str;

    /// Whether the stream looks readable. Does not parse.
    fn can_read(&mut self) -> bool;

    /// Read the current frame; sequences advance on the next call.
    fn read(&mut self) -> Result<Frame, CodecError>;

    /// Encode `frame` and write it to the stream in one operation.
    fn write(&mut self, frame: &Frame) -> Result<(), CodecError>;

    fn supports_option(&self, option: ImageOption) -> bool;

    /// Current value of `option`. `Size` and `Animation` need a readable
    /// stream and return `None` when parsing fails.
    fn option(&mut self, option: ImageOption) -> Option<OptionValue>;

    /// Set an option. Only `Quality` is settable; other options are ignored.
    fn set_option(&mut self, option: ImageOption, value: OptionValue);

    fn image_count(&mut self) -> u32;

    fn current_image_number(&self) -> i32;

    fn jump_to_next_image(&mut self) -> Result<(), CodecError>;

    fn jump_to_image(&mut self, index: i64) -> Result<(), CodecError>;

    /// Milliseconds until the next frame; 0 for stills.
    fn next_image_delay(&mut self) -> i32;

    /// 0 for stills, 1 for sequences.
    fn loop_count(&mut self) -> i32;
}

/// Sniff a stream for an AVIF signature without consuming it.
pub fn can_read_stream<S: ImageStream + ?Sized>(stream: &mut S) -> bool {
    match stream.peek(SIGNATURE_PEEK_LEN) {
        Ok(header) if header.len() >= MIN_SIGNATURE_LEN => sniff::is_avif(&header),
        Ok(_) => false,
        Err(e) => {
            tracing::debug!(error = %e, "cannot peek stream");
            false
        }
    }
}

/// AVIF handler over a stream `S`, backed by codec `C`.
pub struct AvifHandler<C: Av1Codec, S: ImageStream> {
    stream: S,
    format: String,
    quality: Quality,
    config: CodecConfig,
    decoder: ContainerDecoder<C>,
}

impl<C: Av1Codec, S: ImageStream> AvifHandler<C, S> {
    pub fn new(codec: C, stream: S) -> Self {
        Self::with_config(codec, stream, CodecConfig::default())
    }

    pub fn with_config(codec: C, stream: S, config: CodecConfig) -> Self {
        Self {
            stream,
            format: ImageFormat::Avif.name().to_string(),
            quality: Quality::DEFAULT,
            decoder: ContainerDecoder::new(codec, config.clone()),
            config,
        }
    }

    /// Record the format name the host asked for.
    pub fn set_format(&mut self, format: &str) {
        self.format = format.to_string();
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub fn into_stream(self) -> S {
        self.stream
    }

    /// Parse the stream if that has not happened yet. Reports whether
    /// the container is usable.
    fn ensure_parsed(&mut self) -> bool {
        match self.decoder.state() {
            ParseState::Success => true,
            ParseState::Error => false,
            ParseState::NotParsed => {
                if !self.stream.is_readable() {
                    tracing::warn!("stream is not readable");
                    self.decoder.fail();
                    return false;
                }
                match self.stream.read_all() {
                    Ok(data) => self.decoder.parse(data).is_ok(),
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to read AVIF stream");
                        self.decoder.fail();
                        false
                    }
                }
            }
        }
    }

    fn require_parsed(&mut self) -> Result<(), CodecError> {
        if self.ensure_parsed() {
            Ok(())
        } else {
            Err(CodecError::Terminal)
        }
    }
}

impl<C: Av1Codec, S: ImageStream> ImageIoHandler for AvifHandler<C, S> {
    fn format(&self) -> &str {
        &self.format
    }

    fn can_read(&mut self) -> bool {
        match self.decoder.state() {
            ParseState::NotParsed if !can_read_stream(&mut self.stream) => false,
            ParseState::Error => false,
            _ => {
                self.format = ImageFormat::Avif.name().to_string();
                true
            }
        }
    }

    fn read(&mut self) -> Result<Frame, CodecError> {
        self.require_parsed()?;
        self.decoder.read()
    }

    fn write(&mut self, frame: &Frame) -> Result<(), CodecError> {
        let bytes = EncodeRequest::new(self.decoder.codec())
            .with_quality(self.quality)
            .with_config(self.config.encoder.clone())
            .with_limits(self.config.limits.clone())
            .encode(frame)?;
        self.stream.write_all_bytes(&bytes).map_err(|e| {
            tracing::warn!(error = %e, "write error");
            CodecError::Io(e)
        })
    }

    fn supports_option(&self, option: ImageOption) -> bool {
        matches!(
            option,
            ImageOption::Quality | ImageOption::Size | ImageOption::Animation
        )
    }

    fn option(&mut self, option: ImageOption) -> Option<OptionValue> {
        if option == ImageOption::Quality {
            return Some(OptionValue::Int(i32::from(self.quality.get())));
        }
        if !self.supports_option(option) || !self.ensure_parsed() {
            return None;
        }
        match option {
            ImageOption::Size => self
                .decoder
                .current_frame()
                .map(|f| OptionValue::Size(f.width(), f.height())),
            ImageOption::Animation => Some(OptionValue::Bool(self.decoder.image_count() >= 2)),
            _ => None,
        }
    }

    fn set_option(&mut self, option: ImageOption, value: OptionValue) {
        match (option, value) {
            (ImageOption::Quality, OptionValue::Int(q)) => self.quality = Quality::new(q),
            _ => tracing::trace!(?option, ?value, "ignoring option"),
        }
    }

    fn image_count(&mut self) -> u32 {
        if !self.ensure_parsed() {
            return 0;
        }
        self.decoder.image_count()
    }

    fn current_image_number(&self) -> i32 {
        self.decoder.current_image_number()
    }

    fn jump_to_next_image(&mut self) -> Result<(), CodecError> {
        self.require_parsed()?;
        self.decoder.jump_to_next_image()
    }

    fn jump_to_image(&mut self, index: i64) -> Result<(), CodecError> {
        self.require_parsed()?;
        self.decoder.jump_to_image(index)
    }

    fn next_image_delay(&mut self) -> i32 {
        if !self.ensure_parsed() {
            return 0;
        }
        self.decoder.next_image_delay()
    }

    fn loop_count(&mut self) -> i32 {
        if !self.ensure_parsed() {
            return 0;
        }
        self.decoder.loop_count()
    }
}
