//! Unified error type for the AVIF handler.

use alloc::boxed::Box;
use alloc::string::String;

/// Errors surfaced by the handler and its codec seam.
///
/// Parse and per-frame decode errors are terminal for a handler: once one has
/// been returned, every later decode call on the same handler fails with
/// [`CodecError::Terminal`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CodecError {
    /// The byte stream does not start with an AVIF `ftyp` box.
    #[error("data is not an AVIF container")]
    NotAvif,
    /// The container was recognized but could not be parsed.
    #[error("failed to parse AVIF container: {0}")]
    Parse(String),
    /// Image dimensions are zero or outside the configured limits.
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),
    /// A frame inside a sequence has a different size than the container.
    #[error(
        "decoded frame size ({width}x{height}) does not match container size ({expected_width}x{expected_height})"
    )]
    DimensionMismatch {
        width: u32,
        height: u32,
        expected_width: u32,
        expected_height: u32,
    },
    /// Random access past the end of the sequence.
    #[error("frame {index} out of range (sequence has {count} frames)")]
    FrameOutOfRange { index: i64, count: u32 },
    /// The codec failed to decode a frame or convert its samples.
    #[error("failed to decode image: {0}")]
    Decode(String),
    /// The codec rejected the image on encode.
    #[error("failed to encode image: {0}")]
    Encode(String),
    /// Input validation failed (empty frame, unsupported request).
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A previous parse or decode failure poisoned this handler.
    #[error("handler is in an error state; reopen the stream")]
    Terminal,
    /// The underlying byte stream failed.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Error reported by the AV1 codec backend.
    #[error("codec error: {source}")]
    Codec {
        source: Box<dyn core::error::Error + Send + Sync>,
    },
}

impl CodecError {
    /// Wrap a codec-specific error.
    pub fn from_codec<E>(error: E) -> Self
    where
        E: core::error::Error + Send + Sync + 'static,
    {
        CodecError::Codec {
            source: Box::new(error),
        }
    }

    /// Whether this error leaves the handler in its terminal error state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CodecError::NotAvif
                | CodecError::Parse(_)
                | CodecError::LimitExceeded(_)
                | CodecError::DimensionMismatch { .. }
                | CodecError::Decode(_)
                | CodecError::Terminal
        )
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, CodecError>;
