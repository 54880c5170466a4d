//! Plugin entry point: capability queries and handler creation.

use core::ops::{BitOr, BitOrAssign};

use crate::codec::Av1Codec;
use crate::config::CodecConfig;
use crate::format::ImageFormat;
use crate::handler::{AvifHandler, ImageIoHandler, can_read_stream};
use crate::stream::ImageStream;

/// What a plugin can do with a stream or format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Capabilities(u8);

impl Capabilities {
    pub const EMPTY: Self = Capabilities(0);
    pub const CAN_READ: Self = Capabilities(1 << 0);
    pub const CAN_WRITE: Self = Capabilities(1 << 1);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Capabilities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Capabilities(self.0 | rhs.0)
    }
}

impl BitOrAssign for Capabilities {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// A format plugin the host registers.
pub trait ImageIoPlugin<S: ImageStream> {
    type Handler: ImageIoHandler;

    /// Format names this plugin answers to.
    fn keys(&self) -> &'static [&'static str];

    /// Capabilities for a named format, or for a stream when `format` is
    /// empty. A named format ignores the stream.
    fn capabilities(&self, stream: Option<&mut S>, format: &str) -> Capabilities;

    /// Create a handler over `stream`, tagged with `format`.
    fn create(&self, stream: S, format: &str) -> Self::Handler;
}

/// The AVIF plugin.
#[derive(Clone, Debug, Default)]
pub struct AvifPlugin<C> {
    codec: C,
    config: CodecConfig,
}

impl<C: Av1Codec + Clone> AvifPlugin<C> {
    pub fn new(codec: C) -> Self {
        Self {
            codec,
            config: CodecConfig::default(),
        }
    }

    /// Configuration handed to every handler this plugin creates.
    pub fn with_config(mut self, config: CodecConfig) -> Self {
        self.config = config;
        self
    }
}

impl<C: Av1Codec + Clone, S: ImageStream> ImageIoPlugin<S> for AvifPlugin<C> {
    type Handler = AvifHandler<C, S>;

    fn keys(&self) -> &'static [&'static str] {
        &["avif", "avifs"]
    }

    fn capabilities(&self, stream: Option<&mut S>, format: &str) -> Capabilities {
        match format {
            "avif" => return Capabilities::CAN_READ | Capabilities::CAN_WRITE,
            "avifs" => return Capabilities::CAN_READ,
            "" => {}
            _ => return Capabilities::EMPTY,
        }
        let Some(stream) = stream else {
            return Capabilities::EMPTY;
        };
        if !stream.is_open() {
            return Capabilities::EMPTY;
        }
        let mut caps = Capabilities::EMPTY;
        if stream.is_readable() && can_read_stream(stream) {
            caps |= Capabilities::CAN_READ;
        }
        if stream.is_writable() {
            caps |= Capabilities::CAN_WRITE;
        }
        caps
    }

    fn create(&self, stream: S, format: &str) -> Self::Handler {
        tracing::trace!(format, "creating AVIF handler");
        let mut handler = AvifHandler::with_config(self.codec.clone(), stream, self.config.clone());
        if !format.is_empty() {
            handler.set_format(format);
        }
        handler
    }
}

impl<C> AvifPlugin<C> {
    /// Format descriptors for the names this plugin serves.
    pub fn formats(&self) -> [ImageFormat; 2] {
        [ImageFormat::Avif, ImageFormat::AvifSequence]
    }
}
