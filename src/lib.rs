//! # avif-imageio
//!
//! AVIF image I/O handler: reads still images and image sequences from a
//! byte stream into host pixel buffers, and writes host buffers back as
//! AVIF, negotiating pixel layout, bit depth, chroma subsampling and color
//! space in both directions.
//!
//! Compressed AV1 data is handled by a backend implementing [`Av1Codec`].
//! With the `avif-decode`/`avif-encode` features, `backend::AvifCodec`
//! provides one built on zenavif and ravif.
//! The crate owns everything around it: container sniffing, the lazy parse
//! state machine, sequence navigation, YUV conversion, CICP and ICC color
//! signalling, clean aperture and orientation transforms, and the quality to
//! quantizer mapping.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::io::Cursor;
//! use avif_imageio::{AvifPlugin, ImageIoHandler, ImageIoPlugin, Av1Codec};
//!
//! fn first_frame<C: Av1Codec + Clone>(codec: C, bytes: Vec<u8>) -> avif_imageio::Result<()> {
//!     let plugin = AvifPlugin::new(codec);
//!     let mut handler = plugin.create(Cursor::new(bytes), "avif");
//!     let frame = handler.read()?;
//!     println!("{}x{} {:?}", frame.width(), frame.height(), frame.layout());
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(any(feature = "avif-decode", feature = "avif-encode"))]
pub mod backend;
pub mod cicp;
pub mod codec;
pub mod color;
pub mod config;
mod decode;
mod encode;
mod error;
mod format;
pub mod handler;
mod limits;
pub mod negotiate;
pub mod pixel;
pub mod plugin;
mod quality;
pub mod sniff;
pub mod stream;
pub mod transform;
pub mod yuv;

#[cfg(any(feature = "avif-decode", feature = "avif-encode"))]
pub use backend::{AvifCodec, BackendError};
pub use codec::{Av1Codec, Av1Decoder, EncodeSettings};
pub use color::{ColorSpace, Primaries, TransferFunction};
pub use config::{CodecConfig, DecoderConfig, EncoderConfig};
pub use decode::{ContainerDecoder, ParseState};
pub use encode::EncodeRequest;
pub use error::{CodecError, Result};
pub use format::ImageFormat;
pub use handler::{AvifHandler, ImageIoHandler, ImageOption, OptionValue};
pub use limits::{Limits, MAX_DIMENSION};
pub use pixel::{Frame, PixelData, PixelLayout};
pub use plugin::{AvifPlugin, Capabilities, ImageIoPlugin};
pub use quality::Quality;
pub use stream::ImageStream;
pub use crate::yuv::{YuvFormat, YuvImage, YuvRange};
