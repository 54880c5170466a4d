//! Decoder and encoder configuration.
//!
//! The [`CodecConfig`] struct bundles the decoder settings, encoder settings
//! and [`Limits`] into a single value handed to a handler at construction.
//!
//! # Example
//!
//! ```
//! use avif_imageio::config::{CodecConfig, EncoderConfig};
//!
//! let config = CodecConfig::default().with_encoder(EncoderConfig::default().with_speed(4));
//! assert_eq!(config.encoder.speed, 4);
//! ```

use crate::limits::Limits;

/// Lower bound for the codec worker pool.
pub const MIN_THREADS: usize = 1;
/// Upper bound for the codec worker pool.
pub const MAX_THREADS: usize = 64;
/// Encoder speed used unless overridden (0 = slowest, 10 = fastest).
pub const DEFAULT_SPEED: u8 = 7;

/// Worker-thread count derived from the host's available parallelism,
/// clamped to [`MIN_THREADS`]..=[`MAX_THREADS`].
pub fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(MIN_THREADS)
        .clamp(MIN_THREADS, MAX_THREADS)
}

/// Settings passed to [`Av1Codec::new_decoder`](crate::codec::Av1Codec::new_decoder).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Worker threads the codec may use internally.
    pub threads: usize,
    /// Whether the codec should reject files with minor conformance violations.
    pub strict: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            strict: false,
        }
    }
}

impl DecoderConfig {
    /// Set the worker-thread count (clamped to 1..=64).
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.clamp(MIN_THREADS, MAX_THREADS);
        self
    }

    /// Enable or disable strict container validation.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Encoder settings that do not depend on the image being written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncoderConfig {
    /// Worker threads the codec may use internally.
    pub threads: usize,
    /// Encoder speed, 0 (slowest) to 10 (fastest).
    pub speed: u8,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            speed: DEFAULT_SPEED,
        }
    }
}

impl EncoderConfig {
    /// Set the worker-thread count (clamped to 1..=64).
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.clamp(MIN_THREADS, MAX_THREADS);
        self
    }

    /// Set encoder speed (clamped to 0..=10).
    pub fn with_speed(mut self, speed: u8) -> Self {
        self.speed = speed.min(10);
        self
    }
}

/// Everything a handler needs besides the codec and the stream.
#[derive(Clone, Debug, Default)]
pub struct CodecConfig {
    pub decoder: DecoderConfig,
    pub encoder: EncoderConfig,
    pub limits: Limits,
}

impl CodecConfig {
    /// Set decoder configuration.
    pub fn with_decoder(mut self, config: DecoderConfig) -> Self {
        self.decoder = config;
        self
    }

    /// Set encoder configuration.
    pub fn with_encoder(mut self, config: EncoderConfig) -> Self {
        self.encoder = config;
        self
    }

    /// Set dimension limits.
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }
}
