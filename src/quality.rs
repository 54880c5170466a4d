//! Quality setting and its mapping to AV1 quantizers.

use crate::codec::EncodeSettings;
use crate::config::EncoderConfig;
use crate::yuv::YuvFormat;

/// Coarsest AV1 quantizer.
pub const MAX_QUANTIZER: u8 = 63;

/// Encode quality, 0 (smallest) to 100 (lossless).
///
/// Setting a value above 100 clamps to 100. A negative value restores the
/// default of 52.
///
/// | Quality | max Q | min Q | max Q alpha | chroma |
/// |---------|-------|-------|-------------|--------|
/// | 100     | 0     | 0     | 0           | 4:4:4  |
/// | 90      | 6     | 0     | 0           | 4:4:4  |
/// | 75      | 15    | 0     | 0           | 4:2:2  |
/// | 52      | 30    | 10    | 0           | 4:2:0  |
/// | 0       | 63    | 43    | 23          | 4:2:0  |
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Quality(u8);

impl Quality {
    pub const DEFAULT: Quality = Quality(52);

    /// Interpret a host-provided quality value.
    pub fn new(value: i32) -> Self {
        if value < 0 {
            Self::DEFAULT
        } else {
            Quality(value.min(100) as u8)
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Upper quantizer bound for color planes.
    pub fn max_quantizer(self) -> u8 {
        (u32::from(MAX_QUANTIZER) * (100 - u32::from(self.0)) / 100) as u8
    }

    /// Lower quantizer bound for color planes.
    pub fn min_quantizer(self) -> u8 {
        self.max_quantizer().saturating_sub(20)
    }

    /// Upper quantizer bound for the alpha plane. Alpha is kept sharper than
    /// color.
    pub fn max_quantizer_alpha(self) -> u8 {
        self.max_quantizer().saturating_sub(40)
    }

    /// Chroma subsampling for color images at this quality.
    pub fn chroma_format(self) -> YuvFormat {
        match self.max_quantizer() {
            q if q < 10 => YuvFormat::Yuv444,
            q if q < 20 => YuvFormat::Yuv422,
            _ => YuvFormat::Yuv420,
        }
    }

    /// Full encoder settings. Alpha quantizers are only set for images with
    /// alpha.
    pub fn encode_settings(self, config: &EncoderConfig, has_alpha: bool) -> EncodeSettings {
        let mut settings = EncodeSettings::new(config);
        settings.min_quantizer = self.min_quantizer();
        settings.max_quantizer = self.max_quantizer();
        if has_alpha {
            settings.min_quantizer_alpha = 0;
            settings.max_quantizer_alpha = self.max_quantizer_alpha();
        }
        settings
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self::DEFAULT
    }
}
