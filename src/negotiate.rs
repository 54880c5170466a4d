//! Negotiation between host buffers and codec images.
//!
//! Decode side: pick the host layout for a decoded [`YuvImage`], convert it
//! and apply container transforms. Encode side: inspect a [`Frame`] and
//! decide bit depth, chroma subsampling, CICP signalling and any color
//! conversion before building the [`YuvImage`] handed to the codec.

use alloc::string::ToString;
use alloc::vec::Vec;

use imgref::ImgVec;

use crate::cicp::{
    self, ColorPrimaries, MatrixCoefficients, TransferCharacteristics, decode_color_space,
};
use crate::codec::EncodeSettings;
use crate::color::{ColorSpace, convert_rgba16};
use crate::config::EncoderConfig;
use crate::error::CodecError;
use crate::limits::Limits;
use crate::pixel::{Frame, PixelData, PixelLayout};
use crate::quality::Quality;
use crate::transform::apply_container_transforms;
use crate::yuv::{ChromaUpsampling, YuvFormat, YuvImage};

/// Host layout for a decoded image.
///
/// | depth | alpha | luma only | layout |
/// |-------|-------|-----------|--------|
/// | > 8   | yes   | any       | Rgba16 |
/// | > 8   | no    | yes       | Gray16 |
/// | > 8   | no    | no        | Rgb16  |
/// | 8     | yes   | any       | Rgba8  |
/// | 8     | no    | yes       | Gray8  |
/// | 8     | no    | no        | Rgb8   |
pub fn decode_layout(depth: u8, has_alpha: bool, yuv_format: YuvFormat) -> PixelLayout {
    let luma_only = yuv_format == YuvFormat::Yuv400;
    match (depth > 8, has_alpha, luma_only) {
        (true, true, _) => PixelLayout::Rgba16,
        (true, false, true) => PixelLayout::Gray16,
        (true, false, false) => PixelLayout::Rgb16,
        (false, true, _) => PixelLayout::Rgba8,
        (false, false, true) => PixelLayout::Gray8,
        (false, false, false) => PixelLayout::Rgb8,
    }
}

/// Chroma reconstruction: fast nearest-neighbor for 8-bit sequences,
/// bilinear otherwise.
pub fn chroma_upsampling(depth: u8, is_sequence: bool) -> ChromaUpsampling {
    if is_sequence && depth <= 8 {
        ChromaUpsampling::Nearest
    } else {
        ChromaUpsampling::Bilinear
    }
}

fn yuv_to_pixels(
    yuv: &YuvImage,
    layout: PixelLayout,
    upsampling: ChromaUpsampling,
) -> Result<PixelData, CodecError> {
    let pixels = match layout {
        PixelLayout::Gray16 => PixelData::Gray16(yuv.to_gray16()?),
        PixelLayout::Gray8 => PixelData::Gray8(PixelData::Gray16(yuv.to_gray16()?).to_gray8()),
        PixelLayout::Rgba16 => PixelData::Rgba16(yuv.to_rgba16(upsampling)?),
        PixelLayout::Rgb16 => PixelData::Rgb16(PixelData::Rgba16(yuv.to_rgba16(upsampling)?).to_rgb16()),
        PixelLayout::Rgba8 => PixelData::Rgba8(PixelData::Rgba16(yuv.to_rgba16(upsampling)?).to_rgba8()),
        PixelLayout::Rgb8 => PixelData::Rgb8(PixelData::Rgba16(yuv.to_rgba16(upsampling)?).to_rgb8()),
        other => {
            return Err(CodecError::Decode(alloc::format!(
                "no conversion to {other:?}"
            )));
        }
    };
    Ok(pixels)
}

/// Convert a decoded image to a host frame: layout selection, YUV to RGB,
/// container transforms and color space.
pub fn frame_from_yuv(yuv: &YuvImage, is_sequence: bool) -> Result<Frame, CodecError> {
    let layout = decode_layout(yuv.depth, yuv.has_alpha(), yuv.yuv_format);
    let upsampling = chroma_upsampling(yuv.depth, is_sequence);
    tracing::trace!(
        ?layout,
        ?upsampling,
        depth = yuv.depth,
        format = ?yuv.yuv_format,
        "converting decoded image"
    );
    let pixels = yuv_to_pixels(yuv, layout, upsampling)
        .map_err(|e| CodecError::Decode(e.to_string()))?;
    let pixels = apply_container_transforms(pixels, yuv);
    let color_space = decode_color_space(
        &yuv.icc,
        yuv.color_primaries,
        yuv.transfer_characteristics,
    );
    Ok(Frame::new(pixels).with_color_space(color_space))
}

/// Bits per sample needed to keep a host layout's precision.
pub fn encode_depth(layout: PixelLayout) -> u8 {
    let high = matches!(
        layout,
        PixelLayout::Rgb10 | PixelLayout::Gray16 | PixelLayout::Rgb16 | PixelLayout::Rgba16
    ) || layout.bits_per_pixel() > 32;
    if high { 10 } else { 8 }
}

/// Everything decided about an encode before pixels are converted.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodePlan {
    /// Write a luma-only image.
    pub grayscale: bool,
    pub depth: u8,
    pub has_alpha: bool,
    pub yuv_format: YuvFormat,
    pub primaries: ColorPrimaries,
    pub transfer: TransferCharacteristics,
    pub matrix: MatrixCoefficients,
    /// Convert pixels into this space first.
    pub convert_to: Option<ColorSpace>,
    pub icc: Option<Vec<u8>>,
    pub settings: EncodeSettings,
}

impl EncodePlan {
    /// Plan the encode of `frame`.
    ///
    /// Fails for empty frames and frames outside `limits`.
    pub fn new(
        frame: &Frame,
        quality: Quality,
        config: &EncoderConfig,
        limits: &Limits,
    ) -> Result<Self, CodecError> {
        if !frame.is_valid() {
            return Err(CodecError::InvalidInput("no image data to save".into()));
        }
        limits.check_dimensions(frame.width(), frame.height())?;

        let layout = frame.layout();
        let has_alpha = frame.pixels.has_alpha();
        let grayscale = frame.pixels.is_grayscale() && !has_alpha;
        let depth = encode_depth(layout);

        let plan = if grayscale {
            let (primaries, transfer, matrix) = cicp::encode_gray_mapping(&frame.color_space);
            EncodePlan {
                grayscale,
                depth,
                has_alpha,
                yuv_format: YuvFormat::Yuv400,
                primaries,
                transfer,
                matrix,
                convert_to: None,
                icc: None,
                settings: quality.encode_settings(config, has_alpha),
            }
        } else {
            let mapping = cicp::encode_color_mapping(&frame.color_space);
            EncodePlan {
                grayscale,
                depth: if mapping.needs_high_depth { depth.max(10) } else { depth },
                has_alpha,
                yuv_format: quality.chroma_format(),
                primaries: mapping.primaries,
                transfer: mapping.transfer,
                matrix: mapping.matrix,
                convert_to: mapping.convert_to,
                icc: mapping.icc,
                settings: quality.encode_settings(config, has_alpha),
            }
        };
        tracing::debug!(
            layout = ?layout,
            depth = plan.depth,
            grayscale = plan.grayscale,
            format = ?plan.yuv_format,
            primaries = plan.primaries.code(),
            transfer = plan.transfer.code(),
            matrix = plan.matrix.code(),
            convert = plan.convert_to.is_some(),
            "planned AVIF encode"
        );
        Ok(plan)
    }

    /// Convert `frame` into the codec image this plan describes.
    pub fn build_image(&self, frame: &Frame) -> Result<YuvImage, CodecError> {
        let mut image = if self.grayscale {
            let gray = if self.depth > 8 {
                let wide = frame.pixels.to_gray16();
                let (w, h) = (wide.width(), wide.height());
                let samples = wide
                    .into_buf()
                    .into_iter()
                    .map(|v| ((f32::from(v) / 65535.0) * 1023.0 + 0.5).min(1023.0) as u16)
                    .collect();
                ImgVec::new(samples, w, h)
            } else {
                let narrow = frame.pixels.to_gray8();
                let (w, h) = (narrow.width(), narrow.height());
                ImgVec::new(narrow.into_buf().into_iter().map(u16::from).collect(), w, h)
            };
            YuvImage::from_gray(gray.as_ref(), self.depth)
        } else {
            let mut rgba = frame.pixels.to_rgba16();
            if let Some(target) = &self.convert_to {
                convert_rgba16(rgba.buf_mut(), &frame.color_space, target).inspect_err(|e| {
                    tracing::warn!(error = %e, "color space conversion before encoding failed");
                })?;
            }
            YuvImage::from_rgba16(
                rgba.as_ref(),
                self.depth,
                self.yuv_format,
                self.matrix,
                self.primaries,
                self.has_alpha,
            )
        };
        image.color_primaries = self.primaries;
        image.transfer_characteristics = self.transfer;
        image.matrix_coefficients = self.matrix;
        if let Some(icc) = &self.icc {
            image.icc = icc.clone();
        }
        Ok(image)
    }
}
