//! Planar YUV images as exchanged with the AV1 codec, and conversion to and
//! from interleaved 16-bit RGB.
//!
//! Decoding goes through the `yuv` crate's [`RGBConvert`] after chroma
//! upsampling. Chroma-derived matrices, which it does not cover, and the
//! encode direction use the coefficients below.

use alloc::vec;
use alloc::vec::Vec;

use ::yuv::YUV;
use ::yuv::color::{Depth, Range};
use ::yuv::convert::RGBConvert;
use imgref::{ImgRef, ImgVec};
use rgb::Rgba;

use crate::cicp::{ColorPrimaries, MatrixCoefficients, TransferCharacteristics};
use crate::error::CodecError;

/// Chroma subsampling of a YUV image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum YuvFormat {
    Yuv444,
    Yuv422,
    Yuv420,
    /// Luma only.
    Yuv400,
}

impl YuvFormat {
    /// Horizontal and vertical chroma shift.
    fn shift(self) -> (u32, u32) {
        match self {
            YuvFormat::Yuv444 | YuvFormat::Yuv400 => (0, 0),
            YuvFormat::Yuv422 => (1, 0),
            YuvFormat::Yuv420 => (1, 1),
        }
    }

    /// Dimensions of each chroma plane, or `(0, 0)` for luma-only images.
    pub fn chroma_size(self, width: u32, height: u32) -> (u32, u32) {
        if self == YuvFormat::Yuv400 {
            return (0, 0);
        }
        let (sx, sy) = self.shift();
        (width.div_ceil(1 << sx), height.div_ceil(1 << sy))
    }
}

/// Sample range of the luma and chroma planes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum YuvRange {
    #[default]
    Full,
    /// Studio swing: 16..=235 for luma, 16..=240 for chroma at 8 bits.
    Limited,
}

/// Chroma reconstruction filter used when decoding subsampled images.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ChromaUpsampling {
    #[default]
    Bilinear,
    Nearest,
}

/// Clean aperture box (`clap`) as stored in the container: rationals
/// describing a centered crop window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CleanAperture {
    pub width_n: u32,
    pub width_d: u32,
    pub height_n: u32,
    pub height_d: u32,
    pub horiz_off_n: i32,
    pub horiz_off_d: u32,
    pub vert_off_n: i32,
    pub vert_off_d: u32,
}

/// A decoded or to-be-encoded AV1 image.
///
/// Planes hold one `u16` per sample regardless of `depth`. Alpha is always
/// full range and luma-sized.
#[derive(Clone, Debug, PartialEq)]
pub struct YuvImage {
    pub width: u32,
    pub height: u32,
    /// Bits per sample: 8, 10 or 12.
    pub depth: u8,
    pub yuv_format: YuvFormat,
    pub range: YuvRange,
    pub y: Vec<u16>,
    pub u: Vec<u16>,
    pub v: Vec<u16>,
    pub alpha: Option<Vec<u16>>,
    pub color_primaries: ColorPrimaries,
    pub transfer_characteristics: TransferCharacteristics,
    pub matrix_coefficients: MatrixCoefficients,
    /// Embedded ICC profile; empty when absent.
    pub icc: Vec<u8>,
    pub clap: Option<CleanAperture>,
    /// Rotation angle in units of 90° counter-clockwise.
    pub irot: Option<u8>,
    /// Mirror axis: 0 flips top and bottom, 1 flips left and right.
    pub imir: Option<u8>,
}

impl YuvImage {
    /// Blank image with neutral chroma and unspecified color description.
    pub fn new(width: u32, height: u32, depth: u8, yuv_format: YuvFormat) -> Self {
        let luma = width as usize * height as usize;
        let (cw, ch) = yuv_format.chroma_size(width, height);
        let chroma = cw as usize * ch as usize;
        let half = 1u16 << (depth - 1);
        Self {
            width,
            height,
            depth,
            yuv_format,
            range: YuvRange::Full,
            y: vec![0; luma],
            u: vec![half; chroma],
            v: vec![half; chroma],
            alpha: None,
            color_primaries: ColorPrimaries::Unspecified,
            transfer_characteristics: TransferCharacteristics::Unspecified,
            matrix_coefficients: MatrixCoefficients::Unspecified,
            icc: Vec::new(),
            clap: None,
            irot: None,
            imir: None,
        }
    }

    /// Largest sample value at this depth.
    pub fn max_value(&self) -> u16 {
        ((1u32 << self.depth) - 1) as u16
    }

    pub fn has_alpha(&self) -> bool {
        self.alpha.is_some()
    }

    /// Check that plane lengths agree with the declared geometry.
    pub fn validate(&self) -> Result<(), CodecError> {
        if !matches!(self.depth, 8 | 10 | 12) {
            return Err(CodecError::InvalidInput(alloc::format!(
                "unsupported bit depth {}",
                self.depth
            )));
        }
        let luma = self.width as usize * self.height as usize;
        let (cw, ch) = self.yuv_format.chroma_size(self.width, self.height);
        let chroma = cw as usize * ch as usize;
        let alpha_ok = self.alpha.as_ref().is_none_or(|a| a.len() == luma);
        if self.y.len() != luma || self.u.len() != chroma || self.v.len() != chroma || !alpha_ok {
            return Err(CodecError::InvalidInput(alloc::format!(
                "plane sizes do not match {}x{} {:?}",
                self.width,
                self.height,
                self.yuv_format
            )));
        }
        Ok(())
    }

    /// Convert to interleaved RGBA with 16-bit samples.
    ///
    /// Luma-only images become gray RGB. Images without alpha get opaque
    /// alpha.
    pub fn to_rgba16(&self, upsampling: ChromaUpsampling) -> Result<ImgVec<Rgba<u16>>, CodecError> {
        self.validate()?;
        let w = self.width as usize;
        let h = self.height as usize;
        let converter = RgbConverter::new(
            self.depth,
            self.range,
            self.matrix_coefficients,
            self.color_primaries,
        )?;
        let alpha = match self.alpha.as_deref() {
            Some(plane) => Some((plane, RgbConverter::alpha(self.depth)?)),
            None => None,
        };
        let (sx, sy) = self.yuv_format.shift();
        let (cw, ch) = self.yuv_format.chroma_size(self.width, self.height);
        let luma_only = self.yuv_format == YuvFormat::Yuv400;

        let mut out = Vec::with_capacity(w * h);
        for row in 0..h {
            for col in 0..w {
                let i = row * w + col;
                let [r, g, b] = if luma_only {
                    let l = converter.luma(self.y[i]);
                    [l, l, l]
                } else {
                    let sample = |plane: &[u16]| match upsampling {
                        ChromaUpsampling::Nearest => {
                            plane[(row >> sy) * cw as usize + (col >> sx)]
                        }
                        ChromaUpsampling::Bilinear => {
                            bilinear(plane, cw as usize, ch as usize, col, row, sx, sy)
                        }
                    };
                    converter.rgb(self.y[i], sample(&self.u), sample(&self.v))
                };
                let a = alpha
                    .as_ref()
                    .map_or(u16::MAX, |(plane, conv)| conv.luma(plane[i]));
                out.push(Rgba::new(r, g, b, a));
            }
        }
        Ok(ImgVec::new(out, w, h))
    }

    /// Luma plane as 16-bit gray. Only meaningful for luma-only images.
    pub fn to_gray16(&self) -> Result<ImgVec<u16>, CodecError> {
        self.validate()?;
        let converter = RgbConverter::new(
            self.depth,
            self.range,
            self.matrix_coefficients,
            self.color_primaries,
        )?;
        let gray = self.y.iter().map(|&y| converter.luma(y)).collect();
        Ok(ImgVec::new(gray, self.width as usize, self.height as usize))
    }

    /// Build a color image from 16-bit RGBA. Alpha is kept when
    /// `with_alpha` is set.
    pub fn from_rgba16(
        img: ImgRef<'_, Rgba<u16>>,
        depth: u8,
        yuv_format: YuvFormat,
        matrix_coefficients: MatrixCoefficients,
        color_primaries: ColorPrimaries,
        with_alpha: bool,
    ) -> Self {
        let (w, h) = (img.width(), img.height());
        let mut yuv = YuvImage::new(w as u32, h as u32, depth, yuv_format);
        yuv.matrix_coefficients = matrix_coefficients;
        yuv.color_primaries = color_primaries;
        let max = f32::from(yuv.max_value());
        let quant = Quantization::new(depth, yuv.range);
        let matrix = YuvMatrix::for_cicp(matrix_coefficients, color_primaries);

        let mut cb_full = Vec::with_capacity(w * h);
        let mut cr_full = Vec::with_capacity(w * h);
        let mut alpha = with_alpha.then(|| Vec::with_capacity(w * h));
        for (i, px) in img.pixels().enumerate() {
            let [y, cb, cr] = matrix.from_rgb(unit(px.r), unit(px.g), unit(px.b));
            yuv.y[i] = quant.luma_to(y);
            cb_full.push(cb);
            cr_full.push(cr);
            if let Some(alpha) = alpha.as_mut() {
                alpha.push((unit(px.a) * max).round() as u16);
            }
        }
        yuv.alpha = alpha;

        let (sx, sy) = yuv_format.shift();
        let (cw, ch) = yuv_format.chroma_size(w as u32, h as u32);
        for cy in 0..ch as usize {
            for cx in 0..cw as usize {
                let i = cy * cw as usize + cx;
                yuv.u[i] = quant.chroma_to(average(&cb_full, w, h, cx, cy, sx, sy));
                yuv.v[i] = quant.chroma_to(average(&cr_full, w, h, cx, cy, sx, sy));
            }
        }
        yuv
    }

    /// Build a luma-only image from gray samples already at `depth` bits.
    pub fn from_gray(img: ImgRef<'_, u16>, depth: u8) -> Self {
        let mut yuv = YuvImage::new(img.width() as u32, img.height() as u32, depth, YuvFormat::Yuv400);
        yuv.y = img.pixels().collect();
        yuv
    }
}

/// YUV to 16-bit RGB conversion for one depth, range and matrix.
enum RgbConverter {
    Narrow(RGBConvert<u8>),
    /// `scale` stretches the converter's nominal white to `u16::MAX`.
    Wide { conv: RGBConvert<u16>, scale: f32 },
    ChromaDerived { quant: Quantization, kr: f32, kb: f32 },
}

impl RgbConverter {
    fn new(
        depth: u8,
        range: YuvRange,
        matrix: MatrixCoefficients,
        primaries: ColorPrimaries,
    ) -> Result<Self, CodecError> {
        use ::yuv::color::MatrixCoefficients as Yuv;

        let coefficients = match matrix {
            MatrixCoefficients::Identity => Yuv::Identity,
            MatrixCoefficients::Bt709 => Yuv::BT709,
            MatrixCoefficients::Fcc => Yuv::FCC,
            MatrixCoefficients::Bt470Bg => Yuv::BT470BG,
            MatrixCoefficients::Bt601 => Yuv::BT601,
            MatrixCoefficients::Smpte240 => Yuv::SMPTE240,
            MatrixCoefficients::YCgCo => Yuv::YCgCo,
            MatrixCoefficients::Bt2020Ncl => Yuv::BT2020NCL,
            MatrixCoefficients::Bt2020Cl => Yuv::BT2020CL,
            MatrixCoefficients::ChromaDerivedNcl | MatrixCoefficients::ChromaDerivedCl => {
                let (kr, kb) = match YuvMatrix::for_cicp(matrix, primaries) {
                    YuvMatrix::Luma { kr, kb } => (kr, kb),
                    _ => (0.299, 0.114),
                };
                return Ok(RgbConverter::ChromaDerived {
                    quant: Quantization::new(depth, range),
                    kr,
                    kb,
                });
            }
            _ => Yuv::BT601,
        };
        Self::standard(depth, range, coefficients)
    }

    /// Full-range identity conversion for alpha planes.
    fn alpha(depth: u8) -> Result<Self, CodecError> {
        Self::standard(depth, YuvRange::Full, ::yuv::color::MatrixCoefficients::Identity)
    }

    fn standard(
        depth: u8,
        range: YuvRange,
        coefficients: ::yuv::color::MatrixCoefficients,
    ) -> Result<Self, CodecError> {
        let yuv_range = match range {
            YuvRange::Full => Range::Full,
            YuvRange::Limited => Range::Limited,
        };
        if depth == 8 {
            return RGBConvert::<u8>::new(yuv_range, coefficients)
                .map(RgbConverter::Narrow)
                .map_err(conversion_error);
        }
        let yuv_depth = match depth {
            10 => Depth::Depth10,
            12 => Depth::Depth12,
            _ => Depth::Depth16,
        };
        let conv = RGBConvert::<u16>::new(yuv_range, coefficients, yuv_depth)
            .map_err(conversion_error)?;
        let white_code = match range {
            YuvRange::Full => ((1u32 << depth) - 1) as u16,
            YuvRange::Limited => 235 << (depth - 8),
        };
        let white = f32::from(conv.to_luma(white_code));
        if white <= 0.0 {
            return Err(CodecError::Decode(alloc::format!(
                "YUV conversion has no output range at {depth} bits"
            )));
        }
        Ok(RgbConverter::Wide {
            conv,
            scale: 65535.0 / white,
        })
    }

    fn rgb(&self, y: u16, u: u16, v: u16) -> [u16; 3] {
        match self {
            RgbConverter::Narrow(conv) => {
                let px = conv.to_rgb(YUV {
                    y: narrow(y),
                    u: narrow(u),
                    v: narrow(v),
                });
                [widen(px.r), widen(px.g), widen(px.b)]
            }
            RgbConverter::Wide { conv, scale } => {
                let px = conv.to_rgb(YUV { y, u, v });
                [stretch(px.r, *scale), stretch(px.g, *scale), stretch(px.b, *scale)]
            }
            RgbConverter::ChromaDerived { quant, kr, kb } => {
                let (y, cb, cr) = (quant.luma_from(y), quant.chroma_from(u), quant.chroma_from(v));
                let r = y + 2.0 * (1.0 - kr) * cr;
                let b = y + 2.0 * (1.0 - kb) * cb;
                let g = (y - kr * r - kb * b) / (1.0 - kr - kb);
                [rescale(r), rescale(g), rescale(b)]
            }
        }
    }

    fn luma(&self, y: u16) -> u16 {
        match self {
            RgbConverter::Narrow(conv) => widen(conv.to_luma(narrow(y))),
            RgbConverter::Wide { conv, scale } => stretch(conv.to_luma(y), *scale),
            RgbConverter::ChromaDerived { quant, .. } => rescale(quant.luma_from(y)),
        }
    }
}

fn conversion_error(e: impl core::fmt::Debug) -> CodecError {
    CodecError::Decode(alloc::format!("YUV conversion: {e:?}"))
}

fn narrow(v: u16) -> u8 {
    v.min(255) as u8
}

fn widen(v: u8) -> u16 {
    u16::from(v) * 257
}

fn stretch(v: u16, scale: f32) -> u16 {
    (f32::from(v) * scale).round().min(65535.0) as u16
}

/// Sample range scaling at a given depth.
#[derive(Clone, Copy, Debug)]
struct Quantization {
    y_offset: f32,
    y_scale: f32,
    c_offset: f32,
    c_scale: f32,
    max: f32,
}

impl Quantization {
    fn new(depth: u8, range: YuvRange) -> Self {
        let max = ((1u32 << depth) - 1) as f32;
        let half = (1u32 << (depth - 1)) as f32;
        match range {
            YuvRange::Full => Self {
                y_offset: 0.0,
                y_scale: max,
                c_offset: half,
                c_scale: max,
                max,
            },
            YuvRange::Limited => {
                let step = (1u32 << (depth - 8)) as f32;
                Self {
                    y_offset: 16.0 * step,
                    y_scale: 219.0 * step,
                    c_offset: half,
                    c_scale: 224.0 * step,
                    max,
                }
            }
        }
    }

    fn luma_to(&self, y: f32) -> u16 {
        (y * self.y_scale + self.y_offset).round().clamp(0.0, self.max) as u16
    }

    fn chroma_to(&self, c: f32) -> u16 {
        (c * self.c_scale + self.c_offset).round().clamp(0.0, self.max) as u16
    }

    fn luma_from(&self, v: u16) -> f32 {
        (f32::from(v) - self.y_offset) / self.y_scale
    }

    fn chroma_from(&self, v: u16) -> f32 {
        (f32::from(v) - self.c_offset) / self.c_scale
    }
}

/// RGB/YCbCr relationship selected by the matrix coefficients.
#[derive(Clone, Copy, Debug, PartialEq)]
enum YuvMatrix {
    /// Planes carry G, B, R.
    Identity,
    YCgCo,
    Luma { kr: f32, kb: f32 },
}

impl YuvMatrix {
    const BT601: Self = YuvMatrix::Luma { kr: 0.299, kb: 0.114 };

    fn for_cicp(matrix: MatrixCoefficients, primaries: ColorPrimaries) -> Self {
        match matrix {
            MatrixCoefficients::Identity => YuvMatrix::Identity,
            MatrixCoefficients::YCgCo => YuvMatrix::YCgCo,
            MatrixCoefficients::Bt709 => YuvMatrix::Luma { kr: 0.2126, kb: 0.0722 },
            MatrixCoefficients::Fcc => YuvMatrix::Luma { kr: 0.30, kb: 0.11 },
            MatrixCoefficients::Smpte240 => YuvMatrix::Luma { kr: 0.212, kb: 0.087 },
            MatrixCoefficients::Bt2020Ncl | MatrixCoefficients::Bt2020Cl => {
                YuvMatrix::Luma { kr: 0.2627, kb: 0.0593 }
            }
            MatrixCoefficients::ChromaDerivedNcl | MatrixCoefficients::ChromaDerivedCl => primaries
                .chromaticities()
                .luma_coefficients()
                .map_or(Self::BT601, |(kr, kb)| YuvMatrix::Luma {
                    kr: kr as f32,
                    kb: kb as f32,
                }),
            _ => Self::BT601,
        }
    }

    /// Normalized RGB to (Y, Cb, Cr) with chroma centered on zero.
    fn from_rgb(self, r: f32, g: f32, b: f32) -> [f32; 3] {
        match self {
            YuvMatrix::Identity => [g, b - 0.5, r - 0.5],
            YuvMatrix::YCgCo => [
                0.25 * r + 0.5 * g + 0.25 * b,
                -0.25 * r + 0.5 * g - 0.25 * b,
                0.5 * r - 0.5 * b,
            ],
            YuvMatrix::Luma { kr, kb } => {
                let y = kr * r + (1.0 - kr - kb) * g + kb * b;
                [y, (b - y) / (2.0 * (1.0 - kb)), (r - y) / (2.0 * (1.0 - kr))]
            }
        }
    }
}

fn unit(v: u16) -> f32 {
    f32::from(v) / 65535.0
}

fn rescale(v: f32) -> u16 {
    (v * 65535.0).round().clamp(0.0, 65535.0) as u16
}

/// Box average of the full-resolution samples covered by one chroma sample.
fn average(plane: &[f32], w: usize, h: usize, cx: usize, cy: usize, sx: u32, sy: u32) -> f32 {
    let x0 = cx << sx;
    let y0 = cy << sy;
    let x1 = ((cx + 1) << sx).min(w);
    let y1 = ((cy + 1) << sy).min(h);
    let mut sum = 0.0;
    for y in y0..y1 {
        for x in x0..x1 {
            sum += plane[y * w + x];
        }
    }
    sum / ((x1 - x0) * (y1 - y0)) as f32
}

/// Interpolate a chroma plane at a luma position, treating chroma samples as
/// centered on the luma samples they cover.
fn bilinear(plane: &[u16], cw: usize, ch: usize, col: usize, row: usize, sx: u32, sy: u32) -> u16 {
    let coord = |pos: usize, shift: u32, len: usize| {
        if shift == 0 {
            return (pos.min(len - 1), pos.min(len - 1), 0.0f32);
        }
        let c = ((pos as f32 + 0.5) / (1 << shift) as f32 - 0.5).max(0.0);
        let i0 = (c.floor() as usize).min(len - 1);
        let i1 = (i0 + 1).min(len - 1);
        (i0, i1, c - c.floor())
    };
    let (x0, x1, fx) = coord(col, sx, cw);
    let (y0, y1, fy) = coord(row, sy, ch);
    let at = |x: usize, y: usize| f32::from(plane[y * cw + x]);
    let top = at(x0, y0) * (1.0 - fx) + at(x1, y0) * fx;
    let bottom = at(x0, y1) * (1.0 - fx) + at(x1, y1) * fx;
    (top * (1.0 - fy) + bottom * fy).round() as u16
}
