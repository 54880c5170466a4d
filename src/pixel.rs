//! Host image buffers.
//!
//! Uses `imgref::ImgVec` for 2D pixel data with typed pixels from the `rgb` crate.
//! All alpha is straight (not premultiplied).

use alloc::vec::Vec;

use imgref::{ImgRef, ImgVec};
use rgb::alt::BGRA;
use rgb::{Rgb, Rgba};

use crate::color::ColorSpace;

/// Pixel layout tag for a [`PixelData`] buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum PixelLayout {
    Mono,
    Indexed8,
    Gray8,
    Gray16,
    Rgb8,
    Rgba8,
    Bgra8,
    /// 10 bits per channel packed in a `u32` (red in the high bits).
    Rgb10,
    Rgb16,
    Rgba16,
    RgbF32,
    RgbaF32,
}

impl PixelLayout {
    /// Storage bits per pixel.
    pub fn bits_per_pixel(self) -> u32 {
        match self {
            PixelLayout::Mono => 1,
            PixelLayout::Indexed8 | PixelLayout::Gray8 => 8,
            PixelLayout::Gray16 => 16,
            PixelLayout::Rgb8 => 24,
            PixelLayout::Rgba8 | PixelLayout::Bgra8 | PixelLayout::Rgb10 => 32,
            PixelLayout::Rgb16 => 48,
            PixelLayout::Rgba16 => 64,
            PixelLayout::RgbF32 => 96,
            PixelLayout::RgbaF32 => 128,
        }
    }

    /// Whether samples carry more than 8 bits of precision per channel.
    pub fn is_high_bit_depth(self) -> bool {
        matches!(
            self,
            PixelLayout::Gray16
                | PixelLayout::Rgb10
                | PixelLayout::Rgb16
                | PixelLayout::Rgba16
                | PixelLayout::RgbF32
                | PixelLayout::RgbaF32
        )
    }
}

/// Pixel data in a typed buffer.
///
/// The variant determines both the pixel format and precision.
/// Width and height are embedded in the `ImgVec`.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum PixelData {
    /// One bit per pixel, stored one pixel per byte: 0 is black, anything else white.
    Mono(ImgVec<u8>),
    /// Palette indices. Indices past the end of the palette read as opaque black.
    Indexed8 {
        indices: ImgVec<u8>,
        palette: Vec<Rgba<u8>>,
    },
    Gray8(ImgVec<u8>),
    Gray16(ImgVec<u16>),
    Rgb8(ImgVec<Rgb<u8>>),
    Rgba8(ImgVec<Rgba<u8>>),
    /// 8-bit BGRA (blue, green, red, alpha byte order).
    Bgra8(ImgVec<BGRA<u8>>),
    /// `0b11rrrrrrrrrrggggggggggbbbbbbbbbb`; the top two bits are ignored.
    Rgb10(ImgVec<u32>),
    Rgb16(ImgVec<Rgb<u16>>),
    Rgba16(ImgVec<Rgba<u16>>),
    /// Nominal range 0.0..=1.0; values outside are clamped on conversion.
    RgbF32(ImgVec<Rgb<f32>>),
    RgbaF32(ImgVec<Rgba<f32>>),
}

/// A geometric operation applicable to any pixel type.
pub(crate) trait ImageOp {
    fn apply<T: Copy>(&self, img: ImgRef<'_, T>) -> ImgVec<T>;
}

impl PixelData {
    /// Layout tag for this buffer.
    pub fn layout(&self) -> PixelLayout {
        match self {
            PixelData::Mono(_) => PixelLayout::Mono,
            PixelData::Indexed8 { .. } => PixelLayout::Indexed8,
            PixelData::Gray8(_) => PixelLayout::Gray8,
            PixelData::Gray16(_) => PixelLayout::Gray16,
            PixelData::Rgb8(_) => PixelLayout::Rgb8,
            PixelData::Rgba8(_) => PixelLayout::Rgba8,
            PixelData::Bgra8(_) => PixelLayout::Bgra8,
            PixelData::Rgb10(_) => PixelLayout::Rgb10,
            PixelData::Rgb16(_) => PixelLayout::Rgb16,
            PixelData::Rgba16(_) => PixelLayout::Rgba16,
            PixelData::RgbF32(_) => PixelLayout::RgbF32,
            PixelData::RgbaF32(_) => PixelLayout::RgbaF32,
        }
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.size().0
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.size().1
    }

    /// `(width, height)` in pixels.
    pub fn size(&self) -> (u32, u32) {
        fn dims<T>(img: &ImgVec<T>) -> (u32, u32) {
            (img.width() as u32, img.height() as u32)
        }
        match self {
            PixelData::Mono(img) | PixelData::Gray8(img) => dims(img),
            PixelData::Indexed8 { indices, .. } => dims(indices),
            PixelData::Gray16(img) => dims(img),
            PixelData::Rgb8(img) => dims(img),
            PixelData::Rgba8(img) => dims(img),
            PixelData::Bgra8(img) => dims(img),
            PixelData::Rgb10(img) => dims(img),
            PixelData::Rgb16(img) => dims(img),
            PixelData::Rgba16(img) => dims(img),
            PixelData::RgbF32(img) => dims(img),
            PixelData::RgbaF32(img) => dims(img),
        }
    }

    /// Whether this pixel data has an alpha channel.
    ///
    /// Indexed images have alpha when any palette entry is not fully opaque.
    pub fn has_alpha(&self) -> bool {
        match self {
            PixelData::Rgba8(_)
            | PixelData::Bgra8(_)
            | PixelData::Rgba16(_)
            | PixelData::RgbaF32(_) => true,
            PixelData::Indexed8 { palette, .. } => palette.iter().any(|c| c.a < 255),
            _ => false,
        }
    }

    /// Whether the image carries no chroma: monochrome, gray, or an indexed
    /// image whose whole palette is achromatic.
    pub fn is_grayscale(&self) -> bool {
        match self {
            PixelData::Mono(_) | PixelData::Gray8(_) | PixelData::Gray16(_) => true,
            PixelData::Indexed8 { palette, .. } => {
                palette.iter().all(|c| c.r == c.g && c.g == c.b)
            }
            _ => false,
        }
    }

    /// Apply a geometric operation to whichever buffer this is.
    pub(crate) fn map_image(&self, op: &impl ImageOp) -> PixelData {
        match self {
            PixelData::Mono(img) => PixelData::Mono(op.apply(img.as_ref())),
            PixelData::Indexed8 { indices, palette } => PixelData::Indexed8 {
                indices: op.apply(indices.as_ref()),
                palette: palette.clone(),
            },
            PixelData::Gray8(img) => PixelData::Gray8(op.apply(img.as_ref())),
            PixelData::Gray16(img) => PixelData::Gray16(op.apply(img.as_ref())),
            PixelData::Rgb8(img) => PixelData::Rgb8(op.apply(img.as_ref())),
            PixelData::Rgba8(img) => PixelData::Rgba8(op.apply(img.as_ref())),
            PixelData::Bgra8(img) => PixelData::Bgra8(op.apply(img.as_ref())),
            PixelData::Rgb10(img) => PixelData::Rgb10(op.apply(img.as_ref())),
            PixelData::Rgb16(img) => PixelData::Rgb16(op.apply(img.as_ref())),
            PixelData::Rgba16(img) => PixelData::Rgba16(op.apply(img.as_ref())),
            PixelData::RgbF32(img) => PixelData::RgbF32(op.apply(img.as_ref())),
            PixelData::RgbaF32(img) => PixelData::RgbaF32(op.apply(img.as_ref())),
        }
    }

    /// Convert to straight-alpha RGBA16, allocating a new buffer.
    ///
    /// 8-bit channels are widened by `v * 257`, 10-bit channels by bit
    /// replication, floats are clamped to 0..=1 and rounded.
    pub fn to_rgba16(&self) -> ImgVec<Rgba<u16>> {
        match self {
            PixelData::Mono(img) => map_pixels(img, |&v| {
                let v = if v != 0 { u16::MAX } else { 0 };
                gray_rgba(v)
            }),
            PixelData::Indexed8 { indices, palette } => map_pixels(indices, |&i| {
                let c = palette.get(usize::from(i)).copied().unwrap_or(Rgba {
                    r: 0,
                    g: 0,
                    b: 0,
                    a: 255,
                });
                Rgba {
                    r: widen8(c.r),
                    g: widen8(c.g),
                    b: widen8(c.b),
                    a: widen8(c.a),
                }
            }),
            PixelData::Gray8(img) => map_pixels(img, |&v| gray_rgba(widen8(v))),
            PixelData::Gray16(img) => map_pixels(img, |&v| gray_rgba(v)),
            PixelData::Rgb8(img) => map_pixels(img, |p| Rgba {
                r: widen8(p.r),
                g: widen8(p.g),
                b: widen8(p.b),
                a: u16::MAX,
            }),
            PixelData::Rgba8(img) => map_pixels(img, |p| Rgba {
                r: widen8(p.r),
                g: widen8(p.g),
                b: widen8(p.b),
                a: widen8(p.a),
            }),
            PixelData::Bgra8(img) => map_pixels(img, |p| Rgba {
                r: widen8(p.r),
                g: widen8(p.g),
                b: widen8(p.b),
                a: widen8(p.a),
            }),
            PixelData::Rgb10(img) => map_pixels(img, |&v| Rgba {
                r: widen10(v >> 20),
                g: widen10(v >> 10),
                b: widen10(v),
                a: u16::MAX,
            }),
            PixelData::Rgb16(img) => map_pixels(img, |p| Rgba {
                r: p.r,
                g: p.g,
                b: p.b,
                a: u16::MAX,
            }),
            PixelData::Rgba16(img) => map_pixels(img, |&p| p),
            PixelData::RgbF32(img) => map_pixels(img, |p| Rgba {
                r: unit_to_u16(p.r),
                g: unit_to_u16(p.g),
                b: unit_to_u16(p.b),
                a: u16::MAX,
            }),
            PixelData::RgbaF32(img) => map_pixels(img, |p| Rgba {
                r: unit_to_u16(p.r),
                g: unit_to_u16(p.g),
                b: unit_to_u16(p.b),
                a: unit_to_u16(p.a),
            }),
        }
    }

    /// Convert to RGB16, discarding alpha.
    pub fn to_rgb16(&self) -> ImgVec<Rgb<u16>> {
        match self {
            PixelData::Rgb16(img) => map_pixels(img, |&p| p),
            _ => map_pixels(&self.to_rgba16(), |p| Rgb {
                r: p.r,
                g: p.g,
                b: p.b,
            }),
        }
    }

    /// Convert to RGBA8. Exact for 8-bit sources, rounded otherwise.
    pub fn to_rgba8(&self) -> ImgVec<Rgba<u8>> {
        match self {
            PixelData::Rgba8(img) => map_pixels(img, |&p| p),
            _ => map_pixels(&self.to_rgba16(), |p| Rgba {
                r: narrow16(p.r),
                g: narrow16(p.g),
                b: narrow16(p.b),
                a: narrow16(p.a),
            }),
        }
    }

    /// Convert to RGB8, discarding alpha.
    pub fn to_rgb8(&self) -> ImgVec<Rgb<u8>> {
        match self {
            PixelData::Rgb8(img) => map_pixels(img, |&p| p),
            _ => map_pixels(&self.to_rgba16(), |p| Rgb {
                r: narrow16(p.r),
                g: narrow16(p.g),
                b: narrow16(p.b),
            }),
        }
    }

    /// Convert to 16-bit gray.
    ///
    /// Gray sources are widened; color sources take the red channel, which
    /// is exact for the achromatic images this is meant for.
    pub fn to_gray16(&self) -> ImgVec<u16> {
        match self {
            PixelData::Gray16(img) => map_pixels(img, |&v| v),
            PixelData::Gray8(img) => map_pixels(img, |&v| widen8(v)),
            _ => map_pixels(&self.to_rgba16(), |p| p.r),
        }
    }

    /// Convert to 8-bit gray. See [`to_gray16`](Self::to_gray16).
    pub fn to_gray8(&self) -> ImgVec<u8> {
        match self {
            PixelData::Gray8(img) => map_pixels(img, |&v| v),
            _ => map_pixels(&self.to_gray16(), |&v| narrow16(v)),
        }
    }
}

/// One image with its color space, as exchanged with the host.
#[derive(Clone, Debug)]
pub struct Frame {
    pub pixels: PixelData,
    pub color_space: ColorSpace,
}

impl Frame {
    /// Frame tagged with the default (invalid) color space.
    pub fn new(pixels: PixelData) -> Self {
        Self {
            pixels,
            color_space: ColorSpace::default(),
        }
    }

    /// Attach a color space.
    pub fn with_color_space(mut self, color_space: ColorSpace) -> Self {
        self.color_space = color_space;
        self
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn layout(&self) -> PixelLayout {
        self.pixels.layout()
    }

    /// A frame is valid when it has at least one pixel.
    pub fn is_valid(&self) -> bool {
        let (w, h) = self.pixels.size();
        w > 0 && h > 0
    }
}

fn map_pixels<S, D>(img: &ImgVec<S>, f: impl FnMut(&S) -> D) -> ImgVec<D> {
    let w = img.width();
    let h = img.height();
    let buf: Vec<D> = img.rows().flat_map(|row| row.iter()).map(f).collect();
    ImgVec::new(buf, w, h)
}

fn gray_rgba(v: u16) -> Rgba<u16> {
    Rgba {
        r: v,
        g: v,
        b: v,
        a: u16::MAX,
    }
}

#[inline]
pub(crate) fn widen8(v: u8) -> u16 {
    u16::from(v) * 257
}

#[inline]
pub(crate) fn narrow16(v: u16) -> u8 {
    ((u32::from(v) * 255 + 32767) / 65535) as u8
}

#[inline]
fn widen10(v: u32) -> u16 {
    let v = (v & 0x3ff) as u16;
    (v << 6) | (v >> 4)
}

#[inline]
fn unit_to_u16(v: f32) -> u16 {
    (v.clamp(0.0, 1.0) * 65535.0 + 0.5) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn dimensions_and_alpha() {
        let img = ImgVec::new(vec![Rgb { r: 0u8, g: 0, b: 0 }; 100], 10, 10);
        let data = PixelData::Rgb8(img);
        assert_eq!(data.size(), (10, 10));
        assert!(!data.has_alpha());

        let img = ImgVec::new(
            vec![
                Rgba {
                    r: 0u8,
                    g: 0,
                    b: 0,
                    a: 255
                };
                4
            ],
            2,
            2,
        );
        let data = PixelData::Rgba8(img);
        assert!(data.has_alpha());
    }

    #[test]
    fn indexed_gray_palette() {
        let indices = ImgVec::new(vec![0u8, 1, 1, 0], 2, 2);
        let gray = PixelData::Indexed8 {
            indices: indices.clone(),
            palette: vec![
                Rgba {
                    r: 0,
                    g: 0,
                    b: 0,
                    a: 255,
                },
                Rgba {
                    r: 200,
                    g: 200,
                    b: 200,
                    a: 255,
                },
            ],
        };
        assert!(gray.is_grayscale());
        assert!(!gray.has_alpha());

        let colored = PixelData::Indexed8 {
            indices,
            palette: vec![
                Rgba {
                    r: 0,
                    g: 0,
                    b: 0,
                    a: 255,
                },
                Rgba {
                    r: 200,
                    g: 10,
                    b: 200,
                    a: 128,
                },
            ],
        };
        assert!(!colored.is_grayscale());
        assert!(colored.has_alpha());
    }

    #[test]
    fn eight_bit_roundtrip_through_16_is_exact() {
        let pixels: Vec<Rgb<u8>> = (0..=255u8).map(|v| Rgb { r: v, g: 255 - v, b: v / 2 }).collect();
        let data = PixelData::Rgba16(PixelData::Rgb8(ImgVec::new(pixels.clone(), 256, 1)).to_rgba16());
        assert_eq!(data.to_rgb8().into_buf(), pixels);
    }

    #[test]
    fn rgb10_unpacks_channels() {
        let packed = (3u32 << 30) | (1023 << 20) | (512 << 10);
        let data = PixelData::Rgb10(ImgVec::new(vec![packed], 1, 1));
        let px = data.to_rgba16().into_buf()[0];
        assert_eq!(px.r, 65535);
        assert_eq!(px.g >> 6, 512);
        assert_eq!(px.b, 0);
        assert_eq!(px.a, 65535);
        assert!(data.layout().is_high_bit_depth());
    }

    #[test]
    fn mono_expands_to_black_and_white() {
        let data = PixelData::Mono(ImgVec::new(vec![0u8, 1], 2, 1));
        assert_eq!(data.to_gray8().into_buf(), vec![0, 255]);
        assert!(data.is_grayscale());
    }

    #[test]
    fn float_clamps() {
        let data = PixelData::RgbF32(ImgVec::new(
            vec![Rgb {
                r: -1.0f32,
                g: 0.5,
                b: 2.0,
            }],
            1,
            1,
        ));
        let px = data.to_rgb8().into_buf()[0];
        assert_eq!((px.r, px.g, px.b), (0, 128, 255));
        assert_eq!(data.layout().bits_per_pixel(), 96);
    }

    #[test]
    fn frame_validity() {
        assert!(Frame::new(PixelData::Gray8(ImgVec::new(vec![7], 1, 1))).is_valid());
    }
}
