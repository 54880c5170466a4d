//! Geometric transforms signalled by the container: clean aperture crop,
//! rotation and mirroring. Applied in that order.

use alloc::vec::Vec;

use imgref::{ImgRef, ImgVec};

use crate::pixel::{ImageOp, PixelData};
use crate::yuv::{CleanAperture, YuvImage};

/// Crop rectangle in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Crop {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl CleanAperture {
    /// Crop window for an image of the given size.
    ///
    /// `None` when any denominator is zero or the window is empty. The
    /// window size is rounded and capped at the image size; the offsets are
    /// relative to the centered position and clamped inside the image.
    pub fn crop_rect(&self, width: u32, height: u32) -> Option<Crop> {
        if self.has_zero_denominator() {
            return None;
        }
        let (width, height) = (i64::from(width), i64::from(height));
        let new_width =
            ((f64::from(self.width_n) / f64::from(self.width_d) + 0.5) as i64).min(width);
        let new_height =
            ((f64::from(self.height_n) / f64::from(self.height_d) + 0.5) as i64).min(height);
        if new_width <= 0 || new_height <= 0 {
            return None;
        }
        let offset = |n: i32, d: u32, full: i64, size: i64| {
            let off = (f64::from(n) / f64::from(d) + (full - size) as f64 / 2.0 + 0.5) as i64;
            off.clamp(0, full - size)
        };
        Some(Crop {
            x: offset(self.horiz_off_n, self.horiz_off_d, width, new_width) as usize,
            y: offset(self.vert_off_n, self.vert_off_d, height, new_height) as usize,
            width: new_width as usize,
            height: new_height as usize,
        })
    }

    fn has_zero_denominator(&self) -> bool {
        self.width_d == 0 || self.height_d == 0 || self.horiz_off_d == 0 || self.vert_off_d == 0
    }
}

/// Rotation in 90° steps, named by visual direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rotation {
    Ccw90,
    Rotate180,
    Cw90,
}

impl Rotation {
    /// Map an `irot` angle (units of 90° counter-clockwise).
    pub fn from_irot(angle: u8) -> Option<Self> {
        match angle {
            1 => Some(Rotation::Ccw90),
            2 => Some(Rotation::Rotate180),
            3 => Some(Rotation::Cw90),
            _ => None,
        }
    }
}

/// Mirror axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mirror {
    /// Swap top and bottom rows.
    TopBottom,
    /// Swap left and right columns.
    LeftRight,
}

impl Mirror {
    pub fn from_imir(axis: u8) -> Option<Self> {
        match axis {
            0 => Some(Mirror::TopBottom),
            1 => Some(Mirror::LeftRight),
            _ => None,
        }
    }
}

fn remap<T: Copy>(
    img: ImgRef<'_, T>,
    width: usize,
    height: usize,
    source: impl Fn(usize, usize) -> (usize, usize),
) -> ImgVec<T> {
    let buf = img.buf();
    let stride = img.stride();
    let mut out = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let (sx, sy) = source(x, y);
            out.push(buf[sy * stride + sx]);
        }
    }
    ImgVec::new(out, width, height)
}

impl ImageOp for Crop {
    fn apply<T: Copy>(&self, img: ImgRef<'_, T>) -> ImgVec<T> {
        remap(img, self.width, self.height, |x, y| (x + self.x, y + self.y))
    }
}

impl ImageOp for Rotation {
    fn apply<T: Copy>(&self, img: ImgRef<'_, T>) -> ImgVec<T> {
        let (w, h) = (img.width(), img.height());
        match self {
            Rotation::Ccw90 => remap(img, h, w, |x, y| (w - 1 - y, x)),
            Rotation::Rotate180 => remap(img, w, h, |x, y| (w - 1 - x, h - 1 - y)),
            Rotation::Cw90 => remap(img, h, w, |x, y| (y, h - 1 - x)),
        }
    }
}

impl ImageOp for Mirror {
    fn apply<T: Copy>(&self, img: ImgRef<'_, T>) -> ImgVec<T> {
        let (w, h) = (img.width(), img.height());
        match self {
            Mirror::TopBottom => remap(img, w, h, |x, y| (x, h - 1 - y)),
            Mirror::LeftRight => remap(img, w, h, |x, y| (w - 1 - x, y)),
        }
    }
}

/// Apply the crop, rotation and mirror carried by `yuv` to decoded pixels.
pub fn apply_container_transforms(mut pixels: PixelData, yuv: &YuvImage) -> PixelData {
    if let Some(clap) = &yuv.clap {
        if clap.has_zero_denominator() {
            tracing::warn!("Wrong values in clean aperture box");
        } else if let Some(crop) = clap.crop_rect(pixels.width(), pixels.height()) {
            tracing::trace!(?crop, "applying clean aperture");
            pixels = pixels.map_image(&crop);
        }
    }
    if let Some(rotation) = yuv.irot.and_then(Rotation::from_irot) {
        pixels = pixels.map_image(&rotation);
    }
    if let Some(mirror) = yuv.imir.and_then(Mirror::from_imir) {
        pixels = pixels.map_image(&mirror);
    }
    pixels
}
