//! AVIF decode adapter using zenavif.

use alloc::string::ToString;
use alloc::vec::Vec;

use imgref::ImgVec;
use zenavif::DecodedImage;

use super::BackendError;
use crate::cicp::MatrixCoefficients;
use crate::yuv::{YuvFormat, YuvImage, YuvRange};

/// Depth used for zenavif's 16-bit output.
const WIDE_DEPTH: u8 = 12;

/// Decode an AVIF file into codec planes.
pub(super) fn decode(data: &[u8]) -> Result<YuvImage, BackendError> {
    let image = zenavif::decode(data).map_err(|e| BackendError::Decode(e.to_string()))?;
    tracing::debug!(
        width = image.width(),
        height = image.height(),
        depth = image.bit_depth(),
        alpha = image.has_alpha(),
        "zenavif decoded image"
    );

    let (w, h) = (image.width(), image.height());
    let yuv = match image {
        DecodedImage::Gray8(img) => gray(w, h, 8, img.as_ref().pixels().map(u16::from)),
        DecodedImage::Gray16(img) => gray(w, h, WIDE_DEPTH, img.as_ref().pixels().map(narrow16)),
        DecodedImage::Rgb8(img) => identity(
            w,
            h,
            8,
            img.as_ref().pixels().map(|p| [p.r, p.g, p.b, u8::MAX].map(u16::from)),
            false,
        ),
        DecodedImage::Rgba8(img) => identity(
            w,
            h,
            8,
            img.as_ref().pixels().map(|p| [p.r, p.g, p.b, p.a].map(u16::from)),
            true,
        ),
        DecodedImage::Rgb16(img) => identity(
            w,
            h,
            WIDE_DEPTH,
            img.as_ref().pixels().map(|p| [p.r, p.g, p.b, u16::MAX].map(narrow16)),
            false,
        ),
        DecodedImage::Rgba16(img) => identity(
            w,
            h,
            WIDE_DEPTH,
            img.as_ref().pixels().map(|p| [p.r, p.g, p.b, p.a].map(narrow16)),
            true,
        ),
        _ => return Err(BackendError::Decode("unsupported pixel layout".into())),
    };
    Ok(yuv)
}

fn narrow16(v: u16) -> u16 {
    v >> (16 - WIDE_DEPTH)
}

fn gray(width: usize, height: usize, depth: u8, samples: impl Iterator<Item = u16>) -> YuvImage {
    let plane: ImgVec<u16> = ImgVec::new(samples.collect(), width, height);
    YuvImage::from_gray(plane.as_ref(), depth)
}

/// Planes carry G, B, R under the identity matrix; `pixels` are RGBA.
fn identity(
    width: usize,
    height: usize,
    depth: u8,
    pixels: impl Iterator<Item = [u16; 4]>,
    has_alpha: bool,
) -> YuvImage {
    let mut yuv = YuvImage::new(width as u32, height as u32, depth, YuvFormat::Yuv444);
    yuv.range = YuvRange::Full;
    yuv.matrix_coefficients = MatrixCoefficients::Identity;
    let mut alpha = Vec::with_capacity(if has_alpha { width * height } else { 0 });
    for (i, [r, g, b, a]) in pixels.enumerate() {
        yuv.y[i] = g;
        yuv.u[i] = b;
        yuv.v[i] = r;
        if has_alpha {
            alpha.push(a);
        }
    }
    yuv.alpha = has_alpha.then_some(alpha);
    yuv
}
