//! Pixel conversion between structured color spaces through moxcms.

use rgb::Rgba;

use super::ColorSpace;
use crate::error::CodecError;

/// Convert RGBA16 pixels from `from` into `to` in place. Alpha is untouched.
///
/// Both spaces need a structured description with non-degenerate primaries.
#[cfg(feature = "cms")]
pub fn convert_rgba16(
    pixels: &mut [Rgba<u16>],
    from: &ColorSpace,
    to: &ColorSpace,
) -> Result<(), CodecError> {
    use alloc::vec::Vec;
    use moxcms::{Layout, TransformOptions};

    let src = profile::build(from)
        .ok_or_else(|| CodecError::Encode("source color space cannot be converted".into()))?;
    let dst = profile::build(to)
        .ok_or_else(|| CodecError::Encode("target color space cannot be converted".into()))?;

    let transform = src
        .create_transform_16bit(Layout::Rgba, &dst, Layout::Rgba, TransformOptions::default())
        .map_err(|e| CodecError::Encode(alloc::format!("moxcms transform: {e:?}")))?;

    let input: Vec<u16> = pixels.iter().flat_map(|p| [p.r, p.g, p.b, p.a]).collect();
    let mut output = alloc::vec![0u16; input.len()];
    transform
        .transform(&input, &mut output)
        .map_err(|e| CodecError::Encode(alloc::format!("moxcms transform execution: {e:?}")))?;

    for (p, c) in pixels.iter_mut().zip(output.chunks_exact(4)) {
        (p.r, p.g, p.b) = (c[0], c[1], c[2]);
    }
    Ok(())
}

/// Without a CMS no conversion is possible.
#[cfg(not(feature = "cms"))]
pub fn convert_rgba16(
    _pixels: &mut [Rgba<u16>],
    _from: &ColorSpace,
    _to: &ColorSpace,
) -> Result<(), CodecError> {
    Err(CodecError::Encode(
        "color conversion requires the `cms` feature".into(),
    ))
}

#[cfg(feature = "cms")]
mod profile {
    use alloc::vec;

    use moxcms::{ColorPrimaries, ColorProfile, ToneReprCurve, XyY};

    use crate::color::{Chromaticity, ColorSpace, Curve, Primaries, TransferFunction};

    /// RGB display profile for a structured color space.
    pub(super) fn build(color_space: &ColorSpace) -> Option<ColorProfile> {
        let transfer = color_space.transfer_function()?;
        let mut profile = match color_space.primaries()? {
            Primaries::Srgb => ColorProfile::new_srgb(),
            Primaries::DisplayP3 => ColorProfile::new_display_p3(),
            Primaries::Custom(c) => {
                c.rgb_to_xyz()?;
                let mut profile = ColorProfile::new_srgb();
                profile.update_rgb_colorimetry(
                    XyY::new(c.white.x, c.white.y, 1.0),
                    ColorPrimaries {
                        red: chromaticity(c.red),
                        green: chromaticity(c.green),
                        blue: chromaticity(c.blue),
                    },
                );
                profile.media_white_point = None;
                profile
            }
        };

        // The named profiles carry CICP sRGB transfer tags that would
        // override the curves below.
        profile.cicp = None;
        profile.description = None;
        let curve = tone_curve(transfer);
        profile.red_trc = Some(curve.clone());
        profile.green_trc = Some(curve.clone());
        profile.blue_trc = Some(curve);
        Some(profile)
    }

    fn chromaticity(c: Chromaticity) -> moxcms::Chromaticity {
        moxcms::Chromaticity::new(c.x as f32, c.y as f32)
    }

    fn tone_curve(transfer: &TransferFunction) -> ToneReprCurve {
        match transfer {
            TransferFunction::Linear => ToneReprCurve::Parametric(vec![1.0]),
            TransferFunction::Srgb => ToneReprCurve::Parametric(vec![
                2.4,
                1.0 / 1.055,
                0.055 / 1.055,
                1.0 / 12.92,
                0.04045,
            ]),
            TransferFunction::Gamma(g) => ToneReprCurve::Parametric(vec![*g]),
            TransferFunction::Custom(Curve::Table(table)) => ToneReprCurve::Lut(table.clone()),
            TransferFunction::Custom(Curve::Parametric(p)) => {
                ToneReprCurve::Parametric(vec![p.g, p.a, p.b, p.c, p.d, p.e, p.f])
            }
        }
    }
}
