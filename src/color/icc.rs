//! ICC profile classification using moxcms.

use moxcms::{ColorProfile, DataColorSpace, ToneReprCurve};

use super::{Chromaticities, Chromaticity, Curve, D50, ParametricCurve, Primaries, TransferFunction};

/// Colorants are compared after PCS adaptation, so they need a loose tolerance.
const COLORANT_TOLERANCE: f64 = 2e-3;

/// Describe an ICC profile as primaries plus a transfer function.
///
/// Returns `None` for unparseable profiles, non-RGB/gray data spaces and RGB
/// profiles whose three channel curves differ.
pub(super) fn describe(bytes: &[u8]) -> Option<(Primaries, TransferFunction)> {
    let profile = ColorProfile::new_from_slice(bytes).ok()?;

    match profile.color_space {
        DataColorSpace::Rgb => {
            let transfer = classify_curve(profile.red_trc.as_ref()?)?;
            let green = classify_curve(profile.green_trc.as_ref()?)?;
            let blue = classify_curve(profile.blue_trc.as_ref()?)?;
            if green != transfer || blue != transfer {
                return None;
            }
            Some((classify_primaries(&profile), transfer))
        }
        DataColorSpace::Gray => {
            let transfer = classify_curve(profile.gray_trc.as_ref()?)?;
            Some((Primaries::Srgb, transfer))
        }
        _ => None,
    }
}

fn classify_primaries(profile: &ColorProfile) -> Primaries {
    let ours = colorant_chromaticities(profile);
    for (candidate, primaries) in [
        (ColorProfile::new_srgb(), Primaries::Srgb),
        (ColorProfile::new_display_p3(), Primaries::DisplayP3),
    ] {
        if ours.approx_eq(&colorant_chromaticities(&candidate), COLORANT_TOLERANCE) {
            return primaries;
        }
    }
    // Colorants are D50-relative; pair them with the PCS white.
    Primaries::Custom(ours)
}

fn colorant_chromaticities(profile: &ColorProfile) -> Chromaticities {
    let xy = |x: f64, y: f64, z: f64| {
        let sum = x + y + z;
        if sum.abs() < f64::EPSILON {
            Chromaticity::new(0.0, 0.0)
        } else {
            Chromaticity::new(x / sum, y / sum)
        }
    };
    let r = &profile.red_colorant;
    let g = &profile.green_colorant;
    let b = &profile.blue_colorant;
    Chromaticities {
        red: xy(r.x as f64, r.y as f64, r.z as f64),
        green: xy(g.x as f64, g.y as f64, g.z as f64),
        blue: xy(b.x as f64, b.y as f64, b.z as f64),
        white: D50,
    }
}

fn classify_curve(curve: &ToneReprCurve) -> Option<TransferFunction> {
    match curve {
        ToneReprCurve::Lut(table) => match table.as_slice() {
            [] => Some(TransferFunction::Linear),
            // u8Fixed8Number gamma
            [gamma] => Some(gamma_or_linear(f32::from(*gamma) / 256.0)),
            _ if table_is_srgb(table) => Some(TransferFunction::Srgb),
            _ => Some(TransferFunction::Custom(Curve::Table(table.clone()))),
        },
        ToneReprCurve::Parametric(params) => {
            let curve = ParametricCurve::from_params(params)?;
            if params.len() == 1 {
                Some(gamma_or_linear(curve.g))
            } else if curve.is_srgb() {
                Some(TransferFunction::Srgb)
            } else {
                Some(TransferFunction::Custom(Curve::Parametric(curve)))
            }
        }
    }
}

fn gamma_or_linear(gamma: f32) -> TransferFunction {
    if (gamma - 1.0).abs() < 1e-3 {
        TransferFunction::Linear
    } else {
        TransferFunction::Gamma(gamma)
    }
}

fn table_is_srgb(table: &[u16]) -> bool {
    let last = (table.len() - 1) as f64;
    table.iter().enumerate().all(|(i, &v)| {
        let expected = linear_srgb::precise::srgb_to_linear_f64(i as f64 / last);
        (f64::from(v) / 65535.0 - expected).abs() < 2e-3
    })
}
