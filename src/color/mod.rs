//! Host color-space value type.
//!
//! A [`ColorSpace`] is either a structured description (primaries plus a
//! transfer function), an ICC profile that parsed into such a description, or
//! an opaque ICC blob the parser could not classify. Only the first two are
//! [valid](ColorSpace::is_valid). An invalid color space still carries its
//! ICC bytes so they can be written back verbatim.

mod convert;
#[cfg(feature = "cms")]
mod icc;

use alloc::vec::Vec;

use glam::{DMat3, DVec3};

pub use convert::convert_rgba16;

/// CIE 1931 xy chromaticity coordinate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Chromaticity {
    pub x: f64,
    pub y: f64,
}

impl Chromaticity {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// XYZ with Y normalized to 1.
    pub fn to_xyz(self) -> DVec3 {
        DVec3::new(self.x / self.y, 1.0, (1.0 - self.x - self.y) / self.y)
    }

    fn approx_eq(self, other: Self, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance && (self.y - other.y).abs() <= tolerance
    }
}

/// Red, green, blue and white point chromaticities of an RGB space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Chromaticities {
    pub red: Chromaticity,
    pub green: Chromaticity,
    pub blue: Chromaticity,
    pub white: Chromaticity,
}

/// D65 white point.
pub const D65: Chromaticity = Chromaticity::new(0.3127, 0.3290);
/// D50 white point (ICC profile connection space).
pub const D50: Chromaticity = Chromaticity::new(0.3457, 0.3585);

impl Chromaticities {
    /// sRGB / BT.709 primaries, D65 white.
    pub const SRGB: Self = Self::from_array([0.64, 0.33, 0.30, 0.60, 0.15, 0.06, 0.3127, 0.3290]);
    /// Display P3 primaries, D65 white.
    pub const DISPLAY_P3: Self =
        Self::from_array([0.680, 0.320, 0.265, 0.690, 0.150, 0.060, 0.3127, 0.3290]);

    /// Build from `[rX, rY, gX, gY, bX, bY, wX, wY]`.
    pub const fn from_array(v: [f64; 8]) -> Self {
        Self {
            red: Chromaticity::new(v[0], v[1]),
            green: Chromaticity::new(v[2], v[3]),
            blue: Chromaticity::new(v[4], v[5]),
            white: Chromaticity::new(v[6], v[7]),
        }
    }

    /// `[rX, rY, gX, gY, bX, bY, wX, wY]`.
    pub fn to_array(&self) -> [f64; 8] {
        [
            self.red.x,
            self.red.y,
            self.green.x,
            self.green.y,
            self.blue.x,
            self.blue.y,
            self.white.x,
            self.white.y,
        ]
    }

    /// Whether every coordinate is within `tolerance` of `other`.
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        self.red.approx_eq(other.red, tolerance)
            && self.green.approx_eq(other.green, tolerance)
            && self.blue.approx_eq(other.blue, tolerance)
            && self.white.approx_eq(other.white, tolerance)
    }

    /// Linear RGB → XYZ matrix (Y of white = 1). `None` for degenerate primaries.
    pub fn rgb_to_xyz(&self) -> Option<DMat3> {
        let r = self.red.to_xyz();
        let g = self.green.to_xyz();
        let b = self.blue.to_xyz();
        let m = DMat3::from_cols(r, g, b);
        if m.determinant().abs() < f64::EPSILON || !m.is_finite() {
            return None;
        }
        let s = m.inverse() * self.white.to_xyz();
        let out = DMat3::from_cols(r * s.x, g * s.y, b * s.z);
        out.is_finite().then_some(out)
    }

    /// Luma coefficients (Kr, Kb) for chroma-derived YCbCr matrices.
    pub fn luma_coefficients(&self) -> Option<(f64, f64)> {
        let m = self.rgb_to_xyz()?;
        // Second row of the matrix is the Y contribution of each primary.
        Some((m.x_axis.y, m.z_axis.y))
    }
}

/// Color primaries of a structured color space.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub enum Primaries {
    Srgb,
    DisplayP3,
    Custom(Chromaticities),
}

impl Primaries {
    pub fn chromaticities(&self) -> Chromaticities {
        match self {
            Primaries::Srgb => Chromaticities::SRGB,
            Primaries::DisplayP3 => Chromaticities::DISPLAY_P3,
            Primaries::Custom(c) => *c,
        }
    }

    /// Collapse custom chromaticities that equal a named set.
    pub fn from_chromaticities(c: Chromaticities) -> Self {
        const TOLERANCE: f64 = 1e-4;
        if c.approx_eq(&Chromaticities::SRGB, TOLERANCE) {
            Primaries::Srgb
        } else if c.approx_eq(&Chromaticities::DISPLAY_P3, TOLERANCE) {
            Primaries::DisplayP3
        } else {
            Primaries::Custom(c)
        }
    }
}

/// ICC `para` curve: `y = (a·x + b)^g + e` for `x >= d`, else `c·x + f`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParametricCurve {
    pub g: f32,
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl ParametricCurve {
    /// Build from the 1, 3, 4, 5 or 7 parameters of an ICC `para` tag.
    pub fn from_params(p: &[f32]) -> Option<Self> {
        let curve = match *p {
            [g] => Self {
                g,
                a: 1.0,
                b: 0.0,
                c: 0.0,
                d: 0.0,
                e: 0.0,
                f: 0.0,
            },
            [g, a, b] => Self {
                g,
                a,
                b,
                c: 0.0,
                d: if a != 0.0 { -b / a } else { 0.0 },
                e: 0.0,
                f: 0.0,
            },
            [g, a, b, c] => Self {
                g,
                a,
                b,
                c: 0.0,
                d: if a != 0.0 { -b / a } else { 0.0 },
                e: c,
                f: c,
            },
            [g, a, b, c, d] => Self {
                g,
                a,
                b,
                c,
                d,
                e: 0.0,
                f: 0.0,
            },
            [g, a, b, c, d, e, f] => Self { g, a, b, c, d, e, f },
            _ => return None,
        };
        Some(curve)
    }

    /// Whether this is the sRGB curve.
    pub fn is_srgb(&self) -> bool {
        let srgb = [2.4, 1.0 / 1.055, 0.055 / 1.055, 1.0 / 12.92, 0.04045];
        let ours = [self.g, self.a, self.b, self.c, self.d];
        ours.iter()
            .zip(srgb)
            .all(|(&v, s): (&f32, f64)| (f64::from(v) - s).abs() < 1e-3)
            && self.e.abs() < 1e-4
            && self.f.abs() < 1e-4
    }
}

/// A transfer curve the named variants cannot express.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Curve {
    /// Sampled curve, evenly spaced over 0..=1, values scaled to `u16::MAX`.
    Table(Vec<u16>),
    Parametric(ParametricCurve),
}

/// Transfer function between encoded values and linear light.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum TransferFunction {
    Linear,
    /// The piecewise sRGB curve.
    Srgb,
    /// Pure power law: `linear = encoded^gamma`.
    Gamma(f32),
    Custom(Curve),
}

impl TransferFunction {
    /// Gamma value of a pure power law.
    pub fn gamma(&self) -> Option<f32> {
        match self {
            TransferFunction::Gamma(g) => Some(*g),
            _ => None,
        }
    }
}

/// Color space attached to a [`Frame`](crate::Frame).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColorSpace {
    description: Option<(Primaries, TransferFunction)>,
    icc: Option<Vec<u8>>,
}

impl ColorSpace {
    /// Structured color space without an ICC profile.
    pub fn new(primaries: Primaries, transfer: TransferFunction) -> Self {
        Self {
            description: Some((primaries, transfer)),
            icc: None,
        }
    }

    /// sRGB.
    pub fn srgb() -> Self {
        Self::new(Primaries::Srgb, TransferFunction::Srgb)
    }

    /// sRGB primaries with a linear transfer.
    pub fn srgb_linear() -> Self {
        Self::new(Primaries::Srgb, TransferFunction::Linear)
    }

    /// Display P3 (sRGB transfer).
    pub fn display_p3() -> Self {
        Self::new(Primaries::DisplayP3, TransferFunction::Srgb)
    }

    /// Parse an ICC profile.
    ///
    /// The bytes are always retained. The result is valid only when the
    /// profile parses and describes an RGB or gray space with matching
    /// per-channel curves.
    pub fn from_icc_profile(bytes: &[u8]) -> Self {
        #[cfg(feature = "cms")]
        let description = icc::describe(bytes);
        #[cfg(not(feature = "cms"))]
        let description = None;

        Self {
            description,
            icc: Some(bytes.to_vec()),
        }
    }

    /// Whether this color space has a structured description.
    pub fn is_valid(&self) -> bool {
        self.description.is_some()
    }

    pub fn primaries(&self) -> Option<&Primaries> {
        self.description.as_ref().map(|(p, _)| p)
    }

    pub fn transfer_function(&self) -> Option<&TransferFunction> {
        self.description.as_ref().map(|(_, t)| t)
    }

    /// Raw ICC profile bytes, when this color space came from one.
    pub fn icc_profile(&self) -> Option<&[u8]> {
        self.icc.as_deref()
    }

    /// Same primaries with a different transfer function. Drops any ICC bytes.
    pub fn with_transfer_function(&self, transfer: TransferFunction) -> Self {
        match &self.description {
            Some((p, _)) => Self::new(*p, transfer),
            None => Self::default(),
        }
    }

    /// Same transfer function with different primaries. Drops any ICC bytes.
    pub fn with_primaries(&self, primaries: Primaries) -> Self {
        match &self.description {
            Some((_, t)) => Self::new(primaries, t.clone()),
            None => Self::default(),
        }
    }
}
