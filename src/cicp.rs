//! CICP code points (ITU-T H.273) and their mapping to host color spaces.
//!
//! Each enumeration has one explicit code table used in both directions, so
//! `from_code(code(x)) == x` for every named variant. Codes without a name
//! round-trip through `Other`.

use alloc::vec::Vec;

use crate::color::{Chromaticities, Chromaticity, ColorSpace, Primaries, TransferFunction};

macro_rules! code_table {
    (
        $(#[$meta:meta])*
        $name:ident, $table:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $code:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[non_exhaustive]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
            /// A code without a named variant.
            Other(u16),
        }

        const $table: &[(u16, $name)] = &[ $( ($code, $name::$variant), )+ ];

        impl $name {
            /// Look up a numeric code.
            pub fn from_code(code: u16) -> Self {
                $table
                    .iter()
                    .find(|(c, _)| *c == code)
                    .map(|(_, v)| *v)
                    .unwrap_or($name::Other(code))
            }

            /// Numeric code for this value.
            pub fn code(self) -> u16 {
                match self {
                    $name::Other(code) => code,
                    named => $table
                        .iter()
                        .find(|(_, v)| *v == named)
                        .map(|(c, _)| *c)
                        .unwrap_or(2),
                }
            }
        }
    };
}

code_table! {
    /// Color primaries (H.273 table 2).
    ColorPrimaries, PRIMARIES_TABLE {
        Unknown = 0,
        /// BT.709, also sRGB.
        Bt709 = 1,
        Unspecified = 2,
        Bt470M = 4,
        Bt470Bg = 5,
        Bt601 = 6,
        Smpte240 = 7,
        GenericFilm = 8,
        Bt2020 = 9,
        Xyz = 10,
        /// DCI-P3 (SMPTE RP 431-2).
        Smpte431 = 11,
        /// Display P3 (SMPTE EG 432-1).
        Smpte432 = 12,
        Ebu3213 = 22,
    }
}

code_table! {
    /// Transfer characteristics (H.273 table 3).
    TransferCharacteristics, TRANSFER_TABLE {
        Unknown = 0,
        Bt709 = 1,
        Unspecified = 2,
        /// Assumed display gamma 2.2.
        Bt470M = 4,
        /// Assumed display gamma 2.8.
        Bt470Bg = 5,
        Bt601 = 6,
        Smpte240 = 7,
        Linear = 8,
        Log100 = 9,
        Log100Sqrt10 = 10,
        Iec61966 = 11,
        Bt1361 = 12,
        Srgb = 13,
        Bt2020_10Bit = 14,
        Bt2020_12Bit = 15,
        /// SMPTE ST 2084 (PQ).
        Pq = 16,
        Smpte428 = 17,
        /// ARIB STD-B67 (HLG).
        Hlg = 18,
    }
}

code_table! {
    /// Matrix coefficients (H.273 table 4).
    MatrixCoefficients, MATRIX_TABLE {
        Identity = 0,
        Bt709 = 1,
        Unspecified = 2,
        Fcc = 4,
        Bt470Bg = 5,
        Bt601 = 6,
        Smpte240 = 7,
        YCgCo = 8,
        Bt2020Ncl = 9,
        Bt2020Cl = 10,
        Smpte2085 = 11,
        ChromaDerivedNcl = 12,
        ChromaDerivedCl = 13,
        ICtCp = 14,
    }
}

impl ColorPrimaries {
    /// Chromaticities for this code. Codes without a table entry get BT.709.
    pub fn chromaticities(self) -> Chromaticities {
        let v = match self {
            ColorPrimaries::Bt470M => [0.670, 0.330, 0.210, 0.710, 0.140, 0.080, 0.310, 0.316],
            ColorPrimaries::Bt470Bg => [0.640, 0.330, 0.290, 0.600, 0.150, 0.060, 0.3127, 0.3290],
            ColorPrimaries::Bt601 | ColorPrimaries::Smpte240 => {
                [0.630, 0.340, 0.310, 0.595, 0.155, 0.070, 0.3127, 0.3290]
            }
            ColorPrimaries::GenericFilm => [0.681, 0.319, 0.243, 0.692, 0.145, 0.049, 0.310, 0.316],
            ColorPrimaries::Bt2020 => [0.708, 0.292, 0.170, 0.797, 0.131, 0.046, 0.3127, 0.3290],
            ColorPrimaries::Xyz => [1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.3333, 0.3333],
            ColorPrimaries::Smpte431 => [0.680, 0.320, 0.265, 0.690, 0.150, 0.060, 0.314, 0.351],
            ColorPrimaries::Smpte432 => return Chromaticities::DISPLAY_P3,
            ColorPrimaries::Ebu3213 => [0.630, 0.340, 0.295, 0.605, 0.155, 0.077, 0.3127, 0.3290],
            _ => return Chromaticities::SRGB,
        };
        Chromaticities::from_array(v)
    }
}

/// Clamp a chromaticity pair into a range the host accepts: x in [0, 1],
/// y in [`f64::MIN_POSITIVE`, 1], and x + y <= 1 (x is reduced when violated).
pub fn compatible_chromaticity(x: f64, y: f64) -> Chromaticity {
    let x = x.clamp(0.0, 1.0);
    let y = y.clamp(f64::MIN_POSITIVE, 1.0);
    if x + y > 1.0 {
        Chromaticity::new(1.0 - y, y)
    } else {
        Chromaticity::new(x, y)
    }
}

/// Structured color space for a CICP primaries/transfer pair.
///
/// Never fails: unknown transfer codes fall back to sRGB with a warning.
pub fn color_space_from_cicp(
    primaries: ColorPrimaries,
    transfer: TransferCharacteristics,
) -> ColorSpace {
    let transfer = match transfer {
        TransferCharacteristics::Bt470M => TransferFunction::Gamma(2.2),
        TransferCharacteristics::Bt470Bg => TransferFunction::Gamma(2.8),
        TransferCharacteristics::Linear => TransferFunction::Linear,
        TransferCharacteristics::Unknown
        | TransferCharacteristics::Unspecified
        | TransferCharacteristics::Srgb => TransferFunction::Srgb,
        other => {
            tracing::warn!(
                code = other.code(),
                "CICP transfer characteristics not supported, assuming sRGB"
            );
            TransferFunction::Srgb
        }
    };

    let primaries = match primaries {
        ColorPrimaries::Unknown | ColorPrimaries::Bt709 | ColorPrimaries::Unspecified => {
            Primaries::Srgb
        }
        ColorPrimaries::Smpte432 => Primaries::DisplayP3,
        other => {
            let c = other.chromaticities();
            Primaries::Custom(Chromaticities {
                red: compatible_chromaticity(c.red.x, c.red.y),
                green: compatible_chromaticity(c.green.x, c.green.y),
                blue: compatible_chromaticity(c.blue.x, c.blue.y),
                white: compatible_chromaticity(c.white.x, c.white.y),
            })
        }
    };

    let color_space = ColorSpace::new(primaries, transfer);
    if color_space.primaries().is_some_and(|p| p.chromaticities().rgb_to_xyz().is_none()) {
        tracing::warn!("color space built from CICP has degenerate primaries");
    }
    color_space
}

/// Color space for a decoded image: the ICC profile when one is embedded and
/// parses, otherwise the CICP mapping.
pub fn decode_color_space(
    icc: &[u8],
    primaries: ColorPrimaries,
    transfer: TransferCharacteristics,
) -> ColorSpace {
    if !icc.is_empty() {
        let color_space = ColorSpace::from_icc_profile(icc);
        if color_space.is_valid() {
            return color_space;
        }
        tracing::warn!(
            len = icc.len(),
            "AVIF image has an unsupported or invalid ICC profile, using CICP"
        );
    }
    color_space_from_cicp(primaries, transfer)
}

/// How the color description of an RGB frame is written.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorMapping {
    pub primaries: ColorPrimaries,
    pub transfer: TransferCharacteristics,
    pub matrix: MatrixCoefficients,
    /// Pixels must be converted into this space before encoding.
    pub convert_to: Option<ColorSpace>,
    /// Embed these ICC bytes verbatim.
    pub icc: Option<Vec<u8>>,
    /// The frame must be written with at least 10 bits per sample.
    pub needs_high_depth: bool,
}

fn classify_primaries(primaries: &Primaries) -> (ColorPrimaries, MatrixCoefficients) {
    match primaries {
        Primaries::Srgb => (ColorPrimaries::Bt709, MatrixCoefficients::Bt709),
        Primaries::DisplayP3 => (ColorPrimaries::Smpte432, MatrixCoefficients::ChromaDerivedNcl),
        Primaries::Custom(c) => PRIMARIES_TABLE
            .iter()
            .map(|&(_, p)| p)
            .filter(|p| !matches!(p, ColorPrimaries::Unknown | ColorPrimaries::Unspecified))
            .find(|p| p.chromaticities().approx_eq(c, 1e-3))
            .map(|p| match p {
                ColorPrimaries::Bt709 => (p, MatrixCoefficients::Bt709),
                _ => (p, MatrixCoefficients::ChromaDerivedNcl),
            })
            .unwrap_or((ColorPrimaries::Unspecified, MatrixCoefficients::Unspecified)),
    }
}

fn classify_transfer(transfer: &TransferFunction) -> TransferCharacteristics {
    match transfer {
        TransferFunction::Linear => TransferCharacteristics::Linear,
        TransferFunction::Gamma(g) if (g - 2.2).abs() < 0.1 => TransferCharacteristics::Bt470M,
        TransferFunction::Gamma(g) if (g - 2.8).abs() < 0.1 => TransferCharacteristics::Bt470Bg,
        TransferFunction::Srgb => TransferCharacteristics::Srgb,
        _ => TransferCharacteristics::Unspecified,
    }
}

/// Map a host color space to the CICP triple written for an RGB frame.
///
/// Partially classifiable spaces are made classifiable by converting the
/// pixels:
/// - unknown primaries, known transfer: sRGB primaries keeping the transfer
///   (unusual transfers become sRGB);
/// - known primaries, unknown transfer: same primaries with the sRGB curve;
/// - neither known: full sRGB.
///
/// Each of these needs at least 10 bits per sample.
pub fn encode_color_mapping(color_space: &ColorSpace) -> ColorMapping {
    let mut mapping = ColorMapping {
        primaries: ColorPrimaries::Unspecified,
        transfer: TransferCharacteristics::Unspecified,
        matrix: MatrixCoefficients::Bt709,
        convert_to: None,
        icc: None,
        needs_high_depth: false,
    };

    let (Some(primaries), Some(transfer)) =
        (color_space.primaries(), color_space.transfer_function())
    else {
        // Not a structured space: pass the profile through untouched.
        if let Some(icc) = color_space.icc_profile().filter(|icc| !icc.is_empty()) {
            mapping.icc = Some(icc.to_vec());
            mapping.matrix = MatrixCoefficients::Bt601;
        }
        return mapping;
    };

    (mapping.primaries, mapping.matrix) = classify_primaries(primaries);
    mapping.transfer = classify_transfer(transfer);

    let primaries_known = mapping.primaries != ColorPrimaries::Unspecified;
    let transfer_known = mapping.transfer != TransferCharacteristics::Unspecified;
    if primaries_known && transfer_known {
        return mapping;
    }

    mapping.needs_high_depth = true;
    if !primaries_known && transfer_known {
        mapping.primaries = ColorPrimaries::Bt709;
        mapping.matrix = MatrixCoefficients::Bt709;
        let target = match mapping.transfer {
            TransferCharacteristics::Linear => TransferFunction::Linear,
            TransferCharacteristics::Bt470M => TransferFunction::Gamma(2.2),
            TransferCharacteristics::Bt470Bg => TransferFunction::Gamma(2.8),
            _ => {
                mapping.transfer = TransferCharacteristics::Srgb;
                TransferFunction::Srgb
            }
        };
        mapping.convert_to = Some(ColorSpace::new(Primaries::Srgb, target));
    } else if primaries_known {
        mapping.transfer = TransferCharacteristics::Srgb;
        mapping.convert_to = Some(color_space.with_transfer_function(TransferFunction::Srgb));
    } else {
        mapping.primaries = ColorPrimaries::Bt709;
        mapping.transfer = TransferCharacteristics::Srgb;
        mapping.matrix = MatrixCoefficients::Bt709;
        mapping.convert_to = Some(ColorSpace::srgb());
    }
    mapping
}

/// CICP triple for a grayscale frame. Never converts pixels.
pub fn encode_gray_mapping(
    color_space: &ColorSpace,
) -> (ColorPrimaries, TransferCharacteristics, MatrixCoefficients) {
    match color_space.transfer_function() {
        Some(transfer) => {
            let tc = match transfer {
                TransferFunction::Linear => TransferCharacteristics::Linear,
                TransferFunction::Srgb => TransferCharacteristics::Srgb,
                _ => TransferCharacteristics::Unspecified,
            };
            (ColorPrimaries::Bt709, tc, MatrixCoefficients::Bt709)
        }
        None => (
            ColorPrimaries::Unspecified,
            TransferCharacteristics::Unspecified,
            MatrixCoefficients::Unspecified,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_tables_are_bidirectional() {
        for &(code, value) in PRIMARIES_TABLE {
            assert_eq!(ColorPrimaries::from_code(code), value);
            assert_eq!(value.code(), code);
        }
        for &(code, value) in TRANSFER_TABLE {
            assert_eq!(TransferCharacteristics::from_code(code), value);
            assert_eq!(value.code(), code);
        }
        for &(code, value) in MATRIX_TABLE {
            assert_eq!(MatrixCoefficients::from_code(code), value);
            assert_eq!(value.code(), code);
        }
        assert_eq!(ColorPrimaries::from_code(3), ColorPrimaries::Other(3));
        assert_eq!(ColorPrimaries::Other(3).code(), 3);
    }

    #[test]
    fn decode_transfer_table() {
        let tf = |code| {
            color_space_from_cicp(ColorPrimaries::Bt709, TransferCharacteristics::from_code(code))
                .transfer_function()
                .cloned()
                .unwrap()
        };
        assert_eq!(tf(4), TransferFunction::Gamma(2.2));
        assert_eq!(tf(5), TransferFunction::Gamma(2.8));
        assert_eq!(tf(8), TransferFunction::Linear);
        assert_eq!(tf(0), TransferFunction::Srgb);
        assert_eq!(tf(2), TransferFunction::Srgb);
        assert_eq!(tf(13), TransferFunction::Srgb);
        // PQ is not representable: falls back rather than failing.
        assert_eq!(tf(16), TransferFunction::Srgb);
    }

    #[test]
    fn decode_primaries_table() {
        let prim = |code| {
            *color_space_from_cicp(ColorPrimaries::from_code(code), TransferCharacteristics::Srgb)
                .primaries()
                .unwrap()
        };
        assert_eq!(prim(0), Primaries::Srgb);
        assert_eq!(prim(1), Primaries::Srgb);
        assert_eq!(prim(2), Primaries::Srgb);
        assert_eq!(prim(12), Primaries::DisplayP3);
        let Primaries::Custom(c) = prim(9) else {
            panic!("BT.2020 should be custom");
        };
        assert_eq!(c.red, Chromaticity::new(0.708, 0.292));
    }

    #[test]
    fn xyz_primaries_are_made_compatible() {
        let Primaries::Custom(c) =
            *color_space_from_cicp(ColorPrimaries::Xyz, TransferCharacteristics::Linear)
                .primaries()
                .unwrap()
        else {
            panic!("XYZ should be custom");
        };
        assert_eq!(c.red.y, f64::MIN_POSITIVE);
        assert_eq!(c.green, Chromaticity::new(0.0, 1.0));
    }

    #[test]
    fn chromaticity_clamping() {
        assert_eq!(compatible_chromaticity(-0.5, 0.5), Chromaticity::new(0.0, 0.5));
        assert_eq!(compatible_chromaticity(0.5, 0.0), Chromaticity::new(0.5, f64::MIN_POSITIVE));
        assert_eq!(compatible_chromaticity(0.8, 0.6), Chromaticity::new(0.4, 0.6));
        assert_eq!(compatible_chromaticity(2.0, 2.0), Chromaticity::new(0.0, 1.0));
    }

    #[test]
    fn encode_classified_spaces() {
        let m = encode_color_mapping(&ColorSpace::srgb());
        assert_eq!(
            (m.primaries, m.transfer, m.matrix),
            (
                ColorPrimaries::Bt709,
                TransferCharacteristics::Srgb,
                MatrixCoefficients::Bt709
            )
        );
        assert!(!m.needs_high_depth);
        assert!(m.convert_to.is_none());

        let m = encode_color_mapping(&ColorSpace::display_p3());
        assert_eq!(m.primaries, ColorPrimaries::Smpte432);
        assert_eq!(m.matrix, MatrixCoefficients::ChromaDerivedNcl);

        let m = encode_color_mapping(&ColorSpace::new(Primaries::Srgb, TransferFunction::Gamma(2.25)));
        assert_eq!(m.transfer, TransferCharacteristics::Bt470M);
        let m = encode_color_mapping(&ColorSpace::new(Primaries::Srgb, TransferFunction::Gamma(2.75)));
        assert_eq!(m.transfer, TransferCharacteristics::Bt470Bg);
    }

    #[test]
    fn encode_table_primaries_are_kept() {
        let bt2020 = ColorSpace::new(
            Primaries::Custom(ColorPrimaries::Bt2020.chromaticities()),
            TransferFunction::Linear,
        );
        let m = encode_color_mapping(&bt2020);
        assert_eq!(m.primaries, ColorPrimaries::Bt2020);
        assert_eq!(m.matrix, MatrixCoefficients::ChromaDerivedNcl);
        assert!(m.convert_to.is_none());
    }

    #[test]
    fn unknown_primaries_known_transfer() {
        let odd = Chromaticities::from_array([0.7, 0.3, 0.2, 0.7, 0.1, 0.1, 0.3127, 0.329]);
        let m = encode_color_mapping(&ColorSpace::new(
            Primaries::Custom(odd),
            TransferFunction::Gamma(2.2),
        ));
        assert_eq!(m.primaries, ColorPrimaries::Bt709);
        assert_eq!(m.matrix, MatrixCoefficients::Bt709);
        assert_eq!(m.transfer, TransferCharacteristics::Bt470M);
        assert_eq!(
            m.convert_to,
            Some(ColorSpace::new(Primaries::Srgb, TransferFunction::Gamma(2.2)))
        );
        assert!(m.needs_high_depth);
    }

    #[test]
    fn known_primaries_unknown_transfer() {
        let m = encode_color_mapping(&ColorSpace::new(
            Primaries::DisplayP3,
            TransferFunction::Gamma(1.8),
        ));
        assert_eq!(m.primaries, ColorPrimaries::Smpte432);
        assert_eq!(m.transfer, TransferCharacteristics::Srgb);
        assert_eq!(m.convert_to, Some(ColorSpace::display_p3()));
        assert!(m.needs_high_depth);
    }

    #[test]
    fn nothing_known_converts_to_srgb() {
        let odd = Chromaticities::from_array([0.7, 0.3, 0.2, 0.7, 0.1, 0.1, 0.3127, 0.329]);
        let m = encode_color_mapping(&ColorSpace::new(
            Primaries::Custom(odd),
            TransferFunction::Gamma(1.5),
        ));
        assert_eq!(
            (m.primaries, m.transfer, m.matrix),
            (
                ColorPrimaries::Bt709,
                TransferCharacteristics::Srgb,
                MatrixCoefficients::Bt709
            )
        );
        assert_eq!(m.convert_to, Some(ColorSpace::srgb()));
    }

    #[test]
    fn opaque_icc_is_embedded() {
        let m = encode_color_mapping(&ColorSpace::from_icc_profile(b"opaque profile"));
        assert_eq!(m.icc.as_deref(), Some(&b"opaque profile"[..]));
        assert_eq!(m.matrix, MatrixCoefficients::Bt601);
        assert_eq!(m.primaries, ColorPrimaries::Unspecified);
        assert!(!m.needs_high_depth);

        let m = encode_color_mapping(&ColorSpace::default());
        assert!(m.icc.is_none());
        assert_eq!(m.matrix, MatrixCoefficients::Bt709);
    }

    #[test]
    fn gray_mapping() {
        assert_eq!(
            encode_gray_mapping(&ColorSpace::srgb_linear()).1,
            TransferCharacteristics::Linear
        );
        assert_eq!(
            encode_gray_mapping(&ColorSpace::srgb()).1,
            TransferCharacteristics::Srgb
        );
        assert_eq!(
            encode_gray_mapping(&ColorSpace::new(Primaries::Srgb, TransferFunction::Gamma(2.2))).1,
            TransferCharacteristics::Unspecified
        );
        assert_eq!(
            encode_gray_mapping(&ColorSpace::default()).0,
            ColorPrimaries::Unspecified
        );
    }

    #[test]
    fn cicp_icc_precedence() {
        let cs = decode_color_space(&[], ColorPrimaries::Smpte432, TransferCharacteristics::Srgb);
        assert_eq!(cs, ColorSpace::display_p3());
    }

    #[test]
    fn invalid_icc_falls_back_to_cicp() {
        let cs = decode_color_space(b"junk", ColorPrimaries::Smpte432, TransferCharacteristics::Srgb);
        assert!(cs.is_valid());
        assert_eq!(cs, ColorSpace::display_p3());

        let cs = decode_color_space(&[0u8; 128], ColorPrimaries::Bt709, TransferCharacteristics::Linear);
        assert_eq!(cs, ColorSpace::srgb_linear());
    }
}
