//! Format names handled by this crate.

/// Formats the handler answers for.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    /// Still AVIF image (`avif`). Readable and writable.
    Avif,
    /// AVIF image sequence (`avifs`). Read-only.
    AvifSequence,
}

impl ImageFormat {
    /// Look up a host format hint (case-insensitive).
    pub fn from_hint(hint: &str) -> Option<Self> {
        match hint.to_ascii_lowercase().as_str() {
            "avif" => Some(ImageFormat::Avif),
            "avifs" => Some(ImageFormat::AvifSequence),
            _ => None,
        }
    }

    /// Detect format from the leading bytes of a file.
    ///
    /// Looks at the `ftyp` box only. A file whose brands mention `avis` is
    /// reported as a sequence.
    pub fn detect(data: &[u8]) -> Option<Self> {
        let ftyp = crate::sniff::parse_ftyp(data)?;
        if ftyp.has_brand(b"avis") {
            Some(ImageFormat::AvifSequence)
        } else if ftyp.has_brand(b"avif") {
            Some(ImageFormat::Avif)
        } else {
            None
        }
    }

    /// Name used in host format hints.
    pub fn name(self) -> &'static str {
        match self {
            ImageFormat::Avif => "avif",
            ImageFormat::AvifSequence => "avifs",
        }
    }

    /// MIME type string.
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Avif => "image/avif",
            ImageFormat::AvifSequence => "image/avif-sequence",
        }
    }

    /// Common file extensions.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            ImageFormat::Avif => &["avif"],
            ImageFormat::AvifSequence => &["avifs"],
        }
    }

    /// Whether the handler can write this format.
    pub fn supports_write(self) -> bool {
        matches!(self, ImageFormat::Avif)
    }

    /// Whether this format carries multiple frames.
    pub fn supports_animation(self) -> bool {
        matches!(self, ImageFormat::AvifSequence)
    }
}
