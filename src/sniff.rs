//! Signature sniffing on the leading bytes of a stream.
//!
//! Only the `ftyp` box is inspected. Everything past it is the codec's
//! business. Works on truncated data as long as the `ftyp` box carries its
//! major brand and one compatible brand.

/// Bytes peeked from a stream for signature sniffing.
pub const SIGNATURE_PEEK_LEN: usize = 144;

/// Minimum number of peeked bytes needed to attempt sniffing.
pub const MIN_SIGNATURE_LEN: usize = 12;

/// Parsed `ftyp` box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileType<'a> {
    /// Major brand.
    pub major_brand: [u8; 4],
    /// Minor version.
    pub minor_version: u32,
    compatible: &'a [u8],
}

impl<'a> FileType<'a> {
    /// Iterate the compatible brands list.
    pub fn compatible_brands(&self) -> impl Iterator<Item = [u8; 4]> + 'a {
        self.compatible
            .chunks_exact(4)
            .map(|c| [c[0], c[1], c[2], c[3]])
    }

    /// Whether `brand` is the major brand or one of the compatible brands.
    pub fn has_brand(&self, brand: &[u8; 4]) -> bool {
        &self.major_brand == brand || self.compatible_brands().any(|b| &b == brand)
    }

    /// Whether the brands mark this file as something an AVIF decoder reads.
    pub fn is_avif_compatible(&self) -> bool {
        self.has_brand(b"avif") || self.has_brand(b"avis")
    }
}

/// Parse the leading `ftyp` box. Returns `None` if the data does not start
/// with a well-formed `ftyp` box.
///
/// A box cut short by the end of `data` is accepted once the major brand and
/// at least one whole compatible brand are present; only the complete brand
/// slots are listed.
pub fn parse_ftyp(data: &[u8]) -> Option<FileType<'_>> {
    let (content, end) = box_at(data, 0)?;
    if &data[4..8] != b"ftyp" {
        return None;
    }
    let header_len = data.len().min(end) - content.len();
    let declared = end - header_len;
    if declared < 8 || (declared - 8) % 4 != 0 {
        return None;
    }
    let compatible = if end > data.len() {
        if content.len() < 12 {
            return None;
        }
        let whole = (content.len() - 8) / 4 * 4;
        &content[8..8 + whole]
    } else {
        &content[8..]
    };

    Some(FileType {
        major_brand: [content[0], content[1], content[2], content[3]],
        minor_version: u32::from_be_bytes([content[4], content[5], content[6], content[7]]),
        compatible,
    })
}

/// Whether the leading bytes carry an AVIF-compatible signature.
///
/// Fewer than [`MIN_SIGNATURE_LEN`] bytes never match.
pub fn is_avif(header: &[u8]) -> bool {
    if header.len() < MIN_SIGNATURE_LEN {
        return false;
    }
    parse_ftyp(header).is_some_and(|ftyp| ftyp.is_avif_compatible())
}

/// Read the box header at `pos`. Returns (box_content, end_offset); content is
/// truncated to the available data.
fn box_at(data: &[u8], pos: usize) -> Option<(&[u8], usize)> {
    if pos + 8 > data.len() {
        return None;
    }
    let size = u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]);

    let (header_size, box_size) = if size == 1 {
        // Extended size: 64-bit
        if pos + 16 > data.len() {
            return None;
        }
        let mut ext = [0u8; 8];
        ext.copy_from_slice(&data[pos + 8..pos + 16]);
        (16usize, usize::try_from(u64::from_be_bytes(ext)).ok()?)
    } else if size == 0 {
        // Box extends to end of data
        (8usize, data.len() - pos)
    } else {
        (8usize, size as usize)
    };

    if box_size < header_size {
        return None;
    }

    let content_start = pos + header_size;
    let box_end = pos.checked_add(box_size)?;
    let content_end = box_end.min(data.len());
    if content_start > content_end {
        return None;
    }
    Some((&data[content_start..content_end], box_end))
}

/// Find a top-level box by type in ISOBMFF data. Returns (box_content, end_offset).
pub fn find_box<'a>(data: &'a [u8], box_type: &[u8; 4]) -> Option<(&'a [u8], usize)> {
    let mut pos = 0;

    while let Some((content, box_end)) = box_at(data, pos) {
        if &data[pos + 4..pos + 8] == box_type {
            return Some((content, box_end));
        }
        if box_end <= pos {
            return None;
        }
        pos = box_end;
    }

    None
}
