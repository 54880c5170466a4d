//! A loopback AV1 codec for integration tests.
//!
//! Images are stored uncompressed in a private `lbck` box after a regular
//! `ftyp` box, so the handler's sniffing sees a real AVIF signature. Lossy
//! encoding is simulated by clearing the low `max_quantizer / 8` bits of
//! each sample, which makes the error grow monotonically as quality drops.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use avif_imageio::cicp::{ColorPrimaries, MatrixCoefficients, TransferCharacteristics};
use avif_imageio::sniff::find_box;
use avif_imageio::yuv::CleanAperture;
use avif_imageio::{Av1Codec, Av1Decoder, DecoderConfig, EncodeSettings, YuvFormat, YuvImage, YuvRange};

#[derive(Debug, thiserror::Error)]
#[error("loopback: {0}")]
pub struct LoopbackError(pub String);

fn err(msg: &str) -> LoopbackError {
    LoopbackError(msg.to_string())
}

/// Codec backend that stores planes verbatim.
#[derive(Clone, Debug, Default)]
pub struct LoopbackCodec {
    /// Fail decoding of this frame index.
    pub fail_frame: Option<u32>,
    /// Reject every encode.
    pub fail_encode: bool,
    /// Settings seen by the last encode.
    pub last_settings: Arc<std::sync::Mutex<Option<EncodeSettings>>>,
    /// Number of frames decoded through this codec.
    pub decoded: Arc<AtomicUsize>,
}

impl LoopbackCodec {
    pub fn failing_at(frame: u32) -> Self {
        Self {
            fail_frame: Some(frame),
            ..Self::default()
        }
    }

    pub fn failing_encode() -> Self {
        Self {
            fail_encode: true,
            ..Self::default()
        }
    }

    pub fn last_settings(&self) -> Option<EncodeSettings> {
        self.last_settings.lock().unwrap().clone()
    }

    pub fn decoded_frames(&self) -> usize {
        self.decoded.load(Ordering::SeqCst)
    }
}

impl Av1Codec for LoopbackCodec {
    type Error = LoopbackError;
    type Decoder = LoopbackDecoder;

    fn new_decoder(&self, _config: &DecoderConfig) -> Result<LoopbackDecoder, LoopbackError> {
        Ok(LoopbackDecoder {
            frames: Vec::new(),
            index: None,
            fail_frame: self.fail_frame,
            decoded: Arc::clone(&self.decoded),
        })
    }

    fn encode(&self, image: &YuvImage, settings: &EncodeSettings) -> Result<Vec<u8>, LoopbackError> {
        *self.last_settings.lock().unwrap() = Some(settings.clone());
        if self.fail_encode {
            return Err(err("encoder rejected the image"));
        }
        let mut image = image.clone();
        let k = settings.max_quantizer / 8;
        for plane in [&mut image.y, &mut image.u, &mut image.v] {
            quantize(plane, k);
        }
        if let Some(alpha) = image.alpha.as_mut() {
            quantize(alpha, settings.max_quantizer_alpha / 8);
        }
        Ok(container(&[(image, 0.0)]))
    }
}

fn quantize(plane: &mut [u16], bits: u8) {
    let mask = !((1u16 << bits) - 1);
    for v in plane {
        *v &= mask;
    }
}

/// Decoder over a loopback container.
pub struct LoopbackDecoder {
    frames: Vec<(YuvImage, f64)>,
    index: Option<u32>,
    fail_frame: Option<u32>,
    decoded: Arc<AtomicUsize>,
}

impl LoopbackDecoder {
    fn decode(&mut self, index: u32) -> Result<(), LoopbackError> {
        if index as usize >= self.frames.len() {
            return Err(err("no more frames"));
        }
        if self.fail_frame == Some(index) {
            return Err(err("corrupt frame"));
        }
        self.index = Some(index);
        self.decoded.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Av1Decoder for LoopbackDecoder {
    type Error = LoopbackError;

    fn parse(&mut self, data: Arc<[u8]>) -> Result<(), LoopbackError> {
        let (payload, _) = find_box(&data, b"lbck").ok_or_else(|| err("missing payload box"))?;
        self.frames = read_frames(payload).ok_or_else(|| err("truncated payload"))?;
        if self.frames.is_empty() {
            return Err(err("no frames"));
        }
        Ok(())
    }

    fn next_image(&mut self) -> Result<(), LoopbackError> {
        let next = self.index.map_or(0, |i| i + 1);
        self.decode(next)
    }

    fn nth_image(&mut self, index: u32) -> Result<(), LoopbackError> {
        self.decode(index)
    }

    fn reset(&mut self) -> Result<(), LoopbackError> {
        self.index = None;
        Ok(())
    }

    fn image(&self) -> Option<&YuvImage> {
        self.index.map(|i| &self.frames[i as usize].0)
    }

    fn image_index(&self) -> Option<u32> {
        self.index
    }

    fn image_count(&self) -> u32 {
        self.frames.len() as u32
    }

    fn image_duration(&self) -> f64 {
        self.index.map_or(0.0, |i| self.frames[i as usize].1)
    }
}

// Serialization

fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_plane(out: &mut Vec<u8>, plane: &[u16]) {
    put_u32(out, plane.len() as u32);
    for &v in plane {
        put_u16(out, v);
    }
}

fn format_code(format: YuvFormat) -> u8 {
    match format {
        YuvFormat::Yuv444 => 0,
        YuvFormat::Yuv422 => 1,
        YuvFormat::Yuv420 => 2,
        YuvFormat::Yuv400 => 3,
    }
}

fn format_from_code(code: u8) -> Option<YuvFormat> {
    Some(match code {
        0 => YuvFormat::Yuv444,
        1 => YuvFormat::Yuv422,
        2 => YuvFormat::Yuv420,
        3 => YuvFormat::Yuv400,
        _ => return None,
    })
}

/// Build a complete file holding `frames` with their durations in seconds.
pub fn container(frames: &[(YuvImage, f64)]) -> Vec<u8> {
    let mut payload = Vec::new();
    put_u32(&mut payload, frames.len() as u32);
    for (image, duration) in frames {
        payload.extend_from_slice(&duration.to_le_bytes());
        put_u32(&mut payload, image.width);
        put_u32(&mut payload, image.height);
        payload.push(image.depth);
        payload.push(format_code(image.yuv_format));
        payload.push(u8::from(image.range == YuvRange::Limited));
        put_u16(&mut payload, image.color_primaries.code());
        put_u16(&mut payload, image.transfer_characteristics.code());
        put_u16(&mut payload, image.matrix_coefficients.code());
        match &image.clap {
            Some(c) => {
                payload.push(1);
                for v in [c.width_n, c.width_d, c.height_n, c.height_d] {
                    put_u32(&mut payload, v);
                }
                put_u32(&mut payload, c.horiz_off_n as u32);
                put_u32(&mut payload, c.horiz_off_d);
                put_u32(&mut payload, c.vert_off_n as u32);
                put_u32(&mut payload, c.vert_off_d);
            }
            None => payload.push(0),
        }
        payload.push(image.irot.unwrap_or(0xff));
        payload.push(image.imir.unwrap_or(0xff));
        put_u32(&mut payload, image.icc.len() as u32);
        payload.extend_from_slice(&image.icc);
        put_plane(&mut payload, &image.y);
        put_plane(&mut payload, &image.u);
        put_plane(&mut payload, &image.v);
        match &image.alpha {
            Some(alpha) => {
                payload.push(1);
                put_plane(&mut payload, alpha);
            }
            None => payload.push(0),
        }
    }

    let brand: &[u8; 4] = if frames.len() > 1 { b"avis" } else { b"avif" };
    let mut file = Vec::new();
    let mut ftyp = brand.to_vec();
    ftyp.extend_from_slice(&0u32.to_be_bytes());
    ftyp.extend_from_slice(b"mif1");
    ftyp.extend_from_slice(b"miaf");
    put_box(&mut file, b"ftyp", &ftyp);
    put_box(&mut file, b"lbck", &payload);
    file
}

fn put_box(out: &mut Vec<u8>, kind: &[u8; 4], content: &[u8]) {
    out.extend_from_slice(&((content.len() + 8) as u32).to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(content);
}

struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.data.len() < n {
            return None;
        }
        let (head, tail) = self.data.split_at(n);
        self.data = tail;
        Some(head)
    }

    fn u8(&mut self) -> Option<u8> {
        Some(self.take(1)?[0])
    }

    fn u16(&mut self) -> Option<u16> {
        Some(u16::from_le_bytes(self.take(2)?.try_into().ok()?))
    }

    fn u32(&mut self) -> Option<u32> {
        Some(u32::from_le_bytes(self.take(4)?.try_into().ok()?))
    }

    fn f64(&mut self) -> Option<f64> {
        Some(f64::from_le_bytes(self.take(8)?.try_into().ok()?))
    }

    fn plane(&mut self) -> Option<Vec<u16>> {
        let len = self.u32()? as usize;
        (0..len).map(|_| self.u16()).collect()
    }
}

fn read_frames(payload: &[u8]) -> Option<Vec<(YuvImage, f64)>> {
    let mut r = Reader { data: payload };
    let count = r.u32()?;
    let mut frames = Vec::new();
    for _ in 0..count {
        let duration = r.f64()?;
        let width = r.u32()?;
        let height = r.u32()?;
        let depth = r.u8()?;
        let format = format_from_code(r.u8()?)?;
        let mut image = YuvImage::new(width, height, depth, format);
        if r.u8()? == 1 {
            image.range = YuvRange::Limited;
        }
        image.color_primaries = ColorPrimaries::from_code(r.u16()?);
        image.transfer_characteristics = TransferCharacteristics::from_code(r.u16()?);
        image.matrix_coefficients = MatrixCoefficients::from_code(r.u16()?);
        if r.u8()? == 1 {
            image.clap = Some(CleanAperture {
                width_n: r.u32()?,
                width_d: r.u32()?,
                height_n: r.u32()?,
                height_d: r.u32()?,
                horiz_off_n: r.u32()? as i32,
                horiz_off_d: r.u32()?,
                vert_off_n: r.u32()? as i32,
                vert_off_d: r.u32()?,
            });
        }
        image.irot = Some(r.u8()?).filter(|&v| v != 0xff);
        image.imir = Some(r.u8()?).filter(|&v| v != 0xff);
        let icc_len = r.u32()? as usize;
        image.icc = r.take(icc_len)?.to_vec();
        image.y = r.plane()?;
        image.u = r.plane()?;
        image.v = r.plane()?;
        if r.u8()? == 1 {
            image.alpha = Some(r.plane()?);
        }
        frames.push((image, duration));
    }
    Some(frames)
}

/// A flat 8-bit luma-only frame filled with `value`.
pub fn gray_frame(width: u32, height: u32, value: u16) -> YuvImage {
    let mut image = YuvImage::new(width, height, 8, YuvFormat::Yuv400);
    image.y.fill(value);
    image.color_primaries = ColorPrimaries::Bt709;
    image.transfer_characteristics = TransferCharacteristics::Srgb;
    image.matrix_coefficients = MatrixCoefficients::Bt709;
    image
}

/// A sequence of flat gray frames, frame `i` filled with `i * 10`.
pub fn gray_sequence(count: u32, width: u32, height: u32, duration: f64) -> Vec<u8> {
    let frames: Vec<_> = (0..count)
        .map(|i| (gray_frame(width, height, (i * 10) as u16), duration))
        .collect();
    container(&frames)
}
