#![cfg(all(feature = "avif-decode", feature = "avif-encode"))]

use std::io::Cursor;

use avif_imageio::{
    AvifCodec, AvifHandler, ColorSpace, Frame, ImageIoHandler, ImageOption, OptionValue,
    PixelData, PixelLayout,
};
use imgref::ImgVec;
use rgb::{Rgb, Rgba};

fn gradient(width: usize, height: usize) -> Vec<Rgb<u8>> {
    (0..width * height)
        .map(|i| {
            let (x, y) = (i % width, i / width);
            Rgb::new((x * 255 / width) as u8, (y * 255 / height) as u8, 96)
        })
        .collect()
}

fn write(frame: &Frame, quality: i32) -> Vec<u8> {
    let mut writer = AvifHandler::new(AvifCodec::new(), Cursor::new(Vec::new()));
    writer.set_option(ImageOption::Quality, OptionValue::Int(quality));
    writer.write(frame).unwrap();
    writer.into_stream().into_inner()
}

#[test_log::test]
fn encoded_file_decodes() {
    let pixels = gradient(32, 24);
    let frame = Frame::new(PixelData::Rgb8(ImgVec::new(pixels.clone(), 32, 24)))
        .with_color_space(ColorSpace::srgb());

    let bytes = write(&frame, 95);
    assert_eq!(&bytes[4..8], b"ftyp");

    let mut reader = AvifHandler::new(AvifCodec::new(), Cursor::new(bytes));
    assert!(reader.can_read());
    assert_eq!(reader.image_count(), 1);
    let decoded = reader.read().unwrap();
    assert_eq!(decoded.layout(), PixelLayout::Rgb8);
    assert_eq!((decoded.width(), decoded.height()), (32, 24));

    let PixelData::Rgb8(img) = &decoded.pixels else {
        panic!("expected Rgb8");
    };
    let mean_error = img
        .buf()
        .iter()
        .zip(&pixels)
        .map(|(a, b)| {
            (i32::from(a.r) - i32::from(b.r)).abs()
                + (i32::from(a.g) - i32::from(b.g)).abs()
                + (i32::from(a.b) - i32::from(b.b)).abs()
        })
        .sum::<i32>() as f64
        / (pixels.len() * 3) as f64;
    assert!(mean_error < 8.0, "mean error {mean_error}");
}

#[test]
fn alpha_survives_real_codec() {
    let pixels = vec![Rgba::new(200u8, 30, 30, 128); 16 * 16];
    let frame = Frame::new(PixelData::Rgba8(ImgVec::new(pixels, 16, 16)))
        .with_color_space(ColorSpace::srgb());

    let mut reader = AvifHandler::new(AvifCodec::new(), Cursor::new(write(&frame, 90)));
    let decoded = reader.read().unwrap();
    assert_eq!(decoded.layout(), PixelLayout::Rgba8);
    let PixelData::Rgba8(img) = &decoded.pixels else {
        panic!("expected Rgba8");
    };
    let px = img.buf()[8 * 16 + 8];
    assert!((i32::from(px.a) - 128).abs() <= 8, "{px:?}");
}

#[test]
fn second_frame_does_not_exist() {
    let frame = Frame::new(PixelData::Gray8(ImgVec::new(vec![90u8; 64], 8, 8)))
        .with_color_space(ColorSpace::srgb());

    let mut reader = AvifHandler::new(AvifCodec::new(), Cursor::new(write(&frame, 80)));
    assert!(reader.read().is_ok());
    assert!(reader.jump_to_image(1).is_err());
    assert_eq!(reader.loop_count(), 0);
}
