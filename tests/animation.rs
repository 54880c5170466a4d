mod common;

use std::io::Cursor;

use avif_imageio::{AvifHandler, CodecError, Frame, ImageIoHandler, ImageOption, OptionValue, PixelData};
use common::{LoopbackCodec, container, gray_frame, gray_sequence};

type Handler = AvifHandler<LoopbackCodec, Cursor<Vec<u8>>>;

fn handler(codec: &LoopbackCodec, bytes: Vec<u8>) -> Handler {
    AvifHandler::new(codec.clone(), Cursor::new(bytes))
}

fn gray_value(frame: &Frame) -> u8 {
    match &frame.pixels {
        PixelData::Gray8(img) => img.buf()[0],
        other => panic!("expected Gray8, got {:?}", other.layout()),
    }
}

#[test_log::test]
fn read_advances_and_wraps() {
    let codec = LoopbackCodec::default();
    let mut reader = handler(&codec, gray_sequence(3, 4, 4, 0.04));

    assert_eq!(reader.image_count(), 3);
    assert_eq!(reader.option(ImageOption::Animation), Some(OptionValue::Bool(true)));

    let values: Vec<u8> = (0..5).map(|_| gray_value(&reader.read().unwrap())).collect();
    assert_eq!(values, [0, 10, 20, 0, 10]);
    assert_eq!(reader.current_image_number(), 1);
}

#[test]
fn last_frame_wraps_to_first() {
    let codec = LoopbackCodec::default();
    let mut reader = handler(&codec, gray_sequence(4, 2, 2, 0.1));

    let last = i64::from(reader.image_count()) - 1;
    reader.jump_to_image(last).unwrap();
    assert_eq!(reader.current_image_number(), 3);
    reader.jump_to_next_image().unwrap();
    assert_eq!(reader.current_image_number(), 0);
    assert_eq!(gray_value(&reader.read().unwrap()), 0);
}

#[test]
fn jump_then_read_returns_target() {
    let codec = LoopbackCodec::default();
    let mut reader = handler(&codec, gray_sequence(3, 2, 2, 0.1));

    reader.read().unwrap();
    reader.jump_to_image(2).unwrap();
    assert_eq!(gray_value(&reader.read().unwrap()), 20);
    assert_eq!(gray_value(&reader.read().unwrap()), 0);
}

#[test]
fn jump_to_current_frame_does_not_decode() {
    let codec = LoopbackCodec::default();
    let mut reader = handler(&codec, gray_sequence(3, 2, 2, 0.1));

    reader.jump_to_image(1).unwrap();
    let decoded = codec.decoded_frames();
    reader.jump_to_image(1).unwrap();
    assert_eq!(codec.decoded_frames(), decoded);
    assert_eq!(reader.current_image_number(), 1);
}

#[test]
fn out_of_range_jump_keeps_state() {
    let codec = LoopbackCodec::default();
    let mut reader = handler(&codec, gray_sequence(3, 2, 2, 0.1));

    reader.jump_to_image(1).unwrap();
    assert!(matches!(
        reader.jump_to_image(3),
        Err(CodecError::FrameOutOfRange { index: 3, count: 3 })
    ));
    assert!(matches!(
        reader.jump_to_image(-1),
        Err(CodecError::FrameOutOfRange { index: -1, .. })
    ));
    assert_eq!(reader.current_image_number(), 1);
    assert_eq!(gray_value(&reader.read().unwrap()), 10);
}

#[test]
fn still_image_navigation() {
    let codec = LoopbackCodec::default();
    let mut reader = handler(&codec, container(&[(gray_frame(2, 2, 5), 0.0)]));

    assert_eq!(reader.image_count(), 1);
    reader.jump_to_next_image().unwrap();
    reader.jump_to_image(0).unwrap();
    assert!(reader.jump_to_image(1).is_err());
    assert_eq!(reader.current_image_number(), 0);
}

#[test]
fn delay_and_loop_count() {
    let codec = LoopbackCodec::default();
    let mut reader = handler(&codec, gray_sequence(2, 2, 2, 0.0425));
    assert_eq!(reader.next_image_delay(), 42);
    assert_eq!(reader.loop_count(), 1);

    let mut fast = handler(&codec, gray_sequence(2, 2, 2, 0.0001));
    assert_eq!(fast.next_image_delay(), 1);
}

#[test_log::test]
fn size_mismatch_is_terminal() {
    let codec = LoopbackCodec::default();
    let bytes = container(&[(gray_frame(4, 4, 0), 0.1), (gray_frame(4, 3, 10), 0.1)]);
    let mut reader = handler(&codec, bytes);

    assert_eq!(gray_value(&reader.read().unwrap()), 0);
    let err = reader.jump_to_image(1).unwrap_err();
    assert!(matches!(err, CodecError::DimensionMismatch { height: 3, expected_height: 4, .. }), "{err}");

    assert!(matches!(reader.read(), Err(CodecError::Terminal)));
    assert_eq!(reader.image_count(), 0);
    assert_eq!(reader.current_image_number(), 0);
    assert_eq!(reader.option(ImageOption::Size), None);
}

#[test]
fn read_reports_mismatch_on_advance() {
    let codec = LoopbackCodec::default();
    let bytes = container(&[(gray_frame(4, 4, 0), 0.1), (gray_frame(5, 4, 10), 0.1)]);
    let mut reader = handler(&codec, bytes);

    reader.read().unwrap();
    assert!(matches!(reader.read(), Err(CodecError::DimensionMismatch { .. })));
    assert!(reader.read().is_err());
}

#[test]
fn decode_failure_mid_sequence_is_terminal() {
    let codec = LoopbackCodec::failing_at(2);
    let mut reader = handler(&codec, gray_sequence(4, 2, 2, 0.1));

    reader.jump_to_next_image().unwrap();
    assert!(matches!(reader.jump_to_next_image(), Err(CodecError::Decode(_))));
    assert!(reader.jump_to_image(0).is_err());
    assert!(reader.read().is_err());
    assert_eq!(reader.loop_count(), 0);
    assert_eq!(reader.next_image_delay(), 0);
}

#[test]
fn first_frame_failure_fails_parse() {
    let codec = LoopbackCodec::failing_at(0);
    let mut reader = handler(&codec, gray_sequence(2, 2, 2, 0.1));

    assert!(reader.read().is_err());
    assert_eq!(reader.image_count(), 0);
    assert_eq!(reader.current_image_number(), 0);
}
