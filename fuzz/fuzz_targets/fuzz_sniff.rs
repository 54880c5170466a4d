#![no_main]

use std::io::Cursor;

use avif_imageio::ImageFormat;
use avif_imageio::handler::can_read_stream;
use avif_imageio::sniff::{find_box, parse_ftyp};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let detected = ImageFormat::detect(data);
    if let Some(ftyp) = parse_ftyp(data) {
        let _ = ftyp.compatible_brands().count();
        assert_eq!(detected.is_some(), ftyp.is_avif_compatible());
    }
    let _ = find_box(data, b"mdat");

    // Sniffing must never consume the stream.
    let mut stream = Cursor::new(data);
    let _ = can_read_stream(&mut stream);
    assert_eq!(stream.position(), 0);
});
