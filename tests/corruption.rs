// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use musicfox_flac::encode::{EncodingOptions, Stereo};
use musicfox_flac::{Decoder, Encoder};
use std::io::Cursor;
use std::num::NonZero;

fn sine_stream(stereo: Stereo) -> Vec<u8> {
    let left = (0..3000)
        .map(|i| ((i as f64 / 20.0).sin() * 30000.0) as i32)
        .collect::<Vec<_>>();
    let right = left.iter().map(|s| -s / 2).collect::<Vec<_>>();

    let mut flac = Cursor::new(vec![]);
    let mut encoder = Encoder::new(
        &mut flac,
        EncodingOptions::default().block_size(512).stereo(stereo),
        44100,
        16,
        NonZero::new(2).unwrap(),
    )
    .unwrap();
    encoder.encode(&[&left, &right]).unwrap();
    encoder.finalize().unwrap();

    flac.into_inner()
}

fn decode_all(flac: &[u8]) -> Result<(), musicfox_flac::Error> {
    Decoder::new(flac)?.try_for_each(|frame| frame.map(drop))
}

#[test]
fn test_stream_corruption() {
    for stereo in [Stereo::Independent, Stereo::MidSide] {
        let flac = sine_stream(stereo);

        // ensure test stream is okay
        assert!(decode_all(&flac).is_ok());

        // try flipping random bits outside the metadata block area,
        // every one of which should be caught by a frame's checksums
        let valid_range = 42..flac.len();

        for _ in 0..100 {
            let mut flac = flac.clone();
            flac[fastrand::usize(valid_range.clone())] ^= 1 << fastrand::u32(0..8);

            assert!(decode_all(&flac).is_err());
        }
    }
}

#[test]
fn test_error_kinds() {
    let flac = sine_stream(Stereo::LeftSide);

    // first frame's header starts right after the metadata,
    // and its fifth byte is the frame number
    let mut header = flac.clone();
    header[42 + 4] ^= 0x01;
    assert!(matches!(
        decode_all(&header),
        Err(musicfox_flac::Error::Crc8Mismatch)
    ));
    assert!(decode_all(&header).unwrap_err().is_checksum());

    let mut sync = flac.clone();
    sync[42] = 0;
    assert!(matches!(
        decode_all(&sync),
        Err(musicfox_flac::Error::InvalidSyncCode)
    ));
    assert!(!decode_all(&sync).unwrap_err().is_checksum());

    // a damaged sample still parses, so only the CRC-16 notices
    let mut body = flac.clone();
    body[42 + 100] ^= 0x01;
    assert!(matches!(
        decode_all(&body),
        Err(musicfox_flac::Error::Crc16Mismatch)
    ));
}

#[test]
fn test_decoding_continues_after_error() {
    let mut flac = sine_stream(Stereo::SideRight);
    flac[42 + 100] ^= 0x01;

    let mut decoder = Decoder::new(flac.as_slice()).unwrap();
    assert!(decoder.read_frame().is_err());

    // the damaged frame is skipped entirely
    let frame = decoder.read_frame().unwrap().unwrap();
    assert_eq!(frame.sample_number(), 512);
}
