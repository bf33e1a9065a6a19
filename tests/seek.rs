// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use musicfox_flac::decode::Options;
use musicfox_flac::encode::EncodingOptions;
use musicfox_flac::metadata::{SeekPoint, SeekTable, Streaminfo, write_blocks};
use musicfox_flac::stream::{ChannelAssignment, FrameHeader};
use musicfox_flac::{Decoder, Encoder, Error};
use std::io::Cursor;
use std::num::NonZero;

// 10,000 samples in 1,000 sample blocks,
// where every sample is its own index
fn indexed_stream() -> Vec<u8> {
    let samples = (0..10_000).collect::<Vec<i32>>();
    let mut flac = Cursor::new(vec![]);

    let mut encoder = Encoder::new(
        &mut flac,
        EncodingOptions::default().block_size(1000),
        44100,
        16,
        NonZero::new(1).unwrap(),
    )
    .unwrap();
    encoder.encode(&[samples.as_slice()]).unwrap();
    encoder.finalize().unwrap();

    flac.into_inner()
}

fn check_seeks<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) {
    for (target, expected) in [
        (2500, 2000),
        (0, 0),
        (999, 0),
        (1000, 1000),
        (9999, 9000),
        (4321, 4000),
    ] {
        assert_eq!(decoder.seek(target).unwrap(), expected);

        let frame = decoder.read_frame().unwrap().unwrap();
        assert_eq!(frame.sample_number(), expected);
        assert_eq!(frame.channel(0).unwrap()[0], expected as i32);
        decoder.recycle(frame);
    }

    assert!(matches!(decoder.seek(10_000), Err(Error::InvalidSeek)));
    assert!(matches!(decoder.seek(u64::MAX), Err(Error::InvalidSeek)));
}

#[test]
fn test_seek_built_seektable() {
    let mut decoder = Decoder::new_seekable(Cursor::new(indexed_stream())).unwrap();
    assert!(decoder.seektable().is_none());

    check_seeks(&mut decoder);

    let seektable = decoder.seektable().unwrap();
    assert_eq!(seektable.points.len(), 10);
    assert_eq!(seektable.closest(2500).unwrap().sample_offset(), Some(2000));
}

#[test]
fn test_seek_without_seektable() {
    let mut decoder = Decoder::seekable_with_options(
        Cursor::new(indexed_stream()),
        Options::default().build_seektable(false),
    )
    .unwrap();

    check_seeks(&mut decoder);
    assert!(decoder.seektable().is_none());
}

#[test]
fn test_seek_then_read_rest() {
    let mut decoder = Decoder::new_seekable(Cursor::new(indexed_stream())).unwrap();

    // reading some frames before seeking doesn't matter
    assert!(decoder.read_frame().unwrap().is_some());
    assert!(decoder.read_frame().unwrap().is_some());

    assert_eq!(decoder.seek(7777).unwrap(), 7000);

    let rest = decoder
        .by_ref()
        .map(|frame| frame.map(|f| f.channel(0).unwrap().to_vec()))
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
        .concat();

    assert_eq!(rest, (7000..10_000).collect::<Vec<i32>>());
}

#[test]
fn test_seek_unseekable() {
    // a decoder not built seekable has no frame position to return to
    let mut decoder = Decoder::new(Cursor::new(indexed_stream())).unwrap();
    assert!(matches!(decoder.seek(0), Err(Error::InvalidSeek)));
}

#[test]
fn test_seek_stored_seektable() {
    const BLOCK_SIZE: u16 = 100;

    let streaminfo = Streaminfo {
        minimum_block_size: BLOCK_SIZE,
        maximum_block_size: BLOCK_SIZE,
        minimum_frame_size: None,
        maximum_frame_size: None,
        sample_rate: 44100,
        channels: NonZero::new(1).unwrap(),
        bits_per_sample: 16,
        total_samples: NonZero::new(1000),
        md5: None,
    };

    // each frame's samples are all its frame number
    let mut frames = vec![];
    let mut offsets = vec![];
    for number in 0..10 {
        offsets.push(frames.len() as u64);
        musicfox_flac::frame::write(
            &mut frames,
            &FrameHeader {
                fixed_block_size: true,
                block_size: BLOCK_SIZE,
                sample_rate: 44100,
                channel_assignment: ChannelAssignment::Mono,
                bits_per_sample: 16,
                number,
            },
            &streaminfo,
            &[&[number as i32; BLOCK_SIZE as usize]],
        )
        .unwrap();
    }

    let seektable = SeekTable {
        points: vec![
            SeekPoint::Defined {
                sample_offset: 0,
                byte_offset: offsets[0],
                frame_samples: BLOCK_SIZE,
            },
            SeekPoint::Defined {
                sample_offset: 500,
                byte_offset: offsets[5],
                frame_samples: BLOCK_SIZE,
            },
            SeekPoint::Placeholder,
        ],
    };

    let mut flac = vec![];
    write_blocks(&mut flac, &streaminfo, Some(&seektable)).unwrap();
    flac.extend_from_slice(&frames);

    let mut decoder = Decoder::new_seekable(Cursor::new(flac)).unwrap();
    assert_eq!(decoder.seektable(), Some(&seektable));

    for (target, frame_number) in [(750, 7), (500, 5), (499, 4), (0, 0), (999, 9)] {
        assert_eq!(decoder.seek(target).unwrap(), frame_number * 100);
        let frame = decoder.read_frame().unwrap().unwrap();
        assert!(frame.channel(0).unwrap().iter().all(|s| *s == frame_number as i32));
    }

    assert!(matches!(decoder.seek(1000), Err(Error::InvalidSeek)));
}

#[test]
fn test_failed_seektable_scan() {
    let mut flac = indexed_stream();

    // damage a sample in the final frame
    let damaged = flac.len() - 10;
    flac[damaged] ^= 0x01;

    let mut decoder = Decoder::new_seekable(Cursor::new(flac)).unwrap();
    assert_eq!(decoder.read_frame().unwrap().unwrap().sample_number(), 0);

    assert!(matches!(decoder.seek(500), Err(Error::Crc16Mismatch)));
    assert!(decoder.seektable().is_none());

    // decoding resumes where it left off before the seek
    assert_eq!(decoder.read_frame().unwrap().unwrap().sample_number(), 1000);
}
