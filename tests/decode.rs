// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use musicfox_flac::encode::{EncodingOptions, Stereo};
use musicfox_flac::{Decoder, Encoder, Error};
use std::io::Cursor;
use std::num::NonZero;

fn random_channels(channels: usize, bits_per_sample: u32, len: usize) -> Vec<Vec<i32>> {
    let max = (1i64 << (bits_per_sample - 1)) - 1;
    let min = -(1i64 << (bits_per_sample - 1));

    (0..channels)
        .map(|_| {
            (0..len)
                .map(|_| fastrand::i64(min..=max) as i32)
                .collect()
        })
        .collect()
}

fn encode(
    options: EncodingOptions,
    bits_per_sample: u8,
    channels: &[Vec<i32>],
) -> Vec<u8> {
    let mut flac = Cursor::new(vec![]);

    let mut encoder = Encoder::new(
        &mut flac,
        options,
        44100,
        bits_per_sample,
        NonZero::new(channels.len() as u8).unwrap(),
    )
    .unwrap();

    let channels = channels.iter().map(|c| c.as_slice()).collect::<Vec<_>>();
    encoder.encode(&channels).unwrap();
    encoder.finalize().unwrap();

    flac.into_inner()
}

fn decode(flac: &[u8]) -> Vec<Vec<i32>> {
    let mut decoder = Decoder::new(flac).unwrap();
    let mut channels = vec![vec![]; usize::from(decoder.streaminfo().channels.get())];

    while let Some(frame) = decoder.read_frame().unwrap() {
        for (channel, samples) in channels.iter_mut().zip(frame.channels()) {
            channel.extend_from_slice(samples);
        }
        decoder.recycle(frame);
    }

    channels
}

#[test]
fn test_constant_stream() {
    use musicfox_flac::metadata::{Streaminfo, write_blocks};

    let streaminfo = Streaminfo {
        minimum_block_size: 4096,
        maximum_block_size: 4096,
        minimum_frame_size: None,
        maximum_frame_size: None,
        sample_rate: 44100,
        channels: NonZero::new(2).unwrap(),
        bits_per_sample: 16,
        total_samples: None,
        md5: None,
    };

    let mut flac = vec![];
    write_blocks(&mut flac, &streaminfo, None).unwrap();
    flac.extend_from_slice(&[
        0xff, 0xf8, 0xc9, 0x18, 0x00, 0xc2, 0x00, 0x03, 0xe8, 0x00, 0x03, 0xe8, 0x10, 0x3b,
    ]);

    let mut decoder = Decoder::new(flac.as_slice()).unwrap();
    assert_eq!(decoder.streaminfo(), &streaminfo);

    let frame = decoder.read_frame().unwrap().unwrap();
    assert_eq!(frame.block_size(), 4096);
    assert_eq!(frame.sample_rate(), 44100);
    assert_eq!(frame.bits_per_sample(), 16);
    assert_eq!(frame.channel_count(), 2);
    assert_eq!(frame.sample_number(), 0);
    assert_eq!(frame.channel(0), Some(&[1000; 4096][..]));
    assert_eq!(frame.channel(1), Some(&[1000; 4096][..]));
    assert_eq!(frame.channel(2), None);

    assert!(decoder.read_frame().unwrap().is_none());
    assert!(decoder.read_frame().unwrap().is_none());

    assert_eq!(
        musicfox_flac::decode::verify_reader(flac.as_slice()).unwrap(),
        musicfox_flac::decode::Verified::NoMD5
    );
}

#[test]
fn test_stereo_roundtrip() {
    let channels = random_channels(2, 16, 4500);

    for stereo in [
        Stereo::Independent,
        Stereo::LeftSide,
        Stereo::SideRight,
        Stereo::MidSide,
    ] {
        let flac = encode(
            EncodingOptions::default().block_size(1000).stereo(stereo),
            16,
            &channels,
        );

        assert_eq!(decode(&flac), channels, "{stereo:?}");

        assert_eq!(
            musicfox_flac::decode::verify_reader(flac.as_slice()).unwrap(),
            musicfox_flac::decode::Verified::MD5Match,
        );
    }
}

#[test]
fn test_roundtrip_layouts() {
    for (channels, bits_per_sample) in [(1, 24), (1, 32), (3, 8), (6, 20), (8, 12), (2, 4)] {
        let samples = random_channels(channels, bits_per_sample, 777);
        let flac = encode(
            EncodingOptions::default().block_size(256),
            bits_per_sample as u8,
            &samples,
        );

        let decoder = Decoder::new(flac.as_slice()).unwrap();
        assert_eq!(decoder.streaminfo().bits_per_sample, bits_per_sample as u8);
        assert_eq!(
            decoder.streaminfo().total_samples.map(|t| t.get()),
            Some(777)
        );

        assert_eq!(decode(&flac), samples);
    }
}

#[test]
fn test_partial_blocks() {
    // samples arriving in uneven pieces still produce
    // whole blocks and one short final block
    let channels = random_channels(2, 16, 2500);

    let mut flac = Cursor::new(vec![]);
    let mut encoder = Encoder::new(
        &mut flac,
        EncodingOptions::default()
            .block_size(1024)
            .stereo(Stereo::MidSide),
        48000,
        16,
        NonZero::new(2).unwrap(),
    )
    .unwrap();

    for range in [0..1, 1..700, 700..2100, 2100..2500] {
        encoder
            .encode(&[&channels[0][range.clone()], &channels[1][range]])
            .unwrap();
    }
    encoder.finalize().unwrap();

    let flac = flac.into_inner();

    let block_sizes = Decoder::new(flac.as_slice())
        .unwrap()
        .map(|frame| frame.map(|f| f.block_size()))
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    assert_eq!(block_sizes, vec![1024, 1024, 452]);
    assert_eq!(decode(&flac), channels);
}

#[test]
fn test_frame_numbers() {
    let flac = encode(
        EncodingOptions::default().block_size(100),
        16,
        &random_channels(1, 16, 1050),
    );

    let numbers = Decoder::new(flac.as_slice())
        .unwrap()
        .map(|frame| frame.map(|f| f.sample_number()))
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    assert_eq!(numbers, (0..11).map(|i| i * 100).collect::<Vec<u64>>());
}

#[test]
fn test_interleaved() {
    let flac = encode(
        EncodingOptions::default(),
        16,
        &[vec![1, 2, 3], vec![-1, -2, -3]],
    );

    let mut decoder = Decoder::new(flac.as_slice()).unwrap();
    let frame = decoder.read_frame().unwrap().unwrap();
    assert_eq!(
        frame.interleaved().collect::<Vec<_>>(),
        vec![1, -1, 2, -2, 3, -3]
    );
}

#[test]
fn test_md5_mismatch() {
    let mut flac = encode(
        EncodingOptions::default(),
        16,
        &random_channels(2, 16, 5000),
    );

    // "fLaC" + block header + 18 bytes of STREAMINFO precede the MD5 sum
    flac[4 + 4 + 18] ^= 0x01;

    assert_eq!(
        musicfox_flac::decode::verify_reader(flac.as_slice()).unwrap(),
        musicfox_flac::decode::Verified::MD5Mismatch
    );
}

#[test]
fn test_id3v2() {
    use musicfox_flac::decode::Options;

    let flac = encode(
        EncodingOptions::default(),
        16,
        &random_channels(1, 16, 100),
    );

    let mut tagged = vec![b'I', b'D', b'3', 4, 0, 0, 0, 0, 0, 10];
    tagged.extend_from_slice(&[0; 10]);
    tagged.extend_from_slice(&flac);

    assert_eq!(decode(&tagged), decode(&flac));

    assert!(matches!(
        Decoder::with_options(tagged.as_slice(), Options::default().skip_id3v2(false)),
        Err(Error::MissingFlacTag)
    ));
}

#[test]
fn test_truncated_stream() {
    let flac = encode(
        EncodingOptions::default().block_size(500),
        16,
        &random_channels(2, 16, 1000),
    );

    // cut the stream partway through its last frame
    let truncated = &flac[..flac.len() - 10];
    let mut decoder = Decoder::new(truncated).unwrap();

    assert!(decoder.read_frame().unwrap().is_some());
    assert!(matches!(decoder.read_frame(), Err(Error::UnexpectedEof)));
}

#[test]
fn test_invalid_encoder_parameters() {
    fn encoder(
        options: EncodingOptions,
        sample_rate: u32,
        bits_per_sample: u8,
        channels: u8,
    ) -> Result<(), Error> {
        Encoder::new(
            Cursor::new(vec![]),
            options,
            sample_rate,
            bits_per_sample,
            NonZero::new(channels).unwrap(),
        )
        .map(drop)
    }

    assert!(matches!(
        encoder(EncodingOptions::default().block_size(0), 44100, 16, 2),
        Err(Error::InvalidBlockSize)
    ));
    assert!(matches!(
        encoder(EncodingOptions::default(), 1 << 20, 16, 2),
        Err(Error::InvalidSampleRate)
    ));
    assert!(matches!(
        encoder(EncodingOptions::default(), 44100, 0, 2),
        Err(Error::InvalidBitsPerSample)
    ));
    assert!(matches!(
        encoder(EncodingOptions::default(), 44100, 33, 2),
        Err(Error::InvalidBitsPerSample)
    ));
    assert!(matches!(
        encoder(EncodingOptions::default(), 44100, 16, 9),
        Err(Error::ExcessiveChannels)
    ));
    assert!(matches!(
        encoder(
            EncodingOptions::default().stereo(Stereo::MidSide),
            44100,
            32,
            2
        ),
        Err(Error::UnsupportedBitsPerSample)
    ));
    assert!(
        encoder(
            EncodingOptions::default().stereo(Stereo::LeftSide),
            44100,
            32,
            2
        )
        .unwrap_err()
        .is_unsupported()
    );
}
