// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Property-based tests for the frame codec's building blocks

use bitstream_io::{BigEndian, BitReader, BitWrite, BitWriter};
use musicfox_flac::metadata::Streaminfo;
use musicfox_flac::stream::{ChannelAssignment, FrameHeader};
use musicfox_flac::subframe::Subframe;
use musicfox_flac::{Frame, frame, utf8};
use proptest::prelude::*;
use std::num::NonZero;

// samples which fit in a signed field of the given width
fn samples(bits_per_sample: u32, len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<i32>> {
    let max = ((1i64 << (bits_per_sample - 1)) - 1) as i32;
    let min = (-(1i64 << (bits_per_sample - 1))) as i32;
    prop::collection::vec(min..=max, len)
}

fn sized_samples() -> impl Strategy<Value = (u32, Vec<i32>)> {
    (1u32..=32).prop_flat_map(|bps| (Just(bps), samples(bps, 1..300)))
}

fn stereo_pair() -> impl Strategy<Value = (Vec<i32>, Vec<i32>)> {
    (1usize..200).prop_flat_map(|len| (samples(24, len..len + 1), samples(24, len..len + 1)))
}

proptest! {
    /// Any number up to 36 bits survives the UTF-8-style coding
    #[test]
    fn utf8_roundtrip(value in 0..=utf8::MAX) {
        let mut w = BitWriter::endian(Vec::new(), BigEndian);
        utf8::write(&mut w, value).unwrap();
        let data = w.into_writer();

        prop_assert_eq!(Some(data.len()), utf8::len(value));

        let mut r = BitReader::endian(data.as_slice(), BigEndian);
        prop_assert_eq!(utf8::read(&mut r).unwrap(), value);
    }

    /// Decorrelating then correlating returns the original channels
    #[test]
    fn correlation_inverse((left, right) in stereo_pair()) {
        for assignment in [
            ChannelAssignment::LeftSide,
            ChannelAssignment::SideRight,
            ChannelAssignment::MidSide,
        ] {
            let (mut first, mut second) = (left.clone(), right.clone());
            frame::decorrelate(assignment, &mut first, &mut second);
            frame::correlate(assignment, &mut first, &mut second);
            prop_assert_eq!(&first, &left);
            prop_assert_eq!(&second, &right);
        }
    }

    /// Side channels hold the difference between left and right
    #[test]
    fn side_is_difference((left, right) in stereo_pair()) {
        let (mut first, mut second) = (left.clone(), right.clone());
        frame::decorrelate(ChannelAssignment::LeftSide, &mut first, &mut second);
        prop_assert_eq!(&first, &left);
        for ((l, r), s) in left.iter().zip(&right).zip(&second) {
            prop_assert_eq!(l - r, *s);
        }
    }

    /// Subframes read back the samples they were written with
    #[test]
    fn subframe_roundtrip((bps, samples) in sized_samples()) {
        let mut w = BitWriter::endian(Vec::new(), BigEndian);
        musicfox_flac::subframe::write(&mut w, bps, &samples).unwrap();
        w.byte_align().unwrap();
        let data = w.into_writer();

        let mut r = BitReader::endian(data.as_slice(), BigEndian);
        let subframe = Subframe::read(&mut r, bps, samples.len() as u16, Vec::new()).unwrap();
        prop_assert_eq!(subframe.samples, samples);
    }

    /// Whole frames read back with matching headers and samples
    #[test]
    fn frame_roundtrip(
        (left, right) in stereo_pair(),
        assignment in prop::sample::select(vec![
            ChannelAssignment::LeftRight,
            ChannelAssignment::LeftSide,
            ChannelAssignment::SideRight,
            ChannelAssignment::MidSide,
        ]),
        number in 0..=FrameHeader::MAX_FRAME_NUMBER,
    ) {
        let streaminfo = Streaminfo {
            minimum_block_size: 4096,
            maximum_block_size: 4096,
            minimum_frame_size: None,
            maximum_frame_size: None,
            sample_rate: 96000,
            channels: NonZero::new(2).unwrap(),
            bits_per_sample: 24,
            total_samples: None,
            md5: None,
        };

        let header = FrameHeader {
            fixed_block_size: true,
            block_size: left.len() as u16,
            sample_rate: 96000,
            channel_assignment: assignment,
            bits_per_sample: 24,
            number,
        };

        let mut data = Vec::new();
        frame::write(&mut data, &header, &streaminfo, &[&left, &right]).unwrap();

        let frame = Frame::read(data.as_slice(), &streaminfo).unwrap().unwrap();
        prop_assert_eq!(&frame.header, &header);
        prop_assert_eq!(frame.channel(0), Some(left.as_slice()));
        prop_assert_eq!(frame.channel(1), Some(right.as_slice()));
    }
}
