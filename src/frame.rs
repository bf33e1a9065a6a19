// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For reading and writing whole FLAC frames
//!
//! | Bits | Field |
//! |-----:|-------|
//! | 32-128 | [`FrameHeader`], ending with its CRC-8
//! | varies | one [`Subframe`] per channel
//! | 0-7  | padding to a byte boundary
//! | 16   | CRC-16 of every preceding byte in the frame

use crate::Error;
use crate::metadata::Streaminfo;
use crate::stream::{ChannelAssignment, FrameHeader};
use crate::subframe::Subframe;
use arrayvec::ArrayVec;
use bitstream_io::{BigEndian, BitReader, BitWriter};

/// A decoded FLAC frame
///
/// Its subframes hold their channels' final samples,
/// with any stereo decorrelation already reversed.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Frame {
    /// The frame's header
    pub header: FrameHeader,
    /// One subframe per channel, in channel order
    pub subframes: ArrayVec<Subframe, 8>,
    sample_number: u64,
}

impl Frame {
    /// Reads a whole frame, verifying both of its checksums
    ///
    /// Returns `Ok(None)` if the stream ends cleanly
    /// before the frame starts.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is invalid,
    /// either checksum doesn't match or the stream ends
    /// partway through the frame.
    /// No partially-decoded frame is ever returned.
    ///
    /// # Example
    ///
    /// ```
    /// use musicfox_flac::Frame;
    /// use musicfox_flac::metadata::Streaminfo;
    /// use std::num::NonZero;
    ///
    /// let streaminfo = Streaminfo {
    ///     minimum_block_size: 4096,
    ///     maximum_block_size: 4096,
    ///     minimum_frame_size: None,
    ///     maximum_frame_size: None,
    ///     sample_rate: 44100,
    ///     channels: NonZero::new(2).unwrap(),
    ///     bits_per_sample: 16,
    ///     total_samples: None,
    ///     md5: None,
    /// };
    ///
    /// let data: &[u8] = &[
    ///     0xff, 0xf8, 0xc9, 0x18, 0x00, 0xc2,  // frame header
    ///     0x00, 0x03, 0xe8,                    // CONSTANT subframe
    ///     0x00, 0x03, 0xe8,                    // CONSTANT subframe
    ///     0x10, 0x3b,                          // CRC-16
    /// ];
    ///
    /// let frame = Frame::read(data, &streaminfo).unwrap().unwrap();
    /// assert_eq!(frame.block_size(), 4096);
    /// assert!(frame.channels().all(|c| c.iter().all(|s| *s == 1000)));
    /// ```
    pub fn read<R: std::io::Read>(
        reader: R,
        streaminfo: &Streaminfo,
    ) -> Result<Option<Self>, Error> {
        Self::read_using(reader, streaminfo, &mut Vec::new())
    }

    /// Reads a whole frame, drawing sample buffers from `buffers`
    ///
    /// Buffers are popped from the end of `buffers` as needed,
    /// and new ones allocated once it runs out.
    /// This is the same as [`Frame::read`] otherwise.
    ///
    /// # Errors
    ///
    /// As [`Frame::read`].
    pub fn read_using<R: std::io::Read>(
        mut reader: R,
        streaminfo: &Streaminfo,
        buffers: &mut Vec<Vec<i32>>,
    ) -> Result<Option<Self>, Error> {
        use crate::crc::{Crc16, CrcReader};
        use bitstream_io::BitRead;
        use std::io::Read;

        let mut crc16: CrcReader<_, Crc16> = CrcReader::new(reader.by_ref());

        let header = match FrameHeader::read(crc16.by_ref(), streaminfo)? {
            Some(header) => header,
            None => return Ok(None),
        };

        let mut r = BitReader::endian(crc16.by_ref(), BigEndian);

        let mut subframes = (0..usize::from(header.channel_assignment.count()))
            .map(|channel| {
                Subframe::read(
                    &mut r,
                    header.subframe_bits_per_sample(channel),
                    header.block_size,
                    buffers.pop().unwrap_or_default(),
                )
            })
            .collect::<Result<ArrayVec<_, 8>, _>>()?;

        r.byte_align();

        let computed = crc16.checksum();
        let mut expected = [0; 2];
        reader.read_exact(&mut expected)?;
        let expected = u16::from_be_bytes(expected);

        if expected != computed {
            log::debug!(
                "frame {} CRC-16 mismatch: expected {expected:#06x}, computed {computed:#06x}",
                header.number
            );
            return Err(Error::Crc16Mismatch);
        }

        if let [first, second] = subframes.as_mut_slice() {
            correlate(
                header.channel_assignment,
                &mut first.samples,
                &mut second.samples,
            );
        }

        Ok(Some(Self {
            sample_number: header.sample_number(streaminfo),
            header,
            subframes,
        }))
    }

    /// Number of samples per channel
    pub fn block_size(&self) -> u16 {
        self.header.block_size
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.header.sample_rate
    }

    /// Bits-per-sample of the decoded samples
    pub fn bits_per_sample(&self) -> u8 {
        self.header.bits_per_sample
    }

    /// Number of channels
    pub fn channel_count(&self) -> u8 {
        self.header.channel_assignment.count()
    }

    /// Number of the frame's first sample in the stream
    pub fn sample_number(&self) -> u64 {
        self.sample_number
    }

    /// The given channel's samples, if present
    pub fn channel(&self, channel: usize) -> Option<&[i32]> {
        self.subframes.get(channel).map(|s| s.samples.as_slice())
    }

    /// Iterates over each channel's samples, in channel order
    pub fn channels(&self) -> impl Iterator<Item = &[i32]> {
        self.subframes.iter().map(|s| s.samples.as_slice())
    }

    /// Iterates over the frame's samples interleaved by channel
    ///
    /// That is, the first sample of every channel,
    /// then the second sample of every channel, and so on.
    pub fn interleaved(&self) -> impl Iterator<Item = i32> {
        (0..usize::from(self.block_size()))
            .flat_map(move |i| self.subframes.iter().map(move |s| s.samples[i]))
    }

    /// Folds the frame's samples into a running MD5 hash
    ///
    /// Samples are hashed interleaved, each as
    /// a little-endian signed integer as many bytes wide as
    /// its bits-per-sample requires.
    /// Hashing every frame of a stream in order
    /// produces the MD5 sum stored in its STREAMINFO block.
    pub fn hash(&self, md5: &mut md5::Context) {
        let bytes = usize::from(self.bits_per_sample().div_ceil(8));
        let mut buf = Vec::with_capacity(
            usize::from(self.block_size()) * usize::from(self.channel_count()) * bytes,
        );
        for sample in self.interleaved() {
            buf.extend_from_slice(&sample.to_le_bytes()[..bytes]);
        }
        md5.consume(&buf);
    }

    /// Consumes the frame and returns its sample buffers for reuse
    pub fn into_buffers(self) -> impl Iterator<Item = Vec<i32>> {
        self.subframes.into_iter().map(|s| s.samples)
    }
}

/// Reverses stereo decorrelation, in place
///
/// Converts the two stored subframes of a stereo frame
/// back into left and right channels.
/// Independent channel assignments are left as-is.
pub fn correlate(assignment: ChannelAssignment, first: &mut [i32], second: &mut [i32]) {
    let pairs = first.iter_mut().zip(second.iter_mut());

    match assignment {
        ChannelAssignment::LeftSide => pairs.for_each(|(left, side)| {
            *side = left.wrapping_sub(*side);
        }),
        ChannelAssignment::SideRight => pairs.for_each(|(side, right)| {
            *side = side.wrapping_add(*right);
        }),
        ChannelAssignment::MidSide => pairs.for_each(|(mid, side)| {
            let sum = (*mid << 1) | (*side & 1);
            let (left, right) = (sum.wrapping_add(*side) >> 1, sum.wrapping_sub(*side) >> 1);
            *mid = left;
            *side = right;
        }),
        _ => { /* independent channels */ }
    }
}

/// Applies stereo decorrelation, in place
///
/// Converts left and right channels into the two subframes
/// the given channel assignment stores.
/// This is the inverse of [`correlate`].
pub fn decorrelate(assignment: ChannelAssignment, left: &mut [i32], right: &mut [i32]) {
    let pairs = left.iter_mut().zip(right.iter_mut());

    match assignment {
        ChannelAssignment::LeftSide => pairs.for_each(|(left, right)| {
            *right = left.wrapping_sub(*right);
        }),
        ChannelAssignment::SideRight => pairs.for_each(|(left, right)| {
            *left = left.wrapping_sub(*right);
        }),
        ChannelAssignment::MidSide => pairs.for_each(|(left, right)| {
            let (l, r) = (i64::from(*left), i64::from(*right));
            *left = ((l + r) >> 1) as i32;
            *right = (l - r) as i32;
        }),
        _ => { /* independent channels */ }
    }
}

/// Writes a whole frame from per-channel samples
///
/// `channels` holds left and right channels for
/// stereo channel assignments, which are decorrelated
/// as the header's assignment requires before writing.
///
/// # Errors
///
/// Returns an error if the channel count or lengths
/// don't match the header, the header can't be coded
/// or an I/O error occurs.
pub fn write<W: std::io::Write>(
    mut writer: W,
    header: &FrameHeader,
    streaminfo: &Streaminfo,
    channels: &[&[i32]],
) -> Result<(), Error> {
    use crate::crc::{Crc16, CrcWriter};
    use bitstream_io::BitWrite;
    use std::io::Write;

    if channels.len() != usize::from(header.channel_assignment.count()) {
        return Err(Error::ChannelsMismatch);
    } else if channels
        .iter()
        .any(|c| c.len() != usize::from(header.block_size))
    {
        return Err(Error::InvalidBlockSize);
    }

    let mut crc16: CrcWriter<_, Crc16> = CrcWriter::new(writer.by_ref());
    header.write(crc16.by_ref(), streaminfo)?;

    let mut w = BitWriter::endian(crc16.by_ref(), BigEndian);

    match channels {
        [left, right] if header.channel_assignment.side_channel().is_some() => {
            let (mut first, mut second) = (left.to_vec(), right.to_vec());
            decorrelate(header.channel_assignment, &mut first, &mut second);
            crate::subframe::write(&mut w, header.subframe_bits_per_sample(0), &first)?;
            crate::subframe::write(&mut w, header.subframe_bits_per_sample(1), &second)?;
        }
        channels => {
            channels.iter().enumerate().try_for_each(|(channel, samples)| {
                crate::subframe::write(&mut w, header.subframe_bits_per_sample(channel), samples)
            })?;
        }
    }

    w.byte_align()?;

    let crc = crc16.checksum();
    writer.write_all(&crc.to_be_bytes())?;
    Ok(())
}

#[cfg(test)]
fn test_streaminfo() -> Streaminfo {
    Streaminfo {
        minimum_block_size: 4096,
        maximum_block_size: 4096,
        minimum_frame_size: None,
        maximum_frame_size: None,
        sample_rate: 44100,
        channels: std::num::NonZero::new(2).unwrap(),
        bits_per_sample: 16,
        total_samples: None,
        md5: None,
    }
}

#[cfg(test)]
const CONSTANT_FRAME: &[u8] = &[
    0xff, 0xf8, 0xc9, 0x18, 0x00, 0xc2, 0x00, 0x03, 0xe8, 0x00, 0x03, 0xe8, 0x10, 0x3b,
];

#[test]
fn test_constant_frame() {
    let streaminfo = test_streaminfo();
    let mut data = CONSTANT_FRAME;

    let frame = Frame::read(&mut data, &streaminfo).unwrap().unwrap();
    assert_eq!(frame.sample_rate(), 44100);
    assert_eq!(frame.bits_per_sample(), 16);
    assert_eq!(frame.channel_count(), 2);
    assert_eq!(frame.sample_number(), 0);
    for channel in frame.channels() {
        assert_eq!(channel, &[1000; 4096][..]);
    }
    assert!(frame.channel(2).is_none());

    // the stream then ends cleanly
    assert!(data.is_empty());
    assert_eq!(Frame::read(&mut data, &streaminfo).unwrap(), None);

    // and writing it back produces the same bytes
    let mut written = Vec::new();
    write(
        &mut written,
        &frame.header,
        &streaminfo,
        &[&[1000; 4096], &[1000; 4096]],
    )
    .unwrap();
    assert_eq!(written, CONSTANT_FRAME);
}

#[test]
fn test_damaged_frame() {
    let streaminfo = test_streaminfo();

    // damaged subframe data
    let mut data = CONSTANT_FRAME.to_vec();
    data[8] ^= 1;
    assert!(matches!(
        Frame::read(data.as_slice(), &streaminfo),
        Err(Error::Crc16Mismatch)
    ));

    // damaged CRC-16
    let mut data = CONSTANT_FRAME.to_vec();
    data[13] ^= 0x80;
    assert!(matches!(
        Frame::read(data.as_slice(), &streaminfo),
        Err(Error::Crc16Mismatch)
    ));

    // every truncation is an error
    for len in 1..CONSTANT_FRAME.len() {
        assert!(matches!(
            Frame::read(&CONSTANT_FRAME[..len], &streaminfo),
            Err(Error::UnexpectedEof)
        ));
    }
}

#[test]
fn test_stereo_frames() {
    let streaminfo = test_streaminfo();
    let left = [0, 1, -1, 32767, -32768, 32767, -32768, 12345];
    let right = [0, -1, 1, -32768, 32767, 32767, -32768, -54];

    for channel_assignment in [
        ChannelAssignment::LeftRight,
        ChannelAssignment::LeftSide,
        ChannelAssignment::SideRight,
        ChannelAssignment::MidSide,
    ] {
        let header = FrameHeader {
            fixed_block_size: true,
            block_size: 8,
            sample_rate: 44100,
            channel_assignment,
            bits_per_sample: 16,
            number: 7,
        };

        let mut data = Vec::new();
        write(&mut data, &header, &streaminfo, &[&left, &right]).unwrap();

        let frame = Frame::read(data.as_slice(), &streaminfo).unwrap().unwrap();
        assert_eq!(frame.header, header);
        assert_eq!(frame.sample_number(), 7 * 4096);
        assert_eq!(frame.channel(0), Some(&left[..]));
        assert_eq!(frame.channel(1), Some(&right[..]));
        assert_eq!(
            frame.interleaved().take(4).collect::<Vec<_>>(),
            vec![0, 0, 1, -1]
        );
    }
}

#[test]
fn test_hash() {
    let streaminfo = test_streaminfo();
    let frame = Frame::read(CONSTANT_FRAME, &streaminfo).unwrap().unwrap();

    let mut md5 = md5::Context::new();
    frame.hash(&mut md5);

    let mut expected = md5::Context::new();
    expected.consume([0xe8u8, 0x03].repeat(4096 * 2));

    assert_eq!(md5.compute(), expected.compute());
}

#[test]
fn test_correlate() {
    let mut left = vec![10, -3, 0, 7];
    let mut right = vec![4, 5, -1, 7];
    let (l, r) = (left.clone(), right.clone());

    decorrelate(ChannelAssignment::MidSide, &mut left, &mut right);
    assert_eq!(left, [7, 1, -1, 7]);
    assert_eq!(right, [6, -8, 1, 0]);
    correlate(ChannelAssignment::MidSide, &mut left, &mut right);
    assert_eq!((left, right), (l, r));
}
