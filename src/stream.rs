// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For handling common FLAC stream items
//!
//! These are the headers which lay out a frame and its subframes.

use crate::Error;
use crate::metadata::Streaminfo;
use bitstream_io::{
    BigEndian, BitRead, BitReader, BitWrite, BitWriter, FromBitStream, FromBitStreamWith,
    ToBitStream,
};

/// The 14-bit code at the start of every frame
pub const SYNC_CODE: u16 = 0b11111111111110;

/// A FLAC frame header
///
/// | Bits | Field | Meaning |
/// |-----:|------:|---------|
/// | 14   | sync code | always `0b11111111111110`
/// | 1    | reserved | always 0
/// | 1    | `fixed_block_size` | 0 if fixed, 1 if variable
/// | 4    | `block_size` | coded block size
/// | 4    | `sample_rate` | coded sample rate
/// | 4    | `channel_assignment` | coded channel assignment
/// | 3    | `bits_per_sample` | coded bits-per-sample
/// | 1    | reserved | always 0
/// | 8-56 | `number` | UTF-8 coded frame or sample number
/// | 0/8/16 | `block_size` | uncommon block size - 1
/// | 0/8/16 | `sample_rate` | uncommon sample rate
/// | 8    | CRC-8 | of all preceding header bytes
///
/// Fields coded as "get from STREAMINFO" are resolved
/// from the stream's [`Streaminfo`] while parsing,
/// so a parsed header is always complete.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FrameHeader {
    /// Whether the stream uses a fixed block size
    pub fixed_block_size: bool,
    /// Number of samples per channel, from 1 to 65535
    pub block_size: u16,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// The frame's channels and how they're decorrelated
    pub channel_assignment: ChannelAssignment,
    /// Bits-per-sample of the frame's decoded samples
    pub bits_per_sample: u8,
    /// Frame number if `fixed_block_size`,
    /// otherwise the number of the frame's first sample
    pub number: u64,
}

impl FrameHeader {
    /// The largest frame number a fixed-block-size stream may use (2³¹ - 1)
    pub const MAX_FRAME_NUMBER: u64 = (1 << 31) - 1;

    /// Reads and validates a frame header, including its CRC-8
    ///
    /// Returns `Ok(None)` if the stream ends cleanly
    /// before the frame's first byte, which is how a FLAC
    /// stream signals its end.
    ///
    /// # Errors
    ///
    /// Returns an error if the header is invalid,
    /// its CRC-8 doesn't match or the stream
    /// ends partway through it.
    pub fn read<R: std::io::Read>(
        mut reader: R,
        streaminfo: &Streaminfo,
    ) -> Result<Option<Self>, Error> {
        use crate::crc::{Crc8, CrcReader};
        use std::io::Read;

        let mut crc8: CrcReader<_, Crc8> = CrcReader::new(reader.by_ref());

        let mut first = [0; 1];
        if read_first(&mut crc8, &mut first)? == 0 {
            return Ok(None);
        }

        let header = BitReader::endian(first.as_slice().chain(crc8.by_ref()), BigEndian)
            .parse_with::<FrameHeader>(streaminfo)?;

        let computed = crc8.checksum();
        let mut expected = [0; 1];
        reader.read_exact(&mut expected)?;

        if expected[0] == computed {
            Ok(Some(header))
        } else {
            log::debug!(
                "frame header CRC-8 mismatch: expected {:#04x}, computed {:#04x}",
                expected[0],
                computed
            );
            Err(Error::Crc8Mismatch)
        }
    }

    /// Writes the header followed by its CRC-8
    ///
    /// Fields which match the given [`Streaminfo`] and
    /// have no shorter coding are coded as "get from STREAMINFO".
    ///
    /// # Errors
    ///
    /// Returns an error if the header's fields can't be coded
    /// or an I/O error occurs.
    pub fn write<W: std::io::Write>(
        &self,
        mut writer: W,
        streaminfo: &Streaminfo,
    ) -> Result<(), Error> {
        use crate::crc::{Crc8, CrcWriter};
        use std::io::Write;

        let mut crc8: CrcWriter<_, Crc8> = CrcWriter::new(writer.by_ref());
        let mut w = BitWriter::endian(crc8.by_ref(), BigEndian);

        w.write::<14, u16>(SYNC_CODE)?;
        w.write_bit(false)?;
        w.write_bit(!self.fixed_block_size)?;

        let block_size = BlockSizeCode::new(self.block_size)?;
        w.write::<4, u8>(block_size.code())?;

        let sample_rate = SampleRateCode::new(self.sample_rate, streaminfo.sample_rate)?;
        w.write::<4, u8>(sample_rate.code())?;

        w.write::<4, u8>(self.channel_assignment.code())?;

        w.write::<3, u8>(match self.bits_per_sample {
            8 => 0b001,
            12 => 0b010,
            16 => 0b100,
            20 => 0b101,
            24 => 0b110,
            bps if bps == streaminfo.bits_per_sample => 0b000,
            _ => return Err(Error::InvalidBitsPerSample),
        })?;
        w.write_bit(false)?;

        if self.fixed_block_size && self.number > Self::MAX_FRAME_NUMBER {
            return Err(Error::ExcessiveFrameNumber);
        }
        crate::utf8::write(&mut w, self.number)?;

        match block_size {
            BlockSizeCode::Uncommon8(size) => w.write::<8, u16>(size - 1)?,
            BlockSizeCode::Uncommon16(size) => w.write::<16, u16>(size - 1)?,
            BlockSizeCode::Common(_) => { /* nothing to write */ }
        }

        match sample_rate {
            SampleRateCode::Khz(khz) => w.write::<8, u32>(khz)?,
            SampleRateCode::Hz(hz) => w.write::<16, u32>(hz)?,
            SampleRateCode::DaHz(dahz) => w.write::<16, u32>(dahz)?,
            SampleRateCode::Common(_) => { /* nothing to write */ }
        }

        debug_assert!(w.byte_aligned());
        drop(w);

        let crc = crc8.checksum();
        writer.write_all(&[crc])?;
        Ok(())
    }

    /// Number of the frame's first sample
    ///
    /// Fixed-block-size frames count in the stream's block size,
    /// since a stream's final block may be shorter than the rest.
    pub fn sample_number(&self, streaminfo: &Streaminfo) -> u64 {
        match self.fixed_block_size {
            true => self.number * u64::from(streaminfo.maximum_block_size),
            false => self.number,
        }
    }

    /// The bits-per-sample of the given subframe
    ///
    /// Side channels carry one more bit than the frame.
    pub fn subframe_bits_per_sample(&self, channel: usize) -> u32 {
        match self.channel_assignment.side_channel() {
            Some(side) if side == channel => u32::from(self.bits_per_sample) + 1,
            _ => u32::from(self.bits_per_sample),
        }
    }
}

// reads a frame's first byte, distinguishing a clean end-of-stream
fn read_first<R: std::io::Read>(reader: &mut R, buf: &mut [u8; 1]) -> std::io::Result<usize> {
    loop {
        match reader.read(buf) {
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            result => break result,
        }
    }
}

impl FromBitStreamWith<'_> for FrameHeader {
    type Error = Error;
    type Context = Streaminfo;

    fn from_reader<R: BitRead + ?Sized>(
        r: &mut R,
        streaminfo: &Streaminfo,
    ) -> Result<Self, Self::Error> {
        if r.read::<14, u16>()? != SYNC_CODE {
            return Err(Error::InvalidSyncCode);
        }
        if r.read_bit()? {
            return Err(Error::InvalidReservedBit);
        }
        let fixed_block_size = !r.read_bit()?;
        let encoded_block_size = r.read::<4, u8>()?;
        let encoded_sample_rate = r.read::<4, u8>()?;
        let channel_assignment = r.parse()?;
        let bits_per_sample = match r.read::<3, u8>()? {
            0b000 => streaminfo.bits_per_sample,
            0b001 => 8,
            0b010 => 12,
            0b100 => 16,
            0b101 => 20,
            0b110 => 24,
            _ => return Err(Error::InvalidBitsPerSample), // 0b011 and 0b111
        };
        if r.read_bit()? {
            return Err(Error::InvalidReservedBit);
        }
        let number = crate::utf8::read(r)?;

        let block_size = match encoded_block_size {
            0b0000 => return Err(Error::InvalidBlockSize),
            0b0001 => 192,
            n @ 0b0010..=0b0101 => 576 << (n - 2),
            0b0110 => r.read::<8, u16>()? + 1,
            0b0111 => r
                .read::<16, u16>()?
                .checked_add(1)
                .ok_or(Error::InvalidBlockSize)?,
            n => 256 << (n - 8), // 0b1000..=0b1111
        };

        let sample_rate = match encoded_sample_rate {
            0b0000 => streaminfo.sample_rate,
            0b0001 => 88200,
            0b0010 => 176400,
            0b0011 => 192000,
            0b0100 => 8000,
            0b0101 => 16000,
            0b0110 => 22050,
            0b0111 => 24000,
            0b1000 => 32000,
            0b1001 => 44100,
            0b1010 => 48000,
            0b1011 => 96000,
            0b1100 => r.read::<8, u32>()? * 1000,
            0b1101 => r.read::<16, u32>()?,
            0b1110 => r.read::<16, u32>()? * 10,
            _ => return Err(Error::InvalidSampleRate), // 0b1111
        };

        if matches!(encoded_block_size, 0b0110 | 0b0111)
            || matches!(encoded_sample_rate, 0b1100..=0b1110)
        {
            log::debug!("uncommon frame header coding: {block_size} samples at {sample_rate} Hz");
        }

        Ok(Self {
            fixed_block_size,
            block_size,
            sample_rate,
            channel_assignment,
            bits_per_sample,
            number,
        })
    }
}

#[derive(Copy, Clone)]
enum BlockSizeCode {
    Common(u8),
    Uncommon8(u16),
    Uncommon16(u16),
}

impl BlockSizeCode {
    fn new(block_size: u16) -> Result<Self, Error> {
        match block_size {
            0 => Err(Error::InvalidBlockSize),
            192 => Ok(Self::Common(0b0001)),
            576 => Ok(Self::Common(0b0010)),
            1152 => Ok(Self::Common(0b0011)),
            2304 => Ok(Self::Common(0b0100)),
            4608 => Ok(Self::Common(0b0101)),
            256 => Ok(Self::Common(0b1000)),
            512 => Ok(Self::Common(0b1001)),
            1024 => Ok(Self::Common(0b1010)),
            2048 => Ok(Self::Common(0b1011)),
            4096 => Ok(Self::Common(0b1100)),
            8192 => Ok(Self::Common(0b1101)),
            16384 => Ok(Self::Common(0b1110)),
            32768 => Ok(Self::Common(0b1111)),
            size @ 1..=256 => Ok(Self::Uncommon8(size)),
            size => Ok(Self::Uncommon16(size)),
        }
    }

    fn code(self) -> u8 {
        match self {
            Self::Common(code) => code,
            Self::Uncommon8(_) => 0b0110,
            Self::Uncommon16(_) => 0b0111,
        }
    }
}

#[derive(Copy, Clone)]
enum SampleRateCode {
    Common(u8),
    Khz(u32),
    Hz(u32),
    DaHz(u32),
}

impl SampleRateCode {
    fn new(sample_rate: u32, streaminfo_rate: u32) -> Result<Self, Error> {
        match sample_rate {
            88200 => Ok(Self::Common(0b0001)),
            176400 => Ok(Self::Common(0b0010)),
            192000 => Ok(Self::Common(0b0011)),
            8000 => Ok(Self::Common(0b0100)),
            16000 => Ok(Self::Common(0b0101)),
            22050 => Ok(Self::Common(0b0110)),
            24000 => Ok(Self::Common(0b0111)),
            32000 => Ok(Self::Common(0b1000)),
            44100 => Ok(Self::Common(0b1001)),
            48000 => Ok(Self::Common(0b1010)),
            96000 => Ok(Self::Common(0b1011)),
            rate if rate == streaminfo_rate => Ok(Self::Common(0b0000)),
            rate if rate % 1000 == 0 && rate <= 255000 => Ok(Self::Khz(rate / 1000)),
            rate if rate <= 65535 => Ok(Self::Hz(rate)),
            rate if rate % 10 == 0 && rate <= 655350 => Ok(Self::DaHz(rate / 10)),
            _ => Err(Error::InvalidSampleRate),
        }
    }

    fn code(self) -> u8 {
        match self {
            Self::Common(code) => code,
            Self::Khz(_) => 0b1100,
            Self::Hz(_) => 0b1101,
            Self::DaHz(_) => 0b1110,
        }
    }
}

/// How a frame's channels are laid out
///
/// The first eight assignments store each channel independently,
/// in SMPTE/ITU-R channel order.
/// The last three store a stereo pair with one channel
/// replaced by the difference ("side") between them.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ChannelAssignment {
    /// 1 channel: mono
    Mono,
    /// 2 channels: left, right
    LeftRight,
    /// 3 channels: left, right, center
    LeftRightCenter,
    /// 4 channels: left, right, left surround, right surround
    Quad,
    /// 5 channels: left, right, center, left surround, right surround
    FivePointZero,
    /// 6 channels: left, right, center, LFE, left surround, right surround
    FivePointOne,
    /// 7 channels: left, right, center, LFE, center surround, side left, side right
    SixPointOne,
    /// 8 channels: left, right, center, LFE, left surround, right surround,
    /// side left, side right
    SevenPointOne,
    /// 2 channels: left, side
    LeftSide,
    /// 2 channels: side, right
    SideRight,
    /// 2 channels: mid, side
    MidSide,
}

impl ChannelAssignment {
    /// Returns the independent assignment for the given channel count
    pub fn independent(channels: u8) -> Option<Self> {
        match channels {
            1 => Some(Self::Mono),
            2 => Some(Self::LeftRight),
            3 => Some(Self::LeftRightCenter),
            4 => Some(Self::Quad),
            5 => Some(Self::FivePointZero),
            6 => Some(Self::FivePointOne),
            7 => Some(Self::SixPointOne),
            8 => Some(Self::SevenPointOne),
            _ => None,
        }
    }

    /// Number of channels, and so subframes, in the frame
    pub fn count(&self) -> u8 {
        match self {
            Self::Mono => 1,
            Self::LeftRight | Self::LeftSide | Self::SideRight | Self::MidSide => 2,
            Self::LeftRightCenter => 3,
            Self::Quad => 4,
            Self::FivePointZero => 5,
            Self::FivePointOne => 6,
            Self::SixPointOne => 7,
            Self::SevenPointOne => 8,
        }
    }

    /// Index of the subframe holding the side channel, if any
    pub fn side_channel(&self) -> Option<usize> {
        match self {
            Self::LeftSide | Self::MidSide => Some(1),
            Self::SideRight => Some(0),
            _ => None,
        }
    }

    fn code(&self) -> u8 {
        match self {
            Self::LeftSide => 0b1000,
            Self::SideRight => 0b1001,
            Self::MidSide => 0b1010,
            independent => independent.count() - 1,
        }
    }
}

impl std::fmt::Display for ChannelAssignment {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::LeftSide => "left-side".fmt(f),
            Self::SideRight => "side-right".fmt(f),
            Self::MidSide => "mid-side".fmt(f),
            independent => write!(f, "{} independent", independent.count()),
        }
    }
}

impl FromBitStream for ChannelAssignment {
    type Error = Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Self::Error> {
        match r.read::<4, u8>()? {
            c @ 0b0000..=0b0111 => Self::independent(c + 1).ok_or(Error::InvalidChannels),
            0b1000 => Ok(Self::LeftSide),
            0b1001 => Ok(Self::SideRight),
            0b1010 => Ok(Self::MidSide),
            _ => Err(Error::InvalidChannels), // 0b1011..=0b1111
        }
    }
}

/// A subframe's prediction method
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SubframeType {
    /// A single sample repeated for the whole block
    Constant,
    /// Every sample stored as-is
    Verbatim,
    /// Fixed polynomial prediction, with its order from 0 to 4
    Fixed(u8),
    /// Linear prediction with stored coefficients, with its order from 1 to 32
    Lpc(u8),
}

impl SubframeType {
    /// Number of warm-up samples stored before any residuals
    pub fn order(&self) -> usize {
        match self {
            Self::Constant | Self::Verbatim => 0,
            Self::Fixed(order) | Self::Lpc(order) => usize::from(*order),
        }
    }
}

impl std::fmt::Display for SubframeType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Constant => "CONSTANT".fmt(f),
            Self::Verbatim => "VERBATIM".fmt(f),
            Self::Fixed(_) => "FIXED".fmt(f),
            Self::Lpc(_) => "LPC".fmt(f),
        }
    }
}

/// A subframe header
///
/// | Bits | Field | Meaning |
/// |-----:|------:|---------|
/// | 1    | padding | always 0
/// | 6    | `type_` | coded subframe type and order
/// | 1    | has wasted bits |
/// | 0+   | `wasted_bps` | unary-coded wasted bits - 1, if any
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SubframeHeader {
    /// The subframe's prediction method
    pub type_: SubframeType,
    /// Low-order zero bits removed from every sample
    pub wasted_bps: u32,
}

impl FromBitStream for SubframeHeader {
    type Error = Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Self::Error> {
        use crate::bits::SampleRead;

        if r.read_bit()? {
            return Err(Error::InvalidSubframeHeader);
        }

        let type_ = match r.read::<6, u8>()? {
            0b000000 => SubframeType::Constant,
            0b000001 => SubframeType::Verbatim,
            v @ 0b001000..=0b001100 => SubframeType::Fixed(v & 0b111),
            v @ 0b100000..=0b111111 => SubframeType::Lpc((v & 0b11111) + 1),
            _ => return Err(Error::ReservedSubframeType),
        };

        let wasted_bps = match r.read_bit()? {
            false => 0,
            true => r.read_zeroes()? + 1,
        };

        Ok(Self { type_, wasted_bps })
    }
}

impl ToBitStream for SubframeHeader {
    type Error = Error;

    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W) -> Result<(), Self::Error> {
        use crate::bits::SampleWrite;

        w.write_bit(false)?;
        w.write::<6, u8>(match self.type_ {
            SubframeType::Constant => 0b000000,
            SubframeType::Verbatim => 0b000001,
            SubframeType::Fixed(order @ 0..=4) => 0b001000 | order,
            SubframeType::Lpc(order @ 1..=32) => 0b100000 | (order - 1),
            SubframeType::Fixed(_) | SubframeType::Lpc(_) => {
                return Err(Error::ReservedSubframeType);
            }
        })?;
        match self.wasted_bps {
            0 => w.write_bit(false)?,
            wasted => {
                w.write_bit(true)?;
                w.write_zeroes(wasted - 1)?;
            }
        }
        Ok(())
    }
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

#[test]
fn test_read_header() {
    let streaminfo = test_streaminfo();

    // 4096 samples, 44.1kHz, 2 channels, 16 bps, frame 0
    let data: &[u8] = &[0xff, 0xf8, 0xc9, 0x18, 0x00, 0xc2];
    assert_eq!(
        FrameHeader::read(data, &streaminfo).unwrap(),
        Some(FrameHeader {
            fixed_block_size: true,
            block_size: 4096,
            sample_rate: 44100,
            channel_assignment: ChannelAssignment::LeftRight,
            bits_per_sample: 16,
            number: 0,
        })
    );

    // a clean end of stream
    assert_eq!(FrameHeader::read(&[][..], &streaminfo).unwrap(), None);

    // a truncated header is an error
    assert!(matches!(
        FrameHeader::read(&data[0..3], &streaminfo),
        Err(Error::UnexpectedEof)
    ));

    // bad CRC-8
    assert!(matches!(
        FrameHeader::read(&[0xff, 0xf8, 0xc9, 0x18, 0x00, 0xc3][..], &streaminfo),
        Err(Error::Crc8Mismatch)
    ));

    // bad sync code
    assert!(matches!(
        FrameHeader::read(&[0xff, 0xfc, 0xc9, 0x18, 0x00, 0xc2][..], &streaminfo),
        Err(Error::InvalidSyncCode)
    ));
}

#[test]
fn test_header_roundtrip() {
    let streaminfo = test_streaminfo();

    for (block_size, sample_rate, bits_per_sample, number, fixed) in [
        (4096, 44100, 16, 0, true),
        (192, 8000, 8, 1, true),
        (1, 44100, 16, 3, true),
        (255, 11000, 12, 0x1F_FFFF, false),
        (65535, 22051, 24, crate::utf8::MAX, false),
        (4608, 655350, 20, FrameHeader::MAX_FRAME_NUMBER, true),
        (33, 44100, 16, 0, true),
    ] {
        for channel_assignment in [
            ChannelAssignment::Mono,
            ChannelAssignment::SevenPointOne,
            ChannelAssignment::MidSide,
        ] {
            let header = FrameHeader {
                fixed_block_size: fixed,
                block_size,
                sample_rate,
                channel_assignment,
                bits_per_sample,
                number,
            };

            let mut data = Vec::new();
            header.write(&mut data, &streaminfo).unwrap();
            assert_eq!(
                FrameHeader::read(data.as_slice(), &streaminfo).unwrap(),
                Some(header)
            );
        }
    }
}

#[test]
fn test_invalid_headers() {
    fn header_bytes(fields: [u8; 4]) -> Vec<u8> {
        use crate::crc::{Checksum, Crc8};

        let mut data = fields.to_vec();
        data.push(0x00); // frame number 0
        let mut crc = Crc8::default();
        crc.update_all(&data);
        data.push(crc.checksum());
        data
    }

    let streaminfo = test_streaminfo();
    let parse = |fields| FrameHeader::read(header_bytes(fields).as_slice(), &streaminfo);

    assert!(matches!(
        parse([0xff, 0xf8, 0x09, 0x18]),
        Err(Error::InvalidBlockSize)
    ));
    assert!(matches!(
        parse([0xff, 0xf8, 0xcf, 0x18]),
        Err(Error::InvalidSampleRate)
    ));
    assert!(matches!(
        parse([0xff, 0xf8, 0xc9, 0xb8]),
        Err(Error::InvalidChannels)
    ));
    assert!(matches!(
        parse([0xff, 0xf8, 0xc9, 0x16]),
        Err(Error::InvalidBitsPerSample)
    ));
    assert!(matches!(
        parse([0xff, 0xf8, 0xc9, 0x1e]),
        Err(Error::InvalidBitsPerSample)
    ));
    assert!(matches!(
        parse([0xff, 0xf8, 0xc9, 0x19]),
        Err(Error::InvalidReservedBit)
    ));
    assert!(matches!(
        parse([0xff, 0xfa, 0xc9, 0x18]),
        Err(Error::InvalidReservedBit)
    ));

    // fields coded as "get from STREAMINFO"
    assert!(matches!(
        parse([0xff, 0xf8, 0xc0, 0x10]),
        Ok(Some(FrameHeader {
            sample_rate: 44100,
            bits_per_sample: 16,
            ..
        }))
    ));
}

#[test]
fn test_subframe_header() {
    use bitstream_io::BitReader;

    let parse = |byte: &[u8]| BitReader::endian(byte, BigEndian).parse::<SubframeHeader>();

    assert_eq!(
        parse(&[0b0_000000_0]).unwrap(),
        SubframeHeader {
            type_: SubframeType::Constant,
            wasted_bps: 0
        }
    );
    assert_eq!(
        parse(&[0b0_001011_1, 0b001_00000]).unwrap(),
        SubframeHeader {
            type_: SubframeType::Fixed(3),
            wasted_bps: 3
        }
    );
    assert_eq!(
        parse(&[0b0_111111_0]).unwrap().type_,
        SubframeType::Lpc(32)
    );
    assert!(matches!(
        parse(&[0b1_000000_0]),
        Err(Error::InvalidSubframeHeader)
    ));
    for reserved in [0b000010, 0b000100, 0b001101, 0b010000, 0b011111] {
        assert!(matches!(
            parse(&[reserved << 1]),
            Err(Error::ReservedSubframeType)
        ));
        assert!(parse(&[reserved << 1]).unwrap_err().is_unsupported());
    }
    assert!(!parse(&[0b1_000000_0]).unwrap_err().is_unsupported());
}
