// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For reading and writing the FLAC metadata blocks frames depend on
//!
//! Only STREAMINFO and SEEKTABLE are parsed.
//! Other blocks are skipped over.

use crate::Error;
use bitstream_io::{
    BigEndian, BitRead, BitReader, BitWrite, BitWriter, FromBitStream, FromBitStreamUsing,
    ToBitStream,
};
use std::num::NonZero;

/// The FLAC tag which starts every stream
pub const FLAC_TAG: &[u8; 4] = b"fLaC";

/// The tag of an ID3v2 header some files are prefixed with
const ID3_TAG: &[u8; 3] = b"ID3";

/// A metadata block header
///
/// | Bits | Field | Meaning |
/// |-----:|------:|---------|
/// | 1    | `last` | final metadata block in file
/// | 7    | `block_type` | type of block
/// | 24   | `size` | block size, in bytes, not including header
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BlockHeader {
    /// Whether we are the final block
    pub last: bool,
    /// Our block type
    pub block_type: BlockType,
    /// Our block size, in bytes
    pub size: u32,
}

impl BlockHeader {
    /// The largest possible block size, in bytes (2²⁴ - 1)
    pub const MAX_SIZE: u32 = (1 << 24) - 1;
}

impl FromBitStream for BlockHeader {
    type Error = Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Self::Error> {
        Ok(Self {
            last: r.read_bit()?,
            block_type: r.parse()?,
            size: r.read::<24, _>()?,
        })
    }
}

impl ToBitStream for BlockHeader {
    type Error = Error;

    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W) -> Result<(), Self::Error> {
        w.write_bit(self.last)?;
        w.build(&self.block_type)?;
        w.write::<24, _>(self.size)?;
        Ok(())
    }
}

/// A FLAC metadata block type
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BlockType {
    /// The STREAMINFO block
    Streaminfo,
    /// The PADDING block
    Padding,
    /// The APPLICATION block
    Application,
    /// The SEEKTABLE block
    SeekTable,
    /// The VORBIS_COMMENT block
    VorbisComment,
    /// The CUESHEET block
    Cuesheet,
    /// The PICTURE block
    Picture,
    /// A reserved block type, from 7 to 126
    Reserved(u8),
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Streaminfo => "STREAMINFO".fmt(f),
            Self::Padding => "PADDING".fmt(f),
            Self::Application => "APPLICATION".fmt(f),
            Self::SeekTable => "SEEKTABLE".fmt(f),
            Self::VorbisComment => "VORBIS_COMMENT".fmt(f),
            Self::Cuesheet => "CUESHEET".fmt(f),
            Self::Picture => "PICTURE".fmt(f),
            Self::Reserved(t) => write!(f, "reserved type {t}"),
        }
    }
}

impl FromBitStream for BlockType {
    type Error = Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Self::Error> {
        match r.read::<7, u8>()? {
            0 => Ok(Self::Streaminfo),
            1 => Ok(Self::Padding),
            2 => Ok(Self::Application),
            3 => Ok(Self::SeekTable),
            4 => Ok(Self::VorbisComment),
            5 => Ok(Self::Cuesheet),
            6 => Ok(Self::Picture),
            t @ 7..=126 => Ok(Self::Reserved(t)),
            _ => Err(Error::InvalidMetadataBlock),
        }
    }
}

impl ToBitStream for BlockType {
    type Error = Error;

    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W) -> Result<(), Self::Error> {
        w.write::<7, u8>(match self {
            Self::Streaminfo => 0,
            Self::Padding => 1,
            Self::Application => 2,
            Self::SeekTable => 3,
            Self::VorbisComment => 4,
            Self::Cuesheet => 5,
            Self::Picture => 6,
            Self::Reserved(t @ 7..=126) => *t,
            Self::Reserved(_) => return Err(Error::InvalidMetadataBlock),
        })?;
        Ok(())
    }
}

/// A STREAMINFO metadata block
///
/// This block contains metadata about the stream's contents
/// which frame headers may defer to.
///
/// | Bits | Field | Meaning |
/// |-----:|------:|---------|
/// | 16   | `minimum_block_size` | minimum block size (in samples) in the stream
/// | 16   | `maximum_block_size` | maximum block size (in samples) in the stream
/// | 24   | `minimum_frame_size` | minimum frame size (in bytes) in the stream
/// | 24   | `maximum_frame_size` | maximum frame size (in bytes) in the stream
/// | 20   | `sample_rate` | stream's sample rate, in Hz
/// | 3    | `channels` | stream's channel count (+1)
/// | 5    | `bits_per_sample` | stream's bits-per-sample (+1)
/// | 36   | `total_samples` | stream's total channel-independent samples
/// | 16×8 | `md5` | decoded stream's MD5 sum hash
///
/// The encoder rewrites this block once a stream is finished,
/// since most of its fields aren't known before then.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Streaminfo {
    /// The minimum block size (in samples) used in the stream,
    /// excluding the last block.
    pub minimum_block_size: u16,
    /// The maximum block size (in samples) used in the stream,
    /// excluding the last block.
    pub maximum_block_size: u16,
    /// The minimum framesize (in bytes) used in the stream.
    ///
    /// `None` indicates the value is unknown.
    pub minimum_frame_size: Option<NonZero<u32>>,
    /// The maximum framesize (in bytes) used in the stream.
    ///
    /// `None` indicates the value is unknown.
    pub maximum_frame_size: Option<NonZero<u32>>,
    /// Sample rate in Hz
    ///
    /// 0 indicates a non-audio stream.
    pub sample_rate: u32,
    /// Number of channels, from 1 to 8
    pub channels: NonZero<u8>,
    /// Number of bits-per-sample, from 1 to 32
    pub bits_per_sample: u8,
    /// Total number of interchannel samples in stream.
    ///
    /// `None` indicates the value is unknown.
    pub total_samples: Option<NonZero<u64>>,
    /// MD5 hash of unencoded audio data.
    ///
    /// `None` indicates the value is unknown.
    pub md5: Option<[u8; 16]>,
}

impl Streaminfo {
    /// The maximum size of a frame, in bytes (2²⁴ - 1)
    pub const MAX_FRAME_SIZE: u32 = (1 << 24) - 1;

    /// The maximum sample rate, in Hz (2²⁰ - 1)
    pub const MAX_SAMPLE_RATE: u32 = (1 << 20) - 1;

    /// The maximum number of channels (8)
    pub const MAX_CHANNELS: u8 = 8;

    /// The maximum number of total samples (2³⁶ - 1)
    pub const MAX_TOTAL_SAMPLES: u64 = (1 << 36) - 1;

    /// Defined size of STREAMINFO block, in bytes
    pub const SIZE: u32 = 34;
}

impl FromBitStream for Streaminfo {
    type Error = std::io::Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Self::Error> {
        Ok(Self {
            minimum_block_size: r.read_to()?,
            maximum_block_size: r.read_to()?,
            minimum_frame_size: r.read::<24, _>()?,
            maximum_frame_size: r.read::<24, _>()?,
            sample_rate: r.read::<20, _>()?,
            channels: r.read::<3, _>()?,
            bits_per_sample: r.read::<5, u8>()? + 1,
            total_samples: r.read::<36, _>()?,
            md5: r
                .read_to()
                .map(|md5: [u8; 16]| md5.iter().any(|b| *b != 0).then_some(md5))?,
        })
    }
}

impl ToBitStream for Streaminfo {
    type Error = std::io::Error;

    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W) -> Result<(), Self::Error> {
        w.write_from(self.minimum_block_size)?;
        w.write_from(self.maximum_block_size)?;
        w.write::<24, _>(self.minimum_frame_size)?;
        w.write::<24, _>(self.maximum_frame_size)?;
        w.write::<20, _>(self.sample_rate)?;
        w.write::<3, _>(self.channels)?;
        w.write::<5, u8>(
            self.bits_per_sample
                .checked_sub(1)
                .filter(|bps| *bps < 32)
                .ok_or_else(|| {
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "bits-per-sample outside 1 to 32",
                    )
                })?,
        )?;
        w.write::<36, _>(self.total_samples)?;
        w.write_from(self.md5.unwrap_or([0; 16]))?;
        Ok(())
    }
}

/// A SEEKTABLE metadata block
///
/// Because FLAC frames do not store their compressed length,
/// a seek table is used for random access within a FLAC file.
/// By mapping a sample number to a byte offset,
/// one can quickly reach different parts of the file
/// without decoding the whole thing.
///
/// Each point is 18 bytes, so the block's size
/// must be a multiple of 18.
#[derive(Debug, Clone, Eq, PartialEq, Default)]
pub struct SeekTable {
    /// The seek table's individual seek points
    pub points: Vec<SeekPoint>,
}

impl SeekTable {
    /// Size of a single seek point, in bytes
    pub const POINT_SIZE: u32 = (64 + 64 + 16) / 8;

    /// Returns the last defined point at or before the given sample
    ///
    /// Placeholder points are ignored.
    pub fn closest(&self, sample: u64) -> Option<&SeekPoint> {
        self.points
            .iter()
            .filter(|p| p.sample_offset().is_some_and(|offset| offset <= sample))
            .max_by_key(|p| p.sample_offset())
    }
}

impl FromBitStreamUsing for SeekTable {
    type Context = u32;
    type Error = Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R, size: u32) -> Result<Self, Self::Error> {
        match (size / Self::POINT_SIZE, size % Self::POINT_SIZE) {
            (p, 0) => Ok(Self {
                points: (0..p)
                    .map(|_| r.parse())
                    .collect::<Result<Vec<_>, _>>()?,
            }),
            _ => Err(Error::InvalidSeekTableSize),
        }
    }
}

impl ToBitStream for SeekTable {
    type Error = std::io::Error;

    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W) -> Result<(), Self::Error> {
        self.points.iter().try_for_each(|point| w.build(point))
    }
}

/// An individual SEEKTABLE seek point
///
/// | Bits | Field | Meaning |
/// |-----:|------:|---------|
/// | 64   | `sample_offset` | sample number of first sample in target frame
/// | 64   | `byte_offset` | offset, in bytes, from first frame to target frame's header
/// | 16   | `frame_samples` | number of samples in target frame
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SeekPoint {
    /// A defined, non-placeholder seek point
    Defined {
        /// The sample number of the first sample in the target frame
        sample_offset: u64,
        /// Offset, in bytes, from the first byte of the first frame header
        /// to the first byte in the target frame's header
        byte_offset: u64,
        /// Number of samples in the target frame
        frame_samples: u16,
    },
    /// A placeholder seek point
    Placeholder,
}

impl SeekPoint {
    /// Returns our sample offset, if not a placeholder point
    pub fn sample_offset(&self) -> Option<u64> {
        match self {
            Self::Defined { sample_offset, .. } => Some(*sample_offset),
            Self::Placeholder => None,
        }
    }

    /// Returns our byte offset, if not a placeholder point
    pub fn byte_offset(&self) -> Option<u64> {
        match self {
            Self::Defined { byte_offset, .. } => Some(*byte_offset),
            Self::Placeholder => None,
        }
    }
}

impl FromBitStream for SeekPoint {
    type Error = std::io::Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Self::Error> {
        match r.read_to()? {
            u64::MAX => {
                let _byte_offset = r.read_to::<u64>()?;
                let _frame_samples = r.read_to::<u16>()?;
                Ok(Self::Placeholder)
            }
            sample_offset => Ok(Self::Defined {
                sample_offset,
                byte_offset: r.read_to()?,
                frame_samples: r.read_to()?,
            }),
        }
    }
}

impl ToBitStream for SeekPoint {
    type Error = std::io::Error;

    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W) -> Result<(), Self::Error> {
        match self {
            Self::Defined {
                sample_offset,
                byte_offset,
                frame_samples,
            } => {
                w.write_from(*sample_offset)?;
                w.write_from(*byte_offset)?;
                w.write_from(*frame_samples)
            }
            Self::Placeholder => {
                w.write_from(u64::MAX)?;
                w.write_from(0u64)?;
                w.write_from(0u16)
            }
        }
    }
}

/// A metadata block of the sort frame decoding cares about
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Block {
    /// The STREAMINFO block
    Streaminfo(Streaminfo),
    /// The SEEKTABLE block
    SeekTable(SeekTable),
    /// Any other block, whose body has been skipped
    Skipped(BlockHeader),
}

/// An iterator over FLAC metadata blocks
///
/// The stream's `fLaC` tag is read first,
/// and STREAMINFO must be the first block.
/// Once the final block is returned, the underlying
/// reader is positioned at the stream's first frame.
pub struct BlockIterator<R: std::io::Read> {
    reader: R,
    skip_id3v2: bool,
    failed: bool,
    tag_read: bool,
    streaminfo_read: bool,
    seektable_read: bool,
    finished: bool,
}

impl<R: std::io::Read> BlockIterator<R> {
    /// Creates an iterator over something that implements `Read`.
    /// Because this may perform many small reads,
    /// performance is greatly improved by buffering reads
    /// when reading from a raw `File`.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            skip_id3v2: true,
            failed: false,
            tag_read: false,
            streaminfo_read: false,
            seektable_read: false,
            finished: false,
        }
    }

    /// Whether to skip an ID3v2 tag preceding the `fLaC` tag
    ///
    /// This is enabled by default.
    pub fn skip_id3v2(self, skip_id3v2: bool) -> Self {
        Self { skip_id3v2, ..self }
    }

    /// Returns the wrapped reader
    pub fn into_reader(self) -> R {
        self.reader
    }

    fn read_tag(&mut self) -> Result<(), Error> {
        let mut tag = [0; 4];
        self.reader.read_exact(&mut tag)?;

        if self.skip_id3v2 && tag.starts_with(ID3_TAG) {
            // after the major version come
            // a revision, flags and a synchsafe size
            let mut id3 = [0; 6];
            self.reader.read_exact(&mut id3)?;
            let [_revision, flags, size @ ..] = id3;
            let footer = match flags & 0x10 {
                0 => 0,
                _ => 10,
            };
            let size = size
                .iter()
                .fold(0u64, |acc, b| (acc << 7) | u64::from(b & 0x7F))
                + footer;

            log::debug!("skipping {size} byte ID3v2 tag");

            match std::io::copy(&mut std::io::Read::take(std::io::Read::by_ref(&mut self.reader), size), &mut std::io::sink())? {
                skipped if skipped == size => self.reader.read_exact(&mut tag)?,
                _ => return Err(Error::UnexpectedEof),
            }
        }

        match &tag {
            FLAC_TAG => Ok(()),
            _ => Err(Error::MissingFlacTag),
        }
    }

    fn read_block(&mut self) -> Result<Block, Error> {
        // like a slighly easier variant of "Take"
        struct LimitedReader<R> {
            reader: R,
            size: usize,
        }

        impl<R: std::io::Read> std::io::Read for LimitedReader<R> {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                let size = self.size.min(buf.len());
                self.reader.read(&mut buf[0..size]).inspect(|amt_read| {
                    self.size -= amt_read;
                })
            }
        }

        let header: BlockHeader = BitReader::endian(self.reader.by_ref(), BigEndian).parse()?;

        let mut reader = BitReader::endian(
            LimitedReader {
                reader: self.reader.by_ref(),
                size: header.size as usize,
            },
            BigEndian,
        );

        let block = match header.block_type {
            BlockType::Streaminfo => match header.size {
                Streaminfo::SIZE => Block::Streaminfo(reader.parse()?),
                _ => return Err(Error::InvalidMetadataBlockSize),
            },
            BlockType::SeekTable => Block::SeekTable(reader.parse_using(header.size)?),
            block_type => {
                log::debug!("skipping {block_type} block of {} bytes", header.size);
                let mut limited = reader.into_reader();
                std::io::copy(&mut limited, &mut std::io::sink())?;
                match limited.size {
                    0 => {
                        self.finished = header.last;
                        return Ok(Block::Skipped(header));
                    }
                    _ => return Err(Error::UnexpectedEof),
                }
            }
        };

        match reader.into_reader().size {
            0 => {
                self.finished = header.last;
                Ok(block)
            }
            _ => Err(Error::InvalidMetadataBlockSize),
        }
    }

    fn fail(&mut self, err: Error) -> Option<Result<Block, Error>> {
        self.failed = true;
        Some(Err(err))
    }
}

impl<R: std::io::Read> Iterator for BlockIterator<R> {
    type Item = Result<Block, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.finished {
            // once we hit an error, stop any further reads
            None
        } else if !self.tag_read {
            // "fLaC" tag must come before anything else
            match self.read_tag() {
                Ok(()) => {
                    self.tag_read = true;
                    self.next()
                }
                Err(err) => self.fail(err),
            }
        } else if !self.streaminfo_read {
            // STREAMINFO block must be first in file
            match self.read_block() {
                Ok(block @ Block::Streaminfo(_)) => {
                    self.streaminfo_read = true;
                    Some(Ok(block))
                }
                Ok(_) => self.fail(Error::MissingStreaminfo),
                Err(err) => self.fail(err),
            }
        } else {
            match self.read_block() {
                Ok(Block::Streaminfo(_)) => self.fail(Error::MultipleStreaminfo),
                Ok(Block::SeekTable(_)) if self.seektable_read => {
                    self.fail(Error::MultipleSeekTable)
                }
                Ok(block) => {
                    self.seektable_read |= matches!(block, Block::SeekTable(_));
                    Some(Ok(block))
                }
                Err(err) => self.fail(err),
            }
        }
    }
}

/// Returns an iterator over a stream's metadata blocks
///
/// # Example
///
/// ```
/// use musicfox_flac::metadata::{Block, read_blocks};
///
/// let data: &[u8] = &[
///     0x66, 0x4c, 0x61, 0x43,  // "fLaC"
///     0x80, 0x00, 0x00, 0x22,  // STREAMINFO header, final block
///     0x10, 0x00, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00,
///     0x00, 0x00, 0x0a, 0xc4, 0x42, 0xf0, 0x00, 0x00,
///     0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
///     0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
///     0x00, 0x00,
/// ];
///
/// let blocks = read_blocks(data).collect::<Result<Vec<_>, _>>().unwrap();
/// assert_eq!(blocks.len(), 1);
/// let Block::Streaminfo(streaminfo) = &blocks[0] else { panic!() };
/// assert_eq!(streaminfo.sample_rate, 44100);
/// assert_eq!(streaminfo.channels.get(), 2);
/// assert_eq!(streaminfo.bits_per_sample, 16);
/// assert_eq!(streaminfo.total_samples.map(|s| s.get()), Some(4096));
/// assert_eq!(streaminfo.md5, None);
/// ```
pub fn read_blocks<R: std::io::Read>(r: R) -> BlockIterator<R> {
    BlockIterator::new(r)
}

/// Writes a `fLaC` tag, STREAMINFO and any SEEKTABLE block
///
/// The final block written is flagged as such,
/// so frames may follow immediately.
///
/// # Errors
///
/// Returns an error if the seek table is too large
/// or an I/O error occurs.
pub fn write_blocks<W: std::io::Write>(
    mut w: W,
    streaminfo: &Streaminfo,
    seektable: Option<&SeekTable>,
) -> Result<(), Error> {
    w.write_all(FLAC_TAG)?;

    let mut w = BitWriter::endian(w, BigEndian);

    w.build(&BlockHeader {
        last: seektable.is_none(),
        block_type: BlockType::Streaminfo,
        size: Streaminfo::SIZE,
    })?;
    w.build(streaminfo)?;

    if let Some(seektable) = seektable {
        w.build(&BlockHeader {
            last: true,
            block_type: BlockType::SeekTable,
            size: u32::try_from(seektable.points.len())
                .ok()
                .and_then(|points| points.checked_mul(SeekTable::POINT_SIZE))
                .filter(|size| *size <= BlockHeader::MAX_SIZE)
                .ok_or(Error::InvalidSeekTableSize)?,
        })?;
        w.build(seektable)?;
    }

    Ok(())
}

#[cfg(test)]
fn test_streaminfo() -> Streaminfo {
    Streaminfo {
        minimum_block_size: 4096,
        maximum_block_size: 4096,
        minimum_frame_size: NonZero::new(14),
        maximum_frame_size: NonZero::new(20),
        sample_rate: 44100,
        channels: NonZero::new(2).unwrap(),
        bits_per_sample: 16,
        total_samples: NonZero::new(10000),
        md5: Some([1; 16]),
    }
}

#[test]
fn test_streaminfo_roundtrip() {
    let streaminfo = test_streaminfo();

    let mut data = Vec::new();
    write_blocks(&mut data, &streaminfo, None).unwrap();
    assert_eq!(data.len(), 4 + 4 + 34);
    assert_eq!(&data[0..8], b"fLaC\x80\x00\x00\x22");

    let blocks = read_blocks(data.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(blocks, vec![Block::Streaminfo(streaminfo)]);
}

#[test]
fn test_seektable_roundtrip() {
    let streaminfo = test_streaminfo();
    let seektable = SeekTable {
        points: vec![
            SeekPoint::Defined {
                sample_offset: 0,
                byte_offset: 0,
                frame_samples: 4096,
            },
            SeekPoint::Defined {
                sample_offset: 4096,
                byte_offset: 100,
                frame_samples: 4096,
            },
            SeekPoint::Placeholder,
        ],
    };

    let mut data = Vec::new();
    write_blocks(&mut data, &streaminfo, Some(&seektable)).unwrap();
    // some frame data
    data.extend_from_slice(&[0xff, 0xf8]);

    let mut reader = data.as_slice();
    let mut blocks = read_blocks(&mut reader);
    assert_eq!(blocks.next().unwrap().unwrap(), Block::Streaminfo(streaminfo));
    assert_eq!(
        blocks.next().unwrap().unwrap(),
        Block::SeekTable(seektable.clone())
    );
    assert!(blocks.next().is_none());
    drop(blocks);
    assert_eq!(reader, &[0xff, 0xf8]);

    assert_eq!(seektable.closest(0).and_then(|p| p.byte_offset()), Some(0));
    assert_eq!(seektable.closest(4095).and_then(|p| p.byte_offset()), Some(0));
    assert_eq!(
        seektable.closest(100000).and_then(|p| p.byte_offset()),
        Some(100)
    );
    assert!(SeekTable::default().closest(0).is_none());
}

#[test]
fn test_skipped_blocks() {
    let mut streaminfo = Vec::new();
    write_blocks(&mut streaminfo, &test_streaminfo(), None).unwrap();
    // clear STREAMINFO's last flag
    streaminfo[4] = 0x00;

    let mut data = b"ID3\x04\x00\x00\x00\x00\x01\x01".to_vec();
    data.extend(std::iter::repeat_n(0xAA, 129));
    data.extend_from_slice(&streaminfo);
    // PADDING
    data.extend_from_slice(&[0x01, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00]);
    // reserved type 100, final block
    data.extend_from_slice(&[0x80 | 100, 0x00, 0x00, 0x01, 0xFF]);

    let blocks = read_blocks(data.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(blocks.len(), 3);
    assert_eq!(
        blocks[1],
        Block::Skipped(BlockHeader {
            last: false,
            block_type: BlockType::Padding,
            size: 3
        })
    );
    assert_eq!(
        blocks[2],
        Block::Skipped(BlockHeader {
            last: true,
            block_type: BlockType::Reserved(100),
            size: 1
        })
    );

    // without skipping, the ID3v2 tag is an error
    assert!(matches!(
        read_blocks(data.as_slice()).skip_id3v2(false).next(),
        Some(Err(Error::MissingFlacTag))
    ));
}

#[test]
fn test_invalid_blocks() {
    let mut valid = Vec::new();
    write_blocks(&mut valid, &test_streaminfo(), None).unwrap();

    fn first_error(data: &[u8]) -> Error {
        read_blocks(data)
            .find_map(|b| b.err())
            .expect("no error found")
    }

    assert!(matches!(first_error(b"RIFF"), Error::MissingFlacTag));
    assert!(matches!(first_error(b"fLa"), Error::UnexpectedEof));

    // PADDING before STREAMINFO
    assert!(matches!(
        first_error(b"fLaC\x81\x00\x00\x00"),
        Error::MissingStreaminfo
    ));

    // mis-sized STREAMINFO
    let mut data = valid.clone();
    data[7] = 0x21;
    assert!(matches!(first_error(&data), Error::InvalidMetadataBlockSize));

    // a second STREAMINFO
    let mut data = valid.clone();
    data[4] = 0x00;
    data.extend_from_slice(&valid[4..]);
    assert!(matches!(first_error(&data), Error::MultipleStreaminfo));

    // SEEKTABLE not a multiple of 18 bytes
    let mut data = valid.clone();
    data[4] = 0x00;
    data.extend_from_slice(&[0x83, 0x00, 0x00, 0x11]);
    data.extend_from_slice(&[0; 17]);
    assert!(matches!(first_error(&data), Error::InvalidSeekTableSize));

    // block type 127
    let mut data = valid.clone();
    data[4] = 0x00;
    data.extend_from_slice(&[0xFF, 0x00, 0x00, 0x00]);
    assert!(matches!(first_error(&data), Error::InvalidMetadataBlock));

    // truncated block body
    let mut data = valid.clone();
    data[4] = 0x00;
    data.extend_from_slice(&[0x81, 0x00, 0x00, 0x10, 0x00]);
    assert!(matches!(first_error(&data), Error::UnexpectedEof));
}
