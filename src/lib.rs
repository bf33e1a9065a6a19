// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! FLAC frame decoding and encoding
//!
//! A FLAC stream is a `fLaC` tag, one or more metadata blocks
//! (the first of which is always STREAMINFO) and then a series
//! of audio frames.
//! Each frame holds one block of samples for every channel,
//! stored as one subframe per channel.
//!
//! The [`decode::Decoder`] pulls frames from a stream one at a time,
//! and the [`encode::Encoder`] writes them.
//! The lower-level frame and subframe layers are also public
//! for callers that need to work with individual frames.

#![warn(missing_docs)]

pub mod bits;
pub mod crc;
pub mod decode;
pub mod encode;
pub mod frame;
pub mod metadata;
pub mod stream;
pub mod subframe;
pub mod utf8;

pub use decode::Decoder;
pub use encode::Encoder;
pub use frame::Frame;

/// A FLAC decoding or encoding error
#[derive(Debug)]
pub enum Error {
    /// An I/O error from the underlying stream
    Io(std::io::Error),
    /// The stream ended in the middle of a frame or metadata block
    UnexpectedEof,
    /// The stream does not begin with a `fLaC` tag
    MissingFlacTag,
    /// The first metadata block is not STREAMINFO
    MissingStreaminfo,
    /// More than one STREAMINFO block
    MultipleStreaminfo,
    /// More than one SEEKTABLE block
    MultipleSeekTable,
    /// A SEEKTABLE whose size is not a multiple of its point size
    InvalidSeekTableSize,
    /// A metadata block with the invalid type 127
    InvalidMetadataBlock,
    /// A metadata block body that didn't match its declared size
    InvalidMetadataBlockSize,
    /// A frame that doesn't start with the sync code
    InvalidSyncCode,
    /// A reserved header bit that isn't 0
    InvalidReservedBit,
    /// A reserved or out-of-range block size
    InvalidBlockSize,
    /// A reserved or unencodable sample rate
    InvalidSampleRate,
    /// A reserved channel assignment
    InvalidChannels,
    /// A reserved or unencodable bits-per-sample
    InvalidBitsPerSample,
    /// An invalid UTF-8 coded frame or sample number
    InvalidFrameNumber,
    /// The frame header's CRC-8 doesn't match its contents
    Crc8Mismatch,
    /// The frame's CRC-16 doesn't match its contents
    Crc16Mismatch,
    /// A subframe header whose padding bit isn't 0
    InvalidSubframeHeader,
    /// A reserved subframe type
    ReservedSubframeType,
    /// More wasted bits than bits-per-sample
    ExcessiveWastedBits,
    /// A reserved residual coding method
    ReservedResidualCodingMethod,
    /// A residual partition order incompatible with the block size
    InvalidPartitionOrder,
    /// The reserved LPC coefficient precision
    InvalidLpcPrecision,
    /// A negative LPC coefficient shift
    NegativeLpcShift,
    /// Samples wider than 32 bits
    UnsupportedBitsPerSample,
    /// More than 8 channels
    ExcessiveChannels,
    /// Channel count doesn't match the stream's
    ChannelsMismatch,
    /// Frame number too large to encode
    ExcessiveFrameNumber,
    /// Total samples too large for STREAMINFO
    ExcessiveTotalSamples,
    /// Samples written don't match the declared total
    SampleCountMismatch,
    /// No samples written to the stream
    NoSamples,
    /// Seek target past the end of the stream
    InvalidSeek,
}

impl Error {
    /// Whether the error indicates a feature this crate doesn't support
    /// rather than corrupt data
    ///
    /// Subframe types and residual coding methods
    /// reserved for future versions of the format count as unsupported.
    /// Both are fatal for the frame being decoded,
    /// but only corruption means the stream itself is bad.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedBitsPerSample
                | Self::ReservedSubframeType
                | Self::ReservedResidualCodingMethod
        )
    }

    /// Whether the error indicates a failed integrity check
    pub fn is_checksum(&self) -> bool {
        matches!(self, Self::Crc8Mismatch | Self::Crc16Mismatch)
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::UnexpectedEof => Self::UnexpectedEof,
            _ => Self::Io(error),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Io(e) => e.fmt(f),
            Self::UnexpectedEof => "unexpected end of stream".fmt(f),
            Self::MissingFlacTag => "missing FLAC tag".fmt(f),
            Self::MissingStreaminfo => "STREAMINFO block not first in file".fmt(f),
            Self::MultipleStreaminfo => "multiple STREAMINFO blocks found in file".fmt(f),
            Self::MultipleSeekTable => "multiple SEEKTABLE blocks found in file".fmt(f),
            Self::InvalidSeekTableSize => "invalid SEEKTABLE block size".fmt(f),
            Self::InvalidMetadataBlock => "invalid metadata block".fmt(f),
            Self::InvalidMetadataBlockSize => "invalid metadata block size".fmt(f),
            Self::InvalidSyncCode => "invalid frame sync code".fmt(f),
            Self::InvalidReservedBit => "non-zero reserved bit in frame header".fmt(f),
            Self::InvalidBlockSize => "invalid frame block size".fmt(f),
            Self::InvalidSampleRate => "invalid frame sample rate".fmt(f),
            Self::InvalidChannels => "reserved channel assignment".fmt(f),
            Self::InvalidBitsPerSample => "invalid bits-per-sample".fmt(f),
            Self::InvalidFrameNumber => "invalid frame number".fmt(f),
            Self::Crc8Mismatch => "CRC-8 mismatch in frame header".fmt(f),
            Self::Crc16Mismatch => "CRC-16 mismatch in frame".fmt(f),
            Self::InvalidSubframeHeader => "invalid subframe header".fmt(f),
            Self::ReservedSubframeType => "reserved subframe type".fmt(f),
            Self::ExcessiveWastedBits => "wasted bits exceed bits-per-sample".fmt(f),
            Self::ReservedResidualCodingMethod => "reserved residual coding method".fmt(f),
            Self::InvalidPartitionOrder => "invalid residual partition order".fmt(f),
            Self::InvalidLpcPrecision => "invalid LPC coefficient precision".fmt(f),
            Self::NegativeLpcShift => "negative LPC coefficient shift".fmt(f),
            Self::UnsupportedBitsPerSample => "unsupported bits-per-sample".fmt(f),
            Self::ExcessiveChannels => "excessive channel count".fmt(f),
            Self::ChannelsMismatch => "channel count does not match stream".fmt(f),
            Self::ExcessiveFrameNumber => "excessive frame number".fmt(f),
            Self::ExcessiveTotalSamples => "excessive total samples".fmt(f),
            Self::SampleCountMismatch => "samples written do not match total samples".fmt(f),
            Self::NoSamples => "no samples written".fmt(f),
            Self::InvalidSeek => "seek past end of stream".fmt(f),
        }
    }
}
