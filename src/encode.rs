// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For encoding PCM samples to FLAC files

use crate::Error;
use crate::metadata::{Streaminfo, write_blocks};
use crate::stream::{ChannelAssignment, FrameHeader};
use arrayvec::ArrayVec;
use std::num::NonZero;

/// How a two-channel stream's channels are stored
///
/// Streams with any other number of channels
/// always store them independently.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Stereo {
    /// Left and right channels as-is
    #[default]
    Independent,
    /// Left channel and the difference between channels
    LeftSide,
    /// The difference between channels and right channel
    SideRight,
    /// The average of both channels and their difference
    MidSide,
}

/// FLAC encoding options
#[derive(Copy, Clone, Debug)]
pub struct EncodingOptions {
    block_size: u16,
    stereo: Stereo,
}

impl EncodingOptions {
    /// Assigns new block size to options
    ///
    /// The block size must be at least 1.
    pub fn block_size(self, block_size: u16) -> Self {
        Self { block_size, ..self }
    }

    /// Assigns new stereo decorrelation to options
    pub fn stereo(self, stereo: Stereo) -> Self {
        Self { stereo, ..self }
    }
}

impl Default for EncodingOptions {
    fn default() -> Self {
        Self {
            block_size: 4096,
            stereo: Stereo::default(),
        }
    }
}

/// A writer which counts the bytes written through it
struct Counter<W> {
    writer: W,
    count: u64,
}

impl<W> Counter<W> {
    fn new(writer: W) -> Self {
        Self { writer, count: 0 }
    }
}

impl<W: std::io::Write> std::io::Write for Counter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let amt_written = self.writer.write(buf)?;
        self.count += amt_written as u64;
        Ok(amt_written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

/// A FLAC encoder
///
/// Every channel is written as CONSTANT subframes
/// when its samples don't vary and as VERBATIM subframes otherwise.
pub struct Encoder<W: std::io::Write + std::io::Seek> {
    writer: W,
    options: EncodingOptions,
    streaminfo: Streaminfo,
    // position of the "fLaC" tag, to return to when finalizing
    start: u64,
    frame_number: u64,
    samples_written: u64,
    pending: ArrayVec<Vec<i32>, 8>,
    md5: md5::Context,
    finalized: bool,
}

impl<W: std::io::Write + std::io::Seek> Encoder<W> {
    /// Creates new encoder with the given parameters
    ///
    /// `sample_rate` must be between 0 (for non-audio streams)
    /// and 1048575 (a 20 bit field).
    ///
    /// `bits_per_sample` must be between 1 and 32,
    /// or 31 for stereo streams using decorrelation.
    ///
    /// `channels` must be between 1 and 8.
    ///
    /// # Errors
    ///
    /// Returns I/O error if unable to write initial
    /// metadata blocks.
    /// Returns error if any of the encoding parameters are invalid.
    pub fn new(
        mut writer: W,
        options: EncodingOptions,
        sample_rate: u32,
        bits_per_sample: u8,
        channels: NonZero<u8>,
    ) -> Result<Self, Error> {
        if options.block_size == 0 {
            return Err(Error::InvalidBlockSize);
        } else if sample_rate > Streaminfo::MAX_SAMPLE_RATE {
            return Err(Error::InvalidSampleRate);
        } else if !(1..=32).contains(&bits_per_sample) {
            return Err(Error::InvalidBitsPerSample);
        } else if channels.get() > Streaminfo::MAX_CHANNELS {
            return Err(Error::ExcessiveChannels);
        } else if channels.get() == 2
            && options.stereo != Stereo::Independent
            && bits_per_sample >= 32
        {
            // side channels need one more bit than the rest
            return Err(Error::UnsupportedBitsPerSample);
        }

        let streaminfo = Streaminfo {
            minimum_block_size: options.block_size,
            maximum_block_size: options.block_size,
            minimum_frame_size: None,
            maximum_frame_size: None,
            sample_rate,
            bits_per_sample,
            channels,
            total_samples: None,
            md5: None,
        };

        let start = writer.stream_position()?;
        write_blocks(writer.by_ref(), &streaminfo, None)?;

        Ok(Self {
            writer,
            options,
            streaminfo,
            start,
            frame_number: 0,
            samples_written: 0,
            pending: (0..channels.get()).map(|_| Vec::new()).collect(),
            md5: md5::Context::new(),
            finalized: false,
        })
    }

    /// Encodes PCM samples, one slice per channel
    ///
    /// Every channel must hold the same number of samples,
    /// each of which must fit in the stream's bits-per-sample.
    /// Samples are buffered until a whole block is available,
    /// so this may encode zero or more FLAC frames.
    ///
    /// # Errors
    ///
    /// Returns an I/O error from the underlying stream,
    /// or an error if the channels don't match the encoder's.
    pub fn encode(&mut self, channels: &[&[i32]]) -> Result<(), Error> {
        if channels.len() != usize::from(self.streaminfo.channels.get()) {
            return Err(Error::ChannelsMismatch);
        }

        let samples = match channels {
            [first, rest @ ..] if rest.iter().all(|c| c.len() == first.len()) => first.len(),
            _ => return Err(Error::SampleCountMismatch),
        };

        let samples_written = self
            .samples_written
            .checked_add(samples as u64)
            .filter(|total| *total <= Streaminfo::MAX_TOTAL_SAMPLES)
            .ok_or(Error::ExcessiveTotalSamples)?;

        // update MD5 calculation
        let bytes = usize::from(self.streaminfo.bits_per_sample.div_ceil(8));
        let mut interleaved = Vec::with_capacity(samples * channels.len() * bytes);
        for i in 0..samples {
            for channel in channels {
                interleaved.extend_from_slice(&channel[i].to_le_bytes()[..bytes]);
            }
        }
        self.md5.consume(&interleaved);

        self.pending
            .iter_mut()
            .zip(channels)
            .for_each(|(pending, channel)| pending.extend_from_slice(channel));

        let block_size = usize::from(self.options.block_size);
        while self.pending.first().is_some_and(|p| p.len() >= block_size) {
            let block = self
                .pending
                .iter_mut()
                .map(|p| p.drain(0..block_size).collect())
                .collect::<ArrayVec<Vec<i32>, 8>>();
            self.encode_frame(&block)?;
        }

        self.samples_written = samples_written;
        Ok(())
    }

    fn encode_frame(&mut self, channels: &[Vec<i32>]) -> Result<(), Error> {
        let channels = channels
            .iter()
            .map(|c| c.as_slice())
            .collect::<ArrayVec<&[i32], 8>>();

        let header = FrameHeader {
            fixed_block_size: true,
            block_size: channels
                .first()
                .and_then(|c| u16::try_from(c.len()).ok())
                .ok_or(Error::InvalidBlockSize)?,
            sample_rate: self.streaminfo.sample_rate,
            channel_assignment: match (channels.len(), self.options.stereo) {
                (2, Stereo::LeftSide) => ChannelAssignment::LeftSide,
                (2, Stereo::SideRight) => ChannelAssignment::SideRight,
                (2, Stereo::MidSide) => ChannelAssignment::MidSide,
                (count, _) => u8::try_from(count)
                    .ok()
                    .and_then(ChannelAssignment::independent)
                    .ok_or(Error::ExcessiveChannels)?,
            },
            bits_per_sample: self.streaminfo.bits_per_sample,
            number: self.frame_number,
        };

        let mut w = Counter::new(self.writer.by_ref());
        crate::frame::write(&mut w, &header, &self.streaminfo, &channels)?;

        self.frame_number += 1;

        // update minimum and maximum frame size values
        if let s @ Some(size) = u32::try_from(w.count)
            .ok()
            .filter(|size| *size <= Streaminfo::MAX_FRAME_SIZE)
            .and_then(NonZero::new)
        {
            match &mut self.streaminfo.minimum_frame_size {
                Some(min_size) => {
                    *min_size = size.min(*min_size);
                }
                min_size @ None => {
                    *min_size = s;
                }
            }

            match &mut self.streaminfo.maximum_frame_size {
                Some(max_size) => {
                    *max_size = size.max(*max_size);
                }
                max_size @ None => {
                    *max_size = s;
                }
            }
        }

        Ok(())
    }

    fn finalize_inner(&mut self) -> Result<(), Error> {
        use std::io::SeekFrom;

        if !self.finalized {
            self.finalized = true;

            // output any partial frame
            if self.pending.first().is_some_and(|p| !p.is_empty()) {
                let block = std::mem::take(&mut self.pending);
                self.encode_frame(&block)?;
            }

            self.streaminfo.total_samples =
                Some(NonZero::new(self.samples_written).ok_or(Error::NoSamples)?);

            self.streaminfo.md5 = Some(self.md5.clone().compute().0);

            self.writer.seek(SeekFrom::Start(self.start))?;
            write_blocks(self.writer.by_ref(), &self.streaminfo, None)?;
            self.writer.seek(SeekFrom::End(0))?;
            self.writer.flush()?;
        }
        Ok(())
    }

    /// Attempt to finalize stream
    ///
    /// It is necessary to finalize the FLAC encoder
    /// so that it will write any partially unwritten samples
    /// to the stream and update the STREAMINFO block
    /// with its final values.
    ///
    /// Dropping the encoder will attempt to finalize the stream
    /// automatically, but will ignore any errors that may occur.
    ///
    /// # Errors
    ///
    /// Returns an error if no samples were written
    /// or an I/O error occurs.
    pub fn finalize(mut self) -> Result<(), Error> {
        self.finalize_inner()?;
        Ok(())
    }
}

impl<W: std::io::Write + std::io::Seek> Drop for Encoder<W> {
    fn drop(&mut self) {
        let _ = self.finalize_inner();
    }
}

#[test]
fn test_encoder_options() {
    use std::io::Cursor;

    let channels = NonZero::new(2).unwrap();

    assert!(matches!(
        Encoder::new(
            Cursor::new(vec![]),
            EncodingOptions::default().block_size(0),
            44100,
            16,
            channels
        ),
        Err(Error::InvalidBlockSize)
    ));
    assert!(matches!(
        Encoder::new(
            Cursor::new(vec![]),
            EncodingOptions::default(),
            1 << 20,
            16,
            channels
        ),
        Err(Error::InvalidSampleRate)
    ));
    assert!(matches!(
        Encoder::new(
            Cursor::new(vec![]),
            EncodingOptions::default(),
            44100,
            33,
            channels
        ),
        Err(Error::InvalidBitsPerSample)
    ));
    assert!(matches!(
        Encoder::new(
            Cursor::new(vec![]),
            EncodingOptions::default(),
            44100,
            16,
            NonZero::new(9).unwrap()
        ),
        Err(Error::ExcessiveChannels)
    ));
    assert!(matches!(
        Encoder::new(
            Cursor::new(vec![]),
            EncodingOptions::default().stereo(Stereo::MidSide),
            44100,
            32,
            channels
        ),
        Err(Error::UnsupportedBitsPerSample)
    ));
}

#[test]
fn test_encoder_input() {
    use std::io::Cursor;

    let mut flac = Cursor::new(vec![]);
    let mut encoder = Encoder::new(
        &mut flac,
        EncodingOptions::default(),
        44100,
        16,
        NonZero::new(2).unwrap(),
    )
    .unwrap();

    assert!(matches!(
        encoder.encode(&[&[0; 10]]),
        Err(Error::ChannelsMismatch)
    ));
    assert!(matches!(
        encoder.encode(&[&[0; 10], &[0; 9]]),
        Err(Error::SampleCountMismatch)
    ));

    // nothing written at all
    assert!(matches!(encoder.finalize(), Err(Error::NoSamples)));
}

#[test]
fn test_total_samples_limit() {
    use std::io::Cursor;

    let mut encoder = Encoder::new(
        Cursor::new(vec![]),
        EncodingOptions::default(),
        44100,
        16,
        NonZero::new(1).unwrap(),
    )
    .unwrap();

    encoder.samples_written = Streaminfo::MAX_TOTAL_SAMPLES - 1;

    assert!(matches!(
        encoder.encode(&[&[0; 2]]),
        Err(Error::ExcessiveTotalSamples)
    ));
    assert_eq!(encoder.samples_written, Streaminfo::MAX_TOTAL_SAMPLES - 1);

    assert!(encoder.encode(&[&[0; 1]]).is_ok());
    assert_eq!(encoder.samples_written, Streaminfo::MAX_TOTAL_SAMPLES);
}

#[cfg(test)]
struct FullWriter {
    data: std::io::Cursor<Vec<u8>>,
    limit: u64,
}

#[cfg(test)]
impl std::io::Write for FullWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.data.position() + buf.len() as u64 > self.limit {
            Err(std::io::Error::other("writer full"))
        } else {
            std::io::Write::write(&mut self.data, buf)
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
impl std::io::Seek for FullWriter {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        std::io::Seek::seek(&mut self.data, pos)
    }
}

#[test]
fn test_failed_frame_write() {
    // room for the metadata blocks, but not a single frame
    let mut encoder = Encoder::new(
        FullWriter {
            data: std::io::Cursor::new(vec![]),
            limit: 42,
        },
        EncodingOptions::default().block_size(16),
        44100,
        16,
        NonZero::new(1).unwrap(),
    )
    .unwrap();

    assert!(matches!(encoder.encode(&[&[1; 16]]), Err(Error::Io(_))));
    assert_eq!(encoder.samples_written, 0);
    assert!(matches!(encoder.finalize(), Err(Error::NoSamples)));
}

#[test]
fn test_frame_sizes() {
    use crate::metadata::{Block, read_blocks};
    use std::io::Cursor;

    let mut flac = Cursor::new(vec![]);
    let mut encoder = Encoder::new(
        &mut flac,
        EncodingOptions::default().block_size(16),
        44100,
        16,
        NonZero::new(1).unwrap(),
    )
    .unwrap();

    // one CONSTANT frame, one VERBATIM frame and a partial CONSTANT frame
    let mut samples = vec![5; 16];
    samples.extend(0..16);
    samples.extend([7; 4]);
    encoder.encode(&[samples.as_slice()]).unwrap();
    encoder.finalize().unwrap();

    let data = flac.into_inner();
    let Some(Ok(Block::Streaminfo(streaminfo))) = read_blocks(data.as_slice()).next() else {
        panic!("missing STREAMINFO");
    };

    // header (7) + CONSTANT subframe (3) + CRC-16 (2)
    assert_eq!(streaminfo.minimum_frame_size, NonZero::new(12));
    // header (7) + VERBATIM subframe (1 + 32) + CRC-16 (2)
    assert_eq!(streaminfo.maximum_frame_size, NonZero::new(42));
    assert_eq!(streaminfo.total_samples, NonZero::new(36));
    assert_eq!(data.len(), 42 + 12 + 42 + 12);
}
