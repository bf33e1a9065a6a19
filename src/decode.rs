// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For decoding FLAC files to PCM samples

use crate::Error;
use crate::frame::Frame;
use crate::metadata::{SeekPoint, SeekTable, Streaminfo};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// FLAC decoding options
#[derive(Copy, Clone, Debug)]
pub struct Options {
    build_seektable: bool,
    skip_id3v2: bool,
}

impl Options {
    /// Whether to scan the whole stream for a seek table
    /// when seeking a stream that lacks one
    ///
    /// Without one, every seek decodes from the first frame.
    pub fn build_seektable(self, build_seektable: bool) -> Self {
        Self {
            build_seektable,
            ..self
        }
    }

    /// Whether to skip an ID3v2 tag preceding the stream
    pub fn skip_id3v2(self, skip_id3v2: bool) -> Self {
        Self { skip_id3v2, ..self }
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            build_seektable: true,
            skip_id3v2: true,
        }
    }
}

/// A FLAC decoder
///
/// Frames are decoded strictly in stream order,
/// and each is independent of the decoder once returned.
///
/// # Example
///
/// ```
/// use musicfox_flac::{Decoder, Encoder, encode::EncodingOptions};
/// use std::io::Cursor;
/// use std::num::NonZero;
///
/// let mut flac = Cursor::new(vec![]);
///
/// let mut encoder = Encoder::new(
///     &mut flac,
///     EncodingOptions::default(),
///     44100,
///     16,
///     NonZero::new(2).unwrap(),
/// ).unwrap();
/// encoder.encode(&[&[1000; 4096], &[1000; 4096]]).unwrap();
/// encoder.finalize().unwrap();
///
/// flac.set_position(0);
/// let mut decoder = Decoder::new(flac).unwrap();
/// let frame = decoder.read_frame().unwrap().unwrap();
/// assert_eq!(frame.sample_rate(), 44100);
/// assert_eq!(frame.channel(0), Some(&[1000; 4096][..]));
/// assert!(decoder.read_frame().unwrap().is_none());
/// ```
pub struct Decoder<R> {
    reader: R,
    streaminfo: Streaminfo,
    seektable: Option<SeekTable>,
    options: Options,
    // byte offset of the first frame, if seekable
    frames_start: Option<u64>,
    buffers: Vec<Vec<i32>>,
}

impl<R: std::io::Read> Decoder<R> {
    /// Builds a new FLAC decoder from the given stream
    ///
    /// This assumes the stream is positioned at the start
    /// of the file.
    ///
    /// # Errors
    ///
    /// Returns an error of the initial FLAC metadata
    /// is invalid or an I/O error occurs reading
    /// the initial metadata.
    pub fn new(reader: R) -> Result<Self, Error> {
        Self::with_options(reader, Options::default())
    }

    /// Builds a new FLAC decoder with the given options
    ///
    /// # Errors
    ///
    /// As [`Decoder::new`].
    pub fn with_options(mut reader: R, options: Options) -> Result<Self, Error> {
        use crate::metadata::{Block, read_blocks};

        let mut streaminfo = None;
        let mut seektable = None;

        for block in read_blocks(reader.by_ref()).skip_id3v2(options.skip_id3v2) {
            match block? {
                Block::Streaminfo(s) => streaminfo = Some(s),
                Block::SeekTable(s) => seektable = Some(s),
                Block::Skipped(_) => { /* ignore other blocks */ }
            }
        }

        match streaminfo {
            Some(streaminfo) => Ok(Self {
                reader,
                streaminfo,
                seektable,
                options,
                frames_start: None,
                buffers: Vec::new(),
            }),
            // read_blocks should check for this already
            // but we'll add a second check to be certain
            None => Err(Error::MissingStreaminfo),
        }
    }

    /// The stream's STREAMINFO block
    pub fn streaminfo(&self) -> &Streaminfo {
        &self.streaminfo
    }

    /// The stream's seek table, if any
    pub fn seektable(&self) -> Option<&SeekTable> {
        self.seektable.as_ref()
    }

    /// Reads the next whole FLAC frame
    ///
    /// Returns `Ok(None)` once the stream ends.
    /// A failed frame is discarded, but the decoder remains
    /// usable and the next call resumes from wherever
    /// the failed frame stopped reading.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs when reading
    /// the stream, or if the stream data is invalid.
    pub fn read_frame(&mut self) -> Result<Option<Frame>, Error> {
        Frame::read_using(self.reader.by_ref(), &self.streaminfo, &mut self.buffers)
    }

    /// Hands a finished frame's sample buffers back for reuse
    ///
    /// Later frames draw from these before allocating.
    pub fn recycle(&mut self, frame: Frame) {
        self.buffers.extend(frame.into_buffers());
        self.buffers
            .truncate(usize::from(Streaminfo::MAX_CHANNELS));
    }

    /// Returns the wrapped reader
    pub fn into_reader(self) -> R {
        self.reader
    }
}

impl Decoder<BufReader<File>> {
    /// Opens a seekable FLAC decoder from the file at the given path
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be opened
    /// or its initial metadata is invalid.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        File::open(path.as_ref())
            .map_err(Error::Io)
            .and_then(|f| Self::new_seekable(BufReader::new(f)))
    }
}

impl<R: std::io::Read + std::io::Seek> Decoder<R> {
    /// Builds a new FLAC decoder which supports seeking
    ///
    /// # Errors
    ///
    /// As [`Decoder::new`].
    pub fn new_seekable(reader: R) -> Result<Self, Error> {
        Self::seekable_with_options(reader, Options::default())
    }

    /// Builds a new seekable FLAC decoder with the given options
    ///
    /// # Errors
    ///
    /// As [`Decoder::new`].
    pub fn seekable_with_options(reader: R, options: Options) -> Result<Self, Error> {
        let mut decoder = Self::with_options(reader, options)?;
        decoder.frames_start = Some(decoder.reader.stream_position()?);
        Ok(decoder)
    }

    /// Positions the decoder at the frame containing the given sample
    ///
    /// Returns the number of that frame's first sample,
    /// which is the first sample the next
    /// [`Decoder::read_frame`] call returns.
    ///
    /// The nearest preceding seek point is used to skip ahead,
    /// followed by decoding frames until the target is reached.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSeek`] if the sample is
    /// past the end of the stream or the decoder wasn't
    /// built seekable, or any error from decoding
    /// frames along the way.
    pub fn seek(&mut self, sample: u64) -> Result<u64, Error> {
        use std::io::SeekFrom;

        if self
            .streaminfo
            .total_samples
            .is_some_and(|total| sample >= total.get())
        {
            return Err(Error::InvalidSeek);
        }

        let frames_start = self.frames_start.ok_or(Error::InvalidSeek)?;

        if self.seektable.is_none() && self.options.build_seektable {
            self.seektable = Some(self.build_seektable(frames_start)?);
        }

        let offset = self
            .seektable
            .as_ref()
            .and_then(|s| s.closest(sample))
            .and_then(|p| p.byte_offset())
            .unwrap_or(0);

        self.reader.seek(SeekFrom::Start(frames_start + offset))?;

        loop {
            let frame_start = self.reader.stream_position()?;
            let frame = self.read_frame()?.ok_or(Error::InvalidSeek)?;
            let first = frame.sample_number();
            let end = first + u64::from(frame.block_size());
            self.recycle(frame);

            if sample < end {
                log::debug!("seek to sample {sample} landed on frame starting at {first}");
                self.reader.seek(SeekFrom::Start(frame_start))?;
                return Ok(first);
            }
        }
    }

    /// Scans every frame for its position,
    /// then returns to the current position
    /// whether or not every frame decoded
    fn build_seektable(&mut self, frames_start: u64) -> Result<SeekTable, Error> {
        use std::io::SeekFrom;

        let position = self.reader.stream_position()?;
        let points = self.scan_frames(frames_start);
        self.reader.seek(SeekFrom::Start(position))?;

        let points = points?;
        log::debug!("built seek table of {} points", points.len());
        Ok(SeekTable { points })
    }

    fn scan_frames(&mut self, frames_start: u64) -> Result<Vec<SeekPoint>, Error> {
        use std::io::SeekFrom;

        self.reader.seek(SeekFrom::Start(frames_start))?;

        let mut points = Vec::new();
        loop {
            let byte_offset = self.reader.stream_position()? - frames_start;
            match self.read_frame()? {
                Some(frame) => {
                    points.push(SeekPoint::Defined {
                        sample_offset: frame.sample_number(),
                        byte_offset,
                        frame_samples: frame.block_size(),
                    });
                    self.recycle(frame);
                }
                None => break Ok(points),
            }
        }
    }
}

impl<R: std::io::Read> Iterator for Decoder<R> {
    type Item = Result<Frame, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_frame().transpose()
    }
}

/// The result of verifying a stream's MD5 sum
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Verified {
    /// The decoded samples match the stream's MD5 sum
    MD5Match,
    /// The decoded samples don't match the stream's MD5 sum
    MD5Mismatch,
    /// The stream has no MD5 sum, but every frame decoded
    NoMD5,
}

/// Decodes the whole FLAC file at the given path and checks its MD5 sum
///
/// # Errors
///
/// Returns an error if any frame fails to decode.
pub fn verify<P: AsRef<Path>>(path: P) -> Result<Verified, Error> {
    Decoder::open(path).and_then(verify_frames)
}

/// Decodes a whole FLAC stream and checks its MD5 sum
///
/// # Errors
///
/// Returns an error if any frame fails to decode.
pub fn verify_reader<R: std::io::Read>(reader: R) -> Result<Verified, Error> {
    Decoder::new(reader).and_then(verify_frames)
}

fn verify_frames<R: std::io::Read>(mut decoder: Decoder<R>) -> Result<Verified, Error> {
    let mut md5 = md5::Context::new();

    while let Some(frame) = decoder.read_frame()? {
        frame.hash(&mut md5);
        decoder.recycle(frame);
    }

    match decoder.streaminfo.md5 {
        Some(expected) if md5.compute().0 == expected => Ok(Verified::MD5Match),
        Some(_) => {
            log::warn!("decoded samples don't match stream's MD5 sum");
            Ok(Verified::MD5Mismatch)
        }
        None => Ok(Verified::NoMD5),
    }
}
