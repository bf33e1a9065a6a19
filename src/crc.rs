// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For calculating the running checksums of FLAC frames
//!
//! Frame headers are protected by a CRC-8
//! and whole frames by a CRC-16.
//! Both are unreflected and start at 0.
//! Wrapping a reader or writer in a [`CrcReader`] or [`CrcWriter`]
//! folds every byte passing through it into the checksum.

/// A running checksum
pub trait Checksum: Default {
    /// The checksum's final value
    type Output: Copy + Eq + std::fmt::Debug;

    /// Folds a single byte into the checksum
    fn update(&mut self, byte: u8);

    /// Returns the checksum of all bytes so far
    fn checksum(&self) -> Self::Output;

    /// Folds all the given bytes into the checksum
    fn update_all(&mut self, bytes: &[u8]) {
        bytes.iter().for_each(|b| self.update(*b));
    }

    /// Whether the bytes so far, including a trailing
    /// big-endian copy of the checksum itself, are valid
    ///
    /// For these CRCs, that's the case when the
    /// running value has returned to 0.
    fn valid(&self) -> bool;
}

const fn crc8_table() -> [u8; 256] {
    // x⁸ + x² + x¹ + x⁰
    const POLY: u8 = 0x07;

    let mut table = [0; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u8;
        let mut bit = 0;
        while bit < 8 {
            crc = match crc & 0x80 {
                0 => crc << 1,
                _ => (crc << 1) ^ POLY,
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

const fn crc16_table() -> [u16; 256] {
    // x¹⁶ + x¹⁵ + x² + x⁰
    const POLY: u16 = 0x8005;

    let mut table = [0; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            crc = match crc & 0x8000 {
                0 => crc << 1,
                _ => (crc << 1) ^ POLY,
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

const CRC8: [u8; 256] = crc8_table();
const CRC16: [u16; 256] = crc16_table();

/// The CRC-8 protecting frame headers
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Crc8(u8);

impl Checksum for Crc8 {
    type Output = u8;

    #[inline]
    fn update(&mut self, byte: u8) {
        self.0 = CRC8[usize::from(self.0 ^ byte)];
    }

    #[inline]
    fn checksum(&self) -> u8 {
        self.0
    }

    #[inline]
    fn valid(&self) -> bool {
        self.0 == 0
    }
}

/// The CRC-16 protecting whole frames
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Crc16(u16);

impl Checksum for Crc16 {
    type Output = u16;

    #[inline]
    fn update(&mut self, byte: u8) {
        self.0 = (self.0 << 8) ^ CRC16[usize::from((self.0 >> 8) as u8 ^ byte)];
    }

    #[inline]
    fn checksum(&self) -> u16 {
        self.0
    }

    #[inline]
    fn valid(&self) -> bool {
        self.0 == 0
    }
}

/// A reader which folds everything read into a checksum
pub struct CrcReader<R, C> {
    reader: R,
    checksum: C,
}

impl<R, C: Checksum> CrcReader<R, C> {
    /// Wraps reader with a fresh checksum
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            checksum: C::default(),
        }
    }

    /// Returns the checksum of all bytes read so far
    pub fn checksum(&self) -> C::Output {
        self.checksum.checksum()
    }

    /// Consumes the reader and returns its running checksum
    pub fn into_checksum(self) -> C {
        self.checksum
    }

    /// Consumes the reader and returns the wrapped reader
    pub fn into_reader(self) -> R {
        self.reader
    }
}

impl<R: std::io::Read, C: Checksum> std::io::Read for CrcReader<R, C> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let amt_read = self.reader.read(buf)?;
        self.checksum.update_all(&buf[0..amt_read]);
        Ok(amt_read)
    }
}

/// A writer which folds everything written into a checksum
pub struct CrcWriter<W, C> {
    writer: W,
    checksum: C,
}

impl<W, C: Checksum> CrcWriter<W, C> {
    /// Wraps writer with a fresh checksum
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            checksum: C::default(),
        }
    }

    /// Returns the checksum of all bytes written so far
    pub fn checksum(&self) -> C::Output {
        self.checksum.checksum()
    }

    /// Consumes the writer and returns the wrapped writer
    pub fn into_writer(self) -> W {
        self.writer
    }
}

impl<W: std::io::Write, C: Checksum> std::io::Write for CrcWriter<W, C> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let amt_written = self.writer.write(buf)?;
        self.checksum.update_all(&buf[0..amt_written]);
        Ok(amt_written)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

#[test]
fn test_crc8() {
    // frame header of a 4096 sample, 44.1kHz, 16-bit stereo frame 0
    let header = [0xff, 0xf8, 0xc9, 0x18, 0x00];
    let mut crc = Crc8::default();
    crc.update_all(&header);
    assert_eq!(crc.checksum(), 0xc2);

    crc.update(0xc2);
    assert!(crc.valid());

    // the standard CRC-8 check value
    let mut crc = Crc8::default();
    crc.update_all(b"123456789");
    assert_eq!(crc.checksum(), 0xf4);
}

#[test]
fn test_crc16() {
    // the standard CRC-16/UMTS check value
    let mut crc = Crc16::default();
    crc.update_all(b"123456789");
    assert_eq!(crc.checksum(), 0xfee8);

    crc.update_all(&0xfee8u16.to_be_bytes());
    assert!(crc.valid());
}

#[test]
fn test_crc_reader() {
    use std::io::Read;

    let data = b"123456789";
    let mut r: CrcReader<_, Crc16> = CrcReader::new(data.as_slice());
    let mut buf = Vec::new();
    assert_eq!(r.read_to_end(&mut buf).unwrap(), 9);
    assert_eq!(r.checksum(), 0xfee8);
}
