// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Bit-level reading and writing of FLAC sample fields
//!
//! FLAC fields are packed most-significant bit first
//! and are rarely byte-aligned, so frames are read through
//! a big-endian [`bitstream_io::BitReader`].
//! These extension traits add the handful of field encodings
//! FLAC subframes use on top of its plain unsigned reads.
//!
//! A read past the end of the underlying stream fails
//! with [`std::io::ErrorKind::UnexpectedEof`], never a panic.

use bitstream_io::{BitRead, BitWrite};
use std::io;

/// Interprets the low `bits` bits of `value` as a two's complement integer
///
/// `bits` must be between 1 and 32.
#[inline]
pub fn sign_extend(value: u32, bits: u32) -> i32 {
    debug_assert!((1..=32).contains(&bits));
    let unused = 32 - bits;
    ((value << unused) as i32) >> unused
}

/// Maps an unsigned zig-zag value back to its signed residual
///
/// 0, 1, 2, 3, 4 … become 0, -1, 1, -2, 2 …
#[inline]
pub fn zigzag_decode(value: u32) -> i32 {
    (value >> 1) as i32 ^ -((value & 1) as i32)
}

/// Maps a signed residual to its unsigned zig-zag value
#[inline]
pub fn zigzag_encode(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

fn too_wide() -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, "field wider than 32 bits")
}

/// Reads FLAC sample fields from a bitstream
pub trait SampleRead: BitRead {
    /// Reads an unsigned field of 0 to 32 bits
    fn read_bits(&mut self, bits: u32) -> io::Result<u32> {
        match bits {
            0 => Ok(0),
            1..=32 => self.read_var(bits),
            _ => Err(too_wide()),
        }
    }

    /// Reads a two's complement field of 0 to 32 bits
    ///
    /// A 0-bit field is always 0.
    fn read_sample(&mut self, bits: u32) -> io::Result<i32> {
        match bits {
            0 => Ok(0),
            1..=32 => self.read_var::<u32>(bits).map(|u| sign_extend(u, bits)),
            _ => Err(too_wide()),
        }
    }

    /// Reads a count of 0 bits terminated by a 1 bit
    fn read_zeroes(&mut self) -> io::Result<u32> {
        self.read_unary::<1>()
    }

    /// Reads a single Rice-coded residual with the given parameter
    ///
    /// The unary-coded high bits are followed by
    /// `parameter` low bits and the result is zig-zag decoded.
    /// Rice parameters are at most 5 bits wide, so `parameter` < 32.
    fn read_rice(&mut self, parameter: u32) -> io::Result<i32> {
        let msb = self.read_zeroes()?;
        let lsb = self.read_bits(parameter)?;
        Ok(zigzag_decode((msb << parameter) | lsb))
    }
}

impl<R: BitRead + ?Sized> SampleRead for R {}

/// Writes FLAC sample fields to a bitstream
pub trait SampleWrite: BitWrite {
    /// Writes the low `bits` bits of a two's complement sample
    fn write_sample(&mut self, bits: u32, sample: i32) -> io::Result<()> {
        match bits {
            0 => Ok(()),
            32 => self.write_var(32, sample as u32),
            1..32 => self.write_var(bits, (sample as u32) & ((1 << bits) - 1)),
            _ => Err(too_wide()),
        }
    }

    /// Writes a count of 0 bits followed by a 1 bit
    fn write_zeroes(&mut self, count: u32) -> io::Result<()> {
        self.write_unary::<1>(count)
    }

    /// Writes a single Rice-coded residual with the given parameter
    fn write_rice(&mut self, parameter: u32, residual: i32) -> io::Result<()> {
        let value = zigzag_encode(residual);
        self.write_zeroes(value >> parameter)?;
        match parameter {
            0 => Ok(()),
            p => self.write_var(p, value & ((1 << p) - 1)),
        }
    }
}

impl<W: BitWrite + ?Sized> SampleWrite for W {}

#[test]
fn test_sign_extend() {
    assert_eq!(sign_extend(0b0111, 4), 7);
    assert_eq!(sign_extend(0b1000, 4), -8);
    assert_eq!(sign_extend(0b1111, 4), -1);
    assert_eq!(sign_extend(0xFFFF_FFFF, 32), -1);
    assert_eq!(sign_extend(0x7FFF_FFFF, 32), i32::MAX);
    assert_eq!(sign_extend(1, 1), -1);
}

#[test]
fn test_zigzag() {
    assert_eq!(
        (0..7).map(zigzag_decode).collect::<Vec<_>>(),
        vec![0, -1, 1, -2, 2, -3, 3]
    );

    for i in [0, 1, -1, 1000, -1000, i32::MAX, i32::MIN] {
        assert_eq!(zigzag_decode(zigzag_encode(i)), i);
    }
}

#[test]
fn test_read_fields() {
    use bitstream_io::{BigEndian, BitReader};

    // most significant bit first
    let data: &[u8] = &[0b1011_0000, 0b0000_0001, 0b1000_0000];
    let mut r = BitReader::endian(data, BigEndian);
    assert_eq!(r.read_bits(1).unwrap(), 1);
    assert_eq!(r.read_sample(3).unwrap(), 0b011);
    assert_eq!(r.read_bits(0).unwrap(), 0);
    assert_eq!(r.read_zeroes().unwrap(), 11);
    assert_eq!(r.read_sample(1).unwrap(), -1);

    // reading past the end is an error, not a panic
    let mut r = BitReader::endian([0xFFu8].as_slice(), BigEndian);
    assert_eq!(
        r.read_sample(16).unwrap_err().kind(),
        io::ErrorKind::UnexpectedEof
    );
}

#[test]
fn test_rice() {
    use bitstream_io::{BigEndian, BitReader, BitWriter};

    let residuals = [0, -1, 1, 17, -250, 3000, -65536];

    for parameter in [0, 1, 4, 9, 14] {
        let mut w = BitWriter::endian(Vec::new(), BigEndian);
        residuals
            .iter()
            .try_for_each(|r| w.write_rice(parameter, *r))
            .unwrap();
        w.byte_align().unwrap();
        let data = w.into_writer();

        let mut r = BitReader::endian(data.as_slice(), BigEndian);
        for residual in residuals {
            assert_eq!(r.read_rice(parameter).unwrap(), residual);
        }
    }
}
