// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The "UTF-8" coding of frame and sample numbers
//!
//! Frame headers store their frame number (fixed block size streams)
//! or first sample number (variable block size streams)
//! using an extension of UTF-8's variable-length scheme
//! which stretches to 7 bytes and 36 bits.
//!
//! | Bytes | Value bits | Leading byte |
//! |------:|-----------:|--------------|
//! | 1 | 7  | `0xxxxxxx` |
//! | 2 | 11 | `110xxxxx` |
//! | 3 | 16 | `1110xxxx` |
//! | 4 | 21 | `11110xxx` |
//! | 5 | 26 | `111110xx` |
//! | 6 | 31 | `1111110x` |
//! | 7 | 36 | `11111110` |
//!
//! Every continuation byte is `10xxxxxx`.
//! The field is always byte-aligned.

use crate::Error;
use bitstream_io::{BitRead, BitWrite};

/// The largest value the coding can hold (2³⁶ - 1)
pub const MAX: u64 = (1 << 36) - 1;

/// Reads a coded number from a byte-aligned reader
///
/// # Errors
///
/// Returns [`Error::InvalidFrameNumber`] if the leading byte
/// is a continuation byte or `0xFF`, or a continuation
/// byte lacks its `10` prefix.
///
/// # Example
///
/// ```
/// use bitstream_io::{BitReader, BigEndian};
/// use musicfox_flac::utf8;
///
/// let data: &[u8] = &[0b110_00010, 0b10_000000];
/// let mut r = BitReader::endian(data, BigEndian);
/// assert_eq!(utf8::read(&mut r).unwrap(), 128);
/// ```
pub fn read<R: BitRead + ?Sized>(r: &mut R) -> Result<u64, Error> {
    let lead = r.read::<8, u8>()?;

    match lead.leading_ones() {
        0 => Ok(lead.into()),
        1 | 8 => Err(Error::InvalidFrameNumber),
        bytes @ 2..=7 => (1..bytes).try_fold(
            u64::from(lead) & (0xFF >> (bytes + 1)),
            |value, _| -> Result<u64, Error> {
                match r.read::<2, u8>()? {
                    0b10 => Ok((value << 6) | u64::from(r.read::<6, u8>()?)),
                    _ => Err(Error::InvalidFrameNumber),
                }
            },
        ),
        _ => unreachable!(), // at most 8 leading ones in a byte
    }
}

/// Writes a coded number to a byte-aligned writer
///
/// # Errors
///
/// Returns [`Error::ExcessiveFrameNumber`] if the value is
/// larger than [`MAX`].
pub fn write<W: BitWrite + ?Sized>(w: &mut W, value: u64) -> Result<(), Error> {
    let bytes: u32 = match value {
        0..0x80 => return Ok(w.write::<8, u8>(value as u8)?),
        0x80..0x800 => 2,
        0x800..0x1_0000 => 3,
        0x1_0000..0x20_0000 => 4,
        0x20_0000..0x400_0000 => 5,
        0x400_0000..0x8000_0000 => 6,
        0x8000_0000..=MAX => 7,
        _ => return Err(Error::ExcessiveFrameNumber),
    };

    let continuations = bytes - 1;
    let prefix = !(0xFFu8 >> bytes);
    let lead_bits = (value >> (continuations * 6)) as u8;
    w.write::<8, u8>(prefix | lead_bits)?;

    (0..continuations).rev().try_for_each(|i| {
        w.write::<8, u8>(0b1000_0000 | ((value >> (i * 6)) as u8 & 0b0011_1111))
    })?;

    Ok(())
}

/// Returns the number of bytes `value` occupies once coded
pub fn len(value: u64) -> Option<usize> {
    match value {
        0..0x80 => Some(1),
        0x80..0x800 => Some(2),
        0x800..0x1_0000 => Some(3),
        0x1_0000..0x20_0000 => Some(4),
        0x20_0000..0x400_0000 => Some(5),
        0x400_0000..0x8000_0000 => Some(6),
        0x8000_0000..=MAX => Some(7),
        _ => None,
    }
}

#[cfg(test)]
fn encoded(value: u64) -> Vec<u8> {
    use bitstream_io::{BigEndian, BitWriter};

    let mut w = BitWriter::endian(Vec::new(), BigEndian);
    write(&mut w, value).unwrap();
    w.into_writer()
}

#[cfg(test)]
fn decoded(data: &[u8]) -> Result<u64, Error> {
    use bitstream_io::{BigEndian, BitReader};

    read(&mut BitReader::endian(data, BigEndian))
}

#[test]
fn test_boundaries() {
    for value in [
        0,
        127,
        128,
        0x7FF,
        0x800,
        0xFFFF,
        0x1_0000,
        (1 << 21) - 1,
        1 << 21,
        (1 << 31) - 1,
        1 << 31,
        MAX,
    ] {
        let data = encoded(value);
        assert_eq!(Some(data.len()), len(value));
        assert_eq!(decoded(&data).unwrap(), value);
    }

    // these match ordinary UTF-8 wherever UTF-8 is defined
    assert_eq!(encoded(0x7F), "\u{7F}".as_bytes());
    assert_eq!(encoded(0x80), "\u{80}".as_bytes());
    assert_eq!(encoded(0xFFFF), "\u{FFFF}".as_bytes());
    assert_eq!(encoded(0x10FFFF), "\u{10FFFF}".as_bytes());

    assert_eq!(encoded(MAX), [0xFE, 0xBF, 0xBF, 0xBF, 0xBF, 0xBF, 0xBF]);
}

#[test]
fn test_invalid() {
    let mut w = bitstream_io::BitWriter::endian(std::io::sink(), bitstream_io::BigEndian);
    assert!(matches!(write(&mut w, MAX + 1), Err(Error::ExcessiveFrameNumber)));

    // continuation byte as the leading byte
    assert!(matches!(decoded(&[0x80]), Err(Error::InvalidFrameNumber)));

    // continuation byte missing its 10 prefix
    assert!(matches!(
        decoded(&[0b1110_0001, 0b10_000000, 0b11_000000]),
        Err(Error::InvalidFrameNumber)
    ));
    assert!(matches!(
        decoded(&[0b110_00001, 0b00_111111]),
        Err(Error::InvalidFrameNumber)
    ));

    assert!(matches!(decoded(&[0xFF]), Err(Error::InvalidFrameNumber)));

    // truncated
    assert!(matches!(decoded(&[0b110_00001]), Err(Error::UnexpectedEof)));
}

