// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For decoding and encoding the subframes of a single channel
//!
//! A subframe starts with a [`SubframeHeader`] followed by
//! one of four layouts:
//!
//! | Type | Layout |
//! |------|--------|
//! | CONSTANT | one sample |
//! | VERBATIM | `block_size` samples |
//! | FIXED | `order` warm-up samples, residuals |
//! | LPC | `order` warm-up samples, precision, shift, `order` coefficients, residuals |

use crate::Error;
use crate::bits::{SampleRead, SampleWrite};
use crate::stream::{SubframeHeader, SubframeType};
use arrayvec::ArrayVec;
use bitstream_io::{BitRead, BitWrite};

/// Coefficients of the fixed predictors, by order
const FIXED_COEFFICIENTS: [&[i32]; 5] = [&[], &[1], &[2, -1], &[3, -3, 1], &[4, -6, 4, -1]];

/// A decoded subframe
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Subframe {
    /// The subframe's header
    pub header: SubframeHeader,
    /// The subframe's samples, one per block position,
    /// with any wasted bits restored
    pub samples: Vec<i32>,
}

impl Subframe {
    /// Reads a subframe of `block_size` samples
    ///
    /// `bits_per_sample` should already include the extra
    /// bit carried by side channels.
    /// Decoded samples are placed in `buffer`,
    /// which is cleared first so that it may be reused.
    ///
    /// # Errors
    ///
    /// Returns an error if the subframe is invalid,
    /// needs more than 32 bits-per-sample or the
    /// stream ends partway through it.
    pub fn read<R: BitRead + ?Sized>(
        r: &mut R,
        bits_per_sample: u32,
        block_size: u16,
        mut buffer: Vec<i32>,
    ) -> Result<Self, Error> {
        if bits_per_sample > 32 {
            return Err(Error::UnsupportedBitsPerSample);
        }

        let header: SubframeHeader = r.parse()?;

        let bps = bits_per_sample
            .checked_sub(header.wasted_bps)
            .filter(|bps| *bps > 0)
            .ok_or(Error::ExcessiveWastedBits)?;

        buffer.clear();
        buffer.resize(usize::from(block_size), 0);
        let samples = buffer.as_mut_slice();

        match header.type_ {
            SubframeType::Constant => {
                samples.fill(r.read_sample(bps)?);
            }
            SubframeType::Verbatim => {
                read_samples(r, bps, samples)?;
            }
            SubframeType::Fixed(order) => {
                let order = usize::from(order);
                let (warm_up, residuals) = split_warm_up(samples, order)?;
                read_samples(r, bps, warm_up)?;
                read_residuals(r, order, residuals)?;
                predict(FIXED_COEFFICIENTS[order], 0, samples);
            }
            SubframeType::Lpc(order) => {
                let order = usize::from(order);
                let (warm_up, residuals) = split_warm_up(samples, order)?;
                read_samples(r, bps, warm_up)?;

                let precision = match r.read::<4, u32>()? {
                    0b1111 => return Err(Error::InvalidLpcPrecision),
                    p => p + 1,
                };

                let shift = u32::try_from(crate::bits::sign_extend(r.read::<5, u32>()?, 5))
                    .map_err(|_| Error::NegativeLpcShift)?;

                let coefficients = (0..order)
                    .map(|_| r.read_sample(precision))
                    .collect::<Result<ArrayVec<i32, 32>, _>>()?;

                read_residuals(r, order, residuals)?;
                predict(&coefficients, shift, samples);
            }
        }

        if header.wasted_bps > 0 {
            samples.iter_mut().for_each(|s| *s <<= header.wasted_bps);
        }

        Ok(Self {
            header,
            samples: buffer,
        })
    }

    /// Number of samples in the subframe
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the subframe holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

fn split_warm_up(samples: &mut [i32], order: usize) -> Result<(&mut [i32], &mut [i32]), Error> {
    // the predictor order can't exceed the block
    match order <= samples.len() {
        true => Ok(samples.split_at_mut(order)),
        false => Err(Error::InvalidPartitionOrder),
    }
}

fn read_samples<R: BitRead + ?Sized>(r: &mut R, bps: u32, samples: &mut [i32]) -> Result<(), Error> {
    samples.iter_mut().try_for_each(|s| {
        *s = r.read_sample(bps)?;
        Ok(())
    })
}

/// Reads partitioned residuals for the samples following the warm-up
///
/// | Bits | Field |
/// |-----:|-------|
/// | 2    | coding method (0 = 4-bit parameters, 1 = 5-bit parameters)
/// | 4    | partition order
///
/// Each of the 2ⁿ partitions then holds a Rice parameter and
/// its residuals, or an escape code, a 5-bit width and
/// that many bits per raw residual.
/// The first partition is shorter by the predictor order.
fn read_residuals<R: BitRead + ?Sized>(
    r: &mut R,
    order: usize,
    residuals: &mut [i32],
) -> Result<(), Error> {
    let (parameter_bits, escape) = match r.read::<2, u8>()? {
        0b00 => (4, 0b1111),
        0b01 => (5, 0b11111),
        _ => return Err(Error::ReservedResidualCodingMethod),
    };

    let partition_order = r.read::<4, u32>()?;
    let block_size = residuals.len() + order;
    let partition_count = 1 << partition_order;
    let partition_len = block_size >> partition_order;

    if block_size % partition_count != 0 || partition_len < order {
        return Err(Error::InvalidPartitionOrder);
    }

    let mut start = 0;
    for partition in 0..partition_count {
        let len = match partition {
            0 => partition_len - order,
            _ => partition_len,
        };
        let residuals = &mut residuals[start..start + len];
        start += len;

        match r.read_var::<u32>(parameter_bits)? {
            parameter if parameter == escape => {
                let bits = r.read::<5, u32>()?;
                read_samples(r, bits, residuals)?;
            }
            parameter => {
                residuals.iter_mut().try_for_each(|residual| {
                    *residual = r.read_rice(parameter)?;
                    Ok::<(), std::io::Error>(())
                })?;
            }
        }
    }

    Ok(())
}

/// Restores samples in place from their warm-up samples and residuals
///
/// Each sample past the warm-up has the prediction
/// from its preceding samples added to its residual.
fn predict(coefficients: &[i32], shift: u32, samples: &mut [i32]) {
    for i in coefficients.len()..samples.len() {
        let prediction = coefficients
            .iter()
            .zip(samples[..i].iter().rev())
            .fold(0i64, |sum, (c, s)| {
                sum.wrapping_add(i64::from(*c) * i64::from(*s))
            })
            >> shift;

        samples[i] = samples[i].wrapping_add(prediction as i32);
    }
}

/// Writes a single channel's samples as a subframe
///
/// A block of identical samples is written as CONSTANT,
/// anything else as VERBATIM with any trailing zero bits
/// shared by every sample removed as wasted bits.
///
/// # Errors
///
/// Returns an error if `bits_per_sample` is outside 1 to 32,
/// there are no samples or an I/O error occurs.
pub fn write<W: BitWrite + ?Sized>(
    w: &mut W,
    bits_per_sample: u32,
    samples: &[i32],
) -> Result<(), Error> {
    if !(1..=32).contains(&bits_per_sample) {
        return Err(Error::UnsupportedBitsPerSample);
    }

    match samples {
        [] => Err(Error::NoSamples),
        [first, rest @ ..] if rest.iter().all(|s| s == first) => {
            w.build(&SubframeHeader {
                type_: SubframeType::Constant,
                wasted_bps: 0,
            })?;
            w.write_sample(bits_per_sample, *first)?;
            Ok(())
        }
        samples => {
            let wasted_bps = samples
                .iter()
                .fold(0, |acc, s| acc | s)
                .trailing_zeros()
                .min(bits_per_sample - 1);

            w.build(&SubframeHeader {
                type_: SubframeType::Verbatim,
                wasted_bps,
            })?;

            let bps = bits_per_sample - wasted_bps;
            samples
                .iter()
                .try_for_each(|s| w.write_sample(bps, *s >> wasted_bps))?;
            Ok(())
        }
    }
}

#[cfg(test)]
fn encoded(f: impl FnOnce(&mut bitstream_io::BitWriter<Vec<u8>, bitstream_io::BigEndian>)) -> Vec<u8> {
    let mut w = bitstream_io::BitWriter::endian(Vec::new(), bitstream_io::BigEndian);
    f(&mut w);
    w.byte_align().unwrap();
    w.into_writer()
}

#[cfg(test)]
fn decoded(data: &[u8], bits_per_sample: u32, block_size: u16) -> Result<Subframe, Error> {
    let mut r = bitstream_io::BitReader::endian(data, bitstream_io::BigEndian);
    Subframe::read(&mut r, bits_per_sample, block_size, Vec::new())
}

#[test]
fn test_constant_roundtrip() {
    for bps in [8, 16, 24] {
        for block_size in [16, 192, 4096] {
            for sample in [0, 1, -1, (1 << (bps - 1)) - 1, -(1 << (bps - 1))] {
                let samples = vec![sample; usize::from(block_size)];
                let data = encoded(|w| write(w, bps, &samples).unwrap());
                let subframe = decoded(&data, bps, block_size).unwrap();
                assert_eq!(subframe.header.type_, SubframeType::Constant);
                assert_eq!(subframe.samples, samples);
            }
        }
    }
}

#[test]
fn test_verbatim_roundtrip() {
    let samples = [0, 1, -1, 32767, -32768, 1000, -1000, 12345];
    let data = encoded(|w| write(w, 16, &samples).unwrap());
    let subframe = decoded(&data, 16, 8).unwrap();
    assert_eq!(subframe.header.type_, SubframeType::Verbatim);
    assert_eq!(subframe.header.wasted_bps, 0);
    assert_eq!(subframe.samples, samples);

    // one extra bit for a side channel
    let samples = [65535, -65536, 0, 1];
    let data = encoded(|w| write(w, 17, &samples).unwrap());
    assert_eq!(decoded(&data, 17, 4).unwrap().samples, samples);

    // full 32-bit samples
    let samples = [i32::MAX, i32::MIN, 0, -1];
    let data = encoded(|w| write(w, 32, &samples).unwrap());
    assert_eq!(decoded(&data, 32, 4).unwrap().samples, samples);
}

#[test]
fn test_wasted_bits() {
    let samples = [4, 8, -12, 16];
    let data = encoded(|w| write(w, 16, &samples).unwrap());
    let subframe = decoded(&data, 16, 4).unwrap();
    assert_eq!(subframe.header.wasted_bps, 2);
    assert_eq!(subframe.samples, samples);

    // wasted bits may not consume every bit
    let data = encoded(|w| {
        w.build(&SubframeHeader {
            type_: SubframeType::Constant,
            wasted_bps: 8,
        })
        .unwrap();
    });
    assert!(matches!(decoded(&data, 8, 4), Err(Error::ExcessiveWastedBits)));
}

#[test]
fn test_fixed() {
    let samples = [10, 20, 30, 41, 50, 60, 70, 80];

    let data = encoded(|w| {
        w.build(&SubframeHeader {
            type_: SubframeType::Fixed(2),
            wasted_bps: 0,
        })
        .unwrap();
        w.write_sample(16, 10).unwrap();
        w.write_sample(16, 20).unwrap();
        w.write::<2, u8>(0).unwrap(); // 4-bit parameters
        w.write::<4, u8>(0).unwrap(); // one partition
        w.write::<4, u8>(2).unwrap(); // Rice parameter
        for residual in [0, 1, -2, 1, 0, 0] {
            w.write_rice(2, residual).unwrap();
        }
    });

    let subframe = decoded(&data, 16, 8).unwrap();
    assert_eq!(subframe.header.type_, SubframeType::Fixed(2));
    assert_eq!(subframe.samples, samples);
}

#[test]
fn test_fixed_escaped_partition() {
    let samples = [10, 20, 30, 41, 50, 60, 70, 80];

    let data = encoded(|w| {
        w.build(&SubframeHeader {
            type_: SubframeType::Fixed(2),
            wasted_bps: 0,
        })
        .unwrap();
        w.write_sample(16, 10).unwrap();
        w.write_sample(16, 20).unwrap();
        w.write::<2, u8>(1).unwrap(); // 5-bit parameters
        w.write::<4, u8>(1).unwrap(); // two partitions of 4

        // first partition, less the 2 warm-up samples
        w.write::<5, u8>(1).unwrap();
        w.write_rice(1, 0).unwrap();
        w.write_rice(1, 1).unwrap();

        // second partition, escaped to raw 4-bit residuals
        w.write::<5, u8>(0b11111).unwrap();
        w.write::<5, u8>(4).unwrap();
        for residual in [-2, 1, 0, 0] {
            w.write_sample(4, residual).unwrap();
        }
    });

    assert_eq!(decoded(&data, 16, 8).unwrap().samples, samples);

    // a zero-width escaped partition is all zero residuals
    let data = encoded(|w| {
        w.build(&SubframeHeader {
            type_: SubframeType::Fixed(1),
            wasted_bps: 0,
        })
        .unwrap();
        w.write_sample(8, -5).unwrap();
        w.write::<2, u8>(0).unwrap();
        w.write::<4, u8>(0).unwrap();
        w.write::<4, u8>(0b1111).unwrap();
        w.write::<5, u8>(0).unwrap();
    });

    assert_eq!(decoded(&data, 8, 4).unwrap().samples, [-5; 4]);
}

#[test]
fn test_lpc() {
    let data = encoded(|w| {
        w.build(&SubframeHeader {
            type_: SubframeType::Lpc(1),
            wasted_bps: 0,
        })
        .unwrap();
        w.write_sample(16, 100).unwrap();
        w.write::<4, u8>(3).unwrap(); // 4-bit coefficients
        w.write_sample(5, 1).unwrap(); // shift
        w.write_sample(4, 2).unwrap(); // coefficient
        w.write::<2, u8>(0).unwrap();
        w.write::<4, u8>(0).unwrap();
        w.write::<4, u8>(1).unwrap();
        for residual in [1, -2, 0] {
            w.write_rice(1, residual).unwrap();
        }
    });

    let subframe = decoded(&data, 16, 4).unwrap();
    assert_eq!(subframe.header.type_, SubframeType::Lpc(1));
    assert_eq!(subframe.samples, [100, 101, 99, 99]);
}

// a single escaped partition of raw 24-bit residuals
#[cfg(test)]
fn write_raw_residuals(
    w: &mut bitstream_io::BitWriter<Vec<u8>, bitstream_io::BigEndian>,
    residuals: &[i64],
) {
    w.write::<2, u8>(0).unwrap();
    w.write::<4, u8>(0).unwrap();
    w.write::<4, u8>(0b1111).unwrap();
    w.write::<5, u8>(24).unwrap();
    for residual in residuals {
        w.write_sample(24, *residual as i32).unwrap();
    }
}

#[cfg(test)]
fn residuals(samples: &[i32], coefficients: &[i64], shift: u32) -> Vec<i64> {
    (coefficients.len()..samples.len())
        .map(|i| {
            let prediction = coefficients
                .iter()
                .enumerate()
                .map(|(j, c)| c * i64::from(samples[i - 1 - j]))
                .sum::<i64>()
                >> shift;
            i64::from(samples[i]) - prediction
        })
        .collect()
}

#[test]
fn test_fixed_orders() {
    let samples = [3, -7, 12, 40, -25, 8, 100, -60, 5, 17, 0, -3];

    for (order, coefficients) in [
        &[][..],
        &[1][..],
        &[2, -1][..],
        &[3, -3, 1][..],
        &[4, -6, 4, -1][..],
    ]
    .into_iter()
    .enumerate()
    {
        let data = encoded(|w| {
            w.build(&SubframeHeader {
                type_: SubframeType::Fixed(order as u8),
                wasted_bps: 0,
            })
            .unwrap();
            for sample in &samples[..order] {
                w.write_sample(16, *sample).unwrap();
            }
            write_raw_residuals(w, &residuals(&samples, coefficients, 0));
        });

        let subframe = decoded(&data, 16, 12).unwrap();
        assert_eq!(subframe.header.type_, SubframeType::Fixed(order as u8));
        assert_eq!(subframe.samples, samples, "order {order}");
    }
}

#[test]
fn test_lpc_order_3() {
    // coefficients apply to the most recent sample first
    let samples = [120, 98, -40, -77, 15, 63, 64, -2, -90, -31];
    let coefficients = [5, -3, 1];
    let shift = 2;

    let data = encoded(|w| {
        w.build(&SubframeHeader {
            type_: SubframeType::Lpc(3),
            wasted_bps: 0,
        })
        .unwrap();
        for sample in &samples[..3] {
            w.write_sample(16, *sample).unwrap();
        }
        w.write::<4, u8>(3).unwrap(); // 4-bit coefficients
        w.write_sample(5, shift as i32).unwrap();
        for coefficient in coefficients {
            w.write_sample(4, coefficient as i32).unwrap();
        }
        write_raw_residuals(w, &residuals(&samples, &coefficients, shift));
    });

    let subframe = decoded(&data, 16, 10).unwrap();
    assert_eq!(subframe.header.type_, SubframeType::Lpc(3));
    assert_eq!(subframe.samples, samples);

    // reversing the coefficients predicts different samples
    let reversed = residuals(&samples, &[1, -3, 5], shift);
    assert_ne!(reversed, residuals(&samples, &coefficients, shift));
}

#[test]
fn test_invalid_subframes() {
    fn lpc(precision: u8, shift: i32) -> Vec<u8> {
        encoded(|w| {
            w.build(&SubframeHeader {
                type_: SubframeType::Lpc(1),
                wasted_bps: 0,
            })
            .unwrap();
            w.write_sample(16, 0).unwrap();
            w.write::<4, u8>(precision).unwrap();
            w.write_sample(5, shift).unwrap();
            w.write_sample(4, 1).unwrap();
            w.write::<2, u8>(0).unwrap();
            w.write::<4, u8>(0).unwrap();
            w.write::<4, u8>(0).unwrap();
            w.write_rice(0, 0).unwrap();
        })
    }

    assert!(decoded(&lpc(3, 0), 16, 2).is_ok());
    assert!(matches!(
        decoded(&lpc(0b1111, 0), 16, 2),
        Err(Error::InvalidLpcPrecision)
    ));
    assert!(matches!(
        decoded(&lpc(3, -1), 16, 2),
        Err(Error::NegativeLpcShift)
    ));

    fn fixed(method: u8, partition_order: u8) -> Vec<u8> {
        encoded(|w| {
            w.build(&SubframeHeader {
                type_: SubframeType::Fixed(2),
                wasted_bps: 0,
            })
            .unwrap();
            w.write_sample(16, 0).unwrap();
            w.write_sample(16, 0).unwrap();
            w.write::<2, u8>(method).unwrap();
            w.write::<4, u8>(partition_order).unwrap();
        })
    }

    assert!(matches!(
        decoded(&fixed(0b10, 0), 16, 8),
        Err(Error::ReservedResidualCodingMethod)
    ));
    assert!(decoded(&fixed(0b11, 0), 16, 8).unwrap_err().is_unsupported());
    // partitions of 1 sample are smaller than the predictor order
    assert!(matches!(
        decoded(&fixed(0, 3), 16, 8),
        Err(Error::InvalidPartitionOrder)
    ));
    assert!(!decoded(&fixed(0, 3), 16, 8).unwrap_err().is_unsupported());
    // block size doesn't divide into 2 partitions
    assert!(matches!(
        decoded(&fixed(0, 1), 16, 7),
        Err(Error::InvalidPartitionOrder)
    ));
    // predictor order larger than the block
    assert!(matches!(
        decoded(&fixed(0, 0), 16, 1),
        Err(Error::InvalidPartitionOrder)
    ));

    // truncated
    assert!(matches!(
        decoded(&fixed(0, 0), 16, 8),
        Err(Error::UnexpectedEof)
    ));

    assert!(matches!(
        decoded(&[0], 33, 8),
        Err(Error::UnsupportedBitsPerSample)
    ));
}
