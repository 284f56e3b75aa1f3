use nom::{
    bytes::complete::take,
    combinator::{map, opt},
    number::complete::{be_u16, be_u32, be_u64, u8},
    sequence::tuple,
    IResult,
};

#[cfg(feature = "json_dump")]
use serde::Serialize;

use crate::utils::{fourcc, latin1_string};

/// Represents a `COMM` (common) chunk.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json_dump", derive(Serialize))]
pub struct CommonChunk {
    pub channels: u16,
    pub sample_frames: u32,
    /// Bits per sample.
    pub sample_size: u16,
    /// Hz, 0.0 if the stored value is not a finite number.
    pub sample_rate: f64,
    pub duration_seconds: f64,

    /// `NONE` for plain AIFF.
    pub compression_type: String,
    /// Readable name of `compression_type`, see [`compression_name`].
    pub compression: String,
    /// The compression name stored in an AIFF-C file.
    pub compression_label: Option<String>,
}

impl CommonChunk {
    /// Parses a `COMM` body. The returned flag is false when the sample rate
    /// is infinite or NaN.
    pub(crate) fn parse(body: &[u8], aifc: bool) -> IResult<&[u8], (CommonChunk, bool)> {
        let (remain, (channels, sample_frames, sample_size, sample_rate)) =
            tuple((be_u16, be_u32, be_u16, extended))(body)?;

        let (remain, compression_type, compression_label) = if aifc {
            let (remain, code) = opt(map(take(4_usize), fourcc))(remain)?;
            let (remain, label) = opt(pstring)(remain)?;
            (remain, code, label)
        } else {
            (remain, None, None)
        };
        let compression_type = compression_type.unwrap_or_else(|| "NONE".to_owned());

        let rate = sample_rate.unwrap_or_default();
        let duration_seconds = if rate > 0.0 {
            sample_frames as f64 / rate
        } else {
            0.0
        };

        Ok((
            remain,
            (
                CommonChunk {
                    channels,
                    sample_frames,
                    sample_size,
                    sample_rate: rate,
                    duration_seconds,
                    compression: compression_name(&compression_type).to_owned(),
                    compression_type,
                    compression_label,
                },
                sample_rate.is_some(),
            ),
        ))
    }
}

/// Parses an 80-bit IEEE 754 extended precision float: a sign bit, a 15-bit
/// exponent (bias 16383) and a 64-bit mantissa with an explicit integer bit.
/// Infinity and NaN (exponent 0x7FFF) yield `None`, as do values out of the
/// `f64` range.
pub(crate) fn extended(input: &[u8]) -> IResult<&[u8], Option<f64>> {
    map(tuple((be_u16, be_u64)), |(sign_exponent, mantissa)| {
        let exponent = (sign_exponent & 0x7fff) as i32;
        if exponent == 0x7fff {
            return None;
        }
        if mantissa == 0 {
            return Some(0.0);
        }

        let v = scale(mantissa as f64, exponent - 16383 - 63);
        if !v.is_finite() {
            return None;
        }
        Some(if sign_exponent & 0x8000 != 0 { -v } else { v })
    })(input)
}

/// `x * 2^exp` in two steps, `2^exp` alone leaves the `f64` range long
/// before the product does.
fn scale(x: f64, exp: i32) -> f64 {
    let half = exp / 2;
    x * 2_f64.powi(half) * 2_f64.powi(exp - half)
}

/// A Pascal string padded to an even total length.
fn pstring(input: &[u8]) -> IResult<&[u8], String> {
    let (remain, len) = u8(input)?;
    let (remain, text) = take(len)(remain)?;
    let remain = if len % 2 == 0 {
        remain.get(1..).unwrap_or(remain)
    } else {
        remain
    };
    Ok((remain, latin1_string(text)))
}

/// Maps an AIFF-C compression type to a readable name.
pub fn compression_name(code: &str) -> &'static str {
    match code {
        "NONE" => "Not compressed",
        "sowt" => "Little-endian PCM",
        "twos" => "Big-endian PCM",
        "fl32" | "FL32" => "32-bit float",
        "fl64" | "FL64" => "64-bit float",
        "ulaw" | "ULAW" => "\u{b5}-law 2:1",
        "alaw" | "ALAW" => "A-law 2:1",
        "ima4" => "IMA 4:1",
        "MAC3" => "MACE 3:1",
        "MAC6" => "MACE 6:1",
        "GSM " => "GSM",
        "in24" => "24-bit integer",
        "in32" => "32-bit integer",
        _ => "Unknown",
    }
}
