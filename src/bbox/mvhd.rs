use chrono::{DateTime, Utc};
use nom::{
    bytes::complete::take,
    combinator::map,
    number::complete::{be_i16, be_u32, be_u64},
    sequence::tuple,
};

#[cfg(feature = "json_dump")]
use serde::Serialize;

use crate::utils::{fixed_16_16, fixed_8_8, mac_epoch_to_utc};

use super::{FullBoxHeader, ParseBody};

/// Represents a [movie header atom][1].
///
/// mvhd is a fullbox which contains version & flags. Version 1 stores the
/// times and the duration as 64-bit values, version 0 as 32-bit values.
///
/// atom-path: moov/mvhd
///
/// [1]: https://developer.apple.com/documentation/quicktime-file-format/movie_header_atom
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json_dump", derive(Serialize))]
pub struct MvhdBox {
    pub version: u8,

    /// seconds since midnight, January 1, 1904
    pub creation_time: Option<DateTime<Utc>>,

    /// seconds since midnight, January 1, 1904
    pub modification_time: Option<DateTime<Utc>>,

    /// The number of time units that pass per second in its time coordinate
    /// system.
    pub timescale: u32,

    /// Indicates the duration of the movie in time scale units.
    ///
    /// # convert to seconds
    ///
    /// seconds = duration / timescale
    pub duration: u64,

    pub duration_seconds: f64,

    /// Preferred playback rate, 1.0 is normal.
    pub rate: f64,

    /// Preferred volume, 1.0 is full.
    pub volume: f64,

    pub next_track_id: u32,
}

impl MvhdBox {
    pub fn duration_ms(&self) -> u64 {
        (self.duration_seconds * 1000_f64) as u64
    }
}

/// Parses `creation_time, modification_time, timescale, duration`, whose
/// widths depend on the full box version. Shared by mvhd & mdhd.
pub(super) fn parse_times(
    version: u8,
    body: &[u8],
) -> nom::IResult<&[u8], (u64, u64, u32, u64)> {
    if version == 1 {
        tuple((be_u64, be_u64, be_u32, be_u64))(body)
    } else {
        map(
            tuple((be_u32, be_u32, be_u32, be_u32)),
            |(created, modified, timescale, duration)| {
                (created as u64, modified as u64, timescale, duration as u64)
            },
        )(body)
    }
}

pub(crate) fn duration_seconds(duration: u64, timescale: u32) -> f64 {
    if timescale == 0 {
        0.0
    } else {
        duration as f64 / timescale as f64
    }
}

impl ParseBody<Self> for MvhdBox {
    fn parse_body(body: &[u8], header: FullBoxHeader) -> nom::IResult<&[u8], Self> {
        let (remain, (creation_time, modification_time, timescale, duration)) =
            parse_times(header.version, body)?;

        // reserved(10) + matrix(36) + pre-defined(24)
        let (remain, (rate, volume, _, next_track_id)) =
            tuple((be_u32, be_i16, take(70usize), be_u32))(remain)?;

        Ok((
            remain,
            Self {
                version: header.version,
                creation_time: mac_epoch_to_utc(creation_time),
                modification_time: mac_epoch_to_utc(modification_time),
                timescale,
                duration,
                duration_seconds: duration_seconds(duration, timescale),
                rate: fixed_16_16(rate),
                volume: fixed_8_8(volume),
                next_track_id,
            },
        ))
    }
}
