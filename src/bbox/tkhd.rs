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

const TRACK_ENABLED: u32 = 0x000001;
const TRACK_IN_MOVIE: u32 = 0x000002;
const TRACK_IN_PREVIEW: u32 = 0x000004;

/// Represents a [track header atom][1].
///
/// tkhd is a fullbox which contains version & flags.
///
/// atom-path: moov/trak/tkhd
///
/// [1]: https://developer.apple.com/documentation/quicktime-file-format/track_header_atom
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json_dump", derive(Serialize))]
pub struct TkhdBox {
    pub version: u8,
    pub flags: u32,

    /// seconds since midnight, January 1, 1904
    pub creation_time: Option<DateTime<Utc>>,

    /// seconds since midnight, January 1, 1904
    pub modification_time: Option<DateTime<Utc>>,

    pub track_id: u32,

    /// In the time scale of the movie header.
    pub duration: u64,

    pub layer: i16,
    pub alternate_group: i16,
    pub volume: f64,

    pub width: f64,
    pub height: f64,
}

impl TkhdBox {
    pub fn enabled(&self) -> bool {
        self.flags & TRACK_ENABLED != 0
    }

    pub fn in_movie(&self) -> bool {
        self.flags & TRACK_IN_MOVIE != 0
    }

    pub fn in_preview(&self) -> bool {
        self.flags & TRACK_IN_PREVIEW != 0
    }
}

impl ParseBody<TkhdBox> for TkhdBox {
    fn parse_body(body: &[u8], header: FullBoxHeader) -> nom::IResult<&[u8], TkhdBox> {
        // creation_time, modification_time, track_id, reserved, duration
        let (remain, (creation_time, modification_time, track_id, _, duration)) =
            if header.version == 1 {
                tuple((be_u64, be_u64, be_u32, be_u32, be_u64))(body)?
            } else {
                map(
                    tuple((be_u32, be_u32, be_u32, be_u32, be_u32)),
                    |(c, m, id, r, d)| (c as u64, m as u64, id, r, d as u64),
                )(body)?
            };

        let (remain, (_, layer, alternate_group, volume, _, _, width, height)) = tuple((
            take(8usize),
            be_i16,
            be_i16,
            be_i16,
            take(2usize),
            take(36usize),
            be_u32,
            be_u32,
        ))(remain)?;

        Ok((
            remain,
            TkhdBox {
                version: header.version,
                flags: header.flags,
                creation_time: mac_epoch_to_utc(creation_time),
                modification_time: mac_epoch_to_utc(modification_time),
                track_id,
                duration,
                layer,
                alternate_group,
                volume: fixed_8_8(volume),
                width: fixed_16_16(width),
                height: fixed_16_16(height),
            },
        ))
    }
}
