use chrono::{DateTime, Utc};
use nom::number::complete::be_u16;

#[cfg(feature = "json_dump")]
use serde::Serialize;

use crate::utils::mac_epoch_to_utc;

use super::{
    mvhd::{duration_seconds, parse_times},
    FullBoxHeader, ParseBody,
};

/// Represents a [media header atom][1].
///
/// atom-path: moov/trak/mdia/mdhd
///
/// [1]: https://developer.apple.com/documentation/quicktime-file-format/media_header_atom
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json_dump", derive(Serialize))]
pub struct MdhdBox {
    pub version: u8,
    pub creation_time: Option<DateTime<Utc>>,
    pub modification_time: Option<DateTime<Utc>>,
    pub timescale: u32,
    pub duration: u64,
    pub duration_seconds: f64,

    /// ISO-639-2/T language code, e.g. "eng", "und". `None` for the legacy
    /// Macintosh language codes QuickTime may store instead.
    pub language: Option<String>,
}

impl ParseBody<MdhdBox> for MdhdBox {
    fn parse_body(body: &[u8], header: FullBoxHeader) -> nom::IResult<&[u8], MdhdBox> {
        let (remain, (creation_time, modification_time, timescale, duration)) =
            parse_times(header.version, body)?;
        let (remain, language) = be_u16(remain)?;
        let (remain, _pre_defined) = be_u16(remain)?;

        Ok((
            remain,
            MdhdBox {
                version: header.version,
                creation_time: mac_epoch_to_utc(creation_time),
                modification_time: mac_epoch_to_utc(modification_time),
                timescale,
                duration,
                duration_seconds: duration_seconds(duration, timescale),
                language: unpack_language(language),
            },
        ))
    }
}

/// The language is packed as three 5-bit values, each one being a letter
/// minus 0x60, behind a padding bit.
fn unpack_language(code: u16) -> Option<String> {
    if code < 0x400 {
        return None;
    }

    [10, 5, 0]
        .iter()
        .map(|shift| {
            let c = ((code >> shift) & 0x1f) as u8 + 0x60;
            c.is_ascii_lowercase().then_some(c as char)
        })
        .collect()
}
