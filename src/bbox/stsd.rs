use nom::{
    bytes::complete::take,
    number::complete::{be_f64, be_u16, be_u32},
    sequence::tuple,
    IResult,
};

#[cfg(feature = "json_dump")]
use serde::Serialize;

use crate::utils::fixed_16_16;

use super::{BoxIter, FullBoxHeader, ParseBody};

const AUDIO_CODECS: &[&str] = &[
    "mp4a", "alac", "ac-3", "ec-3", "Opus", "fLaC", "samr", "sowt", "twos", "lpcm", "ulaw", "alaw",
    ".mp3", "ima4",
];

const VISUAL_CODECS: &[&str] = &[
    "avc1", "avc3", "hvc1", "hev1", "mp4v", "av01", "vp09", "jpeg", "mjpa", "apcn", "apch", "apcs",
    "apco", "ap4h", "s263",
];

/// Represents a [sample description atom][1].
///
/// atom-path: moov/trak/mdia/minf/stbl/stsd
///
/// [1]: https://developer.apple.com/documentation/quicktime-file-format/sample_description_atom
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json_dump", derive(Serialize))]
pub struct StsdBox {
    pub entries: Vec<SampleEntry>,
}

/// One sample description. Only the fields of the matching kind are set:
/// audio entries carry channels/sample size/rate, visual entries carry
/// width/height.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "json_dump", derive(Serialize))]
pub struct SampleEntry {
    pub codec: String,
    pub channel_count: Option<u16>,
    pub sample_size: Option<u16>,
    pub sample_rate: Option<f64>,
    pub width: Option<u16>,
    pub height: Option<u16>,
}

impl SampleEntry {
    pub fn is_audio(&self) -> bool {
        AUDIO_CODECS.contains(&self.codec.as_str())
    }

    pub fn is_visual(&self) -> bool {
        VISUAL_CODECS.contains(&self.codec.as_str())
    }

    fn parse<'a>(codec: &str, body: &'a [u8]) -> IResult<&'a [u8], SampleEntry> {
        let mut entry = SampleEntry {
            codec: codec.to_owned(),
            ..Default::default()
        };

        if entry.is_audio() {
            // reserved(6) + data_reference_index(2), then QuickTime's
            // version/revision/vendor
            let (remain, (_, version, _, channels, sample_size, _, sample_rate)) =
                tuple((take(8usize), be_u16, take(6usize), be_u16, be_u16, take(4usize), be_u32))(
                    body,
                )?;

            entry.channel_count = Some(channels);
            entry.sample_size = Some(sample_size);
            entry.sample_rate = Some(fixed_16_16(sample_rate));

            // QuickTime sound description v2 moves the real values behind
            // the fixed fields.
            if version == 2 {
                if let Ok((_, (_, rate, channels))) =
                    tuple((be_u32::<_, nom::error::Error<_>>, be_f64, be_u32))(remain)
                {
                    entry.sample_rate = Some(rate);
                    entry.channel_count = u16::try_from(channels).ok();
                }
            }
        } else if entry.is_visual() {
            // reserved(6) + data_reference_index(2) + pre_defined(2) +
            // reserved(2) + pre_defined(12)
            let (_, (_, width, height)) = tuple((take(24usize), be_u16, be_u16))(body)?;
            entry.width = Some(width);
            entry.height = Some(height);
        }

        Ok((body, entry))
    }
}

impl ParseBody<StsdBox> for StsdBox {
    fn parse_body(body: &[u8], _: FullBoxHeader) -> IResult<&[u8], StsdBox> {
        let (remain, entry_count) = be_u32(body)?;

        let mut entries = Vec::new();
        for item in BoxIter::new(remain, 0).take(entry_count as usize) {
            let Ok((_, bbox)) = item else {
                tracing::debug!("invalid sample description entry");
                break;
            };
            match SampleEntry::parse(bbox.box_type(), bbox.body_data()) {
                Ok((_, entry)) => entries.push(entry),
                Err(_) => {
                    tracing::debug!(codec = bbox.box_type(), "sample entry is too small");
                    entries.push(SampleEntry {
                        codec: bbox.box_type().to_owned(),
                        ..Default::default()
                    });
                }
            }
        }

        Ok((&body[body.len()..], StsdBox { entries })) // Safe-slice
    }
}
