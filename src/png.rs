use std::path::Path;

use nom::{
    bytes::complete::{tag, take},
    combinator::map,
    number::complete::{be_u16, be_u32, u8},
    sequence::tuple,
    IResult,
};

#[cfg(feature = "json_dump")]
use serde::Serialize;

use crate::{error::describe_parse_error, utils::fourcc};

pub(crate) const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Animation structure of an APNG (or plain PNG) file.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "json_dump", derive(Serialize))]
pub struct ApngMetadata {
    pub file: String,
    pub file_size: u64,
    pub is_valid_png: bool,
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub color_type: u8,
    /// From `acTL`; a still PNG counts its default image as one frame.
    pub frame_count: u32,
    /// 0 loops forever.
    pub num_plays: u32,
    pub is_animated: bool,
    /// One entry per `fcTL` chunk.
    pub frames: Vec<ApngFrame>,
    /// Milliseconds, one entry per frame.
    pub frame_delays: Vec<u32>,
    pub fdat_sequence_numbers: Vec<u32>,
    pub total_duration_ms: u64,
    /// `IEND` has been reached without errors.
    pub success: bool,
    pub errors: Vec<String>,
}

/// Represents an `fcTL` (frame control) chunk.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "json_dump", derive(Serialize))]
pub struct ApngFrame {
    pub sequence_number: u32,
    pub width: u32,
    pub height: u32,
    pub x_offset: u32,
    pub y_offset: u32,
    pub delay_num: u16,
    /// 0 is read as 100, i.e. the delay is in 1/100 s.
    pub delay_den: u16,
    pub delay_ms: u32,
    /// 0: none, 1: background, 2: previous.
    pub dispose_op: u8,
    /// 0: source, 1: over.
    pub blend_op: u8,
}

impl ApngFrame {
    fn parse(data: &[u8]) -> IResult<&[u8], ApngFrame> {
        let (remain, (sequence_number, width, height, x_offset, y_offset)) =
            tuple((be_u32, be_u32, be_u32, be_u32, be_u32))(data)?;
        let (remain, (delay_num, delay_den, dispose_op, blend_op)) =
            tuple((be_u16, be_u16, u8, u8))(remain)?;

        Ok((
            remain,
            ApngFrame {
                sequence_number,
                width,
                height,
                x_offset,
                y_offset,
                delay_num,
                delay_den,
                delay_ms: delay_ms(delay_num, delay_den),
                dispose_op,
                blend_op,
            },
        ))
    }
}

fn delay_ms(num: u16, den: u16) -> u32 {
    let den = if den == 0 { 100 } else { den as u32 };
    ((num as u32 * 1000) as f64 / den as f64).round() as u32
}

impl ApngMetadata {
    fn error(&mut self, msg: String) {
        tracing::warn!(error = %msg, "apng");
        self.errors.push(msg);
    }
}

/// length, type, data, crc
fn chunk(input: &[u8]) -> IResult<&[u8], (String, &[u8])> {
    let (remain, (len, chunk_type)) = tuple((be_u32, map(take(4_usize), fourcc)))(input)?;
    let (remain, (data, _crc)) = tuple((take(len), take(4_usize)))(remain)?;
    Ok((remain, (chunk_type, data)))
}

/// Parses the PNG/APNG file at `path`. I/O errors are reported in
/// [`ApngMetadata::errors`].
pub fn parse_apng<P: AsRef<Path>>(path: P) -> ApngMetadata {
    let path = path.as_ref();
    let mut meta = match std::fs::read(path) {
        Ok(buf) => parse_apng_bytes(&buf),
        Err(e) => ApngMetadata {
            errors: vec![crate::Error::from(e).to_string()],
            ..Default::default()
        },
    };
    meta.file = path.display().to_string();
    meta
}

/// Walks the chunks of a PNG file. CRCs are not verified.
#[tracing::instrument(skip_all)]
pub fn parse_apng_bytes(input: &[u8]) -> ApngMetadata {
    let mut meta = ApngMetadata {
        file_size: input.len() as u64,
        ..Default::default()
    };

    let Ok((mut remain, _)) = tag::<_, _, nom::error::Error<_>>(PNG_SIGNATURE)(input) else {
        meta.error("not a PNG file".to_owned());
        return meta;
    };
    meta.is_valid_png = true;

    let mut animation_control = None;
    let mut has_idat = false;
    let mut first = true;

    loop {
        let offset = input.len() - remain.len();
        if remain.is_empty() {
            meta.error("missing IEND chunk, the file is truncated".to_owned());
            break;
        }

        let (rem, (chunk_type, data)) = match chunk(remain) {
            Ok(x) => x,
            Err(e) => {
                meta.error(describe_parse_error(e, &format!("chunk at offset {offset}")));
                break;
            }
        };
        remain = rem;
        tracing::debug!(%chunk_type, len = data.len(), offset, "chunk");

        if first && chunk_type != "IHDR" {
            meta.error(format!("first chunk is '{chunk_type}', expected 'IHDR'"));
        }
        first = false;

        match chunk_type.as_str() {
            "IHDR" => {
                let res = tuple((be_u32, be_u32, u8, u8))(data);
                match res {
                    Ok((_, (width, height, bit_depth, color_type))) => {
                        meta.width = width;
                        meta.height = height;
                        meta.bit_depth = bit_depth;
                        meta.color_type = color_type;
                    }
                    Err(e) => meta.error(describe_parse_error(e, "IHDR")),
                }
            }
            "acTL" => match tuple((be_u32, be_u32))(data) {
                Ok((_, (num_frames, num_plays))) => {
                    animation_control = Some(num_frames);
                    meta.num_plays = num_plays;
                }
                Err(e) => meta.error(describe_parse_error(e, "acTL")),
            },
            "fcTL" => match ApngFrame::parse(data) {
                Ok((_, frame)) => meta.frames.push(frame),
                Err(e) => meta.error(describe_parse_error(e, "fcTL")),
            },
            "fdAT" => match be_u32::<_, nom::error::Error<_>>(data) {
                Ok((_, sequence)) => meta.fdat_sequence_numbers.push(sequence),
                Err(e) => meta.error(describe_parse_error(e, "fdAT")),
            },
            "IDAT" => has_idat = true,
            "IEND" => {
                meta.success = meta.errors.is_empty();
                break;
            }
            _ => (),
        }
    }

    meta.frame_count = match animation_control {
        Some(n) => n,
        None => has_idat as u32,
    };
    meta.is_animated = animation_control.is_some_and(|n| n > 0);
    meta.frame_delays = meta.frames.iter().map(|f| f.delay_ms).collect();
    meta.total_duration_ms = meta.frame_delays.iter().map(|d| *d as u64).sum();

    meta
}
