use std::{
    collections::BTreeMap,
    io::{Cursor, Read, Seek},
    path::Path,
};

use chrono::{DateTime, Utc};
use nom::{
    bytes::complete::take,
    combinator::map,
    number::complete::be_u32,
    sequence::tuple,
    IResult,
};

#[cfg(feature = "json_dump")]
use serde::Serialize;

use crate::{
    error::describe_parse_error,
    loader::{open_file, RecordReader},
    utils::{fourcc, latin1_string, mac_epoch_to_utc},
    EntryValue,
};

mod comm;
mod comt;
mod inst;
mod mark;

pub use comm::{compression_name, CommonChunk};
pub use comt::Comment;
pub use inst::{InstrumentChunk, Loop};
pub use mark::Marker;

/// Chunk payloads bigger than this are skipped instead of decoded.
const MAX_CHUNK_LEN: u64 = 16 * 1024 * 1024;

/// Chunks whose payload is loaded and decoded, the rest is only recorded.
const DECODED_CHUNKS: &[&str] = &[
    "COMM", "INST", "MARK", "COMT", "NAME", "AUTH", "(c) ", "ANNO", "FVER", "APPL",
];

/// Metadata extracted from an AIFF or AIFF-C file.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "json_dump", derive(Serialize))]
pub struct AiffMetadata {
    pub file: String,
    /// "AIFF" or "AIFF-C".
    pub format: String,
    pub file_size: u64,
    /// `AIFF` or `AIFC`.
    pub form_type: Option<String>,
    pub common: Option<CommonChunk>,
    pub instrument: Option<InstrumentChunk>,
    pub markers: Vec<Marker>,
    pub comments: Vec<Comment>,
    /// Text chunks: `name`, `author`, `copyright`, `annotation`.
    pub metadata: BTreeMap<String, EntryValue>,
    /// Every chunk in file order.
    pub chunks: Vec<ChunkInfo>,
    pub sound_data: Option<SoundData>,
    /// AIFF-C format version (`FVER`).
    pub format_version: Option<DateTime<Utc>>,
    /// Signatures of the `APPL` chunks.
    pub applications: Vec<String>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json_dump", derive(Serialize))]
pub struct ChunkInfo {
    pub id: String,
    /// Declared payload size, without header and pad byte.
    pub size: u64,
    /// Offset of the chunk header.
    pub offset: u64,
}

/// The `SSND` chunk header; the sample data itself is never read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "json_dump", derive(Serialize))]
pub struct SoundData {
    pub offset: u32,
    pub block_size: u32,
    /// Bytes of sample data following the header.
    pub data_size: u64,
}

impl AiffMetadata {
    fn with_error(e: crate::Error) -> Self {
        AiffMetadata {
            errors: vec![e.to_string()],
            ..Default::default()
        }
    }

    fn error(&mut self, msg: String) {
        tracing::warn!(error = %msg, "aiff");
        self.errors.push(msg);
    }

    fn is_aifc(&self) -> bool {
        self.form_type.as_deref() == Some("AIFC")
    }
}

fn chunk_header(input: &[u8]) -> IResult<&[u8], (String, u32)> {
    tuple((map(take(4_usize), fourcc), be_u32))(input)
}

/// Parses the AIFF/AIFF-C file at `path`.
///
/// Never fails, I/O errors are reported in [`AiffMetadata::errors`].
pub fn parse_aiff<P: AsRef<Path>>(path: P) -> AiffMetadata {
    let path = path.as_ref();
    let mut meta = open_file(path)
        .map_err(crate::Error::from)
        .and_then(parse_aiff_reader)
        .unwrap_or_else(AiffMetadata::with_error);
    meta.file = path.display().to_string();
    meta
}

pub fn parse_aiff_bytes(input: &[u8]) -> AiffMetadata {
    parse_aiff_reader(Cursor::new(input)).unwrap_or_else(AiffMetadata::with_error)
}

/// Walks the chunks of `reader` header-first, the sound data of `SSND` is
/// skipped by `Seek`.
///
/// Only I/O failures are returned as `Err`.
#[tracing::instrument(skip_all)]
pub fn parse_aiff_reader<R: Read + Seek>(reader: R) -> crate::Result<AiffMetadata> {
    let mut reader = RecordReader::new(reader)?;
    let mut meta = AiffMetadata {
        file_size: reader.len(),
        ..Default::default()
    };

    if reader.remaining() < 12 {
        meta.error("not an AIFF file: missing FORM header".to_owned());
        return Ok(meta);
    }

    let head = reader.read_vec(12)?;
    let (form_size, form_type) = match tuple((chunk_header, map(take(4_usize), fourcc)))(&head)
    {
        Ok((_, ((id, size), form_type))) if id == "FORM" => (size, form_type),
        _ => {
            meta.error("not an AIFF file: missing FORM header".to_owned());
            return Ok(meta);
        }
    };
    meta.format = match form_type.as_str() {
        "AIFF" => "AIFF",
        "AIFC" => "AIFF-C",
        other => {
            meta.error(format!("not an AIFF file: unsupported form type '{other}'"));
            return Ok(meta);
        }
    }
    .to_owned();
    meta.form_type = Some(form_type);

    let form_end = 8 + form_size as u64;
    if form_end != reader.len() {
        tracing::debug!(form_end, file_size = reader.len(), "FORM size mismatch");
    }

    while reader.remaining() >= 8 {
        let offset = reader.position();
        let head = reader.read_vec(8)?;
        let (id, size) = match chunk_header(&head) {
            Ok((_, header)) => header,
            Err(e) => {
                meta.error(describe_parse_error(e, &format!("invalid chunk at offset {offset}")));
                break;
            }
        };
        let size = size as u64;
        tracing::debug!(%id, size, offset, "chunk");

        meta.chunks.push(ChunkInfo {
            id: id.clone(),
            size,
            offset,
        });

        let available = reader.remaining();
        if size > available {
            meta.error(format!(
                "chunk '{id}' at offset {offset} declares {size} bytes but only {available} remain"
            ));
            break;
        }
        let pad = size % 2;

        if id == "SSND" {
            if size < 8 {
                meta.error(format!("SSND: chunk is too small: {size}"));
                reader.skip(size + pad)?;
                continue;
            }
            let body = reader.read_vec(8)?;
            let (_, (data_offset, block_size)) = tuple((be_u32, be_u32))(&body[..])
                .map_err(|e: nom::Err<nom::error::Error<&[u8]>>| crate::Error::from(e))?;
            meta.sound_data = Some(SoundData {
                offset: data_offset,
                block_size,
                data_size: size - 8,
            });
            reader.skip(size - 8 + pad)?;
            continue;
        }

        if !DECODED_CHUNKS.contains(&id.as_str()) {
            reader.skip(size + pad)?;
            continue;
        }
        if size > MAX_CHUNK_LEN {
            meta.error(format!(
                "chunk '{id}' at offset {offset} is too big to decode: {size}"
            ));
            reader.skip(size + pad)?;
            continue;
        }

        // size <= MAX_CHUNK_LEN
        let body = reader.read_vec(size as usize)?;
        visit_chunk(&mut meta, &id, &body);
        reader.skip(pad)?;
    }

    Ok(meta)
}

fn visit_chunk(meta: &mut AiffMetadata, id: &str, body: &[u8]) {
    match id {
        "COMM" => match CommonChunk::parse(body, meta.is_aifc()) {
            Ok((_, (common, rate_ok))) => {
                if !rate_ok {
                    meta.error("COMM: sample rate is not a finite number".to_owned());
                }
                meta.common = Some(common);
            }
            Err(e) => meta.error(describe_parse_error(e, "COMM")),
        },
        "INST" => match InstrumentChunk::parse(body) {
            Ok((_, inst)) => meta.instrument = Some(inst),
            Err(e) => meta.error(describe_parse_error(e, "INST")),
        },
        "MARK" => {
            let (markers, err) = mark::parse_markers(body);
            meta.markers.extend(markers);
            if let Some(e) = err {
                meta.error(e);
            }
        }
        "COMT" => {
            let (comments, err) = comt::parse_comments(body);
            meta.comments.extend(comments);
            if let Some(e) = err {
                meta.error(e);
            }
        }
        "FVER" => match be_u32::<_, nom::error::Error<_>>(body) {
            Ok((_, ts)) => meta.format_version = mac_epoch_to_utc(ts as u64),
            Err(e) => meta.error(describe_parse_error(e, "FVER")),
        },
        "APPL" => match body.get(..4) {
            Some(signature) => meta.applications.push(fourcc(signature)),
            None => meta.error("APPL: missing application signature".to_owned()),
        },
        "ANNO" => {
            let text = latin1_string(body);
            meta.metadata
                .entry("annotation".to_owned())
                .and_modify(|v| {
                    if let EntryValue::Text(s) = v {
                        s.push('\n');
                        s.push_str(&text);
                    }
                })
                .or_insert_with(|| EntryValue::Text(text.clone()));
        }
        "NAME" | "AUTH" | "(c) " => {
            let key = match id {
                "NAME" => "name",
                "AUTH" => "author",
                _ => "copyright",
            };
            meta.metadata
                .insert(key.to_owned(), EntryValue::Text(latin1_string(body)));
        }
        _ => (),
    }
}
