use std::{fmt::Display, path::Path};

#[cfg(feature = "json_dump")]
use serde::Serialize;

use crate::{
    aiff::{parse_aiff, parse_aiff_bytes, AiffMetadata},
    bbox::BoxHeader,
    gif::{parse_gif, parse_gif_bytes, GifMetadata},
    loader::read_prefix,
    mov::{parse_mp4, parse_mp4_bytes, Mp4Metadata},
    png::{parse_apng, parse_apng_bytes, ApngMetadata, PNG_SIGNATURE},
};

/// Headerless QuickTime files start with one of these boxes.
const QT_LEADING_BOXES: &[&str] = &["moov", "mdat", "wide", "free", "skip"];

/// Container formats recognized by magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFormat {
    /// ISOBMFF: MP4, MOV, 3GP, M4A, ...
    Mp4,
    Aiff,
    Gif,
    Png,
}

impl TryFrom<&[u8]> for MediaFormat {
    type Error = crate::Error;

    fn try_from(input: &[u8]) -> Result<Self, Self::Error> {
        let format = if input.starts_with(b"GIF87a") || input.starts_with(b"GIF89a") {
            MediaFormat::Gif
        } else if input.starts_with(PNG_SIGNATURE) {
            MediaFormat::Png
        } else if check_aiff(input) {
            MediaFormat::Aiff
        } else if check_bmff(input) {
            MediaFormat::Mp4
        } else {
            return Err(crate::Error::UnrecognizedFileFormat);
        };

        Ok(format)
    }
}

impl Display for MediaFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaFormat::Mp4 => "ISOBMFF".fmt(f),
            MediaFormat::Aiff => "AIFF".fmt(f),
            MediaFormat::Gif => "GIF".fmt(f),
            MediaFormat::Png => "PNG".fmt(f),
        }
    }
}

fn check_aiff(input: &[u8]) -> bool {
    input.len() >= 12
        && &input[..4] == b"FORM"
        && matches!(&input[8..12], b"AIFF" | b"AIFC")
}

fn check_bmff(input: &[u8]) -> bool {
    let Ok((_, header)) = BoxHeader::parse(input) else {
        return false;
    };
    header.box_type == "ftyp" || QT_LEADING_BOXES.contains(&header.box_type.as_str())
}

/// The result of [`parse_media`], one variant per container family.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json_dump", derive(Serialize))]
#[cfg_attr(feature = "json_dump", serde(untagged))]
pub enum MediaMetadata {
    Mp4(Mp4Metadata),
    Aiff(AiffMetadata),
    Gif(GifMetadata),
    Apng(ApngMetadata),
}

impl MediaMetadata {
    /// Soft errors collected while parsing.
    pub fn errors(&self) -> &[String] {
        match self {
            MediaMetadata::Mp4(m) => &m.errors,
            MediaMetadata::Aiff(m) => &m.errors,
            MediaMetadata::Gif(m) => &m.errors,
            MediaMetadata::Apng(m) => &m.errors,
        }
    }

    /// e.g. "MP4", "QuickTime", "AIFF-C", "GIF", "APNG".
    pub fn format_name(&self) -> &str {
        match self {
            MediaMetadata::Mp4(m) => &m.format,
            MediaMetadata::Aiff(m) => &m.format,
            MediaMetadata::Gif(_) => "GIF",
            MediaMetadata::Apng(m) if m.is_animated => "APNG",
            MediaMetadata::Apng(_) => "PNG",
        }
    }

    pub fn file_size(&self) -> u64 {
        match self {
            MediaMetadata::Mp4(m) => m.file_size,
            MediaMetadata::Aiff(m) => m.file_size,
            MediaMetadata::Gif(m) => m.file_size,
            MediaMetadata::Apng(m) => m.file_size,
        }
    }
}

/// Detects the container format of the file at `path` and parses it.
///
/// Returns `Err` only if the file can't be read, or if its format is not
/// recognized; problems inside the file are reported by
/// [`MediaMetadata::errors`].
///
/// ```rust
/// use mediawalk::*;
///
/// let err = parse_media("./Cargo.toml").unwrap_err();
/// assert!(matches!(err, Error::UnrecognizedFileFormat));
/// ```
#[tracing::instrument(skip_all)]
pub fn parse_media<P: AsRef<Path>>(path: P) -> crate::Result<MediaMetadata> {
    let path = path.as_ref();
    let prefix = read_prefix(path)?;
    let format = MediaFormat::try_from(&prefix[..])?;
    tracing::debug!(%format, path = %path.display(), "detected");

    let meta = match format {
        MediaFormat::Mp4 => MediaMetadata::Mp4(parse_mp4(path)),
        MediaFormat::Aiff => MediaMetadata::Aiff(parse_aiff(path)),
        MediaFormat::Gif => MediaMetadata::Gif(parse_gif(path)),
        MediaFormat::Png => MediaMetadata::Apng(parse_apng(path)),
    };
    Ok(meta)
}

/// Like [`parse_media`], for a file that is already in memory.
pub fn parse_media_bytes(input: &[u8]) -> crate::Result<MediaMetadata> {
    let meta = match MediaFormat::try_from(input)? {
        MediaFormat::Mp4 => MediaMetadata::Mp4(parse_mp4_bytes(input)),
        MediaFormat::Aiff => MediaMetadata::Aiff(parse_aiff_bytes(input)),
        MediaFormat::Gif => MediaMetadata::Gif(parse_gif_bytes(input)),
        MediaFormat::Png => MediaMetadata::Apng(parse_apng_bytes(input)),
    };
    Ok(meta)
}

/// Async version of [`parse_media`]. The blocking header-first walk runs on
/// tokio's blocking thread pool, so only the records that are decoded are
/// read, however big the file is.
#[cfg(feature = "async")]
#[tracing::instrument(skip_all)]
pub async fn parse_media_async<P: AsRef<Path>>(path: P) -> crate::Result<MediaMetadata> {
    let path = path.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || parse_media(path))
        .await
        .map_err(std::io::Error::other)?
}
