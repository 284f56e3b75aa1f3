use std::path::Path;

use nom::{
    branch::alt,
    bytes::complete::{tag, take},
    combinator::{map, verify},
    multi::{length_data, many0},
    number::complete::{le_u16, u8},
    sequence::{terminated, tuple},
    IResult,
};

#[cfg(feature = "json_dump")]
use serde::Serialize;

use crate::{error::describe_parse_error, utils::latin1_string};

const EXTENSION: u8 = 0x21;
const IMAGE_DESCRIPTOR: u8 = 0x2c;
const TRAILER: u8 = 0x3b;

const GRAPHIC_CONTROL: u8 = 0xf9;
const APPLICATION: u8 = 0xff;
const COMMENT: u8 = 0xfe;

/// Application identifiers (+ authentication code) carrying a loop count.
const LOOP_EXTENSIONS: &[&[u8]] = &[b"NETSCAPE2.0", b"ANIMEXTS1.0"];

/// Animation structure of a GIF file. Pixel data is never decoded.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "json_dump", derive(Serialize))]
pub struct GifMetadata {
    pub file: String,
    pub file_size: u64,
    pub is_valid_gif: bool,
    /// "87a" or "89a".
    pub version: Option<String>,
    pub width: u16,
    pub height: u16,
    pub has_global_color_table: bool,
    /// Bits per primary color.
    pub color_resolution: u8,
    pub sort_flag: bool,
    pub global_color_count: u16,
    pub background_color_index: u8,
    pub pixel_aspect_ratio: u8,
    /// More than one frame.
    pub is_animated: bool,
    /// `Some(0)` loops forever, `None` if there is no loop extension.
    pub loop_count: Option<u16>,
    pub total_frames: usize,
    pub frames: Vec<GifFrame>,
    /// Milliseconds, one entry per frame.
    pub frame_delays: Vec<u32>,
    /// Disposal method of the first graphic control extension.
    pub disposal_method: Option<String>,
    pub has_transparency: bool,
    pub comments: Vec<String>,
    /// Application identifiers, e.g. `NETSCAPE2.0`, `XMP DataXMP`.
    pub application_extensions: Vec<String>,
    pub total_duration_ms: u64,
    /// The trailer has been reached without errors.
    pub success: bool,
    pub errors: Vec<String>,
}

/// An image descriptor, plus the graphic control extension preceding it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "json_dump", derive(Serialize))]
pub struct GifFrame {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    pub interlaced: bool,
    /// 0 without a local color table.
    pub local_color_count: u16,
    pub delay_ms: u32,
    pub disposal_method: Option<String>,
    pub transparent_index: Option<u8>,
}

#[derive(Debug, Clone, Copy)]
struct GraphicControl {
    disposal: u8,
    delay_cs: u16,
    transparent_index: Option<u8>,
}

impl GifMetadata {
    fn error(&mut self, msg: String) {
        tracing::warn!(error = %msg, "gif");
        self.errors.push(msg);
    }
}

fn disposal_name(method: u8) -> String {
    match method {
        0 => "none".to_owned(),
        1 => "do_not_dispose".to_owned(),
        2 => "restore_to_background".to_owned(),
        3 => "restore_to_previous".to_owned(),
        n => format!("reserved_{n}"),
    }
}

fn color_count(packed: u8) -> u16 {
    1 << ((packed & 0x07) + 1)
}

/// A sequence of length prefixed sub-blocks, ended by an empty block.
fn sub_blocks(input: &[u8]) -> IResult<&[u8], Vec<&[u8]>> {
    terminated(
        many0(verify(length_data(u8), |b: &[u8]| !b.is_empty())),
        tag(&b"\0"[..]),
    )(input)
}

/// Parses the GIF file at `path`. I/O errors are reported in
/// [`GifMetadata::errors`].
pub fn parse_gif<P: AsRef<Path>>(path: P) -> GifMetadata {
    let path = path.as_ref();
    let mut meta = match std::fs::read(path) {
        Ok(buf) => parse_gif_bytes(&buf),
        Err(e) => GifMetadata {
            errors: vec![crate::Error::from(e).to_string()],
            ..Default::default()
        },
    };
    meta.file = path.display().to_string();
    meta
}

#[tracing::instrument(skip_all)]
pub fn parse_gif_bytes(input: &[u8]) -> GifMetadata {
    let mut meta = GifMetadata {
        file_size: input.len() as u64,
        ..Default::default()
    };

    let header: IResult<&[u8], _> = tuple((
        tag("GIF"),
        alt((tag("87a"), tag("89a"))),
        le_u16,
        le_u16,
        u8,
        u8,
        u8,
    ))(input);
    let (remain, (_, version, width, height, packed, background, aspect)) = match header {
        Ok(x) => x,
        Err(_) => {
            meta.error("not a GIF file".to_owned());
            return meta;
        }
    };

    meta.is_valid_gif = true;
    meta.version = Some(latin1_string(version));
    meta.width = width;
    meta.height = height;
    meta.has_global_color_table = packed & 0x80 != 0;
    meta.color_resolution = ((packed >> 4) & 0x07) + 1;
    meta.sort_flag = packed & 0x08 != 0;
    meta.background_color_index = background;
    meta.pixel_aspect_ratio = aspect;

    let mut remain = remain;
    if meta.has_global_color_table {
        meta.global_color_count = color_count(packed);
        match take::<_, _, nom::error::Error<_>>(3 * meta.global_color_count as usize)(remain) {
            Ok((rem, _)) => remain = rem,
            Err(e) => {
                meta.error(describe_parse_error(e, "global color table"));
                return meta;
            }
        }
    }

    let mut walker = BlockWalker {
        input,
        meta: &mut meta,
        control: None,
    };
    walker.walk(remain);

    meta.total_frames = meta.frames.len();
    meta.is_animated = meta.total_frames > 1;
    meta.frame_delays = meta.frames.iter().map(|f| f.delay_ms).collect();
    meta.total_duration_ms = meta.frame_delays.iter().map(|d| *d as u64).sum();

    meta
}

/// Remaining input after a block.
type BlockResult<'a> = Result<&'a [u8], nom::Err<nom::error::Error<&'a [u8]>>>;

struct BlockWalker<'a, 'm> {
    input: &'a [u8],
    meta: &'m mut GifMetadata,
    /// Graphic control extension waiting for its image.
    control: Option<GraphicControl>,
}

impl<'a, 'm> BlockWalker<'a, 'm> {
    fn offset(&self, remain: &[u8]) -> usize {
        self.input.len() - remain.len()
    }

    fn walk(&mut self, mut remain: &'a [u8]) {
        loop {
            let offset = self.offset(remain);
            let Some((&introducer, rest)) = remain.split_first() else {
                self.meta.error("missing trailer, the file is truncated".to_owned());
                return;
            };

            let res = match introducer {
                EXTENSION => self.extension(rest),
                IMAGE_DESCRIPTOR => self.image(rest),
                TRAILER => {
                    tracing::debug!(offset, "trailer");
                    self.meta.success = self.meta.errors.is_empty();
                    return;
                }
                x => {
                    self.meta
                        .error(format!("unknown block 0x{x:02x} at offset {offset}"));
                    return;
                }
            };

            match res {
                Ok(rem) => remain = rem,
                Err(e) => {
                    let block = if introducer == EXTENSION {
                        "extension"
                    } else {
                        "image"
                    };
                    self.meta
                        .error(describe_parse_error(e, &format!("{block} at offset {offset}")));
                    return;
                }
            }
        }
    }

    fn extension(&mut self, input: &'a [u8]) -> BlockResult<'a> {
        let (remain, (label, blocks)) = tuple((u8, sub_blocks))(input)?;
        tracing::debug!(label, blocks = blocks.len(), "extension");

        match label {
            GRAPHIC_CONTROL => {
                if let Some(&[packed, lo, hi, index, ..]) = blocks.first().copied() {
                    let control = GraphicControl {
                        disposal: (packed >> 2) & 0x07,
                        delay_cs: u16::from_le_bytes([lo, hi]),
                        transparent_index: (packed & 0x01 != 0).then_some(index),
                    };
                    if self.meta.disposal_method.is_none() {
                        self.meta.disposal_method = Some(disposal_name(control.disposal));
                    }
                    self.meta.has_transparency |= control.transparent_index.is_some();
                    self.control = Some(control);
                }
            }
            APPLICATION => {
                let mut blocks = blocks.into_iter();
                if let Some(identifier) = blocks.next() {
                    self.meta.application_extensions.push(latin1_string(identifier));
                    if LOOP_EXTENSIONS.contains(&identifier) {
                        // sub-block id 1 + 16-bit loop count, other layouts
                        // are skipped
                        if let Some(&[1, lo, hi]) = blocks.next() {
                            self.meta.loop_count = Some(u16::from_le_bytes([lo, hi]));
                        }
                    }
                }
            }
            COMMENT => {
                let text = blocks.concat();
                self.meta.comments.push(latin1_string(&text));
            }
            _ => (),
        }

        Ok(remain)
    }

    fn image(&mut self, input: &'a [u8]) -> BlockResult<'a> {
        let (remain, (left, top, width, height, packed)) =
            tuple((le_u16, le_u16, le_u16, le_u16, u8))(input)?;

        let local_color_count = if packed & 0x80 != 0 {
            color_count(packed)
        } else {
            0
        };
        let (remain, _) = take(3 * local_color_count as usize)(remain)?;

        // LZW minimum code size, then the image data
        let (remain, (_, blocks)) = tuple((u8, map(sub_blocks, |b| b.len())))(remain)?;
        tracing::debug!(width, height, blocks, "image");

        let control = self.control.take();
        self.meta.frames.push(GifFrame {
            left,
            top,
            width,
            height,
            interlaced: packed & 0x40 != 0,
            local_color_count,
            delay_ms: control.map(|c| c.delay_cs as u32 * 10).unwrap_or_default(),
            disposal_method: control.map(|c| disposal_name(c.disposal)),
            transparent_index: control.and_then(|c| c.transparent_index),
        });

        Ok(remain)
    }
}
