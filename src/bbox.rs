use nom::{
    bytes::{complete, streaming},
    combinator::{fail, map},
    error::context,
    number, IResult,
};

use crate::utils::fourcc;

mod ftyp;
mod hdlr;
mod ilst;
mod keys;
mod mdhd;
mod mvhd;
mod stsd;
mod tkhd;
pub use ftyp::FtypBox;
pub use hdlr::HdlrBox;
pub use ilst::{IlstBox, IlstItem};
pub use keys::KeysBox;
pub use mdhd::MdhdBox;
pub(crate) use mvhd::duration_seconds;
pub use mvhd::MvhdBox;
pub use stsd::{SampleEntry, StsdBox};
pub use tkhd::TkhdBox;

/// Deepest container nesting that is walked, real files stay below ten.
pub(crate) const MAX_BOX_DEPTH: usize = 32;

/// Boxes whose body is itself a sequence of boxes.
pub(crate) const CONTAINER_TYPES: &[&str] =
    &["moov", "trak", "mdia", "minf", "stbl", "udta", "meta", "ilst"];

pub(crate) fn is_container(box_type: &str) -> bool {
    CONTAINER_TYPES.contains(&box_type)
}

/// Representing an ISO base media file format box header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxHeader {
    pub box_size: u64,
    pub box_type: String,
    pub header_size: usize, // include size, type (and the 64-bit size if any)
}

impl BoxHeader {
    /// Parses a box header from the start of `input`. A box size of 0 means
    /// the box extends to the end of `input`.
    pub fn parse(input: &[u8]) -> IResult<&[u8], BoxHeader> {
        Self::parse_sized(input, input.len() as u64)
    }

    /// Like [`BoxHeader::parse`], but a box size of 0 resolves to
    /// `available`, the number of bytes from the start of the header to the
    /// end of the enclosing container (or file).
    pub fn parse_sized(input: &[u8], available: u64) -> IResult<&[u8], BoxHeader> {
        let (remain, size) = number::streaming::be_u32(input)?;

        // String::from_utf8 will fail on "©xyz"
        let (remain, box_type) = map(streaming::take(4_usize), fourcc)(remain)?;

        let (remain, box_size) = match size {
            0 => (remain, available),
            1 => number::streaming::be_u64(remain)?,
            2..=7 => context("invalid box header: box_size is too small", fail)(remain)?,
            _ => (remain, size as u64),
        };

        let header_size = input.len() - remain.len();

        if box_size < header_size as u64 {
            return context("invalid box header: box_size is too small", fail)(remain);
        }

        Ok((
            remain,
            BoxHeader {
                box_size,
                box_type,
                header_size,
            },
        ))
    }

    pub fn body_size(&self) -> u64 {
        self.box_size - self.header_size as u64
    }
}

/// Representing an ISO base media file format full box header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullBoxHeader {
    pub box_size: u64,
    pub box_type: String,
    pub header_size: usize, // include size, type, version, flags

    pub version: u8, // 8 bits
    pub flags: u32,  // 24 bits
}

impl FullBoxHeader {
    fn parse(input: &[u8]) -> IResult<&[u8], FullBoxHeader> {
        let (remain, header) = BoxHeader::parse(input)?;

        let (remain, version) = number::streaming::u8(remain)?;
        let (remain, flags) = number::streaming::be_u24(remain)?;

        let header_size = input.len() - remain.len();

        if header.box_size < header_size as u64 {
            return fail(remain);
        }

        Ok((
            remain,
            FullBoxHeader {
                box_type: header.box_type,
                box_size: header.box_size,
                header_size,
                version,
                flags,
            },
        ))
    }
}

/// Representing a generic ISO base media file format box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxHolder<'a> {
    pub header: BoxHeader,
    // Including header
    pub data: &'a [u8],
}

impl<'a> BoxHolder<'a> {
    pub fn box_size(&self) -> u64 {
        self.header.box_size
    }

    pub fn box_type(&self) -> &str {
        &self.header.box_type
    }

    pub fn header_size(&self) -> usize {
        self.header.header_size
    }

    pub fn body_data(&self) -> &'a [u8] {
        &self.data[self.header_size()..] // Safe-slice
    }
}

/// Iterates over a sequence of sibling boxes, yielding each box together
/// with its absolute offset.
///
/// The iteration ends after the first malformed or truncated box, which is
/// yielded as an `Err` describing the problem. Trailing zero bytes shorter
/// than a box header (QuickTime terminates some atom lists with a 32-bit
/// zero) end the iteration silently.
pub struct BoxIter<'a> {
    input: &'a [u8],
    remain: &'a [u8],
    base_offset: u64,
    done: bool,
}

impl<'a> BoxIter<'a> {
    pub fn new(input: &'a [u8], base_offset: u64) -> Self {
        Self {
            input,
            remain: input,
            base_offset,
            done: false,
        }
    }

    fn offset(&self) -> u64 {
        self.base_offset + (self.input.len() - self.remain.len()) as u64
    }
}

impl<'a> Iterator for BoxIter<'a> {
    type Item = Result<(u64, BoxHolder<'a>), String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.remain.is_empty() {
            return None;
        }

        let offset = self.offset();
        if self.remain.len() < 8 && self.remain.iter().all(|b| *b == 0) {
            self.done = true;
            return None;
        }

        let header = match BoxHeader::parse(self.remain) {
            Ok((_, header)) => header,
            Err(e) => {
                self.done = true;
                return Some(Err(crate::error::describe_parse_error(
                    e,
                    &format!("invalid box header at offset {offset}"),
                )));
            }
        };

        if header.box_size > self.remain.len() as u64 {
            self.done = true;
            return Some(Err(format!(
                "box '{}' at offset {offset} declares {} bytes but only {} remain",
                header.box_type,
                header.box_size,
                self.remain.len()
            )));
        }

        // box_size has been checked against remain.len() above
        let (data, remain) = self.remain.split_at(header.box_size as usize);
        self.remain = remain;

        Some(Ok((offset, BoxHolder { header, data })))
    }
}

/// Finds a box by its atom `path`, e.g. `"moov/trak/mdia/hdlr"`. The first
/// match is taken at every level, and `meta` boxes are entered at their
/// children whichever style they are.
pub fn find_box<'a>(input: &'a [u8], path: &str) -> Option<BoxHolder<'a>> {
    let mut data = input;
    let mut found = None;

    for box_type in path.split('/').filter(|t| !t.is_empty()) {
        let bbox = BoxIter::new(data, 0)
            .map_while(Result::ok)
            .map(|(_, b)| b)
            .find(|b| b.box_type() == box_type)?;
        data = if box_type == "meta" {
            meta_children(bbox.body_data())
        } else {
            bbox.body_data()
        };
        found = Some(bbox);
    }

    found
}

/// Returns the body of a `meta` box with its children only.
///
/// `moov/udta/meta` (iTunes style) is a full box with 4 bytes of version &
/// flags before its children, while `moov/meta` (QuickTime style) is a plain
/// box. Both start with a `hdlr` child, so probe for it.
pub(crate) fn meta_children(body: &[u8]) -> &[u8] {
    if body.len() >= 8 && &body[4..8] == b"hdlr" {
        body
    } else if body.len() >= 4 {
        &body[4..] // Safe-slice
    } else {
        body
    }
}

trait ParseBody<O> {
    fn parse_body(body: &[u8], header: FullBoxHeader) -> IResult<&[u8], O>;
}

pub trait ParseBox<O> {
    fn parse_box(input: &[u8]) -> IResult<&[u8], O>;
}

/// auto implements parse_box for each Box which implements ParseBody
impl<O, T: ParseBody<O>> ParseBox<O> for T {
    fn parse_box(input: &[u8]) -> IResult<&[u8], O> {
        let (remain, header) = FullBoxHeader::parse(input)?;

        // limit parsing size
        let body_len = (header.box_size - header.header_size as u64) as usize;
        let (remain, data) = complete::take(body_len)(remain)?;

        let box_type = header.box_type.clone();
        let (rem, bbox) = Self::parse_body(data, header)?;

        if !rem.is_empty() {
            // Some muxers pad leaf boxes, tolerate it.
            tracing::debug!(%box_type, trailing = rem.len(), "unparsed bytes in box body");
        }

        Ok((remain, bbox))
    }
}
