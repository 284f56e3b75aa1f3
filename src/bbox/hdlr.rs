use nom::{
    bytes::complete::take,
    combinator::{map, rest},
    number::complete::be_u32,
    sequence::tuple,
};

#[cfg(feature = "json_dump")]
use serde::Serialize;

use crate::utils::fourcc;

use super::{FullBoxHeader, ParseBody};

/// Represents a [handler reference atom][1].
///
/// atom-path: moov/trak/mdia/hdlr, moov/meta/hdlr
///
/// [1]: https://developer.apple.com/documentation/quicktime-file-format/handler_reference_atom
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json_dump", derive(Serialize))]
pub struct HdlrBox {
    /// e.g. `vide`, `soun`, `text`, `meta`, `mdir`.
    pub handler_type: String,
    pub name: String,
}

impl ParseBody<HdlrBox> for HdlrBox {
    fn parse_body(body: &[u8], _: FullBoxHeader) -> nom::IResult<&[u8], HdlrBox> {
        let (remain, (_, handler_type, _, name)) = tuple((
            be_u32,
            map(take(4_usize), fourcc),
            take(12_usize),
            map(rest, parse_name),
        ))(body)?;

        Ok((remain, HdlrBox { handler_type, name }))
    }
}

/// ISOBMFF stores a NUL terminated UTF-8 string, while QuickTime stores a
/// Pascal string (a leading length byte).
fn parse_name(data: &[u8]) -> String {
    let data = match data.split_first() {
        Some((&len, text)) if len as usize == text.len() && !text.is_empty() => text,
        _ => data,
    };
    let end = data.iter().position(|b| *b == 0).unwrap_or(data.len());
    String::from_utf8_lossy(&data[..end]).into_owned() // Safe-slice
}
