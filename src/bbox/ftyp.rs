use nom::{
    bytes::complete::take,
    combinator::map,
    multi::many0,
    number::complete::be_u32,
    sequence::tuple,
    IResult,
};

#[cfg(feature = "json_dump")]
use serde::Serialize;

use crate::utils::fourcc;

use super::BoxHeader;

/// Represents a [file type compatibility atom][1].
///
/// ftyp is not a fullbox, it doesn't have version & flags.
///
/// atom-path: ftyp
///
/// [1]: https://developer.apple.com/documentation/quicktime-file-format/file_type_compatibility_atom
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json_dump", derive(Serialize))]
pub struct FtypBox {
    pub major_brand: String,
    pub minor_version: u32,
    pub compatible_brands: Vec<String>,
}

impl FtypBox {
    pub fn parse_box(input: &[u8]) -> IResult<&[u8], FtypBox> {
        let (remain, header) = BoxHeader::parse(input)?;
        let (remain, body) = take(header.body_size())(remain)?;
        let (_, ftyp) = Self::parse_body(body)?;
        Ok((remain, ftyp))
    }

    pub fn parse_body(body: &[u8]) -> IResult<&[u8], FtypBox> {
        let (remain, (major_brand, minor_version)) =
            tuple((map(take(4_usize), fourcc), be_u32))(body)?;

        // A trailing partial brand is ignored.
        let (remain, compatible_brands) = many0(map(take(4_usize), fourcc))(remain)?;

        Ok((
            remain,
            FtypBox {
                major_brand,
                minor_version,
                compatible_brands,
            },
        ))
    }

    pub fn is_quicktime(&self) -> bool {
        self.major_brand == "qt  "
    }
}
