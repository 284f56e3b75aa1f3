use nom::{
    bytes::complete::take,
    combinator::{fail, map, map_res, rest},
    multi::{count, length_value},
    number::complete::be_u32,
    sequence::tuple,
    IResult,
};

use crate::{
    bbox::{FullBoxHeader, ParseBody},
    utils::fourcc,
};

/// QuickTime `keys` atom (`moov/meta/keys`), the key table `ilst` items
/// refer to by 1-based index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeysBox {
    pub entries: Vec<KeyEntry>,
}

impl KeysBox {
    pub fn key(&self, index: u32) -> Option<&str> {
        let idx = usize::try_from(index.checked_sub(1)?).ok()?;
        self.entries.get(idx).map(|e| e.key.as_str())
    }
}

impl ParseBody<KeysBox> for KeysBox {
    fn parse_body(body: &[u8], _: FullBoxHeader) -> IResult<&[u8], KeysBox> {
        let (remain, n) = be_u32(body)?;
        // every entry takes at least 8 bytes
        if n as usize > remain.len() / 8 {
            return fail(remain);
        }
        map(count(KeyEntry::parse, n as usize), |entries| KeysBox {
            entries,
        })(remain)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyEntry {
    /// e.g. `mdta`
    pub namespace: String,
    pub key: String,
}

impl KeyEntry {
    /// size (including itself), namespace, key
    fn parse(input: &[u8]) -> IResult<&[u8], KeyEntry> {
        let entry_len = map_res(be_u32, |size: u32| {
            size.checked_sub(4).ok_or("key entry too short")
        });
        length_value(entry_len, Self::parse_entry)(input)
    }

    fn parse_entry(entry: &[u8]) -> IResult<&[u8], KeyEntry> {
        let (rem, (namespace, key)) = tuple((
            map(take(4_usize), fourcc),
            map_res(rest, |bs: &[u8]| String::from_utf8(bs.to_vec())),
        ))(entry)?;
        Ok((rem, KeyEntry { namespace, key }))
    }
}
