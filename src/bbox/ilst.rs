use nom::bytes::complete::take;
use nom::combinator::rest;
use nom::number::complete::{
    be_f32, be_f64, be_i16, be_i24, be_i32, be_i64, be_u16, be_u24, be_u32, be_u64, u8,
};
use nom::sequence::tuple;

use crate::EntryValue;

use super::{BoxIter, KeysBox};

/// Represents an [item list atom][1].
///
/// ilst is not a fullbox, it doesn't have version & flags.
///
/// Each child is an item whose box type is either an iTunes tag such as
/// `©nam`, or (QuickTime metadata) a 1-based index into the sibling
/// [`KeysBox`].
///
/// atom-path: moov/meta/ilst, moov/udta/meta/ilst
///
/// [1]: https://developer.apple.com/documentation/quicktime-file-format/metadata_item_list_atom
#[derive(Debug, Clone, PartialEq)]
pub struct IlstBox {
    pub items: Vec<IlstItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IlstItem {
    /// The item atom type, e.g. `©nam`, `trkn`, `----`.
    pub tag: String,
    /// The same four bytes read as a big-endian index, for `keys` lookups.
    pub index: u32,

    /// Type indicator, see [type
    /// indicator](https://developer.apple.com/documentation/quicktime-file-format/type_indicator)
    pub type_set: u8,
    pub type_code: u32, // 24-bits

    pub locale: u32,
    pub value: EntryValue,

    /// `mean` & `name` of a freeform (`----`) item.
    pub freeform: Option<(String, String)>,
}

impl IlstItem {
    /// Returns the metadata key of this item: the QuickTime key if `keys`
    /// resolves the item index, the freeform `----:mean:name` key, a
    /// friendly name for well-known iTunes tags, or the raw tag.
    pub fn key(&self, keys: Option<&KeysBox>) -> String {
        if let Some(k) = keys.and_then(|keys| keys.key(self.index)) {
            return k.to_owned();
        }
        if let Some((mean, name)) = &self.freeform {
            return format!("----:{mean}:{name}");
        }
        itunes_tag_name(&self.tag)
            .map(str::to_owned)
            .unwrap_or_else(|| self.tag.clone())
    }
}

impl IlstBox {
    /// Parses the body of an `ilst` box. Malformed items are reported in the
    /// returned error list, the remaining items are still parsed.
    pub fn parse_body(body: &[u8], base_offset: u64) -> (IlstBox, Vec<String>) {
        let mut items = Vec::new();
        let mut errors = Vec::new();

        for item in BoxIter::new(body, base_offset) {
            let (offset, bbox) = match item {
                Ok(x) => x,
                Err(e) => {
                    errors.push(format!("ilst: {e}"));
                    break;
                }
            };

            match IlstItem::parse(bbox.box_type(), bbox.data, bbox.body_data(), offset) {
                Ok(item) => items.push(item),
                Err(e) => errors.push(format!("ilst: item '{}': {e}", bbox.box_type())),
            }
        }

        (IlstBox { items }, errors)
    }
}

impl IlstItem {
    fn parse(tag: &str, data: &[u8], body: &[u8], offset: u64) -> Result<IlstItem, String> {
        // data[..4] is the size, data[4..8] is the type/index
        let index = data
            .get(4..8)
            .map(|bs| u32::from_be_bytes([bs[0], bs[1], bs[2], bs[3]]))
            .unwrap_or_default();

        let mut mean = None;
        let mut name = None;
        let mut value = None;

        for child in BoxIter::new(body, offset + 8) {
            let (_, child) = child?;
            match child.box_type() {
                // full boxes: skip version & flags
                "mean" => mean = child.body_data().get(4..).map(lossy),
                "name" => name = child.body_data().get(4..).map(lossy),
                "data" if value.is_none() => {
                    let (_, (type_set, type_code, locale, payload)) =
                        tuple((u8, be_u24, be_u32, rest))(child.body_data()).map_err(
                            |e: nom::Err<nom::error::Error<&[u8]>>| {
                                crate::error::describe_parse_error(e, "invalid data atom")
                            },
                        )?;
                    let v = parse_value(tag, type_code, payload)?;
                    value = Some((type_set, type_code, locale, v));
                }
                _ => (),
            }
        }

        let Some((type_set, type_code, locale, value)) = value else {
            return Err("no data atom".to_owned());
        };

        Ok(IlstItem {
            tag: tag.to_owned(),
            index,
            type_set,
            type_code,
            locale,
            value,
            freeform: mean.zip(name),
        })
    }
}

fn lossy(data: &[u8]) -> String {
    String::from_utf8_lossy(data).into_owned()
}

/// Parse ilst item data to value, see [Well-known
/// types](https://developer.apple.com/documentation/quicktime-file-format/well-known_types)
fn parse_value(tag: &str, type_code: u32, data: &[u8]) -> Result<EntryValue, String> {
    use EntryValue::*;
    let invalid = |e: nom::Err<nom::error::Error<&[u8]>>| e.to_string();
    let v = match type_code {
        // implicit: track/disk numbers are stored as binary
        0 if tag == "trkn" || tag == "disk" => {
            let (_, (_, number, total)) =
                tuple((take(2_usize), be_u16, be_u16))(data).map_err(invalid)?;
            if total > 0 {
                Text(format!("{number}/{total}"))
            } else {
                Text(number.to_string())
            }
        }
        1 => Text(String::from_utf8(data.to_vec()).map_err(|e| e.to_string())?),
        21 => match data.len() {
            1 => (data[0] as i8).into(),
            2 => be_i16(data).map_err(invalid)?.1.into(),
            3 => be_i24(data).map_err(invalid)?.1.into(),
            4 => be_i32(data).map_err(invalid)?.1.into(),
            8 => be_i64(data).map_err(invalid)?.1.into(),
            x => {
                return Err(format!(
                    "data type is BE Signed Integer while data len is : {x}"
                ));
            }
        },
        22 => match data.len() {
            1 => data[0].into(),
            2 => be_u16(data).map_err(invalid)?.1.into(),
            3 => be_u24(data).map_err(invalid)?.1.into(),
            4 => be_u32(data).map_err(invalid)?.1.into(),
            8 => be_u64(data).map_err(invalid)?.1.into(),
            x => {
                return Err(format!(
                    "data type is BE Unsigned Integer while data len is : {x}"
                ));
            }
        },
        23 => be_f32(data).map_err(invalid)?.1.into(),
        24 => be_f64(data).map_err(invalid)?.1.into(),
        _ => Undefined(data.to_vec()),
    };
    Ok(v)
}

fn itunes_tag_name(tag: &str) -> Option<&'static str> {
    let name = match tag {
        "\u{a9}nam" => "title",
        "\u{a9}ART" => "artist",
        "aART" => "album_artist",
        "\u{a9}alb" => "album",
        "\u{a9}day" => "year",
        "\u{a9}gen" | "gnre" => "genre",
        "\u{a9}wrt" => "composer",
        "\u{a9}cmt" => "comment",
        "\u{a9}too" => "encoder",
        "\u{a9}lyr" => "lyrics",
        "\u{a9}grp" => "grouping",
        "trkn" => "track_number",
        "disk" => "disc_number",
        "tmpo" => "tempo",
        "cpil" => "compilation",
        "covr" => "cover_art",
        "cprt" => "copyright",
        "desc" => "description",
        "ldes" => "long_description",
        "tvsh" => "tv_show",
        "stik" => "media_type",
        _ => return None,
    };
    Some(name)
}
