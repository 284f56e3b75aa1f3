use std::fmt::Display;

use chrono::{DateTime, Utc};

#[cfg(feature = "json_dump")]
use serde::{Serialize, Serializer};

/// Represent a parsed metadata value, e.g. the payload of an `ilst` item or
/// an AIFF text chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryValue {
    Text(String),

    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),

    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),

    F32(f32),
    F64(f64),

    Time(DateTime<Utc>),
    Undefined(Vec<u8>),
}

impl EntryValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            EntryValue::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            EntryValue::Time(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns any unsigned integer variant widened to `u64`.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            EntryValue::U8(v) => Some(*v as u64),
            EntryValue::U16(v) => Some(*v as u64),
            EntryValue::U32(v) => Some(*v as u64),
            EntryValue::U64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns any signed integer variant widened to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            EntryValue::I8(v) => Some(*v as i64),
            EntryValue::I16(v) => Some(*v as i64),
            EntryValue::I32(v) => Some(*v as i64),
            EntryValue::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            EntryValue::F32(v) => Some(*v as f64),
            EntryValue::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// Raw bytes of an item whose type is not decoded.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            EntryValue::Undefined(v) => Some(v),
            _ => None,
        }
    }
}

#[cfg(feature = "json_dump")]
impl Serialize for EntryValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl Display for EntryValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryValue::Text(v) => f.write_str(v),
            EntryValue::U8(v) => v.fmt(f),
            EntryValue::U16(v) => v.fmt(f),
            EntryValue::U32(v) => v.fmt(f),
            EntryValue::U64(v) => v.fmt(f),
            EntryValue::I8(v) => v.fmt(f),
            EntryValue::I16(v) => v.fmt(f),
            EntryValue::I32(v) => v.fmt(f),
            EntryValue::I64(v) => v.fmt(f),
            EntryValue::F32(v) => v.fmt(f),
            EntryValue::F64(v) => v.fmt(f),
            EntryValue::Time(v) => f.write_str(&v.to_rfc3339()),
            // at most 16 bytes, as hex
            EntryValue::Undefined(v) => {
                f.write_str("Undefined[")?;
                for (i, b) in v.iter().take(16).enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "0x{b:02x}")?;
                }
                if v.len() > 16 {
                    f.write_str(" ...")?;
                }
                f.write_str("]")
            }
        }
    }
}

macro_rules! impl_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for EntryValue {
                fn from(value: $t) -> Self {
                    EntryValue::$variant(value)
                }
            }
        )*
    };
}

impl_from! {
    u8 => U8, u16 => U16, u32 => U32, u64 => U64,
    i8 => I8, i16 => I16, i32 => I32, i64 => I64,
    f32 => F32, f64 => F64,
    String => Text,
    DateTime<Utc> => Time,
    Vec<u8> => Undefined,
}

impl From<&str> for EntryValue {
    fn from(value: &str) -> Self {
        EntryValue::Text(value.to_owned())
    }
}
