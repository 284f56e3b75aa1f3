use std::io::Cursor;

use bytes::Buf;

#[cfg(feature = "json_dump")]
use serde::Serialize;

use crate::utils::latin1_string;

/// One entry of a `MARK` chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json_dump", derive(Serialize))]
pub struct Marker {
    pub id: u16,
    /// Sample frame the marker points at.
    pub position: u32,
    pub name: String,
}

/// Parses the marker list of a `MARK` chunk. On truncation the markers read
/// so far are returned together with an error.
pub(crate) fn parse_markers(body: &[u8]) -> (Vec<Marker>, Option<String>) {
    let mut buf = Cursor::new(body);
    let mut markers = Vec::new();

    if buf.remaining() < 2 {
        return (markers, Some("MARK: missing marker count".to_owned()));
    }
    let count = buf.get_u16();

    for i in 0..count {
        if buf.remaining() < 7 {
            return (markers, Some(format!("MARK: marker #{i} is truncated")));
        }
        let id = buf.get_u16();
        let position = buf.get_u32();
        let len = buf.get_u8() as usize;
        if buf.remaining() < len {
            return (markers, Some(format!("MARK: name of marker #{i} is truncated")));
        }
        let name = latin1_string(&buf.copy_to_bytes(len));

        // count byte + text is padded to an even length
        if len % 2 == 0 && buf.has_remaining() {
            buf.advance(1);
        }

        markers.push(Marker { id, position, name });
    }

    (markers, None)
}
