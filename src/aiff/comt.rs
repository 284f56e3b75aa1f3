use std::io::Cursor;

use bytes::Buf;
use chrono::{DateTime, Utc};

#[cfg(feature = "json_dump")]
use serde::Serialize;

use crate::utils::{latin1_string, mac_epoch_to_utc};

/// One entry of a `COMT` chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json_dump", derive(Serialize))]
pub struct Comment {
    pub timestamp: Option<DateTime<Utc>>,
    /// 0 if the comment is not linked to a marker.
    pub marker_id: u16,
    pub text: String,
}

pub(crate) fn parse_comments(body: &[u8]) -> (Vec<Comment>, Option<String>) {
    let mut buf = Cursor::new(body);
    let mut comments = Vec::new();

    if buf.remaining() < 2 {
        return (comments, Some("COMT: missing comment count".to_owned()));
    }
    let count = buf.get_u16();

    for i in 0..count {
        if buf.remaining() < 8 {
            return (comments, Some(format!("COMT: comment #{i} is truncated")));
        }
        let timestamp = mac_epoch_to_utc(buf.get_u32() as u64);
        let marker_id = buf.get_u16();
        let len = buf.get_u16() as usize;
        if buf.remaining() < len {
            return (comments, Some(format!("COMT: text of comment #{i} is truncated")));
        }
        let text = latin1_string(&buf.copy_to_bytes(len));
        if len % 2 == 1 && buf.has_remaining() {
            buf.advance(1);
        }

        comments.push(Comment {
            timestamp,
            marker_id,
            text,
        });
    }

    (comments, None)
}
