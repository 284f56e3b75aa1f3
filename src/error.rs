use std::io;
use thiserror::Error;

type FallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Hard errors. Malformed content never ends up here: the walkers record it
/// in the `errors` list of their result instead. Only failures to obtain the
/// bytes in the first place (I/O), or a failed format detection in
/// [`crate::parse_media`], are returned as `Err`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io error; {0}")]
    Io(#[from] io::Error),

    #[error("parse failed; {0}")]
    ParseFailed(FallbackError),

    #[error("unrecognized file format")]
    UnrecognizedFileFormat,
}

use Error::*;

impl From<String> for Error {
    fn from(src: String) -> Error {
        ParseFailed(src.into())
    }
}

impl From<&str> for Error {
    fn from(src: &str) -> Error {
        src.to_string().into()
    }
}

impl From<nom::Err<nom::error::Error<&[u8]>>> for crate::Error {
    fn from(e: nom::Err<nom::error::Error<&[u8]>>) -> Self {
        convert_parse_error(e, "")
    }
}

pub(crate) fn convert_parse_error(e: nom::Err<nom::error::Error<&[u8]>>, message: &str) -> Error {
    describe_parse_error(e, message).into()
}

/// Renders a nom error as a soft-error string, e.g. `"mvhd: Parsing requires
/// 4 bytes/chars"`.
pub(crate) fn describe_parse_error(e: nom::Err<nom::error::Error<&[u8]>>, message: &str) -> String {
    let reason = match e {
        nom::Err::Incomplete(_) => e.to_string(),
        nom::Err::Error(e) | nom::Err::Failure(e) => e.code.description().to_string(),
    };

    if message.is_empty() {
        reason
    } else {
        format!("{message}: {reason}")
    }
}
