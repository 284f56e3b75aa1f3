//! mediawalk is a container metadata parsing library written in pure Rust
//! with [nom](https://github.com/rust-bakery/nom). It walks the structure of
//! ISOBMFF (mp4/mov/3gp/m4a), AIFF/AIFF-C and GIF/APNG files and reports
//! what it finds, without decoding any samples or pixels.
//!
//! ## Key Features
//!
//! - Format auto-detecting: [`parse_media`] sniffs the magic bytes of a file
//!   and dispatches to the right walker, no need to check file extensions.
//!
//! - Best effort: a truncated or partly malformed file still yields
//!   everything that could be decoded before the problem. Problems are
//!   collected in the `errors` list of each result, in the order they were
//!   encountered. `Err` is only returned when the input can't be read at
//!   all (or, for [`parse_media`], when its format is not recognized).
//!
//! - Minimize I/O operations: ISOBMFF and AIFF files are walked header
//!   first, and big payloads such as `mdat` or `SSND` are skipped by `Seek`
//!   rather than read.
//!
//! - Deterministic: every map in a result is a `BTreeMap`, so parsing the
//!   same bytes twice gives the same result (and the same JSON).
//!
//! ## Supported File Types
//!
//! - ISO base media file format (ISOBMFF): *.mp4, *.mov, *.3gp, *.m4a, etc.
//! - *.aif, *.aiff, *.aifc
//! - *.gif
//! - *.png, *.apng
//!
//! ## Usage
//!
//! ```rust
//! use mediawalk::*;
//!
//! fn main() -> Result<()> {
//!     // A 1x1 GIF without any image: header, screen descriptor, trailer.
//!     let buf = b"GIF89a\x01\x00\x01\x00\x00\x00\x00;";
//!
//!     let meta = parse_media_bytes(buf)?;
//!     assert_eq!(meta.format_name(), "GIF");
//!     assert!(meta.errors().is_empty());
//!
//!     let MediaMetadata::Gif(gif) = meta else {
//!         unreachable!()
//!     };
//!     assert_eq!((gif.width, gif.height), (1, 1));
//!     assert_eq!(gif.total_frames, 0);
//!     assert!(!gif.is_animated);
//!     Ok(())
//! }
//! ```
//!
//! When the format is known beforehand, the walkers can be called directly:
//!
//! ```rust
//! use mediawalk::*;
//!
//! let mut buf = Vec::new();
//! buf.extend(b"\x00\x00\x00\x14ftypisom\x00\x00\x02\x00isom");
//! buf.extend(b"\x00\x00\x00\x08moov");
//!
//! let meta = parse_mp4_bytes(&buf);
//! assert!(meta.errors.is_empty());
//! assert_eq!(meta.format, "MP4");
//! assert_eq!(meta.ftyp.unwrap().major_brand, "isom");
//! assert_eq!(meta.atoms["movie"].offset, 20);
//! ```
//!
//! ## Async API Usage
//!
//! Enable `async` feature flag for mediawalk in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! mediawalk = { version = "0.1", features = ["async"] }
//! ```
//!
//! [`parse_media_async`] runs the same header-first walk as [`parse_media`]
//! on tokio's blocking thread pool.
//!
//! ## JSON
//!
//! With the `json_dump` feature, every result implements
//! `serde::Serialize`.

pub use aiff::{
    compression_name, parse_aiff, parse_aiff_bytes, parse_aiff_reader, AiffMetadata, ChunkInfo,
    Comment, CommonChunk, InstrumentChunk, Loop, Marker, SoundData,
};
pub use bbox::{
    find_box, BoxHeader, BoxHolder, BoxIter, FtypBox, HdlrBox, IlstItem, KeysBox, MdhdBox,
    MvhdBox, SampleEntry, TkhdBox,
};
pub use gif::{parse_gif, parse_gif_bytes, GifFrame, GifMetadata};
pub use mov::{
    parse_mp4, parse_mp4_bytes, parse_mp4_reader, AtomInfo, Mp4Metadata, TrackInfo, TrackKind,
};
pub use png::{parse_apng, parse_apng_bytes, ApngFrame, ApngMetadata};

#[cfg(feature = "async")]
pub use file::parse_media_async;
pub use file::{parse_media, parse_media_bytes, MediaFormat, MediaMetadata};

pub use values::EntryValue;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;

mod aiff;
mod bbox;
mod error;
mod file;
mod gif;
mod loader;
mod mov;
mod png;
mod utils;
mod values;

#[cfg(test)]
mod testkit;
