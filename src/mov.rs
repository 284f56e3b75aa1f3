use std::{
    collections::BTreeMap,
    io::{Cursor, Read, Seek},
    path::Path,
};

use chrono::{DateTime, Utc};

#[cfg(feature = "json_dump")]
use serde::Serialize;

use crate::{
    bbox::{
        duration_seconds, is_container, meta_children, BoxHeader, BoxHolder, BoxIter, FtypBox,
        HdlrBox, IlstBox, KeysBox, MdhdBox, MvhdBox, ParseBox, SampleEntry, StsdBox, TkhdBox,
        MAX_BOX_DEPTH,
    },
    error::describe_parse_error,
    loader::{open_file, RecordReader, MAX_BODY_LEN},
    utils::latin1_string,
    EntryValue,
};

/// Top level boxes whose body is loaded and decoded, everything else (e.g.
/// `mdat`) is skipped.
const DECODED_TOP_LEVEL: &[&str] = &["ftyp", "moov", "meta", "udta"];

/// Metadata extracted from an ISOBMFF (MP4/MOV/3GP/M4A) file.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "json_dump", derive(Serialize))]
pub struct Mp4Metadata {
    pub file: String,
    /// "MP4", "QuickTime" or "3GPP", derived from the major brand.
    pub format: String,
    pub file_size: u64,
    pub ftyp: Option<FtypBox>,
    /// Position of the `moov` box.
    pub moov: Option<AtomInfo>,
    pub movie_header: Option<MvhdBox>,
    pub tracks: Vec<TrackInfo>,
    /// `ilst` items and `udta` text entries.
    pub metadata: BTreeMap<String, EntryValue>,
    /// Top level boxes, keyed by a readable name (`file_type`, `movie`,
    /// `media_data`, ...).
    pub atoms: BTreeMap<String, AtomInfo>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json_dump", derive(Serialize))]
pub struct AtomInfo {
    pub box_type: String,
    /// Including the header.
    pub size: u64,
    pub offset: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "json_dump", derive(Serialize))]
#[cfg_attr(feature = "json_dump", serde(rename_all = "lowercase"))]
pub enum TrackKind {
    Video,
    Audio,
    Text,
    Metadata,
    #[default]
    Other,
}

impl TrackKind {
    fn from_handler(handler_type: &str) -> Self {
        match handler_type {
            "vide" => TrackKind::Video,
            "soun" => TrackKind::Audio,
            "text" | "sbtl" | "subt" | "clcp" => TrackKind::Text,
            "meta" | "mdta" => TrackKind::Metadata,
            _ => TrackKind::Other,
        }
    }
}

/// Track information assembled from `tkhd`, `mdhd`, `hdlr` & `stsd`.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "json_dump", derive(Serialize))]
pub struct TrackInfo {
    pub track_id: u32,
    pub kind: TrackKind,
    pub handler_type: Option<String>,
    pub handler_name: Option<String>,
    /// Four character code of the first sample description, e.g. `avc1`.
    pub codec: Option<String>,
    pub enabled: bool,
    pub creation_time: Option<DateTime<Utc>>,
    pub modification_time: Option<DateTime<Utc>>,
    /// Media time scale (or the movie time scale when there is no `mdhd`).
    pub timescale: u32,
    pub duration: u64,
    pub duration_seconds: f64,
    pub language: Option<String>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub volume: Option<f64>,
    pub channel_count: Option<u16>,
    pub sample_size: Option<u16>,
    pub sample_rate: Option<f64>,
    pub sample_entries: Vec<SampleEntry>,
}

impl Mp4Metadata {
    fn with_error(e: crate::Error) -> Self {
        Mp4Metadata {
            errors: vec![e.to_string()],
            ..Default::default()
        }
    }

    fn add_atom(&mut self, header: &BoxHeader, offset: u64) {
        let name = atom_name(&header.box_type);
        let mut key = name.to_owned();
        let mut n = 1;
        while self.atoms.contains_key(&key) {
            n += 1;
            key = format!("{name}_{n}");
        }
        self.atoms.insert(
            key,
            AtomInfo {
                box_type: header.box_type.clone(),
                size: header.box_size,
                offset,
            },
        );
    }

    fn error(&mut self, msg: String) {
        tracing::warn!(error = %msg, "mp4");
        self.errors.push(msg);
    }
}

/// Readable names of well-known top level boxes.
fn atom_name(box_type: &str) -> &str {
    match box_type {
        "ftyp" => "file_type",
        "moov" => "movie",
        "mdat" => "media_data",
        "moof" => "movie_fragment",
        "mfra" => "movie_fragment_random_access",
        "pdin" => "progressive_download_info",
        "sidx" => "segment_index",
        "styp" => "segment_type",
        other => other,
    }
}

/// Parses the ISOBMFF file at `path`.
///
/// Never fails: if the file can't be read, the returned metadata only
/// carries the error.
pub fn parse_mp4<P: AsRef<Path>>(path: P) -> Mp4Metadata {
    let path = path.as_ref();
    let mut meta = open_file(path)
        .map_err(crate::Error::from)
        .and_then(parse_mp4_reader)
        .unwrap_or_else(Mp4Metadata::with_error);
    meta.file = path.display().to_string();
    meta
}

/// Parses an in-memory ISOBMFF file.
pub fn parse_mp4_bytes(input: &[u8]) -> Mp4Metadata {
    parse_mp4_reader(Cursor::new(input)).unwrap_or_else(Mp4Metadata::with_error)
}

/// Walks the top level boxes of `reader` header-first. Box bodies that are
/// not needed for metadata (e.g. `mdat`) are skipped by `Seek`.
///
/// Only I/O failures are returned as `Err`; malformed content is reported in
/// [`Mp4Metadata::errors`].
#[tracing::instrument(skip_all)]
pub fn parse_mp4_reader<R: Read + Seek>(reader: R) -> crate::Result<Mp4Metadata> {
    let mut reader = RecordReader::new(reader)?;
    let mut meta = Mp4Metadata {
        file_size: reader.len(),
        // headerless QuickTime files start with `wide`/`mdat`/`moov`
        format: "QuickTime".to_owned(),
        ..Default::default()
    };

    while reader.remaining() >= 8 {
        let offset = reader.position();
        let available = reader.remaining();

        let mut head = reader.read_vec(8)?;
        if head[..4] == [0, 0, 0, 1] {
            if available < 16 {
                meta.error(format!(
                    "box at offset {offset} has a 64-bit size but the file ends"
                ));
                break;
            }
            head.extend(reader.read_vec(8)?);
        }

        let header = match BoxHeader::parse_sized(&head, available) {
            Ok((_, header)) => header,
            Err(e) => {
                meta.error(describe_parse_error(
                    e,
                    &format!("invalid box header at offset {offset}"),
                ));
                break;
            }
        };
        tracing::debug!(?header.box_type, ?header.box_size, offset, "Got");

        meta.add_atom(&header, offset);

        if header.box_size > available {
            meta.error(format!(
                "box '{}' at offset {offset} declares {} bytes but only {available} remain",
                header.box_type, header.box_size
            ));
            break;
        }

        let body_size = header.body_size();
        if !DECODED_TOP_LEVEL.contains(&header.box_type.as_str()) {
            reader.skip(body_size)?;
            continue;
        }
        if body_size > MAX_BODY_LEN {
            meta.error(format!(
                "box '{}' at offset {offset} is too big to decode: {body_size}",
                header.box_type
            ));
            reader.skip(body_size)?;
            continue;
        }

        // body_size <= MAX_BODY_LEN
        let body = reader.read_vec(body_size as usize)?;
        let body_offset = offset + header.header_size as u64;
        MovWalker::new(&mut meta).visit_top_level(&header, &body, body_offset);
    }

    if reader.remaining() > 0 {
        tracing::debug!(trailing = reader.remaining(), "ignore trailing bytes");
    }

    Ok(meta)
}

/// Decodes the boxes below a top level box into a [`Mp4Metadata`].
struct MovWalker<'m> {
    meta: &'m mut Mp4Metadata,
    track: Option<TrackInfo>,
    depth: usize,
}

impl<'m> MovWalker<'m> {
    fn new(meta: &'m mut Mp4Metadata) -> Self {
        Self {
            meta,
            track: None,
            depth: 0,
        }
    }

    fn visit_top_level(&mut self, header: &BoxHeader, body: &[u8], body_offset: u64) {
        let offset = body_offset - header.header_size as u64;
        match header.box_type.as_str() {
            "ftyp" => match FtypBox::parse_body(body) {
                Ok((_, ftyp)) => {
                    self.meta.format = brand_format(&ftyp).to_owned();
                    self.meta.ftyp = Some(ftyp);
                }
                Err(e) => self.meta.error(describe_parse_error(e, "ftyp")),
            },
            "moov" => {
                self.meta.moov = Some(AtomInfo {
                    box_type: header.box_type.clone(),
                    size: header.box_size,
                    offset,
                });
                self.walk(body, body_offset, "moov");
            }
            "meta" => self.visit_meta(body, body_offset, "meta"),
            "udta" => self.walk(body, body_offset, "udta"),
            _ => (),
        }
    }

    /// Walks a sequence of sibling boxes. A malformed box ends the sequence,
    /// boxes decoded before it are kept.
    fn walk(&mut self, input: &[u8], base_offset: u64, path: &str) {
        if self.depth >= MAX_BOX_DEPTH {
            self.meta.error(format!("{path}: boxes nested too deeply"));
            return;
        }

        self.depth += 1;
        for item in BoxIter::new(input, base_offset) {
            match item {
                Ok((offset, bbox)) => self.visit(&bbox, offset, path),
                Err(e) => {
                    self.meta.error(format!("{path}: {e}"));
                    break;
                }
            }
        }
        self.depth -= 1;
    }

    fn visit(&mut self, bbox: &BoxHolder, offset: u64, parent: &str) {
        let box_type = bbox.box_type();
        let path = format!("{parent}/{box_type}");
        let body_offset = offset + bbox.header_size() as u64;
        tracing::debug!(%path, size = bbox.box_size(), offset, "visit");

        match box_type {
            "mvhd" => match MvhdBox::parse_box(bbox.data) {
                Ok((_, mvhd)) => self.meta.movie_header = Some(mvhd),
                Err(e) => self.meta.error(describe_parse_error(e, &path)),
            },
            "trak" => {
                let outer = self.track.replace(TrackInfo::default());
                self.walk(bbox.body_data(), body_offset, &path);
                if let Some(track) = self.track.take() {
                    let track = self.finish_track(track);
                    self.meta.tracks.push(track);
                }
                self.track = outer;
            }
            "tkhd" => match TkhdBox::parse_box(bbox.data) {
                Ok((_, tkhd)) => self.with_track(|t| apply_tkhd(t, tkhd)),
                Err(e) => self.meta.error(describe_parse_error(e, &path)),
            },
            "mdhd" => match MdhdBox::parse_box(bbox.data) {
                Ok((_, mdhd)) => self.with_track(|t| apply_mdhd(t, mdhd)),
                Err(e) => self.meta.error(describe_parse_error(e, &path)),
            },
            "hdlr" if parent.ends_with("mdia") => match HdlrBox::parse_box(bbox.data) {
                Ok((_, hdlr)) => self.with_track(|t| {
                    t.kind = TrackKind::from_handler(&hdlr.handler_type);
                    t.handler_type = Some(hdlr.handler_type);
                    t.handler_name = Some(hdlr.name).filter(|s| !s.is_empty());
                }),
                Err(e) => self.meta.error(describe_parse_error(e, &path)),
            },
            "stsd" => match StsdBox::parse_box(bbox.data) {
                Ok((_, stsd)) => self.with_track(|t| t.sample_entries = stsd.entries),
                Err(e) => self.meta.error(describe_parse_error(e, &path)),
            },
            "meta" => self.visit_meta(bbox.body_data(), body_offset, &path),
            // ilst outside of a meta box has no keys
            "ilst" => self.visit_ilst(bbox.body_data(), body_offset, None),
            t if parent.ends_with("udta") && t.starts_with('\u{a9}') => {
                self.meta.metadata.insert(
                    format!("udta.{t}"),
                    EntryValue::Text(parse_udta_text(bbox.body_data())),
                );
            }
            t if is_container(t) => self.walk(bbox.body_data(), body_offset, &path),
            _ => (),
        }
    }

    fn visit_meta(&mut self, body: &[u8], body_offset: u64, path: &str) {
        let children = meta_children(body);
        let children_offset = body_offset + (body.len() - children.len()) as u64;

        let mut keys = None;
        let mut ilst = None;
        for item in BoxIter::new(children, children_offset) {
            match item {
                Ok((offset, bbox)) if bbox.box_type() == "keys" => {
                    match KeysBox::parse_box(bbox.data) {
                        Ok((_, k)) => keys = Some(k),
                        Err(e) => {
                            let e = describe_parse_error(e, &format!("{path}/keys"));
                            self.meta.error(e);
                        }
                    }
                    tracing::debug!(offset, "keys");
                }
                Ok((offset, bbox)) if bbox.box_type() == "ilst" => {
                    ilst = Some((offset + bbox.header_size() as u64, bbox.body_data()));
                }
                Ok(_) => (),
                Err(e) => {
                    self.meta.error(format!("{path}: {e}"));
                    break;
                }
            }
        }

        // `keys` may follow `ilst`, so items are resolved after the walk.
        if let Some((offset, body)) = ilst {
            self.visit_ilst(body, offset, keys.as_ref());
        }
    }

    fn visit_ilst(&mut self, body: &[u8], body_offset: u64, keys: Option<&KeysBox>) {
        let (ilst, errors) = IlstBox::parse_body(body, body_offset);
        for e in errors {
            self.meta.error(e);
        }
        for item in ilst.items {
            let key = item.key(keys);
            self.meta.metadata.insert(key, item.value);
        }
    }

    fn with_track<F: FnOnce(&mut TrackInfo)>(&mut self, f: F) {
        match self.track.as_mut() {
            Some(track) => f(track),
            None => tracing::debug!("track box outside of trak, ignored"),
        }
    }

    fn finish_track(&self, mut track: TrackInfo) -> TrackInfo {
        // no mdhd: the tkhd duration is in the movie time scale
        if track.timescale == 0 {
            if let Some(mvhd) = self.meta.movie_header.as_ref() {
                track.timescale = mvhd.timescale;
                track.duration_seconds = duration_seconds(track.duration, mvhd.timescale);
            }
        }

        if let Some(entry) = track.sample_entries.first() {
            track.codec = Some(entry.codec.clone());
            if entry.is_audio() {
                track.channel_count = entry.channel_count;
                track.sample_size = entry.sample_size;
                track.sample_rate = entry.sample_rate;
            } else if entry.is_visual() {
                track.width = entry.width.map(f64::from).or(track.width);
                track.height = entry.height.map(f64::from).or(track.height);
            }
        }

        if track.kind != TrackKind::Video && track.width == Some(0.0) {
            track.width = None;
            track.height = None;
        }

        track
    }
}

fn apply_tkhd(track: &mut TrackInfo, tkhd: TkhdBox) {
    track.track_id = tkhd.track_id;
    track.enabled = tkhd.enabled();
    track.creation_time = tkhd.creation_time;
    track.modification_time = tkhd.modification_time;
    if track.timescale == 0 {
        track.duration = tkhd.duration;
    }
    if tkhd.width > 0.0 || tkhd.height > 0.0 {
        track.width = Some(tkhd.width);
        track.height = Some(tkhd.height);
    }
    track.volume = Some(tkhd.volume);
}

fn apply_mdhd(track: &mut TrackInfo, mdhd: MdhdBox) {
    track.timescale = mdhd.timescale;
    track.duration = mdhd.duration;
    track.duration_seconds = mdhd.duration_seconds;
    track.language = mdhd.language;
}

fn brand_format(ftyp: &FtypBox) -> &'static str {
    if ftyp.is_quicktime() {
        "QuickTime"
    } else if ftyp.major_brand.starts_with("3g") {
        "3GPP"
    } else {
        "MP4"
    }
}

/// QuickTime user data text: a list of (16-bit length, 16-bit language,
/// text) records, only the first is kept. Android writes `©xyz` the same
/// way. Bodies that don't match are decoded as raw Latin-1 text.
///
/// Records with a packed ISO 639 language code (>= 0x400) are UTF-8, the
/// older Macintosh language codes are kept as Latin-1.
fn parse_udta_text(data: &[u8]) -> String {
    if data.len() >= 4 {
        let len = u16::from_be_bytes([data[0], data[1]]) as usize;
        let language = u16::from_be_bytes([data[2], data[3]]);
        if let Some(text) = data.get(4..4 + len) {
            return if language >= 0x400 {
                String::from_utf8_lossy(text).into_owned()
            } else {
                latin1_string(text)
            };
        }
    }
    latin1_string(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::*;

    #[test]
    fn minimal_mp4_atoms() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let buf = minimal_mp4();
        let meta = parse_mp4_bytes(&buf);
        assert!(meta.errors.is_empty(), "{:?}", meta.errors);

        assert_eq!(meta.format, "MP4");
        assert_eq!(meta.file_size, buf.len() as u64);
        assert_eq!(meta.ftyp.as_ref().unwrap().major_brand, "isom");
        assert_eq!(meta.ftyp.as_ref().unwrap().compatible_brands, ["isom"]);

        let atoms = meta
            .atoms
            .iter()
            .map(|(k, v)| (k.as_str(), v.box_type.as_str(), v.size, v.offset))
            .collect::<Vec<_>>();
        assert_eq!(
            atoms,
            [
                ("file_type", "ftyp", 20, 0),
                ("media_data", "mdat", 8, 28),
                ("movie", "moov", 8, 20),
            ]
        );
        assert_eq!(
            meta.moov,
            Some(AtomInfo {
                box_type: "moov".into(),
                size: 8,
                offset: 20
            })
        );
        assert!(meta.tracks.is_empty());
        assert!(meta.movie_header.is_none());
    }

    #[test]
    fn sample_file() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let meta = parse_mp4_bytes(&sample_mp4());
        assert!(meta.errors.is_empty(), "{:?}", meta.errors);

        let mvhd = meta.movie_header.as_ref().unwrap();
        assert_eq!(mvhd.timescale, 1000);
        assert_eq!(mvhd.duration_ms(), 2500);

        assert_eq!(meta.tracks.len(), 2);
        let video = &meta.tracks[0];
        assert_eq!(video.track_id, 1);
        assert_eq!(video.kind, TrackKind::Video);
        assert_eq!(video.codec.as_deref(), Some("avc1"));
        assert_eq!(video.width, Some(1920.0));
        assert_eq!(video.height, Some(1080.0));
        assert_eq!(video.timescale, 30000);
        assert_eq!(video.duration_seconds, 2.5);
        assert_eq!(video.language.as_deref(), Some("und"));
        assert_eq!(video.handler_name.as_deref(), Some("VideoHandler"));
        assert!(video.enabled);

        let audio = &meta.tracks[1];
        assert_eq!(audio.track_id, 2);
        assert_eq!(audio.kind, TrackKind::Audio);
        assert_eq!(audio.codec.as_deref(), Some("mp4a"));
        assert_eq!(audio.channel_count, Some(2));
        assert_eq!(audio.sample_size, Some(16));
        assert_eq!(audio.sample_rate, Some(44100.0));
        assert_eq!(audio.width, None);
        assert_eq!(audio.language.as_deref(), Some("eng"));

        assert_eq!(
            meta.metadata
                .iter()
                .map(|(k, v)| format!("{k} => {v}"))
                .collect::<Vec<_>>(),
            [
                "artist => Somebody",
                "title => Sample",
                "track_number => 1/9",
                "udta.\u{a9}xyz => +27.2939+112.6932/",
            ]
        );
    }

    #[test]
    fn versions_agree() {
        let v0 = parse_mp4_bytes(&mp4_with_versions(0));
        let v1 = parse_mp4_bytes(&mp4_with_versions(1));
        assert!(v0.errors.is_empty() && v1.errors.is_empty());

        let d = |m: &Mp4Metadata| {
            (
                m.movie_header.as_ref().unwrap().duration_seconds,
                m.tracks[0].duration_seconds,
            )
        };
        assert_eq!(d(&v0), (2.5, 2.5));
        assert_eq!(d(&v0), d(&v1));
        assert_eq!(v0.movie_header.as_ref().unwrap().version, 0);
        assert_eq!(v1.movie_header.as_ref().unwrap().version, 1);
    }

    #[test]
    fn quicktime_keys_metadata() {
        let meta_box = bbox(
            b"meta",
            &[
                hdlr(b"mdta", b""),
                keys(&["com.apple.quicktime.make", "com.apple.quicktime.model"]),
                bbox(
                    b"ilst",
                    &[
                        ilst_item(&1u32.to_be_bytes(), 1, b"Apple"),
                        ilst_item(&2u32.to_be_bytes(), 1, b"iPhone X"),
                    ]
                    .concat(),
                ),
            ]
            .concat(),
        );
        let buf = [
            bbox(b"ftyp", b"qt  \0\0\0\0qt  "),
            bbox(b"wide", &[]),
            bbox(b"mdat", &[0; 64]),
            bbox(b"moov", &[mvhd(0, 0, 600, 300), meta_box].concat()),
        ]
        .concat();

        let meta = parse_mp4_bytes(&buf);
        assert!(meta.errors.is_empty(), "{:?}", meta.errors);
        assert_eq!(meta.format, "QuickTime");
        assert_eq!(
            meta.metadata.get("com.apple.quicktime.make"),
            Some(&EntryValue::Text("Apple".into()))
        );
        assert_eq!(
            meta.metadata.get("com.apple.quicktime.model"),
            Some(&EntryValue::Text("iPhone X".into()))
        );
        assert!(meta.atoms.contains_key("wide"));
    }

    #[test]
    fn extended_size_and_last_box() {
        // mdat with a 64-bit size
        let mut mdat = vec![0, 0, 0, 1];
        mdat.extend(b"mdat");
        mdat.extend(32u64.to_be_bytes());
        mdat.extend([0xaa; 16]);

        // free box with size 0 runs to the end of file
        let mut last = vec![0, 0, 0, 0];
        last.extend(b"free");
        last.extend([0; 10]);

        let buf = [bbox(b"ftyp", b"mp42\0\0\0\0mp42isom"), mdat, last].concat();
        let meta = parse_mp4_bytes(&buf);
        assert!(meta.errors.is_empty(), "{:?}", meta.errors);
        assert_eq!(meta.atoms["media_data"].size, 32);
        assert_eq!(meta.atoms["media_data"].offset, 24);
        assert_eq!(meta.atoms["free"].size, 18);
        assert_eq!(meta.atoms["free"].offset, 56);
    }

    #[test]
    fn truncated_top_level_box() {
        let mut buf = minimal_mp4();
        // grow the declared mdat size beyond the end of file
        let at = buf.len() - 8;
        buf[at..at + 4].copy_from_slice(&1000u32.to_be_bytes());

        let meta = parse_mp4_bytes(&buf);
        assert_eq!(meta.ftyp.as_ref().unwrap().major_brand, "isom");
        assert!(meta.moov.is_some());
        assert_eq!(meta.atoms["media_data"].size, 1000);
        assert_eq!(
            meta.errors,
            ["box 'mdat' at offset 28 declares 1000 bytes but only 8 remain"]
        );
    }

    #[test]
    fn broken_leaf_keeps_siblings() {
        let trak = bbox(
            b"trak",
            &[
                // truncated tkhd body
                full_box(b"tkhd", 0, 3, &[0; 12]),
                bbox(
                    b"mdia",
                    &[mdhd(0, 1000, 4000, 0x55c4), hdlr(b"soun", b"")].concat(),
                ),
            ]
            .concat(),
        );
        let buf = [
            bbox(b"ftyp", b"isom\0\0\0\0isom"),
            bbox(b"moov", &[mvhd(0, 0, 1000, 4000), trak].concat()),
        ]
        .concat();

        let meta = parse_mp4_bytes(&buf);
        assert_eq!(meta.errors.len(), 1);
        assert!(meta.errors[0].starts_with("moov/trak/tkhd"), "{:?}", meta.errors);
        assert_eq!(meta.tracks.len(), 1);
        assert_eq!(meta.tracks[0].kind, TrackKind::Audio);
        assert_eq!(meta.tracks[0].duration_seconds, 4.0);
    }

    #[test]
    fn broken_child_sequence() {
        let moov = [
            mvhd(0, 0, 1000, 4000),
            // declares more bytes than moov holds
            vec![0, 0, 1, 0, b't', b'r', b'a', b'k', 0, 0],
        ]
        .concat();
        let buf = [bbox(b"ftyp", b"isom\0\0\0\0isom"), bbox(b"moov", &moov)].concat();

        let meta = parse_mp4_bytes(&buf);
        assert!(meta.movie_header.is_some());
        assert_eq!(meta.errors.len(), 1);
        assert!(meta.errors[0].starts_with("moov: box 'trak'"), "{:?}", meta.errors);
    }

    #[test]
    fn garbage_input() {
        let meta = parse_mp4_bytes(b"\0\0\0\x05junkjunkjunk");
        assert_eq!(meta.errors.len(), 1);
        assert!(meta.errors[0].starts_with("invalid box header at offset 0"));
        assert!(meta.atoms.is_empty());

        let meta = parse_mp4_bytes(b"");
        assert!(meta.errors.is_empty());
        assert_eq!(meta.file_size, 0);
    }

    #[test]
    fn idempotent() {
        let buf = sample_mp4();
        assert_eq!(parse_mp4_bytes(&buf), parse_mp4_bytes(&buf));
    }

    #[test]
    fn parse_from_path() {
        let path = write_temp("sample.mp4", &sample_mp4());
        let meta = parse_mp4(&path);
        assert_eq!(meta.file, path.display().to_string());
        assert_eq!(meta.tracks.len(), 2);

        let meta = parse_mp4("/nonexistent/file.mp4");
        assert_eq!(meta.errors.len(), 1);
        assert!(meta.errors[0].starts_with("io error"));
    }

    #[test]
    fn udta_text() {
        assert_eq!(
            parse_udta_text(b"\0\x12\x15\xc7+27.2939+112.6932/"),
            "+27.2939+112.6932/"
        );
        assert_eq!(parse_udta_text(b"2019"), "2019");

        // ISO language code: UTF-8
        assert_eq!(parse_udta_text(b"\0\x05\x15\xc7Caf\xc3\xa9"), "Caf\u{e9}");
        // Macintosh language code 0 (English): Latin-1
        assert_eq!(parse_udta_text(b"\0\x04\0\0Caf\xe9"), "Caf\u{e9}");
    }

    #[test]
    fn deeply_nested_boxes() {
        let n = 5000;
        let mut buf = bbox(b"ftyp", b"isom\0\0\0\0isom");
        for i in 0..n {
            buf.extend((((n - i) * 8) as u32).to_be_bytes());
            buf.extend(b"moov");
        }

        let meta = parse_mp4_bytes(&buf);
        assert_eq!(meta.errors.len(), 1, "{:?}", meta.errors);
        assert!(meta.errors[0].ends_with("/moov: boxes nested too deeply"));
        assert!(meta.errors[0].starts_with("moov/moov/"));
        assert_eq!(meta.moov.as_ref().unwrap().size, n as u64 * 8);

        // the same limit applies inside a track
        let mut inner = bbox(b"stbl", &[]);
        for _ in 0..MAX_BOX_DEPTH {
            inner = bbox(b"minf", &inner);
        }
        let trak = bbox(b"trak", &[tkhd(0, 1, 0, 0, 0), inner].concat());
        let buf = [bbox(b"ftyp", b"isom\0\0\0\0isom"), bbox(b"moov", &trak)].concat();
        let meta = parse_mp4_bytes(&buf);
        assert_eq!(meta.errors.len(), 1, "{:?}", meta.errors);
        assert_eq!(meta.tracks.len(), 1);
        assert_eq!(meta.tracks[0].track_id, 1);
    }

    #[test]
    fn huge_box_is_skipped() {
        let size = MAX_BODY_LEN + 9;
        let mut head = bbox(b"ftyp", b"isom\0\0\0\0isom");
        head.extend((size as u32).to_be_bytes());
        head.extend(b"moov");
        let len = 20 + size;

        let meta = parse_mp4_reader(SparseReader::new(head, len)).unwrap();
        assert_eq!(meta.file_size, len);
        assert_eq!(meta.ftyp.unwrap().major_brand, "isom");
        assert_eq!(meta.moov, None);
        assert_eq!(meta.atoms["movie"].offset, 20);
        assert_eq!(
            meta.errors,
            [format!("box 'moov' at offset 20 is too big to decode: {}", MAX_BODY_LEN + 1)]
        );
    }

    #[test]
    fn udta_utf8_title() {
        let mut nam = vec![0, 5, 0x15, 0xc7];
        nam.extend("Café".as_bytes());
        let udta = bbox(b"udta", &bbox(b"\xa9nam", &nam));
        let buf = [bbox(b"ftyp", b"qt  \0\0\0\0qt  "), bbox(b"moov", &udta)].concat();

        let meta = parse_mp4_bytes(&buf);
        assert!(meta.errors.is_empty(), "{:?}", meta.errors);
        assert_eq!(meta.metadata["udta.\u{a9}nam"], EntryValue::Text("Café".into()));
    }
}
