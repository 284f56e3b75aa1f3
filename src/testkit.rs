//! Builders for synthetic media files used by the unit tests.

use std::{
    io::{self, Read, Seek, SeekFrom},
    path::PathBuf,
};

use crate::png::PNG_SIGNATURE;

/// Writes `data` to a temporary file named after `name` and returns its path.
pub fn write_temp(name: &str, data: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("mediawalk-{}-{name}", std::process::id()));
    std::fs::write(&path, data).unwrap();
    path
}

/// A reader of `len` bytes that starts with `head` and reads zeros after
/// it, so huge declared sizes can be tested without allocating them.
pub struct SparseReader {
    head: Vec<u8>,
    len: u64,
    pos: u64,
}

impl SparseReader {
    pub fn new(head: Vec<u8>, len: u64) -> Self {
        Self { head, len, pos: 0 }
    }
}

impl Read for SparseReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = (self.len.saturating_sub(self.pos) as usize).min(buf.len());
        for (i, b) in buf[..n].iter_mut().enumerate() {
            *b = self
                .head
                .get(self.pos as usize + i)
                .copied()
                .unwrap_or_default();
        }
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for SparseReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let pos = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::End(n) => self.len.checked_add_signed(n),
            SeekFrom::Current(n) => self.pos.checked_add_signed(n),
        };
        self.pos = pos.ok_or_else(|| io::Error::from(io::ErrorKind::InvalidInput))?;
        Ok(self.pos)
    }
}

// ---------------------------------------------------------------------------
// ISOBMFF
// ---------------------------------------------------------------------------

pub fn bbox(box_type: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut buf = ((body.len() + 8) as u32).to_be_bytes().to_vec();
    buf.extend(box_type);
    buf.extend(body);
    buf
}

pub fn full_box(box_type: &[u8; 4], version: u8, flags: u32, body: &[u8]) -> Vec<u8> {
    let mut data = vec![version];
    data.extend(&flags.to_be_bytes()[1..]);
    data.extend(body);
    bbox(box_type, &data)
}

fn times(version: u8, created: u64, timescale: u32, duration: u64) -> Vec<u8> {
    let mut buf = Vec::new();
    if version == 1 {
        buf.extend(created.to_be_bytes());
        buf.extend(created.to_be_bytes());
        buf.extend(timescale.to_be_bytes());
        buf.extend(duration.to_be_bytes());
    } else {
        buf.extend((created as u32).to_be_bytes());
        buf.extend((created as u32).to_be_bytes());
        buf.extend(timescale.to_be_bytes());
        buf.extend((duration as u32).to_be_bytes());
    }
    buf
}

pub fn mvhd(version: u8, created: u64, timescale: u32, duration: u64) -> Vec<u8> {
    let mut body = times(version, created, timescale, duration);
    body.extend(0x0001_0000u32.to_be_bytes()); // rate
    body.extend(0x0100u16.to_be_bytes()); // volume
    body.extend([0; 70]);
    body.extend(3u32.to_be_bytes()); // next track id
    full_box(b"mvhd", version, 0, &body)
}

pub fn tkhd(version: u8, track_id: u32, duration: u64, width: u32, height: u32) -> Vec<u8> {
    let mut body = Vec::new();
    if version == 1 {
        body.extend([0; 16]);
        body.extend(track_id.to_be_bytes());
        body.extend([0; 4]);
        body.extend(duration.to_be_bytes());
    } else {
        body.extend([0; 8]);
        body.extend(track_id.to_be_bytes());
        body.extend([0; 4]);
        body.extend((duration as u32).to_be_bytes());
    }
    body.extend([0; 8]);
    body.extend(0u16.to_be_bytes()); // layer
    body.extend(0u16.to_be_bytes()); // alternate group
    body.extend(0x0100u16.to_be_bytes()); // volume
    body.extend([0; 2]);
    body.extend([0; 36]); // matrix
    body.extend((width << 16).to_be_bytes());
    body.extend((height << 16).to_be_bytes());
    full_box(b"tkhd", version, 3, &body)
}

pub fn mdhd(version: u8, timescale: u32, duration: u64, language: u16) -> Vec<u8> {
    let mut body = times(version, 0, timescale, duration);
    body.extend(language.to_be_bytes());
    body.extend([0; 2]);
    full_box(b"mdhd", version, 0, &body)
}

pub fn hdlr(handler: &[u8; 4], name: &[u8]) -> Vec<u8> {
    let mut body = vec![0; 4];
    body.extend(handler);
    body.extend([0; 12]);
    body.extend(name);
    full_box(b"hdlr", 0, 0, &body)
}

pub fn stsd(entries: &[Vec<u8>]) -> Vec<u8> {
    let mut body = (entries.len() as u32).to_be_bytes().to_vec();
    for e in entries {
        body.extend(e);
    }
    full_box(b"stsd", 0, 0, &body)
}

pub fn audio_entry(codec: &[u8; 4], channels: u16, sample_size: u16, rate: u32) -> Vec<u8> {
    let mut body = vec![0; 6];
    body.extend(1u16.to_be_bytes()); // data reference index
    body.extend([0; 8]); // version, revision, vendor
    body.extend(channels.to_be_bytes());
    body.extend(sample_size.to_be_bytes());
    body.extend([0; 4]);
    body.extend((rate << 16).to_be_bytes());
    bbox(codec, &body)
}

pub fn visual_entry(codec: &[u8; 4], width: u16, height: u16) -> Vec<u8> {
    let mut body = vec![0; 6];
    body.extend(1u16.to_be_bytes());
    body.extend([0; 16]);
    body.extend(width.to_be_bytes());
    body.extend(height.to_be_bytes());
    body.extend([0; 50]);
    bbox(codec, &body)
}

pub fn keys(names: &[&str]) -> Vec<u8> {
    let mut body = (names.len() as u32).to_be_bytes().to_vec();
    for name in names {
        body.extend(((name.len() + 8) as u32).to_be_bytes());
        body.extend(b"mdta");
        body.extend(name.as_bytes());
    }
    full_box(b"keys", 0, 0, &body)
}

pub fn ilst_item(tag: &[u8; 4], type_code: u32, payload: &[u8]) -> Vec<u8> {
    let mut data = vec![0];
    data.extend(&type_code.to_be_bytes()[1..]);
    data.extend([0; 4]); // locale
    data.extend(payload);
    bbox(tag, &bbox(b"data", &data))
}

fn trak(
    track_id: u32,
    size: (u32, u32),
    mdhd_box: Vec<u8>,
    handler: (&[u8; 4], &[u8]),
    entry: Vec<u8>,
) -> Vec<u8> {
    let stbl = bbox(b"stbl", &stsd(&[entry]));
    let minf = bbox(b"minf", &stbl);
    let mdia = bbox(
        b"mdia",
        &[mdhd_box, hdlr(handler.0, handler.1), minf].concat(),
    );
    bbox(
        b"trak",
        &[tkhd(0, track_id, 2500, size.0, size.1), mdia].concat(),
    )
}

/// ftyp + mdat + moov with a video track, an audio track and iTunes style
/// user data.
pub fn sample_mp4() -> Vec<u8> {
    let video = trak(
        1,
        (1920, 1080),
        mdhd(0, 30000, 75000, 0x55c4),
        (b"vide", b"VideoHandler\0"),
        visual_entry(b"avc1", 1920, 1080),
    );
    let audio = trak(
        2,
        (0, 0),
        mdhd(0, 44100, 110250, 0x15c7),
        (b"soun", b"SoundHandler\0"),
        audio_entry(b"mp4a", 2, 16, 44100),
    );

    let ilst = bbox(
        b"ilst",
        &[
            ilst_item(b"\xa9nam", 1, b"Sample"),
            ilst_item(b"\xa9ART", 1, b"Somebody"),
            ilst_item(b"trkn", 0, &[0, 0, 0, 1, 0, 9, 0, 0]),
        ]
        .concat(),
    );
    let meta = full_box(b"meta", 0, 0, &[hdlr(b"mdir", b""), ilst].concat());
    let udta = bbox(
        b"udta",
        &[bbox(b"\xa9xyz", b"\0\x12\x15\xc7+27.2939+112.6932/"), meta].concat(),
    );

    let moov = bbox(
        b"moov",
        &[mvhd(0, 3_789_792_597, 1000, 2500), video, audio, udta].concat(),
    );

    [
        bbox(b"ftyp", b"isom\0\0\x02\0isomiso2avc1mp41"),
        bbox(b"mdat", &[0x5a; 256]),
        moov,
    ]
    .concat()
}

/// ftyp + empty moov + empty mdat.
pub fn minimal_mp4() -> Vec<u8> {
    [
        bbox(b"ftyp", b"isom\0\0\0\0isom"),
        bbox(b"moov", &[]),
        bbox(b"mdat", &[]),
    ]
    .concat()
}

/// One video track whose header boxes all use `version`.
pub fn mp4_with_versions(version: u8) -> Vec<u8> {
    let mdia = bbox(
        b"mdia",
        &[mdhd(version, 600, 1500, 0x55c4), hdlr(b"vide", b"")].concat(),
    );
    let trak = bbox(
        b"trak",
        &[tkhd(version, 1, 2500, 640, 480), mdia].concat(),
    );
    [
        bbox(b"ftyp", b"mp42\0\0\0\0mp42isom"),
        bbox(
            b"moov",
            &[mvhd(version, 3_789_792_597, 1000, 2500), trak].concat(),
        ),
    ]
    .concat()
}

// ---------------------------------------------------------------------------
// AIFF
// ---------------------------------------------------------------------------

/// An IFF chunk, padded to an even length.
pub fn aiff_chunk(id: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut buf = id.to_vec();
    buf.extend((body.len() as u32).to_be_bytes());
    buf.extend(body);
    if body.len() % 2 == 1 {
        buf.push(0);
    }
    buf
}

pub fn form(form_type: &[u8; 4], chunks: &[Vec<u8>]) -> Vec<u8> {
    let body = chunks.concat();
    let mut buf = b"FORM".to_vec();
    buf.extend(((body.len() + 4) as u32).to_be_bytes());
    buf.extend(form_type);
    buf.extend(body);
    buf
}

/// Encodes an integral sample rate as an 80-bit IEEE extended float.
pub fn ext80(rate: u32) -> [u8; 10] {
    let mut buf = [0; 10];
    if rate == 0 {
        return buf;
    }
    let lz = (rate as u64).leading_zeros();
    let mantissa = (rate as u64) << lz;
    let exponent = (16383 + 63 - lz) as u16;
    buf[..2].copy_from_slice(&exponent.to_be_bytes());
    buf[2..].copy_from_slice(&mantissa.to_be_bytes());
    buf
}

/// A Pascal string padded to an even total length.
pub fn pstring(text: &[u8]) -> Vec<u8> {
    let mut buf = vec![text.len() as u8];
    buf.extend(text);
    if buf.len() % 2 == 1 {
        buf.push(0);
    }
    buf
}

pub fn comm(channels: u16, frames: u32, bits: u16, rate: u32) -> Vec<u8> {
    let mut body = channels.to_be_bytes().to_vec();
    body.extend(frames.to_be_bytes());
    body.extend(bits.to_be_bytes());
    body.extend(ext80(rate));
    aiff_chunk(b"COMM", &body)
}

pub fn comm_c(
    channels: u16,
    frames: u32,
    bits: u16,
    rate: u32,
    compression: &[u8; 4],
    name: &[u8],
) -> Vec<u8> {
    let mut body = channels.to_be_bytes().to_vec();
    body.extend(frames.to_be_bytes());
    body.extend(bits.to_be_bytes());
    body.extend(ext80(rate));
    body.extend(compression);
    body.extend(pstring(name));
    aiff_chunk(b"COMM", &body)
}

pub fn ssnd(offset: u32, block_size: u32, samples: &[u8]) -> Vec<u8> {
    let mut body = offset.to_be_bytes().to_vec();
    body.extend(block_size.to_be_bytes());
    body.extend(samples);
    aiff_chunk(b"SSND", &body)
}

/// 44.1 kHz stereo 16-bit AIFF with a name and an annotation.
pub fn sample_aiff() -> Vec<u8> {
    form(
        b"AIFF",
        &[
            comm(2, 88200, 16, 44100),
            aiff_chunk(b"NAME", b"Sample"),
            aiff_chunk(b"ANNO", b"first"),
            ssnd(0, 0, &[0; 64]),
        ],
    )
}

// ---------------------------------------------------------------------------
// GIF
// ---------------------------------------------------------------------------

/// GIF header + logical screen descriptor, with a global color table of
/// `2^(gct_size + 1)` entries when `gct_size` is set.
pub fn gif_header(version: &[u8; 3], width: u16, height: u16, gct_size: Option<u8>) -> Vec<u8> {
    let mut buf = b"GIF".to_vec();
    buf.extend(version);
    buf.extend(width.to_le_bytes());
    buf.extend(height.to_le_bytes());
    let packed = match gct_size {
        Some(n) => 0x80 | 0x70 | (n & 0x07),
        None => 0x70,
    };
    buf.extend([packed, 0, 0]);
    if let Some(n) = gct_size {
        buf.extend(vec![0; 3 * (1 << (n + 1))]);
    }
    buf
}

pub fn gif_gce(disposal: u8, delay_cs: u16, transparent: bool) -> Vec<u8> {
    let packed = (disposal << 2) | transparent as u8;
    let mut buf = vec![0x21, 0xf9, 0x04, packed];
    buf.extend(delay_cs.to_le_bytes());
    buf.extend([0, 0]);
    buf
}

pub fn gif_netscape(loops: u16) -> Vec<u8> {
    let mut buf = vec![0x21, 0xff, 0x0b];
    buf.extend(b"NETSCAPE2.0");
    buf.extend([0x03, 0x01]);
    buf.extend(loops.to_le_bytes());
    buf.push(0);
    buf
}

pub fn gif_comment(text: &[u8]) -> Vec<u8> {
    let mut buf = vec![0x21, 0xfe];
    for chunk in text.chunks(255) {
        buf.push(chunk.len() as u8);
        buf.extend(chunk);
    }
    buf.push(0);
    buf
}

/// An image descriptor without a local color table followed by a tiny LZW
/// stream.
pub fn gif_image(width: u16, height: u16) -> Vec<u8> {
    let mut buf = vec![0x2c];
    buf.extend(0u16.to_le_bytes());
    buf.extend(0u16.to_le_bytes());
    buf.extend(width.to_le_bytes());
    buf.extend(height.to_le_bytes());
    buf.push(0);
    buf.extend([0x02, 0x02, 0x4c, 0x01, 0x00]);
    buf
}

/// Two-frame looping animation.
pub fn sample_gif() -> Vec<u8> {
    [
        gif_header(b"89a", 10, 10, Some(1)),
        gif_netscape(0),
        gif_gce(2, 10, true),
        gif_image(10, 10),
        gif_comment(b"hello"),
        gif_gce(1, 20, false),
        gif_image(10, 10),
        vec![0x3b],
    ]
    .concat()
}

// ---------------------------------------------------------------------------
// PNG
// ---------------------------------------------------------------------------

/// A PNG chunk with a zero CRC, CRCs are not verified.
pub fn png_chunk(chunk_type: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut buf = (data.len() as u32).to_be_bytes().to_vec();
    buf.extend(chunk_type);
    buf.extend(data);
    buf.extend([0; 4]);
    buf
}

pub fn ihdr(width: u32, height: u32, bit_depth: u8, color_type: u8) -> Vec<u8> {
    let mut data = width.to_be_bytes().to_vec();
    data.extend(height.to_be_bytes());
    data.extend([bit_depth, color_type, 0, 0, 0]);
    png_chunk(b"IHDR", &data)
}

pub fn actl(num_frames: u32, num_plays: u32) -> Vec<u8> {
    let mut data = num_frames.to_be_bytes().to_vec();
    data.extend(num_plays.to_be_bytes());
    png_chunk(b"acTL", &data)
}

pub fn fctl(sequence: u32, width: u32, height: u32, delay: (u16, u16), dispose: u8) -> Vec<u8> {
    let mut data = sequence.to_be_bytes().to_vec();
    data.extend(width.to_be_bytes());
    data.extend(height.to_be_bytes());
    data.extend(0u32.to_be_bytes());
    data.extend(0u32.to_be_bytes());
    data.extend(delay.0.to_be_bytes());
    data.extend(delay.1.to_be_bytes());
    data.extend([dispose, 0]);
    png_chunk(b"fcTL", &data)
}

pub fn fdat(sequence: u32, data: &[u8]) -> Vec<u8> {
    let mut buf = sequence.to_be_bytes().to_vec();
    buf.extend(data);
    png_chunk(b"fdAT", &buf)
}

/// Two-frame APNG: the first frame is the default image.
pub fn sample_apng() -> Vec<u8> {
    [
        PNG_SIGNATURE.to_vec(),
        ihdr(16, 16, 8, 6),
        actl(2, 0),
        fctl(0, 16, 16, (1, 10), 0),
        png_chunk(b"IDAT", &[0; 8]),
        fctl(1, 8, 8, (50, 0), 1),
        fdat(2, &[0; 8]),
        png_chunk(b"IEND", &[]),
    ]
    .concat()
}
