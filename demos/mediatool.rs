use std::{error::Error, process::ExitCode};

use clap::Parser;
use mediawalk::{AiffMetadata, ApngMetadata, GifMetadata, MediaMetadata, Mp4Metadata};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    file: String,

    /// Dump the whole result as JSON (needs the `json_dump` feature)
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // clap exits with code 2 on usage errors, missing arguments exit with 1
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            return ExitCode::from(1);
        }
        Err(e) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
    };

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {e}", cli.file);
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let meta = mediawalk::parse_media(&cli.file)?;

    if cli.json {
        return dump_json(&meta);
    }

    let mut entries = summary(&meta);
    entries.extend(
        meta.errors()
            .iter()
            .enumerate()
            .map(|(i, e)| (format!("error[{i}]"), e.to_owned())),
    );

    for (k, v) in entries.iter() {
        println!("{k:<32}=> {v}");
    }
    println!("{} fields", entries.len());
    Ok(())
}

#[cfg(feature = "json_dump")]
fn dump_json(meta: &MediaMetadata) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(meta)?);
    Ok(())
}

#[cfg(not(feature = "json_dump"))]
fn dump_json(_: &MediaMetadata) -> Result<(), Box<dyn Error>> {
    Err("--json requires the `json_dump` feature".into())
}

fn summary(meta: &MediaMetadata) -> Vec<(String, String)> {
    let mut entries = vec![
        ("format".to_owned(), meta.format_name().to_owned()),
        ("file_size".to_owned(), meta.file_size().to_string()),
    ];
    match meta {
        MediaMetadata::Mp4(m) => mp4_summary(m, &mut entries),
        MediaMetadata::Aiff(m) => aiff_summary(m, &mut entries),
        MediaMetadata::Gif(m) => gif_summary(m, &mut entries),
        MediaMetadata::Apng(m) => apng_summary(m, &mut entries),
    }
    entries
}

fn mp4_summary(m: &Mp4Metadata, entries: &mut Vec<(String, String)>) {
    if let Some(ftyp) = &m.ftyp {
        entries.push(("major_brand".to_owned(), ftyp.major_brand.clone()));
        entries.push((
            "compatible_brands".to_owned(),
            ftyp.compatible_brands.join(", "),
        ));
    }
    if let Some(mvhd) = &m.movie_header {
        entries.push(("duration".to_owned(), format!("{:.3}s", mvhd.duration_seconds)));
        if let Some(t) = mvhd.creation_time {
            entries.push(("creation_time".to_owned(), t.to_rfc3339()));
        }
    }
    for (i, track) in m.tracks.iter().enumerate() {
        let mut desc = format!(
            "{:?} {}",
            track.kind,
            track.codec.as_deref().unwrap_or("-")
        );
        if let (Some(w), Some(h)) = (track.width, track.height) {
            desc.push_str(&format!(" {w}x{h}"));
        }
        if let (Some(ch), Some(rate)) = (track.channel_count, track.sample_rate) {
            desc.push_str(&format!(" {ch}ch {rate}Hz"));
        }
        desc.push_str(&format!(" {:.3}s", track.duration_seconds));
        entries.push((format!("track[{i}]"), desc));
    }
    for (k, v) in m.metadata.iter() {
        entries.push((k.to_owned(), v.to_string()));
    }
    for (name, atom) in m.atoms.iter() {
        entries.push((
            format!("atom.{name}"),
            format!("'{}' {} bytes @ {}", atom.box_type, atom.size, atom.offset),
        ));
    }
}

fn aiff_summary(m: &AiffMetadata, entries: &mut Vec<(String, String)>) {
    if let Some(c) = &m.common {
        entries.push(("channels".to_owned(), c.channels.to_string()));
        entries.push(("sample_rate".to_owned(), c.sample_rate.to_string()));
        entries.push(("sample_size".to_owned(), c.sample_size.to_string()));
        entries.push(("duration".to_owned(), format!("{:.3}s", c.duration_seconds)));
        entries.push(("compression".to_owned(), c.compression.clone()));
    }
    if !m.markers.is_empty() {
        entries.push(("markers".to_owned(), m.markers.len().to_string()));
    }
    for (k, v) in m.metadata.iter() {
        entries.push((k.to_owned(), v.to_string()));
    }
    let ids = m.chunks.iter().map(|c| c.id.as_str()).collect::<Vec<_>>();
    entries.push(("chunks".to_owned(), ids.join(", ")));
}

fn gif_summary(m: &GifMetadata, entries: &mut Vec<(String, String)>) {
    entries.push((
        "version".to_owned(),
        m.version.clone().unwrap_or_default(),
    ));
    entries.push(("size".to_owned(), format!("{}x{}", m.width, m.height)));
    entries.push(("frames".to_owned(), m.total_frames.to_string()));
    entries.push(("animated".to_owned(), m.is_animated.to_string()));
    if let Some(n) = m.loop_count {
        entries.push(("loop_count".to_owned(), n.to_string()));
    }
    entries.push(("duration".to_owned(), format!("{}ms", m.total_duration_ms)));
    for (i, c) in m.comments.iter().enumerate() {
        entries.push((format!("comment[{i}]"), c.to_owned()));
    }
}

fn apng_summary(m: &ApngMetadata, entries: &mut Vec<(String, String)>) {
    entries.push(("size".to_owned(), format!("{}x{}", m.width, m.height)));
    entries.push(("frames".to_owned(), m.frame_count.to_string()));
    entries.push(("animated".to_owned(), m.is_animated.to_string()));
    entries.push(("num_plays".to_owned(), m.num_plays.to_string()));
    entries.push(("duration".to_owned(), format!("{}ms", m.total_duration_ms)));
}
