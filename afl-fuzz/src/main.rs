use std::io::Cursor;

use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    afl::fuzz!(|data: &[u8]| {
        let _ = mediawalk::parse_media_bytes(data);
        let _ = mediawalk::parse_mp4_reader(Cursor::new(data));
        let _ = mediawalk::parse_aiff_reader(Cursor::new(data));
        let _ = mediawalk::parse_gif_bytes(data);
        let _ = mediawalk::parse_apng_bytes(data);
    });
}
