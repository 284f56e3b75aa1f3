use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Decodes bytes as ISO-8859-1 and trims trailing NULs, as the IFF text
/// chunks are stored.
pub(crate) fn latin1_string(data: &[u8]) -> String {
    data.iter()
        .map(|b| *b as char)
        .collect::<String>()
        .trim_end_matches('\0')
        .to_owned()
}

/// Converts seconds since midnight, January 1, 1904 (UTC), the epoch used by
/// QuickTime and the IFF family, to a calendar timestamp.
pub(crate) fn mac_epoch_to_utc(seconds: u64) -> Option<DateTime<Utc>> {
    let epoch = NaiveDate::from_ymd_opt(1904, 1, 1)?.and_hms_opt(0, 0, 0)?;
    let secs = i64::try_from(seconds).ok()?;
    let t = epoch.checked_add_signed(Duration::try_seconds(secs)?)?;
    Some(t.and_utc())
}

/// Unsigned 16.16 fixed point.
#[inline]
pub(crate) fn fixed_16_16(raw: u32) -> f64 {
    raw as f64 / 65536.0
}

/// Signed 8.8 fixed point.
#[inline]
pub(crate) fn fixed_8_8(raw: i16) -> f64 {
    raw as f64 / 256.0
}

/// Renders a four character code, replacing non printable bytes with `*`
/// (box types like `©nam` keep their copyright sign).
pub(crate) fn fourcc(code: &[u8]) -> String {
    code.iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' || b == 0xa9 {
                b as char
            } else {
                '*'
            }
        })
        .collect()
}
