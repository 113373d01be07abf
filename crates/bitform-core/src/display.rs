//! C7 — display layer: raw/human renderings and the built-in handlers.
//!
//! A [`Handler`] is a pure function from a field's already-decoded value to
//! human text; `human_display` defaults to `raw_display` unless a handler
//! is attached. The handler bodies below are ported from
//! `hachoir_core/text_handler.py` and `hachoir_core/tools.py` in
//! `examples/original_source/` for exact constants and rounding.

use crate::value::Value;
use chrono::{NaiveDate, NaiveDateTime};

/// A pure function rendering a field's value as human text.
pub type Handler = fn(&Value) -> String;

/// Renders raw bytes as a literal `\xNN`-escaped, quoted string; integers
/// as decimal; booleans as `true`/`false`; bytes longer than `max_len` are
/// truncated with an indicator (spec §4.2 `RawBytes` display contract).
pub fn raw_display(value: &Value, max_len: usize) -> String {
    match value {
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Text(s) => format!("{s:?}"),
        Value::Bytes(b) => {
            let truncated = b.len() > max_len;
            let shown = if truncated { &b[..max_len] } else { &b[..] };
            let escaped = crate::stream::backslash_escape(shown);
            if truncated {
                format!("\"{escaped}...\" ({} bytes)", b.len())
            } else {
                format!("\"{escaped}\"")
            }
        }
        Value::FieldSet => "<field set>".to_owned(),
    }
}

/// Windows 64-bit `FILETIME`: 100ns ticks since 1601-01-01 UTC.
pub fn timestamp_win64(ticks: i128) -> String {
    if ticks == 0 {
        return "(not set)".to_owned();
    }
    let Ok(ticks) = i64::try_from(ticks) else {
        return "invalid Windows 64 timestamp (year out of range)".to_owned();
    };
    let secs = ticks / 10_000_000;
    let rem_100ns = ticks % 10_000_000;
    let Some(base) = NaiveDate::from_ymd_opt(1601, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0))
    else {
        unreachable!("fixed epoch");
    };
    let Some(dt) = base
        .checked_add_signed(chrono::Duration::seconds(secs))
        .and_then(|dt| dt.checked_add_signed(chrono::Duration::microseconds(rem_100ns / 10)))
    else {
        return "invalid Windows 64 timestamp (year out of range)".to_owned();
    };
    format_with_micros(dt)
}

/// UNIX timestamp: seconds since 1970-01-01 UTC, valid in `[0, i32::MAX]`.
pub fn timestamp_unix(secs: i128) -> String {
    if !(0..=2_147_483_647).contains(&secs) {
        return format!("invalid UNIX timestamp ({secs})");
    }
    #[allow(clippy::cast_possible_truncation)]
    let secs = secs as i64;
    let Some(dt) = NaiveDateTime::from_timestamp_opt(secs, 0) else {
        return format!("invalid UNIX timestamp ({secs})");
    };
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Classic Mac OS timestamp: seconds since 1904-01-01 UTC, valid in
/// `[0, 2^32-1]`.
pub fn timestamp_mac(secs: i128) -> String {
    if !(0..=u32::MAX as i128).contains(&secs) {
        return format!("invalid mac timestamp ({secs})");
    }
    #[allow(clippy::cast_possible_truncation)]
    let secs = secs as i64;
    let Some(base) = NaiveDate::from_ymd_opt(1904, 1, 1).and_then(|d| d.and_hms_opt(0, 0, 0))
    else {
        unreachable!("fixed epoch");
    };
    let Some(dt) = base.checked_add_signed(chrono::Duration::seconds(secs)) else {
        return format!("invalid mac timestamp ({secs})");
    };
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// MS-DOS packed date/time: second/2, minute, hour, day, month, year+1980
/// at bit widths 5/6/5/5/4/7 (LSB to MSB).
pub fn msdos_datetime(raw: u32) -> String {
    let second = (raw & 0x1F) * 2;
    let minute = (raw >> 5) & 0x3F;
    let hour = (raw >> 11) & 0x1F;
    let day = (raw >> 16) & 0x1F;
    let month = (raw >> 21) & 0xF;
    let year = ((raw >> 25) & 0x7F) + 1980;

    let date = NaiveDate::from_ymd_opt(year as i32, month, day);
    let time = date.and_then(|d| d.and_hms_opt(hour, minute, second));
    match time {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => format!("invalid msdos datetime ({raw:#010x})"),
    }
}

fn format_with_micros(dt: NaiveDateTime) -> String {
    let micros = dt.and_utc().timestamp_subsec_micros();
    format!("{}.{:06}", dt.format("%Y-%m-%d %H:%M:%S"), micros)
}

/// Binary file size: `KB = 1024`, one decimal place once the value exceeds
/// 10 000 bytes.
pub fn human_filesize(bytes: u64) -> String {
    if bytes < 10_000 {
        return if bytes == 1 {
            "1 byte".to_owned()
        } else {
            format!("{bytes} bytes")
        };
    }
    scale_and_format(bytes as f64, 1024.0, &["KB", "MB", "GB", "TB", "PB"])
}

/// Decimal bit rate: `Kbit = 1000`, one decimal place.
pub fn human_bitrate(bits_per_sec: u64) -> String {
    if bits_per_sec < 1000 {
        return format!("{bits_per_sec} bit/s");
    }
    scale_and_format(bits_per_sec as f64, 1000.0, &["Kbit/s", "Mbit/s", "Gbit/s"])
}

/// Decimal frequency: `KHz = 1000`, one decimal place.
pub fn human_frequency(hz: u64) -> String {
    if hz < 1000 {
        return format!("{hz} Hz");
    }
    scale_and_format(hz as f64, 1000.0, &["KHz", "MHz", "GHz"])
}

fn scale_and_format(mut value: f64, base: f64, units: &[&str]) -> String {
    let mut idx = 0;
    while value >= base && idx < units.len() - 1 {
        value /= base;
        idx += 1;
    }
    format!("{value:.1} {}", units[idx])
}

/// Lower-case `0x`-prefixed hex, zero-padded to `ceil(bit_size / 4)` nibbles.
pub fn hexadecimal(value: u64, bit_size: u32) -> String {
    let nibbles = ((bit_size + 3) / 4) as usize;
    format!("0x{value:0nibbles$x}")
}
