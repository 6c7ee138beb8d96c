//! Timecode formatting and parsing.
//!
//! Both SRT and WebVTT use `HH:MM:SS` followed by a millisecond component;
//! only the separator differs (`,` for SRT, `.` for WebVTT).

/// Format seconds as `HH:MM:SS<sep>mmm` with zero padding.
pub fn format_timecode(secs: f64, millis_sep: char) -> String {
    let total_ms = (secs.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let seconds = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02}{millis_sep}{millis:03}")
}

/// Parse `HH:MM:SS,mmm` or `HH:MM:SS.mmm` into seconds.
///
/// The millisecond component is optional and defaults to 0. Returns `None`
/// for anything that does not fit the grammar, so callers can skip the
/// enclosing block rather than abort the document.
pub fn parse_timecode(input: &str) -> Option<f64> {
    let mut parts = input.trim().split(':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let rest = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let (seconds_part, millis_part) = match rest.split_once([',', '.']) {
        Some((s, m)) => (s, Some(m)),
        None => (rest, None),
    };
    let seconds: u64 = seconds_part.parse().ok()?;
    let millis: u64 = match millis_part {
        Some(m) => m.parse().ok()?,
        None => 0,
    };

    Some(hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds as f64 + millis as f64 / 1000.0)
}

/// Split a `start --> end` range line into two parsed timecodes.
pub fn parse_timecode_range(line: &str) -> Option<(f64, f64)> {
    let (start, end) = line.split_once("-->")?;
    Some((parse_timecode(start)?, parse_timecode(end)?))
}
