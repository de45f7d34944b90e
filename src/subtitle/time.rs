/// Format seconds as an ASS timestamp, `HH:MM:SS.cc`.
///
/// Centiseconds are truncated, never rounded, so 59.999 becomes
/// `00:00:59.99`. Negative and non-finite input is treated as zero.
pub fn format_ass_time(seconds: f64) -> String {
    let seconds = if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    };

    let whole = seconds.trunc();
    let total = whole as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    let centis = (((seconds - whole) * 100.0).floor() as u64).min(99);

    format!("{hours:02}:{minutes:02}:{secs:02}.{centis:02}")
}
