//! Audio timestamp formatting and parsing.
//!
//! Timestamps render as `M:SS` below one hour and `H:MM:SS` at or
//! above it, with seconds (and minutes, when hours are present) floored
//! and zero-padded to two digits. The same shapes are accepted back by
//! [`parse_timestamp`], which is how bracketed citations like `[2:05]`
//! or `[1:02:45]` in generated text are resolved to seconds.

/// Format a position in seconds as `M:SS` or `H:MM:SS`.
///
/// Fractional seconds are floored. Negative inputs clamp to `0:00`.
pub fn format_timestamp(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Parse `M:SS` or `H:MM:SS` into seconds.
///
/// Returns `None` for anything else (missing parts, non-digits,
/// seconds or minutes ≥ 60 in the positional fields).
pub fn parse_timestamp(text: &str) -> Option<f64> {
    let parts: Vec<&str> = text.split(':').collect();
    let as_field = |s: &str| -> Option<u64> {
        if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        s.parse().ok()
    };

    match parts.as_slice() {
        [m, s] => {
            let minutes = as_field(m)?;
            let secs = as_field(s)?;
            if s.len() != 2 || secs >= 60 {
                return None;
            }
            Some((minutes * 60 + secs) as f64)
        }
        [h, m, s] => {
            let hours = as_field(h)?;
            let minutes = as_field(m)?;
            let secs = as_field(s)?;
            if m.len() != 2 || s.len() != 2 || minutes >= 60 || secs >= 60 {
                return None;
            }
            Some((hours * 3600 + minutes * 60 + secs) as f64)
        }
        _ => None,
    }
}
