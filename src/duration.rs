//! Duration parsing for human-readable values like "60s", "1500ms".

use std::time::Duration;

use anyhow::{Context, Result};

/// Parse a duration string like "1d", "2h", "30m", "60s", or "1500ms".
///
/// The input is case-insensitive and whitespace is trimmed.
///
/// # Examples
///
/// ```
/// use kite_autologin::duration::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("60s").unwrap(), Duration::from_secs(60));
/// assert_eq!(parse_duration("1500ms").unwrap(), Duration::from_millis(1500));
/// assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
/// ```
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();
    // "ms" must be checked before "m" and "s".
    let (num, unit) = if s.ends_with("ms") {
        (s.trim_end_matches("ms"), "ms")
    } else if s.ends_with('d') {
        (s.trim_end_matches('d'), "d")
    } else if s.ends_with('h') {
        (s.trim_end_matches('h'), "h")
    } else if s.ends_with('m') {
        (s.trim_end_matches('m'), "m")
    } else if s.ends_with('s') {
        (s.trim_end_matches('s'), "s")
    } else {
        anyhow::bail!("Duration must end with d, h, m, s, or ms");
    };

    let num: u64 = num.parse().with_context(|| "Invalid number in duration")?;

    let millis = match unit {
        "d" => num
            .checked_mul(24 * 60 * 60 * 1000)
            .context("Duration is too large")?,
        "h" => num
            .checked_mul(60 * 60 * 1000)
            .context("Duration is too large")?,
        "m" => num.checked_mul(60 * 1000).context("Duration is too large")?,
        "s" => num.checked_mul(1000).context("Duration is too large")?,
        "ms" => num,
        _ => unreachable!(),
    };

    Ok(Duration::from_millis(millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_units() {
        assert_eq!(parse_duration("1d").unwrap(), Duration::from_secs(86_400));
        assert_eq!(parse_duration("3h").unwrap(), Duration::from_secs(3 * 3600));
        assert_eq!(parse_duration("15m").unwrap(), Duration::from_secs(900));
        assert_eq!(parse_duration("45s").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
    }

    #[test]
    fn trims_and_ignores_case() {
        assert_eq!(parse_duration(" 10S ").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("100MS").unwrap(), Duration::from_millis(100));
    }

    #[test]
    fn rejects_bare_numbers_and_garbage() {
        assert!(parse_duration("60").is_err());
        assert!(parse_duration("fast").is_err());
        assert!(parse_duration("s").is_err());
    }
}
