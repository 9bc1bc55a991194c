//! Human-friendly time window parsing and formatting.
//!
//! Time windows are stored in seconds. Users can type them with a unit
//! suffix (`90s`, `5m`, `2h`, `3d`, `1w`, `1mo`, `1y`), and they are shown
//! back in the largest whole unit that fits.

const MINUTE: u64 = 60;
const HOUR: u64 = 3_600;
const DAY: u64 = 86_400;
const WEEK: u64 = 604_800;
const MONTH: u64 = 2_592_000;
const YEAR: u64 = 31_536_000;

/// Format a duration in seconds into a compact string such as `5m` or `2h`.
///
/// The value is truncated to the largest unit it reaches, so `90` becomes
/// `1m` and `299` becomes `4m`.
///
/// # Example
///
/// ```
/// use dupeguard::detection::window::format_time_window;
///
/// assert_eq!(format_time_window(45), "45s");
/// assert_eq!(format_time_window(300), "5m");
/// assert_eq!(format_time_window(7_200), "2h");
/// ```
#[must_use]
pub fn format_time_window(seconds: u64) -> String {
    if seconds < MINUTE {
        format!("{seconds}s")
    } else if seconds < HOUR {
        format!("{}m", seconds / MINUTE)
    } else if seconds < DAY {
        format!("{}h", seconds / HOUR)
    } else if seconds < WEEK {
        format!("{}d", seconds / DAY)
    } else if seconds < MONTH {
        format!("{}w", seconds / WEEK)
    } else if seconds < YEAR {
        format!("{}mo", seconds / MONTH)
    } else {
        format!("{}y", seconds / YEAR)
    }
}

/// Parse a time window such as `5m`, `2 hours` or `1.5d` into seconds.
///
/// A bare number is taken as seconds. Months are 30 days and years are
/// 365 days.
///
/// # Errors
///
/// Returns a message describing the problem if the value is empty, the
/// number is invalid, or the unit is unknown.
pub fn parse_time_window(s: &str) -> Result<u64, String> {
    let s = s.trim().to_lowercase();
    if s.is_empty() {
        return Err("Time window cannot be empty".to_string());
    }

    let (num_str, unit) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim()),
        None => (s.as_str(), ""),
    };

    let value: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    let multiplier = match unit {
        "" | "s" | "sec" | "second" | "seconds" => 1,
        "m" | "min" | "minute" | "minutes" => MINUTE,
        "h" | "hr" | "hour" | "hours" => HOUR,
        "d" | "day" | "days" => DAY,
        "w" | "wk" | "week" | "weeks" => WEEK,
        "mo" | "month" | "months" => MONTH,
        "y" | "yr" | "year" | "years" => YEAR,
        _ => return Err(format!("Unknown time unit: '{unit}'")),
    };

    Ok((value * multiplier as f64) as u64)
}
