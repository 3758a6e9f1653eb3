//! Clock formatting for segment midpoints.
//!
//! Results carry the midpoint as a human-readable duration: whole seconds,
//! hours unpadded, minutes and seconds zero-padded (`0:00:35`, `12:03:09`).
//! Spans of a day or more get a `N day(s), ` prefix.

const SECS_PER_DAY: u64 = 86_400;

/// Format seconds as `H:MM:SS`, truncating any fractional part.
///
/// Negative and non-finite inputs are treated as zero.
///
/// # Examples
/// ```
/// use segframe_models::timestamp::format_clock;
/// assert_eq!(format_clock(35.9), "0:00:35");
/// assert_eq!(format_clock(3723.0), "1:02:03");
/// ```
pub fn format_clock(total_secs: f64) -> String {
    let whole = if total_secs.is_finite() && total_secs > 0.0 {
        total_secs.trunc() as u64
    } else {
        0
    };

    let days = whole / SECS_PER_DAY;
    let rem = whole % SECS_PER_DAY;
    let hours = rem / 3600;
    let mins = (rem % 3600) / 60;
    let secs = rem % 60;

    let clock = format!("{}:{:02}:{:02}", hours, mins, secs);
    match days {
        0 => clock,
        1 => format!("1 day, {}", clock),
        n => format!("{} days, {}", n, clock),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_clock_basic() {
        assert_eq!(format_clock(0.0), "0:00:00");
        assert_eq!(format_clock(35.0), "0:00:35");
        assert_eq!(format_clock(90.0), "0:01:30");
        assert_eq!(format_clock(3661.0), "1:01:01");
        assert_eq!(format_clock(36_000.0), "10:00:00");
    }

    #[test]
    fn test_format_clock_truncates() {
        assert_eq!(format_clock(35.999), "0:00:35");
    }

    #[test]
    fn test_format_clock_days() {
        assert_eq!(format_clock(86_400.0), "1 day, 0:00:00");
        assert_eq!(format_clock(2.0 * 86_400.0 + 5.0), "2 days, 0:00:05");
    }

    #[test]
    fn test_format_clock_degenerate_inputs() {
        assert_eq!(format_clock(-3.0), "0:00:00");
        assert_eq!(format_clock(f64::NAN), "0:00:00");
    }
}
