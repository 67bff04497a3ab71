//! Elapsed-time display formatting

/// Shown in place of a time when the input cannot be rendered
pub const PLACEHOLDER: &str = "--:--:--";

/// Format a whole number of seconds as zero-padded `HH:MM:SS`.
///
/// Hours do not wrap at 24. Negative input yields [`PLACEHOLDER`].
pub fn format_hms(seconds: i64) -> String {
    if seconds < 0 {
        return PLACEHOLDER.to_string();
    }
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

/// Format an unsigned second count; values past `i64::MAX` saturate
pub fn format_hms_u64(seconds: u64) -> String {
    format_hms(i64::try_from(seconds).unwrap_or(i64::MAX))
}

/// Format a possibly fractional second count, flooring it first.
///
/// NaN, infinities and negative values yield [`PLACEHOLDER`].
pub fn format_hms_f64(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 || seconds >= i64::MAX as f64 {
        return PLACEHOLDER.to_string();
    }
    format_hms(seconds.floor() as i64)
}

/// Format the elapsed time of a timer that has reached its end
pub fn format_ended(seconds: u64) -> String {
    format!("Ended ({})", format_hms_u64(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_every_component() {
        assert_eq!(format_hms(0), "00:00:00");
        assert_eq!(format_hms(59), "00:00:59");
        assert_eq!(format_hms(3661), "01:01:01");
    }

    #[test]
    fn hours_do_not_wrap() {
        assert_eq!(format_hms(25 * 3600 + 5), "25:00:05");
        assert_eq!(format_hms(100 * 3600), "100:00:00");
    }

    #[test]
    fn invalid_input_gives_placeholder() {
        assert_eq!(format_hms(-1), PLACEHOLDER);
        assert_eq!(format_hms_f64(-1.0), PLACEHOLDER);
        assert_eq!(format_hms_f64(f64::NAN), PLACEHOLDER);
        assert_eq!(format_hms_f64(f64::INFINITY), PLACEHOLDER);
    }

    #[test]
    fn fractional_seconds_are_floored() {
        assert_eq!(format_hms_f64(61.9), "00:01:01");
    }

    #[test]
    fn unsigned_input_saturates() {
        assert_eq!(format_hms_u64(3661), "01:01:01");
        assert_eq!(format_hms_u64(u64::MAX), format_hms(i64::MAX));
    }

    #[test]
    fn ended_annotation() {
        assert_eq!(format_ended(10), "Ended (00:00:10)");
    }
}
