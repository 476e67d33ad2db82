//! Human-readable durations and rates for progress lines.

/// Placeholder for an unknown value.
pub(crate) const UNKNOWN: &str = "--";

const SPEED_UNITS: [(&str, f64); 4] = [("c/s", 1.0), ("c/min", 60.0), ("c/h", 60.0), ("c/d", 24.0)];

/// Formats a duration given in seconds.
///
/// - below 1s: milliseconds with two decimals (`"123.46ms"`)
/// - below 10s: seconds with two decimals (`"5.12s"`)
/// - otherwise: `HH:MM:SS`, hours unbounded (`"34:17:36"`)
///
/// Negative or non-finite input renders as `"--"`.
///
/// # Example
/// ```
/// use loopvisor::humanize_time;
///
/// assert_eq!(humanize_time(0.1234567), "123.46ms");
/// assert_eq!(humanize_time(5.1234567), "5.12s");
/// assert_eq!(humanize_time(123456.0), "34:17:36");
/// ```
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn humanize_time(secs: f64) -> String {
    if !secs.is_finite() || secs < 0.0 {
        return UNKNOWN.to_string();
    }
    if secs < 1.0 {
        return format!("{:.2}ms", secs * 1000.0);
    }
    if secs < 10.0 {
        return format!("{secs:.2}s");
    }
    let total = secs as u64;
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

/// Formats a rate given in counts per second.
///
/// Rates below 1 are scaled through `c/min`, `c/h` and `c/d` until they reach 1.
///
/// # Example
/// ```
/// use loopvisor::humanize_speed;
///
/// assert_eq!(humanize_speed(12.34), "12.3c/s");
/// assert_eq!(humanize_speed(0.5), "30.0c/min");
/// assert_eq!(humanize_speed(f64::NAN), "--");
/// ```
pub fn humanize_speed(per_sec: f64) -> String {
    if !per_sec.is_finite() || per_sec < 0.0 {
        return UNKNOWN.to_string();
    }
    let mut value = per_sec;
    let mut unit = SPEED_UNITS[0].0;
    if value > 0.0 {
        for &(next, factor) in &SPEED_UNITS[1..] {
            if value >= 1.0 {
                break;
            }
            value *= factor;
            unit = next;
        }
    }
    format!("{value:.1}{unit}")
}

/// [`humanize_time`] for optional values.
pub(crate) fn time_or_unknown(secs: Option<f64>) -> String {
    secs.map_or_else(|| UNKNOWN.to_string(), humanize_time)
}

/// [`humanize_speed`] for optional values.
pub(crate) fn speed_or_unknown(per_sec: Option<f64>) -> String {
    per_sec.map_or_else(|| UNKNOWN.to_string(), humanize_speed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_breakpoints() {
        assert_eq!(humanize_time(0.1234567), "123.46ms");
        assert_eq!(humanize_time(5.1234567), "5.12s");
        assert_eq!(humanize_time(123456.0), "34:17:36");
        assert_eq!(humanize_time(0.0), "0.00ms");
        assert_eq!(humanize_time(0.999), "999.00ms");
        assert_eq!(humanize_time(1.0), "1.00s");
        assert_eq!(humanize_time(10.0), "00:00:10");
        assert_eq!(humanize_time(3661.9), "01:01:01");
    }

    #[test]
    fn time_rejects_garbage() {
        assert_eq!(humanize_time(-1.0), "--");
        assert_eq!(humanize_time(f64::INFINITY), "--");
        assert_eq!(time_or_unknown(None), "--");
        assert_eq!(time_or_unknown(Some(2.0)), "2.00s");
    }

    #[test]
    fn speed_scales_down_to_days() {
        assert_eq!(humanize_speed(3.0), "3.0c/s");
        assert_eq!(humanize_speed(0.1), "6.0c/min");
        assert_eq!(humanize_speed(1.0 / 600.0), "6.0c/h");
        assert_eq!(humanize_speed(1.0 / 86_400.0), "1.0c/d");
        assert_eq!(humanize_speed(0.0), "0.0c/s");
        assert_eq!(speed_or_unknown(None), "--");
    }
}
