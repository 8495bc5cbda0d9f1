use chrono::{DateTime, Utc};

/// Countdown display, `MM:SS`. Minutes are not wrapped into hours.
pub fn format_mm_ss(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Human-friendly distance between `date` and `now`, e.g. "3 minutes ago".
pub fn format_relative(date: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now.signed_duration_since(date);
    let future = delta.num_seconds() < 0;
    let secs = delta.num_seconds().unsigned_abs();

    let (amount, unit) = match secs {
        0..=59 => (secs, "second"),
        60..=3_599 => (secs / 60, "minute"),
        3_600..=86_399 => (secs / 3_600, "hour"),
        86_400..=604_799 => (secs / 86_400, "day"),
        604_800..=2_629_799 => (secs / 604_800, "week"),
        2_629_800..=31_557_599 => (secs / 2_629_800, "month"),
        _ => (secs / 31_557_600, "year"),
    };

    if secs < 1 {
        return "now".to_string();
    }
    let plural = if amount == 1 { "" } else { "s" };
    if future {
        format!("in {amount} {unit}{plural}")
    } else {
        format!("{amount} {unit}{plural} ago")
    }
}
