use chrono::NaiveTime;

const FORMATS: &[&str] = &["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M:%S %p", "%I:%M%p"];

/// Lenient time-of-day parse for provider strings like `"09:00"`,
/// `"9:30"`, `"14:15:00"` or `"2:30 PM"`. Anything else is `None`.
pub fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
        .or_else(|| split_hours_minutes(raw))
}

fn split_hours_minutes(raw: &str) -> Option<NaiveTime> {
    let mut parts = raw.split(':');
    let hours: u32 = parts.next()?.trim().parse().ok()?;
    let minutes: u32 = parts.next()?.trim().parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    NaiveTime::from_hms_opt(hours, minutes, 0)
}

/// Zero-padded `HH:mm`, empty when unset.
pub fn format_hhmm(time: Option<NaiveTime>) -> String {
    time.map(|t| t.format("%H:%M").to_string())
        .unwrap_or_default()
}
