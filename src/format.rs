use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

const SECONDS_PER_DAY: i64 = 86_400;

/// Accepts RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM:SS` and bare dates.
pub fn parse_iso(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// `Mar 7, 2025`; unparseable input is echoed back, absent input is `TBA`.
pub fn format_date(input: Option<&str>) -> String {
    match input.map(str::trim).filter(|s| !s.is_empty()) {
        None => "TBA".to_string(),
        Some(raw) => parse_iso(raw)
            .map(|dt| dt.format("%b %-d, %Y").to_string())
            .unwrap_or_else(|| raw.to_string()),
    }
}

/// Upstream uses `???` for unknown prices.
pub fn display_price(price: Option<&str>) -> &str {
    match price.map(str::trim) {
        Some(p) if !p.is_empty() && p != "???" => p,
        _ => "TBA",
    }
}

/// Steam-page flag wins over the enrichment location; online otherwise.
pub fn venue_label<'a>(has_steam_page: Option<&'a str>, location: Option<&'a str>) -> &'a str {
    match has_steam_page.map(str::trim) {
        Some(flag) if !flag.is_empty() && flag != "???" && !flag.eq_ignore_ascii_case("no") => {
            "Steam Page"
        }
        _ => location
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or("Online"),
    }
}

/// Whole days (rounded up) until `deadline`, or `None` once it has passed.
pub fn days_until(deadline: &str, now: DateTime<Utc>) -> Option<i64> {
    let date = parse_iso(deadline)?;
    if date < now {
        return None;
    }
    let seconds = (date - now).num_seconds();
    Some((seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY)
}

pub fn format_deadline(deadline: Option<&str>, now: DateTime<Utc>) -> String {
    let Some(deadline) = deadline.filter(|d| !d.trim().is_empty()) else {
        return String::new();
    };
    match days_until(deadline, now) {
        None => "Ended".to_string(),
        Some(0) => "Today!".to_string(),
        Some(1) => "Tomorrow!".to_string(),
        Some(days) if days <= 7 => format!("{days} days left"),
        Some(_) => format_date(Some(deadline)),
    }
}

/// Card label driven by the upstream `daysToSubmit` value.
pub fn days_left_label(days: Option<i64>) -> Option<String> {
    match days? {
        d if d < 0 => Some("Closed".to_string()),
        0 => Some("Last day".to_string()),
        1 => Some("1 day left".to_string()),
        d => Some(format!("{d} days left")),
    }
}
