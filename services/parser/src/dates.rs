use chrono::NaiveDateTime;

/// Lodgement timestamps as published, e.g. `5/03/2018 12:00:00 AM`.
const LODGEMENT_FORMAT: &str = "%d/%m/%Y %I:%M:%S %p";

/// Normalize a lodgement timestamp to `YYYY-MM-DD`.
///
/// The day may be one or two digits, the month exactly two, the year exactly
/// four; the time of day and AM/PM marker must be present. Anything else,
/// including impossible calendar dates, yields an empty string. The time of
/// day is discarded.
pub fn normalize_date(raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return String::new();
    };

    if !has_lodgement_shape(raw) {
        return String::new();
    }

    NaiveDateTime::parse_from_str(raw, LODGEMENT_FORMAT)
        .map(|dt| dt.date().format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// Field widths chrono does not enforce on its own.
fn has_lodgement_shape(raw: &str) -> bool {
    let parts: Vec<&str> = raw.split(' ').collect();
    let [date, time, meridiem] = parts.as_slice() else {
        return false;
    };

    let date: Vec<&str> = date.split('/').collect();
    let [day, month, year] = date.as_slice() else {
        return false;
    };

    let time: Vec<&str> = time.split(':').collect();
    let [hour, minute, second] = time.as_slice() else {
        return false;
    };

    digits(day, 1..=2)
        && digits(month, 2..=2)
        && digits(year, 4..=4)
        && digits(hour, 1..=2)
        && digits(minute, 2..=2)
        && digits(second, 2..=2)
        && (meridiem.eq_ignore_ascii_case("AM") || meridiem.eq_ignore_ascii_case("PM"))
}

fn digits(s: &str, len: std::ops::RangeInclusive<usize>) -> bool {
    len.contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit())
}
