use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{Error, Result};

/// Number of week buckets in a reporting year.
pub const WEEKS_PER_YEAR: u8 = 52;

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse a GLPI timestamp.
///
/// Accepts `2024-03-03`, `2024-03-03 14:05:00`, `2024-03-03T14:05:00`
/// (with or without seconds) and RFC 3339 with an offset. Offsets are
/// dropped: the wall-clock time is kept as written.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.naive_local());
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(d.and_time(NaiveTime::MIN));
    }

    Err(Error::InvalidTimestamp(s.to_string()))
}

/// Parse an optional timestamp. Missing or blank input yields `None`.
pub fn parse_optional(s: Option<&str>) -> Option<Result<NaiveDateTime>> {
    match s {
        Some(s) if !s.trim().is_empty() => Some(parse_timestamp(s)),
        _ => None,
    }
}

/// Hours elapsed from `start` to `end`, never negative.
pub fn hours_between(start: NaiveDateTime, end: NaiveDateTime) -> f64 {
    let secs = (end - start).num_seconds();
    (secs.max(0) as f64) / 3600.0
}

/// Days between Jan 1 and the Monday on or before it.
fn jan1_offset(date: NaiveDate) -> i64 {
    (date.weekday().num_days_from_monday() as i64 - date.ordinal0() as i64).rem_euclid(7)
}

/// First day of week 1: the Monday on or before Jan 1 of `year`.
pub fn week_one_start(year: i32) -> Option<NaiveDate> {
    let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)?;
    Some(jan1 - Duration::days(jan1_offset(jan1)))
}

/// Year whose week grid `date` falls in.
///
/// The days before Jan 1 that start week 1 of the next year belong to that
/// next year, so 2024-12-30 is in the 2025 grid.
pub fn week_year(date: NaiveDate) -> i32 {
    let next = date.year() + 1;
    match week_one_start(next) {
        Some(start) if date >= start => next,
        _ => date.year(),
    }
}

/// Week number (1..=52) of `date` within the grid of [`week_year`].
///
/// Weeks run Monday to Sunday and week 1 is the week containing Jan 1.
/// A grid that would run to 53 weeks folds its last week into week 52.
pub fn week_of_year(date: NaiveDate) -> u8 {
    let days = week_one_start(week_year(date)).map_or(0, |start| (date - start).num_days());
    (days / 7 + 1).clamp(1, WEEKS_PER_YEAR as i64) as u8
}

/// Inclusive range of `week` in the grid of `year`.
///
/// Every week is Monday..Sunday except a folded week 52, which runs up to
/// the day before week 1 of the next year.
pub fn week_range(year: i32, week: u8) -> Option<(NaiveDate, NaiveDate)> {
    if !(1..=WEEKS_PER_YEAR).contains(&week) {
        return None;
    }
    let start = week_one_start(year)? + Duration::days((week as i64 - 1) * 7);
    let end = if week == WEEKS_PER_YEAR {
        week_one_start(year + 1)?.pred_opt()?
    } else {
        start + Duration::days(6)
    };
    Some((start, end))
}

/// Get the last day of a given month (1-based).
pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    first_of_next.pred_opt()
}
