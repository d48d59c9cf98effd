//! Time related utils.
//!
//! Every formatter here spells month and weekday names from fixed English
//! tables, so the output never depends on the process locale.

use chrono::{Datelike, NaiveDateTime, SubsecRound, Timelike, Utc};

use crate::{Error, Result};

/// DateTime is the alias for chrono::DateTime<Utc>.
pub type DateTime = chrono::DateTime<Utc>;

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Create datetime of now.
pub fn now() -> DateTime {
    Utc::now()
}

/// Format time into RFC 1123 http date: "Sun, 06 Nov 1994 08:49:37 GMT"
pub fn format_http_date(t: DateTime) -> String {
    format!(
        "{}, {:02} {} {:04} {:02}:{:02}:{:02} GMT",
        WEEKDAYS[t.weekday().num_days_from_monday() as usize],
        t.day(),
        MONTHS[t.month0() as usize],
        t.year(),
        t.hour(),
        t.minute(),
        t.second(),
    )
}

/// Parse an RFC 1123 http date like "Sun, 06 Nov 1994 08:49:37 GMT".
///
/// The weekday is checked for shape only; the calendar date wins.
pub fn parse_http_date(s: &str) -> Result<DateTime> {
    let invalid = || Error::parse(format!("invalid http date: {s}"));

    let (weekday, rest) = s.trim().split_once(", ").ok_or_else(invalid)?;
    if !WEEKDAYS.contains(&weekday) {
        return Err(invalid());
    }

    let mut parts = rest.split(' ');
    let (Some(day), Some(month), Some(year), Some(clock), Some("GMT"), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(invalid());
    };
    let month = MONTHS
        .iter()
        .position(|m| *m == month)
        .ok_or_else(invalid)?
        + 1;

    let text = format!("{year}-{month:02}-{day} {clock}");
    NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S")
        .map(|t| t.and_utc())
        .map_err(|e| invalid().with_source(e))
}

/// Format time into ISO 8601 with microseconds: "2022-03-01T08:12:34.000001Z"
pub fn format_iso8601_micros(t: DateTime) -> String {
    t.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Truncate time to microsecond precision.
pub fn truncate_micros(t: DateTime) -> DateTime {
    t.trunc_subsecs(6)
}
