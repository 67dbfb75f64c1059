//! Free-text time expressions ("tomorrow 10:00", "in 2 hours", ...).

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use regex::Regex;
use std::sync::LazyLock;

/// Accepted formats, one per line, as shown to users.
pub const FORMAT_HINT: &str = "\
• today 20:30
• tomorrow 10:00
• 25.12.2026 15:45
• 15:30
• in 2 hours
• in 30 minutes
• in 1 day
• in an hour / in half an hour / in a day / in a week";

/// Nothing in the input could be read as a point in time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("could not understand the time {0:?}")]
pub struct ParseError(pub String);

static TODAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^today\s+(\d{1,2}):(\d{2})$").expect("valid regex"));
static TOMORROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^tomorrow\s+(\d{1,2}):(\d{2})$").expect("valid regex"));
static ABSOLUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})\.(\d{1,2})\.(\d{4})\s+(\d{1,2}):(\d{2})$").expect("valid regex")
});
static CLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2}):(\d{2})$").expect("valid regex"));
static RELATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^in\s+(\d+)\s*(hours|hour|h|minutes|minute|mins|min|m|days|day|d)$")
        .expect("valid regex")
});

/// Parse `text` relative to `now`.
///
/// Clock times that are not after `now` roll over to the next day; absolute
/// dates are taken as given. Callers decide whether a past result is acceptable.
pub fn parse(text: &str, now: NaiveDateTime) -> Result<NaiveDateTime, ParseError> {
    let err = || ParseError(text.trim().to_string());
    let input = text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    let now = now.with_nanosecond(0).unwrap_or(now);

    if let Some(delta) = lexicon(&input) {
        return Ok(now + delta);
    }

    if let Some(c) = TODAY.captures(&input) {
        let t = clock(&c[1], &c[2]).ok_or_else(err)?;
        return Ok(roll_forward(now.date().and_time(t), now));
    }

    if let Some(c) = TOMORROW.captures(&input) {
        let t = clock(&c[1], &c[2]).ok_or_else(err)?;
        return Ok((now.date() + Duration::days(1)).and_time(t));
    }

    if let Some(c) = ABSOLUTE.captures(&input) {
        let date = NaiveDate::from_ymd_opt(
            c[3].parse().map_err(|_| err())?,
            c[2].parse().map_err(|_| err())?,
            c[1].parse().map_err(|_| err())?,
        )
        .ok_or_else(err)?;
        let t = clock(&c[4], &c[5]).ok_or_else(err)?;
        return Ok(date.and_time(t));
    }

    if let Some(c) = CLOCK.captures(&input) {
        let t = clock(&c[1], &c[2]).ok_or_else(err)?;
        return Ok(roll_forward(now.date().and_time(t), now));
    }

    if let Some(c) = RELATIVE.captures(&input) {
        let n: i64 = c[1].parse().map_err(|_| err())?;
        if n < 1 {
            return Err(err());
        }
        let delta = match &c[2] {
            "hours" | "hour" | "h" => Duration::try_hours(n),
            "days" | "day" | "d" => Duration::try_days(n),
            _ => Duration::try_minutes(n),
        }
        .ok_or_else(err)?;
        return now.checked_add_signed(delta).ok_or_else(err);
    }

    Err(err())
}

fn lexicon(input: &str) -> Option<Duration> {
    match input {
        "in an hour" => Some(Duration::hours(1)),
        "in half an hour" => Some(Duration::minutes(30)),
        "in a day" => Some(Duration::days(1)),
        "in a week" => Some(Duration::weeks(1)),
        _ => None,
    }
}

fn clock(h: &str, m: &str) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(h.parse().ok()?, m.parse().ok()?, 0)
}

fn roll_forward(candidate: NaiveDateTime, now: NaiveDateTime) -> NaiveDateTime {
    if candidate <= now {
        candidate + Duration::days(1)
    } else {
        candidate
    }
}
