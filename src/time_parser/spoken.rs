//! Spoken date/time parser
//!
//! Resolves loosely formatted Vietnamese/English expressions into an absolute
//! instant. Supported shapes:
//! - dates: `15/2`, `15-2`, `15/2/2026` (day first)
//! - clock: `10`, `10h`, `10h30`, `10:30`, `10 giờ 30`, `10am`, `3 pm`, `6 rưỡi`
//! - day parts: `sáng`, `trưa`, `chiều`, `tối`, `đêm`
//! - relative days: `hôm nay`/`today`, `mai`/`tomorrow`, `mốt`, `tuần sau`/`next week`
//!
//! Rules: without a year the local current year is used, and a date earlier in
//! the year than today rolls over to next year. A bare hour without am/pm or a
//! day part is taken literally (`"3"` is 03:00).

use super::{TimeError, TzOffset};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

static DATE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})[/-](\d{1,2})(?:[/-](\d{4}))?\b").expect("date token regex")
});

static CLOCK_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?P<hour>\d{1,2})(?:\s*(?::|h|giờ)\s*(?P<minute>\d{2})|\s*(?:h|giờ))?\s*(?P<meridiem>am|pm)?\b",
    )
    .expect("clock token regex")
});

static HALF_PAST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:giờ\s*)?rưỡi\b").expect("half past regex"));

static AFTERNOON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:chiều|tối|đêm)\b").expect("afternoon regex"));
static NOON: Lazy<Regex> = Lazy::new(|| Regex::new(r"\btrưa\b").expect("noon regex"));
static MORNING: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bsáng\b").expect("morning regex"));

static TODAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:hôm nay|today)\b").expect("today regex"));

// Most specific first: "day after tomorrow" contains "tomorrow".
static RELATIVE_DAYS: Lazy<Vec<(Regex, i64)>> = Lazy::new(|| {
    [
        (r"\b(?:tuần sau|tuần tới|next week)\b", 7),
        (r"\b(?:mốt|day after tomorrow)\b", 2),
        (r"\b(?:mai|tomorrow)\b", 1),
        (r"\b(?:hôm nay|today)\b", 0),
    ]
    .into_iter()
    .map(|(pattern, days)| (Regex::new(pattern).expect("relative day regex"), days))
    .collect()
});

/// Inputs the parser needs besides the text itself
#[derive(Debug, Clone, Copy)]
pub struct ParseSettings {
    pub tz_offset: TzOffset,
    pub now_utc: DateTime<Utc>,
}

impl ParseSettings {
    pub fn new(tz_offset: TzOffset, now_utc: DateTime<Utc>) -> Self {
        Self { tz_offset, now_utc }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Meridiem {
    Am,
    Pm,
}

#[derive(Debug)]
struct DateToken {
    day: u32,
    month: u32,
    year: Option<i32>,
    span: Range<usize>,
}

#[derive(Debug)]
struct ClockReading {
    hour: u32,
    minute: u32,
    meridiem: Option<Meridiem>,
}

/// Resolve spoken time text into a UTC instant
///
/// # Arguments
///
/// * `text` - What the caller said, e.g. "10:30 sáng ngày 15/2"
/// * `settings` - Timezone offset and the current instant
///
/// # Returns
///
/// * `Result<DateTime<Utc>, TimeError>` - The instant, or why the text could not be used
pub fn resolve(text: &str, settings: &ParseSettings) -> Result<DateTime<Utc>, TimeError> {
    let normalized = normalize(text);
    if normalized.is_empty() {
        return Err(TimeError::MissingTime);
    }

    let today = settings.tz_offset.to_local(settings.now_utc).date();
    let date_token = find_date_token(&normalized)?;

    // The day number must not be read as the hour ("15/2 10am").
    let clock_text = match &date_token {
        Some(token) => {
            let mut remainder = normalized.clone();
            remainder.replace_range(token.span.clone(), " ");
            remainder
        }
        None => normalized.clone(),
    };
    let clock = find_clock(&clock_text)
        .ok_or_else(|| TimeError::MissingTimeOfDay(text.trim().to_string()))?;
    let hour = to_24_hour(&clock, &normalized);

    let date = match &date_token {
        Some(token) => calendar_date(token, today)?,
        None => relative_date(&normalized, today),
    };

    let time = NaiveTime::from_hms_opt(hour, clock.minute, 0).ok_or_else(|| {
        TimeError::InvalidTime(format!("{:02}:{:02} is not a valid time of day", hour, clock.minute))
    })?;

    let mut instant = settings.tz_offset.to_utc(date.and_time(time));
    if date_token.is_none() && TODAY.is_match(&normalized) && instant < settings.now_utc {
        debug!("'{}' already passed today, moving to tomorrow", normalized);
        instant += Duration::days(1);
    }

    debug!("Resolved '{}' -> {}", text, instant);
    Ok(instant)
}

fn normalize(text: &str) -> String {
    text.to_lowercase()
        .replace(',', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn find_date_token(text: &str) -> Result<Option<DateToken>, TimeError> {
    let Some(caps) = DATE_TOKEN.captures(text) else {
        return Ok(None);
    };

    let span = caps.get(0).map_or(0..0, |m| m.range());
    let day: u32 = caps[1].parse().map_err(|_| invalid_date(&caps[0]))?;
    let month: u32 = caps[2].parse().map_err(|_| invalid_date(&caps[0]))?;
    let year = match caps.get(3) {
        Some(m) => Some(m.as_str().parse::<i32>().map_err(|_| invalid_date(&caps[0]))?),
        None => None,
    };

    if !(1..=31).contains(&day) || !(1..=12).contains(&month) {
        return Err(invalid_date(&caps[0]));
    }

    Ok(Some(DateToken { day, month, year, span }))
}

fn invalid_date(token: &str) -> TimeError {
    TimeError::InvalidTime(format!("'{}' is not a valid day/month", token))
}

fn find_clock(text: &str) -> Option<ClockReading> {
    let caps = CLOCK_TOKEN.captures(text)?;
    let whole = caps.get(0)?;
    let hour: u32 = caps.name("hour")?.as_str().parse().ok()?;

    let minute = match caps.name("minute") {
        Some(m) => m.as_str().parse().ok()?,
        None if HALF_PAST.is_match(&text[whole.end()..]) => 30,
        None => 0,
    };

    let meridiem = caps.name("meridiem").map(|m| match m.as_str() {
        "pm" => Meridiem::Pm,
        _ => Meridiem::Am,
    });

    Some(ClockReading { hour, minute, meridiem })
}

/// Convert the clock reading to a 24-hour value using am/pm or day-part keywords
fn to_24_hour(clock: &ClockReading, text: &str) -> u32 {
    let hour = clock.hour;

    if let Some(meridiem) = clock.meridiem {
        return match (hour, meridiem) {
            (12, Meridiem::Am) => 0,
            (12, Meridiem::Pm) => 12,
            (1..=11, Meridiem::Pm) => hour + 12,
            _ => hour,
        };
    }

    if !(1..=12).contains(&hour) {
        return hour;
    }

    if AFTERNOON.is_match(text) {
        if hour == 12 {
            12
        } else {
            hour + 12
        }
    } else if NOON.is_match(text) {
        if hour <= 5 {
            hour + 12
        } else {
            hour
        }
    } else if MORNING.is_match(text) {
        if hour == 12 {
            0
        } else {
            hour
        }
    } else {
        // Ambiguous: no am/pm and no day part, taken as given.
        hour
    }
}

fn calendar_date(token: &DateToken, today: NaiveDate) -> Result<NaiveDate, TimeError> {
    let year = match token.year {
        Some(year) => year,
        None => {
            let input_key = token.month * 100 + token.day;
            let today_key = today.month() * 100 + today.day();
            if input_key < today_key {
                today.year() + 1
            } else {
                today.year()
            }
        }
    };

    NaiveDate::from_ymd_opt(year, token.month, token.day).ok_or_else(|| {
        TimeError::InvalidTime(format!(
            "{}/{}/{} is not a calendar date",
            token.day, token.month, year
        ))
    })
}

fn relative_date(text: &str, today: NaiveDate) -> NaiveDate {
    RELATIVE_DAYS
        .iter()
        .find(|(re, _)| re.is_match(text))
        .map_or(today, |(_, days)| today + Duration::days(*days))
}
