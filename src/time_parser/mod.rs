//! Time handling for voice bookings
//!
//! This module turns what a caller said ("3 chiều 15/2", "mai 10h30") into a
//! UTC instant and renders instants in the wire format the booking API wants.
//! Everything here is pure: "now" and the timezone offset are always passed in.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};

pub mod spoken;
pub mod window;
pub mod wire_format;

pub use spoken::{resolve, ParseSettings};
pub use window::TimeWindow;
pub use wire_format::{format_wire, structured_to_wire, WIRE_FORMAT};

/// Offset used when nothing is configured (Asia/Ho_Chi_Minh, UTC+7)
pub const DEFAULT_TZ_OFFSET_MINUTES: i32 = 420;

/// Errors produced while resolving or formatting times
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeError {
    #[error("Time text is empty")]
    MissingTime,
    #[error("No time of day found in '{0}'")]
    MissingTimeOfDay(String),
    #[error("Invalid time: {0}")]
    InvalidTime(String),
}

/// Fixed offset from UTC, in minutes east.
///
/// Offsets of a full day or more are rejected on construction, so converting
/// between UTC and local wall-clock time never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TzOffset(i32);

impl TzOffset {
    pub fn from_minutes(minutes: i32) -> Option<Self> {
        if minutes.abs() < 24 * 60 {
            Some(Self(minutes))
        } else {
            None
        }
    }

    pub fn minutes(&self) -> i32 {
        self.0
    }

    /// Local wall-clock time for a UTC instant
    pub fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.naive_utc() + Duration::minutes(i64::from(self.0))
    }

    /// UTC instant for a local wall-clock time
    pub fn to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        Utc.from_utc_datetime(&(local - Duration::minutes(i64::from(self.0))))
    }
}

impl Default for TzOffset {
    fn default() -> Self {
        Self(DEFAULT_TZ_OFFSET_MINUTES)
    }
}
