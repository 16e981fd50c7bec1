//! Wire format for the booking API: `MM/DD/YYYY HH:mm` in local wall-clock time.

use super::{TimeError, TzOffset};
use chrono::{DateTime, NaiveDateTime, Utc};

pub const WIRE_FORMAT: &str = "%m/%d/%Y %H:%M";

// Accepted shapes for structured start/end times sent by the voice agent.
const STRUCTURED_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    WIRE_FORMAT,
];

/// Render a UTC instant as local `MM/DD/YYYY HH:mm`
pub fn format_wire(instant: DateTime<Utc>, tz_offset: TzOffset) -> String {
    tz_offset.to_local(instant).format(WIRE_FORMAT).to_string()
}

/// Convert a structured local time such as `2026-02-09 18:30` into wire format.
///
/// Values already in wire format are validated and passed through.
pub fn structured_to_wire(text: &str) -> Result<String, TimeError> {
    let trimmed = text.trim();
    STRUCTURED_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(|local| local.format(WIRE_FORMAT).to_string())
        .ok_or_else(|| {
            TimeError::InvalidTime(format!(
                "'{}' is not in YYYY-MM-DD HH:mm or MM/DD/YYYY HH:mm format",
                trimmed
            ))
        })
}

/// Parse a wire-format string back into local wall-clock time
pub fn parse_wire(text: &str) -> Result<NaiveDateTime, TimeError> {
    NaiveDateTime::parse_from_str(text.trim(), WIRE_FORMAT)
        .map_err(|e| TimeError::InvalidTime(format!("'{}': {}", text.trim(), e)))
}
