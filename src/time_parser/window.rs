use super::spoken::{resolve, ParseSettings};
use super::wire_format::format_wire;
use super::{TimeError, TzOffset};
use chrono::{DateTime, Duration, TimeZone, Utc};
use log::debug;

/// Start/end pair for one appointment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Window of `duration_minutes` starting at `start`. A zero duration is rejected.
    pub fn starting_at(start: DateTime<Utc>, duration_minutes: u32) -> Result<Self, TimeError> {
        if duration_minutes == 0 {
            return Err(TimeError::InvalidTime(
                "duration must be at least one minute".to_string(),
            ));
        }
        Ok(Self {
            start,
            end: start + Duration::minutes(i64::from(duration_minutes)),
        })
    }

    /// Resolve spoken time text and build the window from it
    pub fn from_time_text(
        text: &str,
        duration_minutes: u32,
        settings: &ParseSettings,
    ) -> Result<Self, TimeError> {
        let start = resolve(text, settings)?;
        Self::starting_at(start, duration_minutes)
    }

    /// First slot at least `lead_minutes` from now, aligned to `round_minutes`
    /// on the local clock. A `round_minutes` of zero disables alignment.
    pub fn next_available(
        settings: &ParseSettings,
        lead_minutes: u32,
        round_minutes: u32,
        duration_minutes: u32,
    ) -> Result<Self, TimeError> {
        let earliest = settings.tz_offset.to_local(settings.now_utc)
            + Duration::minutes(i64::from(lead_minutes));

        let local_start = if round_minutes == 0 {
            earliest
        } else {
            let step = i64::from(round_minutes) * 60_000;
            let millis = Utc.from_utc_datetime(&earliest).timestamp_millis();
            let rounded = (millis + step - 1).div_euclid(step) * step;
            Utc.timestamp_millis_opt(rounded)
                .single()
                .map(|dt| dt.naive_utc())
                .ok_or_else(|| TimeError::InvalidTime("slot out of range".to_string()))?
        };

        debug!("Next available local slot: {}", local_start);
        Self::starting_at(settings.tz_offset.to_utc(local_start), duration_minutes)
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// `(startTime, endTime)` in wire format
    pub fn wire(&self, tz_offset: TzOffset) -> (String, String) {
        (format_wire(self.start, tz_offset), format_wire(self.end, tz_offset))
    }
}
