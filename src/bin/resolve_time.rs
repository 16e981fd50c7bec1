//! Resolve a spoken time from the command line, using the same defaults as
//! the server.
//!
//! ```text
//! resolve_time "3 chiều 15/2" [duration_minutes]
//! ```

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use log::debug;
use voicebook::config::BookingDefaults;
use voicebook::env_manager;
use voicebook::time_parser::{ParseSettings, TimeWindow};

fn main() -> Result<()> {
    voicebook::init_logger();
    env_manager::load_env_file();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let text = args
        .first()
        .ok_or_else(|| anyhow!("Usage: resolve_time \"<time text>\" [duration_minutes]"))?;

    let defaults = BookingDefaults::from_env().context("Invalid booking configuration")?;
    let duration = match args.get(1) {
        Some(raw) => raw
            .parse::<u32>()
            .with_context(|| format!("'{}' is not a number of minutes", raw))?,
        None => defaults.duration_minutes,
    };

    let settings = ParseSettings::new(defaults.tz_offset, Utc::now());
    debug!("Resolving '{}' with {:?}", text, settings);

    let window = TimeWindow::from_time_text(text, duration, &settings)?;
    let (start, end) = window.wire(defaults.tz_offset);

    println!("Start: {} (UTC {})", start, window.start.to_rfc3339());
    println!("End:   {} (UTC {})", end, window.end.to_rfc3339());
    Ok(())
}
