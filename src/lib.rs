pub mod api_server;
pub mod booking;
pub mod config;
pub mod env_manager;
pub mod ontiloo;
pub mod time_parser;
pub mod validation;

use anyhow::Result;
use env_logger::Env;
use log::*;

/// Load `.env`, build the config and serve the webhook API until shutdown
pub async fn run() -> Result<()> {
    env_manager::load_env_file();

    let missing = env_manager::check_env_vars();
    if !missing.is_empty() {
        warn!("Starting with missing variables: {}", missing.join(", "));
    }

    let config = Config::from_env()?;
    info!(
        "Booking defaults: offset {} min, duration {} min, group {}",
        config.booking.tz_offset.minutes(),
        config.booking.duration_minutes,
        config.booking.group
    );
    api_server::start_api_server(config).await
}

pub fn init_logger() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            use chrono::Local;
            use std::io::Write;
            writeln!(
                buf,
                "{} [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();
}

// Re-export commonly used types
pub use booking::{BookingError, BookingOrchestrator, BookingRequest, BookingResult};
pub use config::Config;
pub use time_parser::{resolve, ParseSettings, TimeError, TimeWindow, TzOffset};
