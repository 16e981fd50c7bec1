use crate::env_manager::get_var_with;
use crate::time_parser::{TzOffset, DEFAULT_TZ_OFFSET_MINUTES};
use anyhow::{anyhow, Context, Result};
use secrecy::SecretString;
use std::env;
use std::str::FromStr;

pub const DEFAULT_BASE_URL: &str = "https://api.ontiloo.com";

/// Process-wide settings, read once at start-up and never mutated
#[derive(Debug, Default)]
pub struct Config {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub booking: BookingDefaults,
}

#[derive(Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Expected value of the `x-retell-secret` header
    pub webhook_secret: Option<SecretString>,
}

#[derive(Debug)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub api_key: SecretString,
    pub bearer_token: Option<SecretString>,
}

/// Defaults applied to bookings when the caller leaves fields out
#[derive(Debug, Clone, PartialEq)]
pub struct BookingDefaults {
    pub tz_offset: TzOffset,
    pub lead_minutes: u32,
    pub duration_minutes: u32,
    pub round_minutes: u32,
    pub group: u64,
    /// Pool a service is picked from at random
    pub service_ids: Vec<u64>,
    /// Pool a staff member is picked from at random
    pub staff_ids: Vec<u64>,
    pub request_staff: bool,
    pub source_type: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            webhook_secret: None,
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: SecretString::from(String::new()),
            bearer_token: None,
        }
    }
}

impl Default for BookingDefaults {
    fn default() -> Self {
        Self {
            tz_offset: TzOffset::default(),
            lead_minutes: 60,
            duration_minutes: 30,
            round_minutes: 30,
            group: 1656,
            service_ids: vec![6137],
            staff_ids: vec![1643],
            request_staff: true,
            source_type: "AI".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ServerConfig::default();
        let server = ServerConfig {
            host: get_var_with("HOST", &lookup).unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT")?.unwrap_or(defaults.port),
            webhook_secret: get_var_with("RETELL_FUNCTION_SECRET", &lookup).map(SecretString::from),
        };

        let api_key = get_var_with("ONTILOO_API_KEY", &lookup)
            .ok_or_else(|| anyhow!("ONTILOO_API_KEY environment variable not set"))?;
        let upstream = UpstreamConfig {
            base_url: get_var_with("ONTILOO_BASE_URL", &lookup)
                .map(|url| url.trim().trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key: SecretString::from(api_key),
            bearer_token: get_var_with("ONTILOO_BEARER_TOKEN", &lookup).map(SecretString::from),
        };

        Ok(Self {
            server,
            upstream,
            booking: BookingDefaults::from_lookup(&lookup)?,
        })
    }
}

impl BookingDefaults {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|key: &str| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let offset_minutes: i32 =
            parse_var(lookup, "BOOKING_TZ_OFFSET_MINUTES")?.unwrap_or(DEFAULT_TZ_OFFSET_MINUTES);
        let tz_offset = TzOffset::from_minutes(offset_minutes).ok_or_else(|| {
            anyhow!("BOOKING_TZ_OFFSET_MINUTES out of range: {}", offset_minutes)
        })?;

        let duration_minutes = parse_var(lookup, "DEFAULT_DURATION_MINUTES")?
            .unwrap_or(defaults.duration_minutes);
        if duration_minutes == 0 {
            return Err(anyhow!("DEFAULT_DURATION_MINUTES must be positive"));
        }

        let service_ids = match get_var_with("DEFAULT_SERVICE_IDS", lookup) {
            Some(raw) => parse_id_list(&raw).context("Failed to parse DEFAULT_SERVICE_IDS")?,
            None => defaults.service_ids,
        };
        let staff_ids = match get_var_with("DEFAULT_STAFF_IDS", lookup) {
            Some(raw) => parse_id_list(&raw).context("Failed to parse DEFAULT_STAFF_IDS")?,
            None => defaults.staff_ids,
        };
        let request_staff = match get_var_with("DEFAULT_REQUEST_STAFF", lookup) {
            Some(raw) => parse_bool(&raw).context("Failed to parse DEFAULT_REQUEST_STAFF")?,
            None => defaults.request_staff,
        };

        Ok(Self {
            tz_offset,
            lead_minutes: parse_var(lookup, "DEFAULT_LEAD_MINUTES")?.unwrap_or(defaults.lead_minutes),
            duration_minutes,
            round_minutes: parse_var(lookup, "DEFAULT_ROUND_MINUTES")?
                .unwrap_or(defaults.round_minutes),
            group: parse_var(lookup, "DEFAULT_GROUP")?.unwrap_or(defaults.group),
            service_ids,
            staff_ids,
            request_staff,
            source_type: get_var_with("DEFAULT_SOURCE_TYPE", lookup)
                .map(|s| s.trim().to_string())
                .unwrap_or(defaults.source_type),
        })
    }
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    get_var_with(name, lookup)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("Failed to parse {}={:?}", name, raw))
        })
        .transpose()
}

fn parse_id_list(raw: &str) -> Result<Vec<u64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u64>()
                .with_context(|| format!("'{}' is not a numeric id", part))
        })
        .collect()
}

fn parse_bool(raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(anyhow!("'{}' is not a boolean", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.upstream.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.booking.tz_offset.minutes(), 420);
        assert_eq!(config.booking.duration_minutes, 30);
        assert_eq!(config.booking.group, 1656);
        assert_eq!(config.booking.service_ids, vec![6137]);
        assert_eq!(config.booking.staff_ids, vec![1643]);
        assert!(config.booking.request_staff);
        assert_eq!(config.booking.source_type, "AI");
    }

    #[test]
    fn test_config_from_lookup_minimal() -> Result<()> {
        let config = Config::from_lookup(lookup_from(&[("ONTILOO_API_KEY", "key")]))?;
        assert_eq!(config.upstream.api_key.expose_secret(), "key");
        assert!(config.upstream.bearer_token.is_none());
        assert!(config.server.webhook_secret.is_none());
        assert_eq!(config.booking, BookingDefaults::default());
        Ok(())
    }

    #[test]
    fn test_config_from_lookup_overrides() -> Result<()> {
        let config = Config::from_lookup(lookup_from(&[
            ("ONTILOO_X_API_KEY", "legacy-key"),
            ("ONTILOO_AUTH_TOKEN", "tok"),
            ("ONTILOO_BASE_URL", "https://staging.ontiloo.com/"),
            ("RETELL_FUNCTION_SECRET", "shh"),
            ("PORT", "8080"),
            ("BOOKING_TZ_OFFSET_MINUTES", "-300"),
            ("DEFAULT_DURATION_MINUTES", "45"),
            ("DEFAULT_SERVICE_IDS", "11, 12,,13"),
            ("DEFAULT_STAFF_ID", "7"),
            ("DEFAULT_REQUEST_STAFF", "false"),
            ("DEFAULT_SOURCE_TYPE", "VOICE"),
        ]))?;

        assert_eq!(config.upstream.api_key.expose_secret(), "legacy-key");
        assert_eq!(
            config.upstream.bearer_token.as_ref().map(|t| t.expose_secret().to_string()),
            Some("tok".to_string())
        );
        assert_eq!(config.upstream.base_url, "https://staging.ontiloo.com");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.booking.tz_offset.minutes(), -300);
        assert_eq!(config.booking.duration_minutes, 45);
        assert_eq!(config.booking.service_ids, vec![11, 12, 13]);
        assert_eq!(config.booking.staff_ids, vec![7]);
        assert!(!config.booking.request_staff);
        assert_eq!(config.booking.source_type, "VOICE");
        Ok(())
    }

    #[test]
    fn test_config_requires_api_key() {
        assert!(Config::from_lookup(lookup_from(&[])).is_err());
    }

    #[test]
    fn test_config_rejects_malformed_values() {
        for (name, value) in [
            ("PORT", "http"),
            ("BOOKING_TZ_OFFSET_MINUTES", "2000"),
            ("DEFAULT_DURATION_MINUTES", "0"),
            ("DEFAULT_SERVICE_IDS", "6137,abc"),
            ("DEFAULT_REQUEST_STAFF", "maybe"),
            ("DEFAULT_GROUP", "-1"),
        ] {
            let result = Config::from_lookup(lookup_from(&[("ONTILOO_API_KEY", "key"), (name, value)]));
            assert!(result.is_err(), "{}={} should be rejected", name, value);
        }
    }
}
