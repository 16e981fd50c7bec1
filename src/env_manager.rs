use log::{debug, info, warn};
use std::env;
use std::path::PathBuf;

pub const REQUIRED_ENV_VARS: &[&str] = &["ONTILOO_API_KEY", "RETELL_FUNCTION_SECRET"];

// Names of optional environment variables
pub const OPTIONAL_ENV_VARS: &[&str] = &[
    "HOST",
    "PORT",
    "ONTILOO_BASE_URL",
    "ONTILOO_BEARER_TOKEN",
    "BOOKING_TZ_OFFSET_MINUTES",
    "DEFAULT_LEAD_MINUTES",
    "DEFAULT_DURATION_MINUTES",
    "DEFAULT_ROUND_MINUTES",
    "DEFAULT_GROUP",
    "DEFAULT_SERVICE_IDS",
    "DEFAULT_STAFF_IDS",
    "DEFAULT_REQUEST_STAFF",
    "DEFAULT_SOURCE_TYPE",
    "RUST_LOG",
];

// Older deployments used these names; the first entry wins when both are set.
const ENV_ALIASES: &[(&str, &str)] = &[
    ("ONTILOO_API_KEY", "ONTILOO_X_API_KEY"),
    ("ONTILOO_BEARER_TOKEN", "ONTILOO_AUTH_TOKEN"),
    ("DEFAULT_STAFF_IDS", "DEFAULT_STAFF_ID"),
];

/// Load `.env` from the working directory (or a parent) if there is one
pub fn load_env_file() -> Option<PathBuf> {
    match dotenvy::dotenv() {
        Ok(path) => {
            info!("Loaded environment from {:?}", path);
            Some(path)
        }
        Err(e) => {
            info!("No .env file found or error loading it: {}", e);
            None
        }
    }
}

/// Read a variable through `lookup`, falling back to its legacy alias.
/// Blank values count as unset.
pub fn get_var_with<F>(name: &str, lookup: &F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    let direct = lookup(name).filter(|v| !v.trim().is_empty());
    if direct.is_some() {
        return direct;
    }

    ENV_ALIASES
        .iter()
        .find(|(primary, _)| *primary == name)
        .and_then(|(_, alias)| lookup(alias))
        .filter(|v| !v.trim().is_empty())
}

pub fn missing_required_vars_with<F>(lookup: &F) -> Vec<&'static str>
where
    F: Fn(&str) -> Option<String>,
{
    REQUIRED_ENV_VARS
        .iter()
        .copied()
        .filter(|var| get_var_with(var, lookup).is_none())
        .collect()
}

/// Log and return every required variable that is not set
pub fn check_env_vars() -> Vec<&'static str> {
    let lookup = |key: &str| env::var(key).ok();
    let missing = missing_required_vars_with(&lookup);
    for var in &missing {
        warn!("Missing required environment variable: {}", var);
    }
    for var in OPTIONAL_ENV_VARS {
        if get_var_with(var, &lookup).is_none() {
            debug!("{} not set, using default", var);
        }
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_alias_fallback() {
        let lookup = lookup_from(&[("ONTILOO_X_API_KEY", "legacy")]);
        assert_eq!(get_var_with("ONTILOO_API_KEY", &lookup), Some("legacy".to_string()));

        let lookup = lookup_from(&[("ONTILOO_API_KEY", "new"), ("ONTILOO_X_API_KEY", "legacy")]);
        assert_eq!(get_var_with("ONTILOO_API_KEY", &lookup), Some("new".to_string()));
    }

    #[test]
    fn test_blank_counts_as_unset() {
        let lookup = lookup_from(&[("ONTILOO_API_KEY", "  "), ("ONTILOO_X_API_KEY", "legacy")]);
        assert_eq!(get_var_with("ONTILOO_API_KEY", &lookup), Some("legacy".to_string()));
        assert_eq!(get_var_with("PORT", &lookup_from(&[("PORT", "")])), None);
    }

    #[test]
    fn test_missing_required_vars() {
        let lookup = lookup_from(&[("ONTILOO_AUTH_TOKEN", "t")]);
        assert_eq!(
            missing_required_vars_with(&lookup),
            vec!["ONTILOO_API_KEY", "RETELL_FUNCTION_SECRET"]
        );

        let lookup = lookup_from(&[("ONTILOO_X_API_KEY", "k"), ("RETELL_FUNCTION_SECRET", "s")]);
        assert!(missing_required_vars_with(&lookup).is_empty());
    }
}
