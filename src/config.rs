use std::{env, fmt::Display, str::FromStr, time::Duration};

use tracing::{info, warn};

use crate::error::ConfigError;

const DEFAULT_PORT: &str = "5000";
const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";
const DEFAULT_MAX_CONNECTIONS: &str = "5";
const DEFAULT_REQUEST_TIMEOUT_MS: &str = "5000";

/// Cross-origin callers the boundary accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    /// `*`: any origin, without credentials.
    Any,
    List(Vec<String>),
}

impl AllowedOrigins {
    /// Parse a comma-separated origin list. A `*` entry anywhere means any
    /// origin; blank entries are skipped.
    pub fn parse(raw: &str) -> Self {
        let origins: Vec<String> = raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if origins.iter().any(|o| o == "*") {
            Self::Any
        } else {
            Self::List(origins)
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub admin_key: String,
    /// `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub allowed_origins: AllowedOrigins,
    pub request_timeout: Duration,
}

impl Config {
    /// Read configuration from the process environment. A `.env` file, if
    /// present, is loaded first.
    pub fn load() -> Result<Self, ConfigError> {
        if dotenvy::dotenv().is_ok() {
            info!("Loaded .env file");
        }

        let admin_key = var("ADMIN_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::Missing("ADMIN_KEY"))?;

        let database_url = var("DATABASE_URL").filter(|u| !u.trim().is_empty());
        if database_url.is_none() {
            warn!("DATABASE_URL not set, polls will be kept in memory only");
        }

        let allowed_origins = AllowedOrigins::parse(
            &var("FRONTEND_URL").unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_string()),
        );
        if allowed_origins == AllowedOrigins::Any {
            warn!("FRONTEND_URL allows any origin, credentials are disabled");
        }

        let timeout_ms: u64 = try_load("REQUEST_TIMEOUT_MS", DEFAULT_REQUEST_TIMEOUT_MS)?;

        Ok(Self {
            port: try_load("PORT", DEFAULT_PORT)?,
            admin_key,
            database_url,
            max_connections: try_load("DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
            allowed_origins,
            request_timeout: Duration::from_millis(timeout_ms),
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_load_falls_back_to_default() {
        let port: u16 = try_load("MICROPOLLS_TEST_UNSET_PORT", "5000").unwrap();
        assert_eq!(port, 5000);
    }

    #[test]
    fn wildcard_origin_means_any() {
        assert_eq!(AllowedOrigins::parse("*"), AllowedOrigins::Any);
        assert_eq!(
            AllowedOrigins::parse("http://localhost:5173, *"),
            AllowedOrigins::Any
        );
    }

    #[test]
    fn origin_list_is_trimmed() {
        assert_eq!(
            AllowedOrigins::parse(" http://a.test ,,http://b.test"),
            AllowedOrigins::List(vec!["http://a.test".into(), "http://b.test".into()])
        );
    }

    #[test]
    fn try_load_reports_bad_values() {
        let err = try_load::<u16>("MICROPOLLS_TEST_UNSET_PORT", "not-a-port").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "MICROPOLLS_TEST_UNSET_PORT", .. }));
    }
}
