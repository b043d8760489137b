//! Deployment settings read from environment variables.
//!
//! `.env` is loaded by `main` before this runs, so values may come from either
//! the real environment or the file. Secrets stay here and are never written
//! to `config.toml`.

use super::database::DEFAULT_DATABASE_URL;
use crate::errors::{Error, Result};
use std::{env, str::FromStr};
use tracing::{info, warn};

/// Longest accepted session lifetime: one year.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

/// Environment-driven settings for the HTTP server and its collaborators.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Database connection string
    pub database_url: String,
    /// Socket address the HTTP server binds to
    pub bind_addr: String,
    /// Browser origin allowed by CORS (the SPA)
    pub client_origin: Option<String>,
    /// Session lifetime in hours
    pub session_ttl_hours: i64,
    /// Stripe secret key; `None` selects the in-memory gateway
    pub stripe_secret_key: Option<String>,
    /// Secret used to verify webhook signatures
    pub stripe_webhook_secret: Option<String>,
    /// Lowercase ISO currency code used for every price
    pub currency: String,
    /// Path to config.toml
    pub config_path: String,
    /// Administrator account created at startup if missing
    pub admin_email: Option<String>,
    /// Password for the bootstrap administrator
    pub admin_password: Option<String>,
}

impl Settings {
    /// Reads all settings from the environment, applying defaults.
    ///
    /// # Errors
    /// Returns [`Error::Config`] when a numeric variable does not parse or is
    /// out of range.
    pub fn from_env() -> Result<Self> {
        let stripe_secret_key = optional("STRIPE_SECRET_KEY");
        if stripe_secret_key.is_none() {
            warn!("STRIPE_SECRET_KEY not set, payments will use the in-memory gateway");
        }

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            client_origin: optional("CLIENT_ORIGIN"),
            session_ttl_hours: validate_session_ttl(parse_or("SESSION_TTL_HOURS", 168)?)?,
            stripe_secret_key,
            stripe_webhook_secret: optional("STRIPE_WEBHOOK_SECRET"),
            currency: env::var("CURRENCY")
                .map(|c| c.to_lowercase())
                .unwrap_or_else(|_| "usd".to_string()),
            config_path: env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string()),
            admin_email: optional("ADMIN_EMAIL"),
            admin_password: optional("ADMIN_PASSWORD"),
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            bind_addr: "0.0.0.0:8080".to_string(),
            client_origin: None,
            session_ttl_hours: 168,
            stripe_secret_key: None,
            stripe_webhook_secret: None,
            currency: "usd".to_string(),
            config_path: "config.toml".to_string(),
            admin_email: None,
            admin_password: None,
        }
    }
}

fn validate_session_ttl(hours: i64) -> Result<i64> {
    if (1..=MAX_SESSION_TTL_HOURS).contains(&hours) {
        Ok(hours)
    } else {
        Err(Error::Config {
            message: format!("SESSION_TTL_HOURS must be within 1..={MAX_SESSION_TTL_HOURS}, got {hours}"),
        })
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e| Error::Config {
            message: format!("Invalid {key} value '{raw}': {e}"),
        }),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_use_mock_gateway() {
        let settings = Settings::default();
        assert!(settings.stripe_secret_key.is_none());
        assert_eq!(settings.currency, "usd");
        assert_eq!(settings.session_ttl_hours, 168);
    }

    #[test]
    fn test_session_ttl_range() {
        assert_eq!(validate_session_ttl(168).ok(), Some(168));
        assert_eq!(validate_session_ttl(MAX_SESSION_TTL_HOURS).ok(), Some(MAX_SESSION_TTL_HOURS));
        for hours in [0, -5, MAX_SESSION_TTL_HOURS + 1, i64::MAX] {
            assert!(matches!(
                validate_session_ttl(hours),
                Err(Error::Config { message: _ })
            ));
        }
    }

    #[test]
    fn test_parse_or_falls_back_to_default() {
        let value: i64 = parse_or("COURSE_MARKET_TEST_UNSET_VARIABLE", 42).unwrap_or(0);
        assert_eq!(value, 42);
    }
}
