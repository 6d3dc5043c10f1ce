use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub adzuna_app_id: String,
    pub adzuna_app_key: String,
    pub adzuna_country: String,
    pub anthropic_api_key: String,
    /// Redis is optional; searches are cached in memory without it.
    pub redis_url: Option<String>,
    /// When set, `/api/v1/*` requires `Authorization: Bearer <token>`.
    pub api_token: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub search_sync_wait: Duration,
    pub search_cache_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            adzuna_app_id: require_env("ADZUNA_APP_ID")?,
            adzuna_app_key: require_env("ADZUNA_APP_KEY")?,
            adzuna_country: optional_env("ADZUNA_COUNTRY").unwrap_or_else(|| "us".to_string()),
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            redis_url: optional_env("REDIS_URL"),
            api_token: optional_env("API_TOKEN"),
            port: parse_env("PORT", 8080).context("PORT must be a valid port number")?,
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            search_sync_wait: Duration::from_millis(
                parse_env("SEARCH_SYNC_WAIT_MS", 4000)
                    .context("SEARCH_SYNC_WAIT_MS must be a number of milliseconds")?,
            ),
            search_cache_ttl: Duration::from_secs(
                parse_env("SEARCH_CACHE_TTL_SECS", 900)
                    .context("SEARCH_CACHE_TTL_SECS must be a number of seconds")?,
            ),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset and blank are both treated as absent.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => Ok(raw.parse::<T>()?),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_uses_default_when_unset() {
        let port: u16 = parse_env("SEEKER_TEST_UNSET_PORT", 8080).unwrap();
        assert_eq!(port, 8080);
    }

    #[test]
    fn test_parse_env_rejects_garbage() {
        std::env::set_var("SEEKER_TEST_BAD_PORT", "eighty");
        assert!(parse_env::<u16>("SEEKER_TEST_BAD_PORT", 8080).is_err());
        std::env::remove_var("SEEKER_TEST_BAD_PORT");
    }

    #[test]
    fn test_blank_optional_is_none() {
        std::env::set_var("SEEKER_TEST_BLANK", "   ");
        assert_eq!(optional_env("SEEKER_TEST_BLANK"), None);
        std::env::remove_var("SEEKER_TEST_BLANK");
    }
}
