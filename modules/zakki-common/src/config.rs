use std::env;
use std::str::FromStr;
use std::time::Duration;

use chrono::{Datelike, Utc};
use tracing::info;

use crate::error::{Result, ZakkiError};

/// First year the diary archive has content for.
pub const ARCHIVE_START_YEAR: i32 = 2024;

/// Tag-loader configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Origin that site-relative paths are joined to.
    pub base_url: String,

    // Scan range (inclusive)
    pub start_year: i32,
    pub end_year: i32,

    // Scheduling
    pub batch_size: usize,
    pub fetch_timeout: Duration,

    // RequestThrottle
    pub rate_limit: usize,
    pub rate_window: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            start_year: ARCHIVE_START_YEAR,
            end_year: Utc::now().year() + 1,
            batch_size: 4,
            fetch_timeout: Duration::from_secs(10),
            rate_limit: 60,
            rate_window: Duration::from_secs(60),
        }
    }
}

impl Config {
    /// Load configuration from `ZAKKI_*` environment variables, falling back
    /// to [`Config::default`] for anything unset.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            base_url: env::var("ZAKKI_BASE_URL").unwrap_or(defaults.base_url),
            start_year: parsed_env("ZAKKI_START_YEAR", defaults.start_year)?,
            end_year: parsed_env("ZAKKI_END_YEAR", defaults.end_year)?,
            batch_size: parsed_env("ZAKKI_BATCH_SIZE", defaults.batch_size)?,
            fetch_timeout: Duration::from_secs(parsed_env(
                "ZAKKI_FETCH_TIMEOUT_SECS",
                defaults.fetch_timeout.as_secs(),
            )?),
            rate_limit: parsed_env("ZAKKI_RATE_LIMIT", defaults.rate_limit)?,
            rate_window: Duration::from_secs(parsed_env(
                "ZAKKI_RATE_WINDOW_SECS",
                defaults.rate_window.as_secs(),
            )?),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(ZakkiError::Config("batch size must be at least 1".into()));
        }
        if self.start_year > self.end_year {
            return Err(ZakkiError::Config(format!(
                "start year {} is after end year {}",
                self.start_year, self.end_year
            )));
        }
        if url_has_no_scheme(&self.base_url) {
            return Err(ZakkiError::Config(format!(
                "base URL needs an http(s) scheme: {}",
                self.base_url
            )));
        }
        Ok(())
    }

    /// Log the effective configuration with any userinfo in the base URL masked.
    pub fn log_redacted(&self) {
        let base = match self.base_url.split_once('@') {
            Some((_, host)) => format!("***@{host}"),
            None => self.base_url.clone(),
        };
        info!(
            base_url = base.as_str(),
            start_year = self.start_year,
            end_year = self.end_year,
            batch_size = self.batch_size,
            fetch_timeout_secs = self.fetch_timeout.as_secs(),
            rate_limit = self.rate_limit,
            rate_window_secs = self.rate_window.as_secs(),
            "Tag loader configuration"
        );
    }
}

fn url_has_no_scheme(url: &str) -> bool {
    !(url.starts_with("http://") || url.starts_with("https://"))
}

fn parsed_env<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ZakkiError::Config(format!("{key} must be a number, got {raw:?}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let config = Config::default();
        assert_eq!(config.start_year, 2024);
        assert_eq!(config.end_year, Utc::now().year() + 1);
        assert_eq!(config.batch_size, 4);
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
        assert_eq!(config.rate_limit, 60);
        assert_eq!(config.rate_window, Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let config = Config {
            batch_size: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ZakkiError::Config(_))));
    }

    #[test]
    fn inverted_year_range_is_rejected() {
        let config = Config {
            start_year: 2026,
            end_year: 2024,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn base_url_needs_scheme() {
        let config = Config {
            base_url: "example.com".into(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
