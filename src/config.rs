//! Configuration module for Upwatch.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::scheduler::DEFAULT_WINDOW_DAYS;

/// Upper bound for day-based settings: a century of checks.
pub const MAX_DAYS: i64 = 36_500;

/// Configuration validation errors.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),
    #[error("{name} must be at most {max} days")]
    TooLarge { name: &'static str, max: i64 },
    #[error("retention of {retention} days is shorter than the {window}-day uptime window")]
    RetentionTooShort { retention: i64, window: i64 },
}

/// Monitor configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Path to the SQLite database file (default: "upwatch.db")
    pub db_path: String,
    /// Seconds between monitoring cycles (default: 60)
    pub check_interval_secs: u64,
    /// Per-request timeout in seconds (default: 10)
    pub request_timeout_secs: u64,
    /// Uptime aggregation window in days (default: 90)
    pub window_days: i64,
    /// Prune checks older than this many days; None keeps everything
    pub retention_days: Option<i64>,
    /// Port for the read-only status API; None disables it
    pub http_port: Option<u16>,
    /// JSON file of endpoints to register at startup
    pub seed_file: Option<PathBuf>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            db_path: "upwatch.db".to_string(),
            check_interval_secs: 60,
            request_timeout_secs: 10,
            window_days: DEFAULT_WINDOW_DAYS,
            retention_days: None,
            http_port: None,
            seed_file: None,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `UPWATCH_DB_PATH`: Database file path (default: "upwatch.db")
    /// - `UPWATCH_CHECK_INTERVAL`: Seconds between cycles (default: 60)
    /// - `UPWATCH_REQUEST_TIMEOUT`: Request timeout in seconds (default: 10)
    /// - `UPWATCH_WINDOW_DAYS`: Uptime window in days (default: 90)
    /// - `UPWATCH_RETENTION_DAYS`: Check retention in days (default: unset)
    /// - `UPWATCH_HTTP_PORT`: Status API port (default: unset)
    /// - `UPWATCH_SEED_FILE`: Endpoint seed file (default: unset)
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(db_path) = lookup("UPWATCH_DB_PATH") {
            cfg.db_path = db_path;
        }
        if let Some(v) = parse_var(&lookup, "UPWATCH_CHECK_INTERVAL") {
            cfg.check_interval_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "UPWATCH_REQUEST_TIMEOUT") {
            cfg.request_timeout_secs = v;
        }
        if let Some(v) = parse_var(&lookup, "UPWATCH_WINDOW_DAYS") {
            cfg.window_days = v;
        }
        cfg.retention_days = parse_var(&lookup, "UPWATCH_RETENTION_DAYS");
        cfg.http_port = parse_var(&lookup, "UPWATCH_HTTP_PORT");
        cfg.seed_file = lookup("UPWATCH_SEED_FILE").map(PathBuf::from);

        cfg
    }

    /// Reject values the monitor cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.check_interval_secs == 0 {
            return Err(ConfigError::NotPositive("UPWATCH_CHECK_INTERVAL"));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::NotPositive("UPWATCH_REQUEST_TIMEOUT"));
        }
        if self.window_days <= 0 {
            return Err(ConfigError::NotPositive("UPWATCH_WINDOW_DAYS"));
        }
        if self.window_days > MAX_DAYS {
            return Err(ConfigError::TooLarge {
                name: "UPWATCH_WINDOW_DAYS",
                max: MAX_DAYS,
            });
        }
        if let Some(retention) = self.retention_days {
            if retention > MAX_DAYS {
                return Err(ConfigError::TooLarge {
                    name: "UPWATCH_RETENTION_DAYS",
                    max: MAX_DAYS,
                });
            }
            if retention < self.window_days {
                return Err(ConfigError::RetentionTooShort {
                    retention,
                    window: self.window_days,
                });
            }
        }
        Ok(())
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring invalid value for {}: {:?}", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> MonitorConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        MonitorConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let cfg = MonitorConfig::default();
        assert_eq!(cfg.db_path, "upwatch.db");
        assert_eq!(cfg.check_interval(), Duration::from_secs(60));
        assert_eq!(cfg.request_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.window_days, 90);
        assert!(cfg.http_port.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let cfg = config_from(&[
            ("UPWATCH_DB_PATH", "/var/lib/upwatch.db"),
            ("UPWATCH_CHECK_INTERVAL", "30"),
            ("UPWATCH_REQUEST_TIMEOUT", " 5 "),
            ("UPWATCH_RETENTION_DAYS", "365"),
            ("UPWATCH_HTTP_PORT", "8080"),
            ("UPWATCH_SEED_FILE", "endpoints.json"),
        ]);
        assert_eq!(cfg.db_path, "/var/lib/upwatch.db");
        assert_eq!(cfg.check_interval_secs, 30);
        assert_eq!(cfg.request_timeout_secs, 5);
        assert_eq!(cfg.retention_days, Some(365));
        assert_eq!(cfg.http_port, Some(8080));
        assert_eq!(cfg.seed_file, Some(PathBuf::from("endpoints.json")));
    }

    #[test]
    fn test_invalid_numbers_keep_defaults() {
        let cfg = config_from(&[("UPWATCH_CHECK_INTERVAL", "soon"), ("UPWATCH_HTTP_PORT", "99999")]);
        assert_eq!(cfg.check_interval_secs, 60);
        assert!(cfg.http_port.is_none());
    }

    #[test]
    fn test_validate() {
        let cfg = config_from(&[("UPWATCH_CHECK_INTERVAL", "0")]);
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::NotPositive("UPWATCH_CHECK_INTERVAL"))
        );

        let cfg = config_from(&[("UPWATCH_RETENTION_DAYS", "30")]);
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::RetentionTooShort { retention: 30, window: 90 })
        );
    }

    #[test]
    fn test_validate_rejects_out_of_range_days() {
        let cfg = config_from(&[("UPWATCH_WINDOW_DAYS", "100000000")]);
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::TooLarge { name: "UPWATCH_WINDOW_DAYS", max: MAX_DAYS })
        );

        let cfg = config_from(&[("UPWATCH_RETENTION_DAYS", "100000000")]);
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::TooLarge { name: "UPWATCH_RETENTION_DAYS", max: MAX_DAYS })
        );

        let cfg = config_from(&[
            ("UPWATCH_WINDOW_DAYS", "36500"),
            ("UPWATCH_RETENTION_DAYS", "36500"),
        ]);
        assert!(cfg.validate().is_ok());
    }
}
