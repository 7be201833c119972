//! Configuration management.

use std::time::Duration;

use serde::Deserialize;

use crate::utils::RetryConfig;

/// Main application configuration.
///
/// Every section has defaults, so an empty environment yields a runnable
/// in-memory setup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Postgres settings. Without a URL the in-memory log is used.
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Backoff used when a command loses an optimistic concurrency race
    #[serde(default)]
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,

    #[serde(default = "default_with_thread_ids")]
    pub with_thread_ids: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            with_thread_ids: default_with_thread_ids(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            initial_delay: Duration::from_millis(settings.initial_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            ..RetryConfig::default()
        }
    }
}

// Default value functions
fn default_max_connections() -> u32 { 5 }
fn default_log_filter() -> String { "info,account_ledger=debug".to_string() }
fn default_with_thread_ids() -> bool { true }
fn default_max_attempts() -> u32 { 3 }
fn default_initial_delay_ms() -> u64 { 50 }
fn default_max_delay_ms() -> u64 { 1000 }

impl AppConfig {
    pub const ENV_PREFIX: &'static str = "LEDGER";
    pub const DEFAULT_FILE: &'static str = "ledger";

    /// Load configuration from `ledger.toml` (if present) and environment.
    pub fn load() -> anyhow::Result<Self> {
        Self::from_file(Self::DEFAULT_FILE)
    }

    /// Load from a specific file path (extension optional, file optional).
    /// Environment variables override file values.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix(Self::ENV_PREFIX).separator("__"))
            .build()?;

        let cfg: AppConfig = config.try_deserialize()?;
        Ok(cfg)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::from(&self.retry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_sources() {
        let cfg = AppConfig::from_file("does-not-exist-ledger-config").unwrap();

        assert_eq!(cfg.logging.filter, "info,account_ledger=debug");
        assert!(cfg.logging.with_thread_ids);
        assert_eq!(cfg.retry.max_attempts, 3);
    }

    #[test]
    fn test_file_values_are_read() {
        let dir = std::env::temp_dir().join(format!("ledger-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("ledger.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[database]\nurl = \"postgres://localhost/ledger\"\n\n[retry]\nmax_attempts = 7\ninitial_delay_ms = 10"
        )
        .unwrap();

        let cfg = AppConfig::from_file(path.to_str().unwrap()).unwrap();
        let database = cfg.database.unwrap();
        assert_eq!(database.url, "postgres://localhost/ledger");
        assert_eq!(database.max_connections, 5);
        assert_eq!(cfg.retry.max_attempts, 7);
        assert_eq!(cfg.retry.max_delay_ms, 1000);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_retry_settings_convert() {
        let settings = RetrySettings {
            max_attempts: 0,
            initial_delay_ms: 20,
            max_delay_ms: 200,
        };

        let retry = RetryConfig::from(&settings);
        assert_eq!(retry.max_attempts, 1);
        assert_eq!(retry.initial_delay, Duration::from_millis(20));
        assert_eq!(retry.max_delay, Duration::from_millis(200));
    }
}
