use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::errors::{AppError, AppResult};

pub mod defaults;
pub mod duration_serde;

use defaults::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upper bound for a whole request, notification included
    #[serde(default = "default_request_timeout", with = "duration_serde::duration")]
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `identity|display name|credential` per line
    #[serde(default = "default_senders_file")]
    pub senders_file: PathBuf,
    #[serde(default = "default_open_log_file")]
    pub open_log_file: PathBuf,
    /// Generated on startup when missing
    #[serde(default = "default_pixel_file")]
    pub pixel_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Repeat opens of the same key inside this window are suppressed
    #[serde(default = "default_dedup_window", with = "duration_serde::duration")]
    pub dedup_window: Duration,
    /// How often expired dedup entries are swept
    #[serde(default = "default_sweep_interval", with = "duration_serde::duration")]
    pub sweep_interval: Duration,
    /// Entry count that triggers an inline sweep
    #[serde(default = "default_max_cache_entries")]
    pub max_cache_entries: usize,
    /// Number of lines returned by the log viewer
    #[serde(default = "default_log_tail_lines")]
    pub log_tail_lines: usize,
}

/// How the SMTP connection is secured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpTls {
    /// TLS from the first byte (SMTPS, usually port 465)
    Implicit,
    /// Plain connection upgraded with STARTTLS (usually port 587)
    Starttls,
    /// No encryption, only suitable for local relays and test servers
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_notifications_enabled")]
    pub enabled: bool,
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default = "default_smtp_tls")]
    pub tls: SmtpTls,
    #[serde(default = "default_smtp_timeout", with = "duration_serde::duration")]
    pub timeout: Duration,
}

// Web defaults
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_request_timeout() -> Duration {
    parse_default(DEFAULT_REQUEST_TIMEOUT)
}

// Storage defaults
fn default_senders_file() -> PathBuf {
    PathBuf::from(DEFAULT_SENDERS_FILE)
}

fn default_open_log_file() -> PathBuf {
    PathBuf::from(DEFAULT_OPEN_LOG_FILE)
}

fn default_pixel_file() -> PathBuf {
    PathBuf::from(DEFAULT_PIXEL_FILE)
}

// Tracking defaults
fn default_dedup_window() -> Duration {
    parse_default(DEFAULT_DEDUP_WINDOW)
}

fn default_sweep_interval() -> Duration {
    parse_default(DEFAULT_SWEEP_INTERVAL)
}

fn default_max_cache_entries() -> usize {
    DEFAULT_MAX_CACHE_ENTRIES
}

fn default_log_tail_lines() -> usize {
    DEFAULT_LOG_TAIL_LINES
}

// Notification defaults
fn default_notifications_enabled() -> bool {
    DEFAULT_NOTIFICATIONS_ENABLED
}

fn default_smtp_host() -> String {
    DEFAULT_SMTP_HOST.to_string()
}

fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

fn default_smtp_tls() -> SmtpTls {
    SmtpTls::Implicit
}

fn default_smtp_timeout() -> Duration {
    parse_default(DEFAULT_SMTP_TIMEOUT)
}

/// Default durations are compile-time constants, a failure here is a typo in `defaults`
fn parse_default(value: &str) -> Duration {
    humantime::parse_duration(value).unwrap_or(Duration::ZERO)
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout: default_request_timeout(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            senders_file: default_senders_file(),
            open_log_file: default_open_log_file(),
            pixel_file: default_pixel_file(),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            dedup_window: default_dedup_window(),
            sweep_interval: default_sweep_interval(),
            max_cache_entries: default_max_cache_entries(),
            log_tail_lines: default_log_tail_lines(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: default_notifications_enabled(),
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            tls: default_smtp_tls(),
            timeout: default_smtp_timeout(),
        }
    }
}

impl Config {
    pub fn load_from_file(config_file: &str) -> Result<Self> {
        let config = if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(config_file)?;
            toml::from_str::<Self>(&contents)?
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(config_file, contents)?;
            info!("Created default config file: {}", config_file);
            default_config
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.tracking.dedup_window.is_zero() {
            return Err(AppError::configuration("tracking.dedup_window must be greater than zero"));
        }
        if self.tracking.sweep_interval.is_zero() {
            return Err(AppError::configuration("tracking.sweep_interval must be greater than zero"));
        }
        if self.tracking.max_cache_entries == 0 {
            return Err(AppError::configuration("tracking.max_cache_entries must be at least 1"));
        }
        if self.tracking.log_tail_lines == 0 {
            return Err(AppError::configuration("tracking.log_tail_lines must be at least 1"));
        }
        if self.web.request_timeout.is_zero() {
            return Err(AppError::configuration("web.request_timeout must be greater than zero"));
        }
        if self.notifications.enabled {
            if self.notifications.smtp_host.trim().is_empty() {
                return Err(AppError::configuration(
                    "notifications.smtp_host is required when notifications are enabled",
                ));
            }
            if self.notifications.timeout.is_zero()
                || self.notifications.timeout >= self.web.request_timeout
            {
                return Err(AppError::configuration(
                    "notifications.timeout must be greater than zero and shorter than web.request_timeout",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = Config::default();

        assert_eq!(config.web.host, "0.0.0.0");
        assert_eq!(config.web.port, 5000);
        assert_eq!(config.tracking.dedup_window, Duration::from_secs(300));
        assert_eq!(config.tracking.log_tail_lines, 100);
        assert_eq!(config.storage.open_log_file, PathBuf::from("opens.log"));
        assert_eq!(config.notifications.smtp_port, 465);
        assert_eq!(config.notifications.tls, SmtpTls::Implicit);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            [web]
            port = 8081

            [tracking]
            dedup_window = "90s"

            [notifications]
            enabled = false
            tls = "starttls"
            "#,
        )
        .unwrap();

        assert_eq!(config.web.port, 8081);
        assert_eq!(config.web.host, "0.0.0.0");
        assert_eq!(config.tracking.dedup_window, Duration::from_secs(90));
        assert_eq!(config.tracking.sweep_interval, Duration::from_secs(60));
        assert!(!config.notifications.enabled);
        assert_eq!(config.notifications.tls, SmtpTls::Starttls);
    }

    #[test]
    fn test_validation_rejects_zero_values() {
        let mut config = Config::default();
        config.tracking.dedup_window = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.tracking.log_tail_lines = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.notifications.smtp_host = "  ".to_string();
        assert!(config.validate().is_err());

        config.notifications.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_timeouts_that_cannot_fit_in_a_request() {
        let mut config = Config::default();
        config.web.request_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.notifications.timeout = config.web.request_timeout;
        assert!(config.validate().is_err());

        config.notifications.timeout = Duration::from_secs(60);
        assert!(config.validate().is_err());

        config.notifications.timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        config.notifications.enabled = false;
        assert!(config.validate().is_ok());

        let mut config = Config::default();
        config.notifications.timeout = config.web.request_timeout - Duration::from_secs(1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_creates_default_file_when_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let path_str = path.to_str().unwrap();

        let config = Config::load_from_file(path_str).unwrap();
        assert!(path.exists());
        assert_eq!(config.web.port, DEFAULT_PORT);

        // The written file must load back to the same values
        let reloaded = Config::load_from_file(path_str).unwrap();
        assert_eq!(reloaded.tracking.dedup_window, config.tracking.dedup_window);
        assert_eq!(reloaded.storage.senders_file, config.storage.senders_file);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[tracking]\nlog_tail_lines = 0\n").unwrap();

        assert!(Config::load_from_file(path.to_str().unwrap()).is_err());
    }
}
