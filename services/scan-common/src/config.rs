//! Configuration management for the signal scanner.
//!
//! The scanner reads a single JSON document at `~/.stockscan/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (SCAN_* prefix)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `SCAN_CONFIG` → path of the config file to load instead of the default
//! - `SCAN_LOG_LEVEL` → observability.log_level
//! - `SCAN_LOG_FORMAT` → observability.log_format
//! - `SCAN_MAX_WORKERS` → scanner.max_workers
//! - `SCAN_MAX_CALLS_PER_SEC` → data_source.max_calls_per_sec
//! - `SCAN_TARGET_SYMBOLS` → scanner.target_symbols (comma separated)
//! - `SCAN_EMAIL_ENABLED` → email.enabled
//! - `SCAN_EMAIL_SENDER` → email.sender
//! - `SCAN_EMAIL_PASSWORD` → email.password
//! - `SCAN_EMAIL_RECIPIENTS` → email.recipients (comma separated)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".stockscan"),
        |dirs| dirs.home_dir().join(".stockscan"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Market data source configuration
    #[serde(default)]
    pub data_source: DataSourceConfig,

    /// Scan pipeline configuration
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Email delivery of the report
    #[serde(default)]
    pub email: EmailConfig,
}

impl Config {
    /// Load configuration from `SCAN_CONFIG` or the default path.
    ///
    /// A missing default file is not an error; defaults are used instead.
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var("SCAN_CONFIG") {
            return Self::load_from(Path::new(&path));
        }

        let path = config_path();
        if !path.exists() {
            tracing::info!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::from(e).with_context(format!("Failed to read config from {}", path.display()))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            Error::from(e).with_context(format!("Failed to parse config from {}", path.display()))
        })
    }

    /// Load configuration and apply environment overrides.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("SCAN_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Ok(format) = std::env::var("SCAN_LOG_FORMAT") {
            self.observability.log_format = format;
        }
        if let Ok(workers) = std::env::var("SCAN_MAX_WORKERS") {
            if let Ok(w) = workers.parse() {
                self.scanner.max_workers = w;
            }
        }
        if let Ok(rate) = std::env::var("SCAN_MAX_CALLS_PER_SEC") {
            if let Ok(r) = rate.parse() {
                self.data_source.max_calls_per_sec = r;
            }
        }
        if let Ok(symbols) = std::env::var("SCAN_TARGET_SYMBOLS") {
            self.scanner.target_symbols = parse_symbol_list(&symbols);
        }
        if let Ok(enabled) = std::env::var("SCAN_EMAIL_ENABLED") {
            if let Ok(e) = enabled.parse() {
                self.email.enabled = e;
            }
        }
        if let Ok(sender) = std::env::var("SCAN_EMAIL_SENDER") {
            self.email.sender = Some(sender);
        }
        if let Ok(password) = std::env::var("SCAN_EMAIL_PASSWORD") {
            self.email.password = Some(password);
        }
        if let Ok(recipients) = std::env::var("SCAN_EMAIL_RECIPIENTS") {
            self.email.recipients = parse_symbol_list(&recipients);
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.scanner.max_workers == 0 {
            return Err(Error::Config("scanner.max_workers must be at least 1".into()));
        }
        if self.data_source.max_calls_per_sec == 0 {
            return Err(Error::Config(
                "data_source.max_calls_per_sec must be at least 1".into(),
            ));
        }
        if self.data_source.timeout_secs == 0 {
            return Err(Error::Config("data_source.timeout_secs must be at least 1".into()));
        }
        if self.scanner.prefilter.lookback_days == 0 {
            return Err(Error::Config(
                "scanner.prefilter.lookback_days must be at least 1".into(),
            ));
        }
        match self.scanner.report_format.to_lowercase().as_str() {
            "text" | "txt" | "markdown" | "md" | "json" | "html" | "htm" => {}
            other => {
                    return Err(Error::Config(format!("unknown report format: {}", other)));
            }
        }
        if self.email.enabled && self.email.smtp_port == 0 {
            return Err(Error::Config("email.smtp_port must be set".into()));
        }
        Ok(())
    }
}

/// Split a comma separated list, dropping blanks.
pub fn parse_symbol_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Observability
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

// ============================================================================
// Data Source
// ============================================================================

/// Market data source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceConfig {
    /// Maximum history requests per second (smoothed, one call per 1/N seconds)
    #[serde(default = "default_max_calls_per_sec")]
    pub max_calls_per_sec: u32,

    /// HTTP timeout for a single request
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Listing file used to resolve the symbol universe
    #[serde(default = "default_listing_url")]
    pub listing_url: String,
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self {
            max_calls_per_sec: default_max_calls_per_sec(),
            timeout_secs: default_timeout_secs(),
            listing_url: default_listing_url(),
        }
    }
}

// ============================================================================
// Scanner
// ============================================================================

/// Scan pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Worker pool size for per-symbol evaluation
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Strategies applied to every symbol without an override
    #[serde(default = "default_strategies")]
    pub default_strategies: Vec<String>,

    /// Per-symbol strategy lists; these replace the defaults for that symbol
    #[serde(default)]
    pub strategy_overrides: HashMap<String, Vec<String>>,

    /// Symbols to scan. Empty means the whole listing (prefiltered).
    #[serde(default)]
    pub target_symbols: Vec<String>,

    /// Report format: text, markdown, json or html
    #[serde(default = "default_report_format")]
    pub report_format: String,

    /// Liquidity prefilter for full-listing scans
    #[serde(default)]
    pub prefilter: PrefilterConfig,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            default_strategies: default_strategies(),
            strategy_overrides: HashMap::new(),
            target_symbols: Vec::new(),
            report_format: default_report_format(),
            prefilter: PrefilterConfig::default(),
        }
    }
}

/// Liquidity prefilter thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefilterConfig {
    /// Whether the prefilter runs for full-listing scans
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Minimum mean dollar volume over the lookback
    #[serde(default = "default_min_avg_dollar_volume")]
    pub min_avg_dollar_volume: f64,

    /// Minimum latest close
    #[serde(default = "default_min_close_price")]
    pub min_close_price: f64,

    /// Bars considered for the dollar volume mean
    #[serde(default = "default_lookback_days")]
    pub lookback_days: usize,
}

impl Default for PrefilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_avg_dollar_volume: default_min_avg_dollar_volume(),
            min_close_price: default_min_close_price(),
            lookback_days: default_lookback_days(),
        }
    }
}

// ============================================================================
// Email
// ============================================================================

/// SMTP delivery of the scan report.
///
/// Delivery is skipped with a warning while sender, password or recipients
/// are missing, so a half-filled section never fails the run.
#[derive(Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_smtp_server")]
    pub smtp_server: String,

    /// STARTTLS submission port
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// Sender address, also the SMTP login
    #[serde(default)]
    pub sender: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub recipients: Vec<String>,

    #[serde(default = "default_email_subject")]
    pub subject: String,
}

impl EmailConfig {
    /// Sender and password, when both are present and non-blank.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let sender = self.sender.as_deref().filter(|s| !s.trim().is_empty())?;
        let password = self.password.as_deref().filter(|s| !s.is_empty())?;
        Some((sender, password))
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_server: default_smtp_server(),
            smtp_port: default_smtp_port(),
            sender: None,
            password: None,
            recipients: Vec::new(),
            subject: default_email_subject(),
        }
    }
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("enabled", &self.enabled)
            .field("smtp_server", &self.smtp_server)
            .field("smtp_port", &self.smtp_port)
            .field("sender", &self.sender)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("recipients", &self.recipients)
            .field("subject", &self.subject)
            .finish()
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}
fn default_max_calls_per_sec() -> u32 {
    3
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_listing_url() -> String {
    "https://www.nasdaqtrader.com/dynamic/symdir/nasdaqlisted.txt".to_string()
}
fn default_max_workers() -> usize {
    10
}
fn default_strategies() -> Vec<String> {
    vec![
        "CDSignalStrategy".to_string(),
        "MACrossStrategy".to_string(),
        "VolumeSurgeStrategy".to_string(),
    ]
}
fn default_report_format() -> String {
    "text".to_string()
}
fn default_true() -> bool {
    true
}
fn default_min_avg_dollar_volume() -> f64 {
    1_000_000.0
}
fn default_min_close_price() -> f64 {
    0.5
}
fn default_lookback_days() -> usize {
    20
}
fn default_smtp_server() -> String {
    "smtp.gmail.com".to_string()
}
fn default_smtp_port() -> u16 {
    587
}
fn default_email_subject() -> String {
    "Stock scan results".to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.observability.log_level, "info");
        assert_eq!(config.data_source.max_calls_per_sec, 3);
        assert_eq!(config.scanner.max_workers, 10);
        assert_eq!(config.scanner.default_strategies.len(), 3);
        assert!(config.scanner.prefilter.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let json = r#"{
            "scanner": {
                "max_workers": 4,
                "strategy_overrides": { "AAPL": ["VolumeSurgeStrategy"] }
            }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.scanner.max_workers, 4);
        assert_eq!(config.scanner.default_strategies.len(), 3);
        assert_eq!(
            config.scanner.strategy_overrides["AAPL"],
            vec!["VolumeSurgeStrategy".to_string()]
        );
        assert_eq!(config.data_source.timeout_secs, 30);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "observability": {{ "level": "debug", "format": "json" }} }}"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.observability.log_format, "json");
    }

    #[test]
    fn test_load_from_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = Config::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
        match err {
            Error::WithContext { source, .. } => assert!(matches!(*source, Error::Json(_))),
            other => panic!("expected WithContext, got {:?}", other),
        }
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from(&dir.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().starts_with("Failed to read config from"));
        match err {
            Error::WithContext { source, .. } => assert!(matches!(*source, Error::Io(_))),
            other => panic!("expected WithContext, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let mut config = Config::default();
        config.scanner.max_workers = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_unknown_format() {
        let mut config = Config::default();
        config.scanner.report_format = "pdf".into();
        assert!(config.validate().is_err());

        config.scanner.report_format = "Markdown".into();
        assert!(config.validate().is_ok());

        config.scanner.report_format = "html".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_email_section() {
        let config = Config::default();
        assert!(!config.email.enabled);
        assert_eq!(config.email.smtp_server, "smtp.gmail.com");
        assert_eq!(config.email.smtp_port, 587);
        assert!(config.email.credentials().is_none());

        let json = r#"{
            "email": {
                "enabled": true,
                "sender": "scanner@example.com",
                "password": "secret",
                "recipients": ["a@example.com"]
            }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(
            config.email.credentials(),
            Some(("scanner@example.com", "secret"))
        );
        assert_eq!(config.email.smtp_port, 587);
        assert!(!format!("{:?}", config.email).contains("secret"));
    }

    #[test]
    fn test_blank_sender_is_not_a_credential() {
        let email = EmailConfig {
            sender: Some("  ".into()),
            password: Some("secret".into()),
            ..EmailConfig::default()
        };
        assert!(email.credentials().is_none());
    }

    #[test]
    fn test_parse_symbol_list() {
        assert_eq!(
            parse_symbol_list(" AAPL, MSFT,,GOOGL "),
            vec!["AAPL".to_string(), "MSFT".to_string(), "GOOGL".to_string()]
        );
        assert!(parse_symbol_list("").is_empty());
    }
}
