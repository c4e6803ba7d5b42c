use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";
const DEFAULT_TICK_INTERVAL_SECS: u64 = 60;
const DEFAULT_BATCH_LIMIT: u64 = 100;
const DEFAULT_AUTO_SUBMIT_DELAY_SECS: i64 = 60;
const DEFAULT_REJECTED_RETENTION_DAYS: i64 = 3;
const DEFAULT_SYSTEM_USER_ID: i32 = 1;

/// Scheduled maintenance job configuration
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct JobsConfig {
    /// Run the periodic sweeps from `serve`
    #[serde(default = "default_true_bool")]
    pub enabled: bool,

    /// Seconds between scheduler ticks
    #[serde(default = "default_tick_interval_secs")]
    #[validate(range(min = 1))]
    pub tick_interval_secs: u64,

    /// Maximum records per auto-submit/reminder sweep
    #[serde(default = "default_batch_limit")]
    #[validate(range(min = 1, max = 10000))]
    pub batch_limit: u64,

    /// Minimum age of a `new` request before it is auto-submitted
    #[serde(default = "default_auto_submit_delay_secs")]
    #[validate(range(min = 0))]
    pub auto_submit_delay_secs: i64,

    /// Rejected requests untouched for longer than this are purged
    #[serde(default = "default_rejected_retention_days")]
    #[validate(range(min = 0))]
    pub rejected_retention_days: i64,

    /// User the sweeps act as
    #[serde(default = "default_system_user_id")]
    #[validate(range(min = 1))]
    pub system_user_id: i32,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_interval_secs: default_tick_interval_secs(),
            batch_limit: default_batch_limit(),
            auto_submit_delay_secs: default_auto_submit_delay_secs(),
            rejected_retention_days: default_rejected_retention_days(),
            system_user_id: default_system_user_id(),
        }
    }
}

impl JobsConfig {
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.tick_interval_secs)
    }

    pub fn auto_submit_delay(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.auto_submit_delay_secs)
    }

    pub fn rejected_retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.rejected_retention_days)
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    #[validate(length(min = 1))]
    pub database_url: String,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,

    /// Capacity of the domain event channel
    #[serde(default = "default_event_channel_capacity")]
    #[validate(custom = "validate_event_channel_capacity")]
    pub event_channel_capacity: usize,

    #[serde(default)]
    #[validate]
    pub jobs: JobsConfig,
}

impl AppConfig {
    /// Minimal configuration pointing at `database_url`, everything else defaulted.
    pub fn new(database_url: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            environment: environment.into(),
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            jobs: JobsConfig::default(),
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_true_bool() -> bool {
    true
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_min_connections() -> u32 {
    1
}

fn default_db_connect_timeout_secs() -> u64 {
    30
}

fn default_event_channel_capacity() -> usize {
    1024
}

fn default_tick_interval_secs() -> u64 {
    DEFAULT_TICK_INTERVAL_SECS
}

fn default_batch_limit() -> u64 {
    DEFAULT_BATCH_LIMIT
}

fn default_auto_submit_delay_secs() -> i64 {
    DEFAULT_AUTO_SUBMIT_DELAY_SECS
}

fn default_rejected_retention_days() -> i64 {
    DEFAULT_REJECTED_RETENTION_DAYS
}

fn default_system_user_id() -> i32 {
    DEFAULT_SYSTEM_USER_ID
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_event_channel_capacity(capacity: usize) -> Result<(), ValidationError> {
    if (1..=1_000_000).contains(&capacity) {
        Ok(())
    } else {
        let mut err = ValidationError::new("event_channel_capacity");
        err.message = Some("Must be between 1 and 1000000".into());
        Err(err)
    }
}

/// Loads configuration from built-in defaults, `config/default`, `config/{RUN_ENV}` and
/// `APP__*` environment variables, in that order of precedence.
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("database_url", "sqlite://mrp_approval.db?mode=rwc")?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = AppConfig::new("sqlite::memory:", "test");
        assert!(config.validate().is_ok());
        assert_eq!(config.jobs.rejected_retention(), chrono::Duration::days(3));
        assert_eq!(config.jobs.auto_submit_delay(), chrono::Duration::seconds(60));
    }

    #[test]
    fn rejects_unknown_log_level() {
        let mut config = AppConfig::new("sqlite::memory:", "test");
        config.log_level = "verbose".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_batch_limit() {
        let mut config = AppConfig::new("sqlite::memory:", "test");
        config.jobs.batch_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn reads_nested_jobs_section_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            "database_url = \"sqlite::memory:\"\nenvironment = \"test\"\n\n[jobs]\nbatch_limit = 5\nrejected_retention_days = 7\n",
        )
        .expect("write config");

        let config: AppConfig = Config::builder()
            .add_source(File::from(path.as_path()))
            .build()
            .expect("build")
            .try_deserialize()
            .expect("deserialize");

        assert_eq!(config.jobs.batch_limit, 5);
        assert_eq!(config.jobs.rejected_retention_days, 7);
        assert_eq!(config.jobs.tick_interval_secs, DEFAULT_TICK_INTERVAL_SECS);
        assert!(config.jobs.enabled);
    }
}
