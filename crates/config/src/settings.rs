//! Typed `Settings`, loaded from `config/default.toml` plus environment
//! overrides, with a `validate()` pass per section (§9 Design Notes:
//! run-time configuration must be a typed value passed in at construction,
//! not read ad hoc from the ambient environment).

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_engine()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "port cannot be 0".to_string(),
            });
        }
        if self.server.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.max_connections".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.environment.is_production()
            && self.server.cors_enabled
            && self.server.cors_origins.is_empty()
        {
            tracing::warn!(
                "CORS is enabled in production but no origins are configured; \
                 this may block legitimate listener clients"
            );
        }
        Ok(())
    }

    fn validate_engine(&self) -> Result<(), ConfigError> {
        let e = &self.engine;

        if !(0.70..=0.95).contains(&e.min_stability_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "engine.min_stability_threshold".to_string(),
                message: format!(
                    "must be in [0.70, 0.95], got {}",
                    e.min_stability_threshold
                ),
            });
        }
        if !(2..=10).contains(&e.max_buffer_timeout_secs) {
            return Err(ConfigError::InvalidValue {
                field: "engine.max_buffer_timeout_secs".to_string(),
                message: format!("must be in [2, 10], got {}", e.max_buffer_timeout_secs),
            });
        }
        if e.max_listeners_per_session == 0 {
            return Err(ConfigError::InvalidValue {
                field: "engine.max_listeners_per_session".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if e.session_max_duration_hours == 0 {
            return Err(ConfigError::InvalidValue {
                field: "engine.session_max_duration_hours".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if e.connection_warning_minutes <= e.connection_refresh_minutes {
            return Err(ConfigError::InvalidValue {
                field: "engine.connection_warning_minutes".to_string(),
                message: "must be greater than connection_refresh_minutes".to_string(),
            });
        }
        if e.max_rate_per_second == 0 {
            return Err(ConfigError::InvalidValue {
                field: "engine.max_rate_per_second".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if e.translation_cache_max_entries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "engine.translation_cache_max_entries".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_connections: default_max_connections(),
            cors_enabled: true,
            cors_origins: Vec::new(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_max_connections() -> usize {
    10_000
}
fn default_true() -> bool {
    true
}

/// All of §6's recognized configuration keys, one field each.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_session_max_duration_hours")]
    pub session_max_duration_hours: i64,
    #[serde(default = "default_max_listeners_per_session")]
    pub max_listeners_per_session: u32,
    #[serde(default = "default_connection_refresh_minutes")]
    pub connection_refresh_minutes: u64,
    #[serde(default = "default_connection_warning_minutes")]
    pub connection_warning_minutes: u64,
    #[serde(default = "default_connection_idle_timeout_seconds")]
    pub connection_idle_timeout_seconds: u64,
    #[serde(default = "default_true")]
    pub partial_results_enabled: bool,
    #[serde(default = "default_min_stability_threshold")]
    pub min_stability_threshold: f32,
    #[serde(default = "default_max_buffer_timeout")]
    pub max_buffer_timeout_secs: u64,
    #[serde(default = "default_pause_threshold")]
    pub pause_threshold_secs: u64,
    #[serde(default = "default_orphan_timeout")]
    pub orphan_timeout_secs: u64,
    #[serde(default = "default_max_rate_per_second")]
    pub max_rate_per_second: u32,
    #[serde(default = "default_rate_limit_window_ms")]
    pub rate_limit_window_ms: u64,
    #[serde(default = "default_dedup_cache_ttl")]
    pub dedup_cache_ttl_secs: u64,
    #[serde(default = "default_translation_cache_max_entries")]
    pub translation_cache_max_entries: usize,
    #[serde(default = "default_translation_cache_ttl")]
    pub translation_cache_ttl_secs: u64,
    #[serde(default = "default_max_concurrent_broadcasts")]
    pub max_concurrent_broadcasts: usize,
    #[serde(default = "default_words_per_second")]
    pub words_per_second: u32,
    #[serde(default = "default_result_buffer_capacity_secs")]
    pub result_buffer_capacity_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    #[serde(default = "default_translate_timeout_ms")]
    pub translate_timeout_ms: u64,
    #[serde(default = "default_synth_timeout_ms")]
    pub synth_timeout_ms: u64,
    #[serde(default = "default_broadcast_max_retries")]
    pub broadcast_max_retries: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            session_max_duration_hours: default_session_max_duration_hours(),
            max_listeners_per_session: default_max_listeners_per_session(),
            connection_refresh_minutes: default_connection_refresh_minutes(),
            connection_warning_minutes: default_connection_warning_minutes(),
            connection_idle_timeout_seconds: default_connection_idle_timeout_seconds(),
            partial_results_enabled: true,
            min_stability_threshold: default_min_stability_threshold(),
            max_buffer_timeout_secs: default_max_buffer_timeout(),
            pause_threshold_secs: default_pause_threshold(),
            orphan_timeout_secs: default_orphan_timeout(),
            max_rate_per_second: default_max_rate_per_second(),
            rate_limit_window_ms: default_rate_limit_window_ms(),
            dedup_cache_ttl_secs: default_dedup_cache_ttl(),
            translation_cache_max_entries: default_translation_cache_max_entries(),
            translation_cache_ttl_secs: default_translation_cache_ttl(),
            max_concurrent_broadcasts: default_max_concurrent_broadcasts(),
            words_per_second: default_words_per_second(),
            result_buffer_capacity_secs: default_result_buffer_capacity_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            translate_timeout_ms: default_translate_timeout_ms(),
            synth_timeout_ms: default_synth_timeout_ms(),
            broadcast_max_retries: default_broadcast_max_retries(),
        }
    }
}

fn default_session_max_duration_hours() -> i64 {
    2
}
fn default_max_listeners_per_session() -> u32 {
    500
}
fn default_connection_refresh_minutes() -> u64 {
    100
}
fn default_connection_warning_minutes() -> u64 {
    105
}
fn default_connection_idle_timeout_seconds() -> u64 {
    120
}
fn default_min_stability_threshold() -> f32 {
    0.85
}
fn default_max_buffer_timeout() -> u64 {
    5
}
fn default_pause_threshold() -> u64 {
    2
}
fn default_orphan_timeout() -> u64 {
    15
}
fn default_max_rate_per_second() -> u32 {
    5
}
fn default_rate_limit_window_ms() -> u64 {
    200
}
fn default_dedup_cache_ttl() -> u64 {
    10
}
fn default_translation_cache_max_entries() -> usize {
    10_000
}
fn default_translation_cache_ttl() -> u64 {
    3_600
}
fn default_max_concurrent_broadcasts() -> usize {
    100
}
fn default_words_per_second() -> u32 {
    30
}
fn default_result_buffer_capacity_secs() -> u64 {
    10
}
fn default_sweep_interval_secs() -> u64 {
    60
}
fn default_translate_timeout_ms() -> u64 {
    2_000
}
fn default_synth_timeout_ms() -> u64 {
    10_000
}
fn default_broadcast_max_retries() -> u32 {
    2
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
            metrics_port: default_metrics_port(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_metrics_port() -> u16 {
    9090
}

/// Load settings from `config/default.{toml}`, an optional
/// `config/{env}.toml` overlay, then `RELAY__`-prefixed environment
/// variables (highest priority), and validate the result.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("RELAY")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.engine.max_listeners_per_session, 500);
    }

    #[test]
    fn rejects_stability_threshold_out_of_range() {
        let mut settings = Settings::default();
        settings.engine.min_stability_threshold = 0.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_buffer_timeout_out_of_range() {
        let mut settings = Settings::default();
        settings.engine.max_buffer_timeout_secs = 1;
        assert!(settings.validate().is_err());
        settings.engine.max_buffer_timeout_secs = 11;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_zero_port() {
        let mut settings = Settings::default();
        settings.server.port = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_warning_below_refresh() {
        let mut settings = Settings::default();
        settings.engine.connection_warning_minutes = settings.engine.connection_refresh_minutes;
        assert!(settings.validate().is_err());
    }
}
