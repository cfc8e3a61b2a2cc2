//! Typed configuration for the translation relay engine.
//!
//! Settings load from `config/default.toml`, an optional per-environment
//! overlay, and `RELAY__`-prefixed environment variables, then run through
//! a `validate()` pass before anything is constructed from them.

pub mod error;
pub mod settings;

pub use error::ConfigError;
pub use settings::{
    load_settings, EngineConfig, ObservabilityConfig, RuntimeEnvironment, ServerConfig, Settings,
};
