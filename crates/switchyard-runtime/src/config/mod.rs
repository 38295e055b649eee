//! Configuration for the Switchyard runtime.
//!
//! Layered loading via figment (defaults, files, `SWITCHYARD_*` environment)
//! and validation of the merged result.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    BotConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, RetryConfig, SessionConfig,
    SpanEventConfig, SwitchyardConfig,
};
pub use validation::validate_config;
