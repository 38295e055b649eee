//! Configuration schema definitions.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use switchyard_framework::{DispatchSettings, WorkMode};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SwitchyardConfig {
    /// Operator settings for dispatch.
    #[serde(default)]
    pub bot: BotConfig,

    /// Connection lifecycle settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

// =============================================================================
// Bot
// =============================================================================

/// Operator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Command prefix. `""`, `"false"` and `"null"` disable prefix commands.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// `public` or `private`.
    #[serde(default)]
    pub mode: WorkMode,

    /// Owner numbers or identifiers.
    #[serde(default)]
    pub owners: Vec<String>,

    /// Menu header, `owner;botname`.
    #[serde(default)]
    pub info: String,

    /// Directory holding extension manifests.
    #[serde(default = "default_modules_dir")]
    pub modules_dir: PathBuf,

    /// JSON document holding persisted state.
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            mode: WorkMode::default(),
            owners: Vec::new(),
            info: String::new(),
            modules_dir: default_modules_dir(),
            state_file: default_state_file(),
        }
    }
}

impl BotConfig {
    /// Builds the settings the pipeline reads.
    pub fn to_dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings::default()
            .with_prefix(&self.prefix)
            .with_mode(self.mode)
            .with_owners(&self.owners)
            .with_info(self.info.as_str())
    }
}

fn default_prefix() -> String {
    ".".to_string()
}

fn default_modules_dir() -> PathBuf {
    PathBuf::from("modules")
}

fn default_state_file() -> PathBuf {
    PathBuf::from("data/state.json")
}

// =============================================================================
// Session
// =============================================================================

/// Connection lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Reconnect after an eligible disconnect.
    #[serde(default = "default_reconnect")]
    pub reconnect: bool,

    /// Backoff between reconnect attempts.
    #[serde(default)]
    pub retry: RetryConfig,

    /// How long shutdown waits for running handlers, in milliseconds.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

impl SessionConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect: default_reconnect(),
            retry: RetryConfig::default(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

fn default_reconnect() -> bool {
    true
}

fn default_shutdown_grace_ms() -> u64 {
    5000
}

/// Retry configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of consecutive reconnect attempts.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial delay between retries in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum delay between retries in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Exponential backoff multiplier.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryConfig {
    /// Delay before reconnect attempt `attempt` (1-based), capped at `max_delay_ms`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let millis = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        let capped = millis.min(self.max_delay_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }
}

fn default_max_retries() -> u32 {
    5
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// =============================================================================
// Logging
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature.
    Json,
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Which span lifecycle events are logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpanEventConfig {
    pub new: bool,
    pub enter: bool,
    pub exit: bool,
    pub close: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Log file, used when `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    #[serde(default)]
    pub thread_ids: bool,

    /// Include file and line of each event.
    #[serde(default)]
    pub file_location: bool,

    /// Per-target levels, e.g. `switchyard_framework = "debug"`.
    #[serde(default)]
    pub filters: BTreeMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            file_path: None,
            span_events: SpanEventConfig::default(),
            thread_ids: false,
            file_location: false,
            filters: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_and_caps() {
        let retry = RetryConfig {
            max_retries: 10,
            initial_delay_ms: 100,
            max_delay_ms: 1000,
            backoff_multiplier: 2.0,
        };
        assert_eq!(retry.delay_for(1), Duration::from_millis(100));
        assert_eq!(retry.delay_for(2), Duration::from_millis(200));
        assert_eq!(retry.delay_for(4), Duration::from_millis(800));
        assert_eq!(retry.delay_for(5), Duration::from_millis(1000));
        assert_eq!(retry.delay_for(40), Duration::from_millis(1000));
    }

    #[test]
    fn test_dispatch_settings_from_bot_config() {
        let bot = BotConfig {
            prefix: "^[!]".to_string(),
            mode: WorkMode::Public,
            owners: vec!["15551234".to_string()],
            ..Default::default()
        };
        let settings = bot.to_dispatch_settings();
        assert_eq!(settings.prefix.as_deref(), Some("!"));
        assert_eq!(settings.mode, WorkMode::Public);
        assert_eq!(settings.owners, vec!["15551234@s.whatsapp.net".to_string()]);
    }
}
