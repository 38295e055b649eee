//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{
    BotConfig, LogOutput, LoggingConfig, RetryConfig, SessionConfig, SwitchyardConfig,
};

/// Validates the entire configuration.
pub fn validate_config(config: &SwitchyardConfig) -> ConfigResult<()> {
    validate_bot_config(&config.bot)?;
    validate_session_config(&config.session)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

fn validate_bot_config(bot: &BotConfig) -> ConfigResult<()> {
    if bot.modules_dir.as_os_str().is_empty() {
        return Err(ConfigError::validation("bot.modules_dir cannot be empty"));
    }

    if bot.state_file.as_os_str().is_empty() {
        return Err(ConfigError::validation("bot.state_file cannot be empty"));
    }

    if let Some(owner) = bot.owners.iter().find(|o| o.chars().any(char::is_whitespace)) {
        return Err(ConfigError::validation(format!(
            "Owner entry '{owner}' cannot contain whitespace"
        )));
    }

    Ok(())
}

fn validate_session_config(session: &SessionConfig) -> ConfigResult<()> {
    validate_retry_config(&session.retry)
}

fn validate_retry_config(retry: &RetryConfig) -> ConfigResult<()> {
    if retry.max_delay_ms < retry.initial_delay_ms {
        return Err(ConfigError::validation(
            "Max retry delay must be greater than or equal to initial delay",
        ));
    }

    if retry.backoff_multiplier.is_nan() || retry.backoff_multiplier < 1.0 {
        return Err(ConfigError::validation(
            "Backoff multiplier must be at least 1.0",
        ));
    }

    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.file_path is required when logging.output is \"file\"",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&SwitchyardConfig::default()).is_ok());
    }

    #[test]
    fn test_rejects_small_multiplier() {
        let mut config = SwitchyardConfig::default();
        config.session.retry.backoff_multiplier = 0.5;
        assert!(validate_config(&config).is_err());

        config.session.retry.backoff_multiplier = f64::NAN;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_inverted_delays() {
        let mut config = SwitchyardConfig::default();
        config.session.retry.initial_delay_ms = 5000;
        config.session.retry.max_delay_ms = 1000;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_empty_modules_dir() {
        let mut config = SwitchyardConfig::default();
        config.bot.modules_dir = PathBuf::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_owner_with_whitespace() {
        let mut config = SwitchyardConfig::default();
        config.bot.owners = vec!["1555 1234".to_string()];
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("1555 1234"));
    }

    #[test]
    fn test_file_output_needs_path() {
        let mut config = SwitchyardConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());

        config.logging.file_path = Some(PathBuf::from("logs/switchyard.log"));
        assert!(validate_config(&config).is_ok());
    }
}
