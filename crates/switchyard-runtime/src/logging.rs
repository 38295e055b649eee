//! Logging setup.
//!
//! Installs one `tracing-subscriber` fmt layer behind an env filter, shaped
//! entirely by [`LoggingConfig`]. `RUST_LOG`, when set, replaces the configured
//! base level; `logging.filters` entries are added on top either way.
//!
//! The pipeline opens a `dispatch` span per message and a `group_update` span
//! per membership change. Set `logging.span_events.close = true` to log each
//! one's busy time when it ends.

use std::ffi::OsStr;
use std::path::Path;

use tracing::warn;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{LogFormat, LogOutput, LoggingConfig, SpanEventConfig};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Installs the global subscriber described by `config`.
///
/// Does nothing if a subscriber is already installed.
pub fn init_from_config(config: &LoggingConfig) {
    let _ = try_init(config);
}

/// Like [`init_from_config`], but reports an already installed subscriber.
pub fn try_init(config: &LoggingConfig) -> Result<(), TryInitError> {
    let (writer, fallback) = writer(config);
    tracing_subscriber::registry()
        .with(fmt_layer(config, writer))
        .with(filter(config))
        .try_init()?;

    if let Some(fallback) = fallback {
        warn!("{fallback}");
    }
    if config.format == LogFormat::Json && !cfg!(feature = "json-log") {
        warn!("JSON log format needs the `json-log` feature, using full format");
    }
    Ok(())
}

fn fmt_layer(config: &LoggingConfig, writer: BoxMakeWriter) -> BoxedLayer {
    let layer = fmt::layer()
        .with_writer(writer)
        .with_span_events(span_events(&config.span_events))
        .with_thread_ids(config.thread_ids)
        .with_file(config.file_location)
        .with_line_number(config.file_location);

    match config.format {
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Full => layer.boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
        #[cfg(feature = "json-log")]
        LogFormat::Json => layer.json().boxed(),
        #[cfg(not(feature = "json-log"))]
        LogFormat::Json => layer.boxed(),
    }
}

/// The configured sink, plus a warning when it had to fall back to stdout.
fn writer(config: &LoggingConfig) -> (BoxMakeWriter, Option<&'static str>) {
    match (config.output, config.file_path.as_deref()) {
        (LogOutput::Stdout, _) => (BoxMakeWriter::new(std::io::stdout), None),
        (LogOutput::Stderr, _) => (BoxMakeWriter::new(std::io::stderr), None),
        (LogOutput::File, Some(path)) => {
            let appender = tracing_appender::rolling::never(
                path.parent().unwrap_or_else(|| Path::new(".")),
                path.file_name()
                    .unwrap_or_else(|| OsStr::new("switchyard.log")),
            );
            (BoxMakeWriter::new(appender), None)
        }
        (LogOutput::File, None) => (
            BoxMakeWriter::new(std::io::stdout),
            Some("File output requested but no file path configured, using stdout"),
        ),
    }
}

fn filter(config: &LoggingConfig) -> EnvFilter {
    let mut filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    for directive in directives(config) {
        match directive.parse() {
            Ok(d) => filter = filter.add_directive(d),
            Err(e) => eprintln!("Ignoring invalid log directive '{directive}': {e}"),
        }
    }
    filter
}

fn directives(config: &LoggingConfig) -> Vec<String> {
    config
        .filters
        .iter()
        .map(|(target, level)| format!("{target}={level}"))
        .collect()
}

fn span_events(config: &SpanEventConfig) -> FmtSpan {
    let mut span = FmtSpan::NONE;
    for (enabled, event) in [
        (config.new, FmtSpan::NEW),
        (config.enter, FmtSpan::ENTER),
        (config.exit, FmtSpan::EXIT),
        (config.close, FmtSpan::CLOSE),
    ] {
        if enabled {
            span |= event;
        }
    }
    span
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_filters_become_directives() {
        let mut config = LoggingConfig::default();
        config.filters.insert("switchyard_framework".into(), LogLevel::Trace);
        config.filters.insert("switchyard_runtime".into(), LogLevel::Warn);

        assert_eq!(
            directives(&config),
            vec![
                "switchyard_framework=trace".to_string(),
                "switchyard_runtime=warn".to_string(),
            ]
        );
    }

    #[test]
    fn test_span_events_from_config() {
        assert_eq!(span_events(&SpanEventConfig::default()), FmtSpan::NONE);

        let lifecycle = SpanEventConfig {
            new: true,
            close: true,
            ..Default::default()
        };
        assert_eq!(span_events(&lifecycle), FmtSpan::NEW | FmtSpan::CLOSE);
    }

    #[test]
    fn test_file_output_without_path_falls_back() {
        let config = LoggingConfig {
            output: LogOutput::File,
            ..Default::default()
        };
        assert!(writer(&config).1.is_some());

        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            output: LogOutput::File,
            file_path: Some(dir.path().join("bot.log")),
            ..Default::default()
        };
        assert!(writer(&config).1.is_none());
    }
}
