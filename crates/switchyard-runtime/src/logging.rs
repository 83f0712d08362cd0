//! Logging setup.
//!
//! The dispatch crates only emit `tracing` data: a `dispatch` span per
//! request (with `controller` and `action` fields), a `pipeline` span per
//! middleware scope, and debug/trace events for resolution. This module
//! installs a `tracing-subscriber` for applications.
//!
//! ```rust,ignore
//! use switchyard_runtime::config::{LogLevel, SpanEventConfig};
//! use switchyard_runtime::logging::LoggingBuilder;
//!
//! LoggingBuilder::new()
//!     .level(LogLevel::Debug)
//!     .directive("switchyard_framework=trace")
//!     .span_events(SpanEventConfig::LIFECYCLE)
//!     .init();
//! ```
//!
//! Or straight from configuration:
//!
//! ```rust,ignore
//! logging::init_from_config(&config.logging);
//! ```

use std::path::Path;

use tracing::warn;
use tracing_appender::rolling::{self, RollingFileAppender};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::config::{LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, SpanEventConfig};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Installs the subscriber described by `config`.
///
/// A subscriber that is already installed is left in place.
pub fn init_from_config(config: &LoggingConfig) {
    LoggingBuilder::from_config(config).init();
}

fn fmt_span(events: SpanEventConfig) -> FmtSpan {
    [
        (events.new, FmtSpan::NEW),
        (events.enter, FmtSpan::ENTER),
        (events.exit, FmtSpan::EXIT),
        (events.close, FmtSpan::CLOSE),
    ]
    .into_iter()
    .filter(|(enabled, _)| *enabled)
    .fold(FmtSpan::NONE, |acc, (_, span)| acc | span)
}

/// Builder for the global subscriber.
///
/// Starts from a [`LoggingConfig`]; extra filter directives and the target
/// toggle exist only here.
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    config: LoggingConfig,
    directives: Vec<String>,
    with_target: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingBuilder {
    /// Compact `info` lines on stdout.
    pub fn new() -> Self {
        Self::from_config(&LoggingConfig::default())
    }

    /// Starts from `config`; its per-target filters become directives,
    /// sorted by target.
    pub fn from_config(config: &LoggingConfig) -> Self {
        let mut targets: Vec<_> = config.filters.iter().collect();
        targets.sort_unstable_by(|a, b| a.0.cmp(b.0));
        Self {
            config: config.clone(),
            directives: targets
                .into_iter()
                .map(|(target, level)| format!("{target}={level}"))
                .collect(),
            with_target: true,
        }
    }

    /// Base level, used when `RUST_LOG` is unset.
    pub fn level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    /// Adds a filter directive such as `switchyard_framework=trace`.
    pub fn directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    pub fn span_events(mut self, events: SpanEventConfig) -> Self {
        self.config.span_events = events;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.config.output = output;
        self
    }

    /// Writes to `path` with the given rotation; implies [`LogOutput::File`].
    pub fn file(mut self, path: impl AsRef<Path>, rotation: LogRotation) -> Self {
        self.config.output = LogOutput::File;
        self.config.file_path = Some(path.as_ref().to_path_buf());
        self.config.rotation = rotation;
        self
    }

    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    pub fn with_thread_ids(mut self, enabled: bool) -> Self {
        self.config.thread_ids = enabled;
        self
    }

    /// Includes source file and line.
    pub fn with_file_location(mut self, enabled: bool) -> Self {
        self.config.file_location = enabled;
        self
    }

    /// `RUST_LOG` if set, else the base level; configured directives are
    /// added on top. Invalid directives are skipped with a warning.
    fn filter(&self) -> (EnvFilter, Vec<String>) {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.config.level.as_str()));
        let mut rejected = Vec::new();
        for directive in &self.directives {
            match directive.parse::<Directive>() {
                Ok(parsed) => filter = filter.add_directive(parsed),
                Err(_) => rejected.push(directive.clone()),
            }
        }
        (filter, rejected)
    }

    fn writer(&self) -> BoxMakeWriter {
        match (self.config.output, self.config.file_path.as_deref()) {
            (LogOutput::Stdout, _) => BoxMakeWriter::new(std::io::stdout),
            (LogOutput::Stderr, _) => BoxMakeWriter::new(std::io::stderr),
            (LogOutput::File, Some(path)) => BoxMakeWriter::new(self.appender(path)),
            (LogOutput::File, None) => BoxMakeWriter::new(std::io::stdout),
        }
    }

    fn appender(&self, path: &Path) -> RollingFileAppender {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "switchyard.log".to_string());
        match self.config.rotation {
            LogRotation::Never => rolling::never(dir, name),
            LogRotation::Hourly => rolling::hourly(dir, name),
            LogRotation::Daily => rolling::daily(dir, name),
        }
    }

    fn layer(&self) -> BoxedLayer {
        let layer = fmt::layer()
            .with_writer(self.writer())
            .with_span_events(fmt_span(self.config.span_events))
            .with_target(self.with_target)
            .with_thread_ids(self.config.thread_ids)
            .with_file(self.config.file_location)
            .with_line_number(self.config.file_location);

        match self.config.format {
            LogFormat::Compact => layer.compact().boxed(),
            LogFormat::Pretty => layer.pretty().boxed(),
            #[cfg(feature = "json-log")]
            LogFormat::Json => layer.json().boxed(),
            LogFormat::Full => layer.boxed(),
            #[cfg(not(feature = "json-log"))]
            LogFormat::Json => layer.boxed(),
        }
    }

    /// Installs the subscriber, ignoring an already installed one.
    pub fn init(self) {
        let _ = self.try_init();
    }

    /// Installs the subscriber.
    ///
    /// Fails if a global subscriber is already set. Configuration problems
    /// that could be worked around are reported as warnings once logging is
    /// up.
    pub fn try_init(self) -> Result<(), TryInitError> {
        let (filter, rejected) = self.filter();
        tracing_subscriber::registry()
            .with(self.layer())
            .with(filter)
            .try_init()?;

        for directive in rejected {
            warn!(%directive, "Ignoring invalid log directive");
        }
        if self.config.output == LogOutput::File && self.config.file_path.is_none() {
            warn!("File output requested without a file path, logging to stdout");
        }
        if cfg!(not(feature = "json-log")) && self.config.format == LogFormat::Json {
            warn!("JSON logs need the `json-log` feature, using the full format");
        }
        Ok(())
    }
}
