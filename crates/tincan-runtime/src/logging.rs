//! Logging setup using `tracing` and `tracing-subscriber`.
//!
//! ```rust,ignore
//! use tincan_runtime::{config::load_config, logging};
//!
//! let config = load_config()?;
//! logging::init_from_config(&config.logging);
//! ```
//!
//! Raw protocol lines are logged at DEBUG under the `tincan::wire` target;
//! `wire = true` enables them regardless of the base level.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tincan_transport::WIRE_TARGET;
use tracing::warn;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LogFormat, LogOutput, LogRotation, LoggingConfig, SpanEventConfig};

/// Maps the configured span events onto the formatter's flags.
///
/// The runtime opens a span per dispatched message and per routed command, so
/// `new` plus `close` shows how long each one took.
fn fmt_span(events: SpanEventConfig) -> fmt::format::FmtSpan {
    let mut span = fmt::format::FmtSpan::NONE;
    if events.new {
        span |= fmt::format::FmtSpan::NEW;
    }
    if events.enter {
        span |= fmt::format::FmtSpan::ENTER;
    }
    if events.exit {
        span |= fmt::format::FmtSpan::EXIT;
    }
    if events.close {
        span |= fmt::format::FmtSpan::CLOSE;
    }
    span
}

// =============================================================================
// Configuration-Based Initialization
// =============================================================================

/// Initialize logging from a `LoggingConfig`.
///
/// A subscriber that is already installed is left in place.
pub fn init_from_config(config: &LoggingConfig) {
    let _ = LoggingBuilder::from_config(config).try_init();
}

// =============================================================================
// LoggingBuilder
// =============================================================================

/// A subscriber configuration derived from a [`LoggingConfig`].
pub struct LoggingBuilder {
    directives: Vec<String>,
    level: tracing::Level,
    span_events: SpanEventConfig,
    format: LogFormat,
    output: LogOutput,
    rotation: LogRotation,
    with_thread_ids: bool,
    with_file_location: bool,
    with_wire: bool,
    file_path: Option<PathBuf>,
}

impl LoggingBuilder {
    /// Create a LoggingBuilder from a LoggingConfig.
    pub fn from_config(config: &LoggingConfig) -> Self {
        let directives = config
            .filters
            .iter()
            .map(|(target, level)| format!("{}={}", target, level.as_str()))
            .collect();

        Self {
            directives,
            level: config.level.to_tracing_level(),
            span_events: config.span_events,
            format: config.format,
            output: config.output,
            rotation: config.rotation,
            with_thread_ids: config.thread_ids,
            with_file_location: config.file_location,
            with_wire: config.wire,
            file_path: config.file_path.clone(),
        }
    }

    /// Returns the directives applied on top of the base level, in order.
    fn all_directives(&self) -> Vec<String> {
        let mut directives = Vec::with_capacity(self.directives.len() + 1);
        if self.with_wire {
            directives.push(format!("{WIRE_TARGET}=debug"));
        }
        directives.extend(self.directives.iter().cloned());
        directives
    }

    fn build_filter(&self) -> EnvFilter {
        let base_filter = self.level.to_string().to_lowercase();

        // RUST_LOG replaces the configured base level.
        let mut filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&base_filter));

        for directive in self.all_directives() {
            if let Ok(d) = directive.parse() {
                filter = filter.add_directive(d);
            }
        }

        filter
    }

    /// Try to initialize the logging system, returning an error on failure.
    pub fn try_init(self) -> Result<(), TryInitError> {
        let filter = self.build_filter();
        let span_events = fmt_span(self.span_events);

        macro_rules! configure_layer {
            ($layer:expr) => {
                $layer
                    .with_span_events(span_events)
                    .with_thread_ids(self.with_thread_ids)
                    .with_file(self.with_file_location)
                    .with_line_number(self.with_file_location)
            };
        }

        macro_rules! init_with_writer {
            ($writer:expr) => {
                match &self.format {
                    #[cfg(feature = "json-log")]
                    LogFormat::Json => {
                        let layer = fmt::layer()
                            .json()
                            .with_span_events(span_events)
                            .with_writer($writer);
                        tracing_subscriber::registry()
                            .with(layer)
                            .with(filter)
                            .try_init()
                    }
                    #[cfg(not(feature = "json-log"))]
                    LogFormat::Json | LogFormat::Compact => {
                        let layer = configure_layer!(fmt::layer().compact().with_writer($writer));
                        tracing_subscriber::registry()
                            .with(layer)
                            .with(filter)
                            .try_init()
                    }
                    #[cfg(feature = "json-log")]
                    LogFormat::Compact => {
                        let layer = configure_layer!(fmt::layer().compact().with_writer($writer));
                        tracing_subscriber::registry()
                            .with(layer)
                            .with(filter)
                            .try_init()
                    }
                    LogFormat::Full => {
                        let layer = configure_layer!(fmt::layer().with_writer($writer));
                        tracing_subscriber::registry()
                            .with(layer)
                            .with(filter)
                            .try_init()
                    }
                    LogFormat::Pretty => {
                        let layer = configure_layer!(fmt::layer().pretty().with_writer($writer));
                        tracing_subscriber::registry()
                            .with(layer)
                            .with(filter)
                            .try_init()
                    }
                }
            };
        }

        match &self.output {
            LogOutput::Stdout => init_with_writer!(std::io::stdout),
            LogOutput::Stderr => init_with_writer!(std::io::stderr),
            LogOutput::File => {
                if let Some(path) = &self.file_path {
                    let dir = path.parent().unwrap_or_else(|| Path::new("."));
                    let name = path.file_name().unwrap_or_else(|| OsStr::new("tincan.log"));
                    let file_appender = match self.rotation {
                        LogRotation::Never => tracing_appender::rolling::never(dir, name),
                        LogRotation::Hourly => tracing_appender::rolling::hourly(dir, name),
                        LogRotation::Daily => tracing_appender::rolling::daily(dir, name),
                    };
                    init_with_writer!(file_appender)
                } else {
                    let result = init_with_writer!(std::io::stdout);
                    warn!(
                        "File output requested but no file path configured, falling back to stdout"
                    );
                    result
                }
            }
        }
    }
}
