//! Logger builder implementation

use tracing_subscriber::fmt::{self, TestWriter, writer::BoxMakeWriter};
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, Format, Writer};
use crate::core::{LogError, LogResult};

/// Logger builder
#[derive(Debug)]
pub struct LoggerBuilder {
    config: Config,
}

/// Returned by [`LoggerBuilder::build`]
///
/// Reports whether this call installed the global subscriber. A disabled
/// configuration, or a process that already has a subscriber, yields an
/// inactive guard.
#[derive(Debug)]
#[must_use = "the guard reports whether logging was installed"]
pub struct LoggerGuard {
    installed: bool,
}

/// Human-readable fmt layer with the shared display options applied.
macro_rules! create_fmt_layer {
    ($style:ident, $display:expr, $writer:expr) => {
        fmt::layer()
            .$style()
            .with_ansi($display.colors)
            .with_target($display.target)
            .with_file($display.source)
            .with_line_number($display.source)
            .with_writer($writer)
    };
}

impl LoggerBuilder {
    /// Create builder from config
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Install the global subscriber.
    ///
    /// A second call in the same process leaves the first subscriber in
    /// place and returns an inactive guard.
    pub fn build(self) -> LogResult<LoggerGuard> {
        if !self.config.enabled {
            return Ok(LoggerGuard::noop());
        }

        let filter = EnvFilter::try_new(&self.config.level)
            .map_err(|e| LogError::Filter(format!("{}: {e}", self.config.level)))?;
        let display = &self.config.display;
        let writer = make_writer(self.config.writer);
        let registry = Registry::default().with(filter);

        let result = match self.config.format {
            Format::Compact => registry
                .with(create_fmt_layer!(compact, display, writer))
                .try_init(),
            Format::Pretty => registry
                .with(create_fmt_layer!(pretty, display, writer))
                .try_init(),
            Format::Json => registry
                .with(
                    fmt::layer()
                        .json()
                        .with_current_span(true)
                        .with_span_list(false)
                        .with_target(display.target)
                        .with_file(display.source)
                        .with_line_number(display.source)
                        .with_writer(writer),
                )
                .try_init(),
        };

        if result.is_err() {
            tracing::debug!("Global subscriber already set; keeping it");
            return Ok(LoggerGuard::noop());
        }

        tracing::debug!(
            level = %self.config.level,
            format = %self.config.format,
            "Logger initialized"
        );
        Ok(LoggerGuard { installed: true })
    }
}

impl LoggerGuard {
    pub(crate) const fn noop() -> Self {
        Self { installed: false }
    }

    /// Whether this guard's builder installed the global subscriber
    pub const fn is_installed(&self) -> bool {
        self.installed
    }
}

fn make_writer(writer: Writer) -> BoxMakeWriter {
    match writer {
        Writer::Stderr => BoxMakeWriter::new(std::io::stderr),
        Writer::Stdout => BoxMakeWriter::new(std::io::stdout),
        Writer::Test => BoxMakeWriter::new(TestWriter::new()),
    }
}
