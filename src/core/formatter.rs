//! Line rendering
//!
//! Layout, single-space separated and newline terminated:
//!
//! ```text
//! [timestamp] level [path:line:col] [requestId userId] [key=value ...] args...
//! ```
//!
//! Bracketed parts are omitted when the sink does not want them or there is
//! nothing to show.

use super::inspect::{Inspector, DEFAULT_DEPTH};
use super::log_record::{LogArg, LogRecord};
use super::severity::{Severity, SeverityModel};
use super::sink::SinkConfig;
use super::timestamp::TimestampFormat;
use std::fmt;
use std::sync::Arc;

/// Replacement for the model's level colors
pub type Colorizer = Arc<dyn Fn(Severity) -> String + Send + Sync>;

#[derive(Clone)]
pub struct LineFormatter {
    inspector: Inspector,
    timestamp_format: TimestampFormat,
    colorizer: Option<Colorizer>,
}

impl LineFormatter {
    pub fn new() -> Self {
        Self {
            inspector: Inspector::new(DEFAULT_DEPTH),
            timestamp_format: TimestampFormat::default(),
            colorizer: None,
        }
    }

    /// Nesting depth rendered for structured arguments
    #[must_use]
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.inspector = Inspector::new(depth);
        self
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    /// Use `colorizer` instead of the severity model's colors
    #[must_use]
    pub fn with_colorizer(mut self, colorizer: Colorizer) -> Self {
        self.colorizer = Some(colorizer);
        self
    }

    /// Render `record` for a sink configured by `config`
    pub fn render<M: SeverityModel>(&self, record: &LogRecord, config: &SinkConfig) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(5 + record.args.len());

        if config.timestamp {
            parts.push(self.timestamp_format.format(&record.timestamp));
        }

        parts.push(if config.colorize {
            self.colorize::<M>(record.severity)
        } else {
            record.severity.name().to_string()
        });

        if let Some(ref callsite) = record.callsite {
            parts.push(callsite.tag());
        }

        if let Some(ref context) = record.context {
            if context.has_identifiers() {
                parts.push(context.format_tag());
            }
            if !context.fields().is_empty() {
                parts.push(context.format_fields());
            }
        }

        parts.extend(record.args.iter().map(|arg| self.render_arg(arg)));

        let mut line = parts.join(" ");
        line.push('\n');
        line
    }

    /// Render one argument
    pub fn render_arg(&self, arg: &LogArg) -> String {
        match arg {
            LogArg::Text(s) | LogArg::Number(s) | LogArg::Debug(s) => s.clone(),
            LogArg::Value(value) => self.inspector.inspect(value),
        }
    }

    fn colorize<M: SeverityModel>(&self, severity: Severity) -> String {
        match self.colorizer {
            Some(ref colorizer) => colorizer(severity),
            None => M::colorize(severity),
        }
    }
}

impl Default for LineFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LineFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineFormatter")
            .field("inspector", &self.inspector)
            .field("timestamp_format", &self.timestamp_format)
            .field("custom_colorizer", &self.colorizer.is_some())
            .finish()
    }
}
