//! Sink trait and per-sink configuration

use super::error::Result;
use serde::{Deserialize, Serialize};

/// Output destination for rendered log lines
///
/// `severity` is the numeric rank of the record in the logger's model.
pub trait Sink: Send {
    fn write(&mut self, line: &str, severity: u8) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
    fn name(&self) -> &str;
}

/// Routing and formatting preferences of one registered sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkConfig {
    pub name: String,
    /// Threshold level name; unknown names admit every record
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub colorize: bool,
    #[serde(default)]
    pub timestamp: bool,
    #[serde(default)]
    pub custom: serde_json::Map<String, serde_json::Value>,
}

fn default_level() -> String {
    "debug".to_string()
}

impl SinkConfig {
    /// Plain, untimestamped sink admitting `level` and everything more severe
    pub fn new(name: impl Into<String>, level: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: level.into(),
            colorize: false,
            timestamp: false,
            custom: serde_json::Map::new(),
        }
    }

    #[must_use]
    pub fn with_colorize(mut self, colorize: bool) -> Self {
        self.colorize = colorize;
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: bool) -> Self {
        self.timestamp = timestamp;
        self
    }

    #[must_use]
    pub fn with_custom(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.custom.insert(key.into(), value);
        self
    }
}
