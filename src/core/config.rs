//! Declarative logger construction
//!
//! A [`LoggerConfig`] describes the sinks of a logger as data, loaded from
//! JSON or TOML:
//!
//! ```toml
//! console = { level = "info", colorize = true, timestamp = true }
//!
//! [syslog]
//! tag = "api"
//! facility = "local3"
//!
//! [global]
//! root = "/srv/api"
//!
//! [[transports]]
//! type = "file"
//! data = { path = "/var/log/api.log", level = "warn" }
//! ```
//!
//! Building never fails. A sink that cannot be created is skipped and
//! reported once as a warning line through the console sink (or stderr when
//! there is none); the remaining sinks work normally.

use super::{
    callsite::CallSiteSource,
    error::{LoggerError, Result},
    logger::{Logger, LoggerBuilder},
    severity::SeverityModel,
    sink::{Sink, SinkConfig},
};
use crate::appenders::{FileSink, MemorySink, StreamSink};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Keys of a transport's `data` object that configure routing and formatting
const ROUTING_KEYS: &[&str] = &["name", "level", "colorize", "timestamp"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Syslog sink options; `null`, `false`, `0` and `""` disable it
    pub syslog: Json,
    pub console: Option<ConsoleSetting>,
    pub global: GlobalOptions,
    pub transports: Vec<TransportSpec>,
}

/// `console: true` or `console: { level, colorize, timestamp }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConsoleSetting {
    Enabled(bool),
    Options(ConsoleOptions),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleOptions {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub colorize: bool,
    #[serde(default)]
    pub timestamp: bool,
}

fn default_level() -> String {
    "debug".to_string()
}

impl ConsoleSetting {
    /// Effective console options, `None` when the console is disabled
    pub fn resolve(&self) -> Option<ConsoleOptions> {
        match self {
            ConsoleSetting::Enabled(false) => None,
            ConsoleSetting::Enabled(true) => Some(ConsoleOptions {
                level: default_level(),
                colorize: true,
                timestamp: true,
            }),
            ConsoleSetting::Options(options) => Some(options.clone()),
        }
    }
}

/// How call sites are resolved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallSiteMode {
    #[default]
    Caller,
    Backtrace,
    Disabled,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalOptions {
    /// Project root for relative call-site paths (default: cwd)
    pub root: Option<PathBuf>,
    /// Frame to report in `backtrace` mode, counted from the caller
    pub depth: Option<usize>,
    pub call_site: CallSiteMode,
    /// Nesting depth rendered for structured arguments
    pub inspect_depth: Option<usize>,
    /// Dispatch through a worker thread with this queue size
    pub async_buffer: Option<usize>,
}

impl GlobalOptions {
    pub fn call_site_source(&self) -> CallSiteSource {
        match self.call_site {
            CallSiteMode::Caller => CallSiteSource::Caller,
            CallSiteMode::Backtrace => CallSiteSource::Backtrace {
                depth: self.depth.unwrap_or(0),
            },
            CallSiteMode::Disabled => CallSiteSource::Disabled,
        }
    }
}

/// One pluggable transport: a sink kind and its settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Json,
}

impl TransportSpec {
    pub fn new(kind: impl Into<String>, data: Json) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }

    /// Routing and formatting preferences carried in `data`
    pub fn sink_config(&self) -> SinkConfig {
        sink_config_from(&self.kind, &self.data)
    }
}

fn sink_config_from(default_name: &str, data: &Json) -> SinkConfig {
    let name = data
        .get("name")
        .and_then(Json::as_str)
        .unwrap_or(default_name);
    let level = data
        .get("level")
        .and_then(Json::as_str)
        .unwrap_or("debug");

    let mut config = SinkConfig::new(name, level)
        .with_colorize(data.get("colorize").and_then(Json::as_bool).unwrap_or(false))
        .with_timestamp(data.get("timestamp").and_then(Json::as_bool).unwrap_or(false));

    if let Some(object) = data.as_object() {
        for (key, value) in object {
            if !ROUTING_KEYS.contains(&key.as_str()) {
                config = config.with_custom(key.clone(), value.clone());
            }
        }
    }
    config
}

/// What a sink factory is asked to build
pub struct SinkRequest<'a> {
    pub kind: &'a str,
    pub data: &'a Json,
    /// Maps the logger's ranks to syslog severities
    pub syslog_code: fn(u8) -> u8,
}

pub type SinkFactory = Arc<dyn Fn(&SinkRequest<'_>) -> Result<Box<dyn Sink>> + Send + Sync>;

/// Named sink factories used to instantiate transports
///
/// Pre-populated with `console`, `file`, `memory` and (on Unix) `syslog`.
/// Registering an existing name replaces the factory.
#[derive(Clone)]
pub struct SinkKinds {
    factories: BTreeMap<String, SinkFactory>,
}

impl SinkKinds {
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    pub fn builtin() -> Self {
        let mut kinds = Self::empty();
        kinds.register("console", |_| Ok(Box::new(StreamSink::stdout())));
        kinds.register("memory", |_| Ok(Box::new(MemorySink::new())));
        kinds.register("file", |request| {
            let path = request
                .data
                .get("path")
                .and_then(Json::as_str)
                .ok_or_else(|| LoggerError::config("file transport", "missing 'path'"))?;
            Ok(Box::new(FileSink::new(path)?))
        });
        #[cfg(unix)]
        kinds.register("syslog", |request| {
            use crate::appenders::{SyslogOptions, SyslogSink};

            let options: SyslogOptions = if request.data.is_object() {
                serde_json::from_value(request.data.clone())?
            } else {
                SyslogOptions::default()
            };
            Ok(Box::new(
                SyslogSink::new(options)?.with_severity_map(request.syslog_code),
            ))
        });
        kinds
    }

    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&SinkRequest<'_>) -> Result<Box<dyn Sink>> + Send + Sync + 'static,
    {
        self.factories.insert(kind.into(), Arc::new(factory));
        self
    }

    #[must_use]
    pub fn with<F>(mut self, kind: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&SinkRequest<'_>) -> Result<Box<dyn Sink>> + Send + Sync + 'static,
    {
        self.register(kind, factory);
        self
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn kinds(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn create(&self, request: &SinkRequest<'_>) -> Result<Box<dyn Sink>> {
        let factory = self
            .factories
            .get(request.kind)
            .ok_or_else(|| LoggerError::UnknownSinkKind(request.kind.to_string()))?;
        factory(request)
    }
}

impl Default for SinkKinds {
    fn default() -> Self {
        Self::builtin()
    }
}

impl LoggerConfig {
    pub fn from_json_str(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Load a `.toml` file as TOML and anything else as JSON
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&source),
            _ => Self::from_json_str(&source),
        }
    }

    /// Console options in effect, `None` when the console is disabled
    pub fn console_options(&self) -> Option<ConsoleOptions> {
        self.console.as_ref().and_then(ConsoleSetting::resolve)
    }

    /// Whether a syslog sink is requested
    ///
    /// Fails for values that are neither an object nor falsy.
    pub fn syslog_enabled(&self) -> Result<bool> {
        match &self.syslog {
            Json::Object(_) => Ok(true),
            Json::Null | Json::Bool(false) => Ok(false),
            Json::String(s) if s.is_empty() => Ok(false),
            Json::Number(n) if n.as_f64() == Some(0.0) => Ok(false),
            other => Err(LoggerError::config(
                "syslog",
                format!(
                    "could not instantiate syslog, invalid config type. \
                     Expected 'object', got '{}'",
                    json_type(other)
                ),
            )),
        }
    }

    /// A builder carrying the `global` options and no sinks
    pub fn builder<M: SeverityModel>(&self) -> LoggerBuilder<M> {
        let mut builder = Logger::<M>::builder().call_site(self.global.call_site_source());
        if let Some(root) = &self.global.root {
            builder = builder.project_root(root.clone());
        }
        if let Some(depth) = self.global.inspect_depth {
            builder = builder.depth(depth);
        }
        if let Some(buffer_size) = self.global.async_buffer {
            builder = builder.async_mode(buffer_size);
        }
        builder
    }

    /// Build a logger with the built-in sink kinds
    pub fn build<M: SeverityModel>(&self) -> Logger<M> {
        self.build_with_kinds(&SinkKinds::builtin())
    }

    /// Build a logger, instantiating sinks through `kinds`
    ///
    /// Sinks are registered console first, then syslog, then transports in
    /// order.
    pub fn build_with_kinds<M: SeverityModel>(&self, kinds: &SinkKinds) -> Logger<M> {
        let mut builder = self.builder::<M>();
        let mut problems = Vec::new();

        if let Some(console) = self.console_options() {
            let data = serde_json::json!({});
            let config = SinkConfig::new("console", console.level)
                .with_colorize(console.colorize)
                .with_timestamp(console.timestamp);
            match kinds.create(&request::<M>("console", &data)) {
                Ok(sink) => builder = builder.boxed_sink(config, sink),
                Err(e) => problems.push(e),
            }
        }

        match self.syslog_enabled() {
            Ok(true) => {
                let config = sink_config_from("syslog", &self.syslog);
                match kinds.create(&request::<M>("syslog", &self.syslog)) {
                    Ok(sink) => builder = builder.boxed_sink(config, sink),
                    Err(e) => problems.push(e),
                }
            }
            Ok(false) => {}
            Err(e) => problems.push(e),
        }

        for transport in &self.transports {
            match kinds.create(&request::<M>(&transport.kind, &transport.data)) {
                Ok(sink) => builder = builder.boxed_sink(transport.sink_config(), sink),
                Err(e) => problems.push(e),
            }
        }

        let logger = builder.build();
        for problem in problems {
            logger.report_warning(format!("Skipping sink: {}", problem));
        }
        logger
    }
}

fn request<'a, M: SeverityModel>(kind: &'a str, data: &'a Json) -> SinkRequest<'a> {
    SinkRequest {
        kind,
        data,
        syslog_code: M::syslog_code,
    }
}

fn json_type(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}
