//! # Context Logger System
//!
//! A process-wide leveled line logger. Every line carries the call site that
//! produced it and the request context that was ambient when it was logged,
//! and is fanned out to any number of sinks, each with its own threshold and
//! formatting.
//!
//! ## Features
//!
//! - **Call sites**: `[path:line:col]` tags relative to the project root
//! - **Ambient context**: request and user ids that follow a unit of work
//!   across `.await` points, spawned tasks and threads
//! - **Two severity models**: syslog's eight levels or npm's six, chosen per logger
//! - **Independent sinks**: console, syslog, file, memory or your own, each
//!   filtered and formatted on its own; a failing sink never affects the others
//! - **Declarative setup**: build a logger from JSON or TOML configuration
//!
//! ## Example
//!
//! ```
//! use context_logger_system::prelude::*;
//!
//! struct Request {
//!     id: u64,
//!     user: Option<u64>,
//! }
//!
//! impl WorkUnit for Request {
//!     fn acting_user_id(&self) -> Option<String> {
//!         self.user.map(|u| u.to_string())
//!     }
//!
//!     fn event_id(&self) -> Option<String> {
//!         Some(self.id.to_string())
//!     }
//! }
//!
//! let memory = MemorySink::new();
//! let logger = Logger::<Syslog>::builder()
//!     .sink(SinkConfig::new("memory", "info"), memory.clone())
//!     .call_site(CallSiteSource::Disabled)
//!     .build();
//!
//! let request = Request { id: 42, user: Some(7) };
//! logger.setup_context(&request, || {
//!     logger.info(("charging card", 1999));
//! });
//!
//! assert_eq!(memory.lines(), vec!["info [42 7] charging card 1999\n"]);
//! ```

pub mod appenders;
pub mod core;
pub mod macros;

pub mod prelude {
    pub use crate::appenders::{FileSink, MemorySink, StreamSink};
    #[cfg(unix)]
    pub use crate::appenders::{SyslogOptions, SyslogSink};
    pub use crate::core::{
        spawn_in_context, spawn_thread_in_context, CallSite, CallSiteSource, ContextFutureExt,
        ContextPropagator, FieldValue, LogArg, LogArgs, LogContext, Logger, LoggerBuilder,
        LoggerConfig, LoggerError, LoggerMetrics, Npm, Result, Severity, SeverityModel, Sink,
        SinkConfig, SinkKinds, Syslog, TimestampFormat, Value, WorkUnit, DEFAULT_SHUTDOWN_TIMEOUT,
    };
}

pub use appenders::{FileSink, MemorySink, StreamSink};
#[cfg(unix)]
pub use appenders::{Facility, SyslogOptions, SyslogSink};
pub use crate::core::{
    spawn_in_context, spawn_thread_in_context, CallSite, CallSiteMode, CallSiteResolver,
    CallSiteSource, Colorizer, ConsoleOptions, ConsoleSetting, ContextFutureExt,
    ContextPropagator, ErrorHandler, FieldValue, GlobalOptions, Inspector, LineFormatter, LogArg,
    LogArgs, LogContext, LogRecord, Logger, LoggerBuilder, LoggerConfig, LoggerError,
    LoggerMetrics, Npm, Result, Severity, SeverityModel, Sink, SinkConfig, SinkFactory,
    SinkKinds, SinkRegistry, SinkRequest, StackFrame, Syslog, TimestampFormat, TransportSpec,
    Value, WorkUnit, DEFAULT_SHUTDOWN_TIMEOUT,
};
