//! Core logger types and traits

pub mod callsite;
pub mod config;
pub mod error;
pub mod formatter;
pub mod inspect;
pub mod log_context;
pub mod log_record;
pub mod logger;
pub mod metrics;
pub mod propagation;
pub mod registry;
pub mod severity;
pub mod sink;
pub mod timestamp;

pub use callsite::{CallSite, CallSiteResolver, CallSiteSource, StackFrame};
pub use config::{
    CallSiteMode, ConsoleOptions, ConsoleSetting, GlobalOptions, LoggerConfig, SinkFactory,
    SinkKinds, SinkRequest, TransportSpec,
};
pub use error::{LoggerError, Result};
pub use formatter::{Colorizer, LineFormatter};
pub use inspect::{Inspector, Value};
pub use log_context::{FieldValue, LogContext, WorkUnit};
pub use log_record::{LogArg, LogArgs, LogRecord};
pub use logger::{Logger, LoggerBuilder, DEFAULT_SHUTDOWN_TIMEOUT};
pub use metrics::LoggerMetrics;
pub use propagation::{spawn_in_context, spawn_thread_in_context, ContextFutureExt, ContextPropagator};
pub use registry::{ErrorHandler, SinkRegistry};
pub use severity::{Npm, Severity, SeverityModel, Syslog};
pub use sink::{Sink, SinkConfig};
pub use timestamp::TimestampFormat;
