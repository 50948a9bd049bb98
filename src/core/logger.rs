//! Logger facade
//!
//! [`Logger`] ties the pieces together: a facade call resolves its call site,
//! reads the ambient [`LogContext`](super::LogContext) and hands one
//! [`LogRecord`] to the sink registry, either inline or through a bounded
//! queue drained by a worker thread.

use super::{
    callsite::{CallSiteResolver, CallSiteSource},
    error::{LoggerError, Result},
    formatter::{Colorizer, LineFormatter},
    log_context::{LogContext, WorkUnit},
    log_record::{LogArg, LogArgs, LogRecord},
    metrics::LoggerMetrics,
    propagation::ContextPropagator,
    registry::{report_failures, ErrorHandler, SinkRegistry},
    severity::{Npm, Severity, SeverityModel, Syslog},
    sink::{Sink, SinkConfig},
    timestamp::TimestampFormat,
};
use crate::appenders::StreamSink;
use crossbeam_channel::{bounded, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use std::future::Future;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicI16, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::task::futures::TaskLocalFuture;

/// Default shutdown timeout for logger cleanup (5 seconds)
///
/// Used when the last handle is dropped without an explicit
/// [`Logger::shutdown`].
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Records the worker dispatches before flushing the sinks
const BATCH_SIZE: usize = 50;

/// Run `f` under the registry lock, then report sink failures unlocked
fn with_registry<M: SeverityModel, R>(
    registry: &Mutex<SinkRegistry<M>>,
    f: impl FnOnce(&mut SinkRegistry<M>) -> R,
) -> R {
    let (result, failures, handler) = {
        let mut registry = registry.lock();
        let result = f(&mut *registry);
        (result, registry.take_failures(), registry.error_handler())
    };
    if !failures.is_empty() {
        report_failures(&handler, failures);
    }
    result
}

struct Inner<M: SeverityModel> {
    registry: Arc<Mutex<SinkRegistry<M>>>,
    resolver: CallSiteResolver,
    metrics: Arc<LoggerMetrics>,
    /// Loosest threshold over all sinks, -1 while there are none
    loosest: AtomicI16,
    stopped: AtomicBool,
    sender: RwLock<Option<Sender<LogRecord>>>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
}

impl<M: SeverityModel> Inner<M> {
    fn stop(&self, timeout: Duration) -> bool {
        self.stopped.store(true, Ordering::Release);

        // Closing the channel lets the worker drain what is queued and exit
        drop(self.sender.write().take());

        if let Some(handle) = self.worker.lock().take() {
            let start = Instant::now();

            loop {
                if handle.is_finished() {
                    if let Err(e) = handle.join() {
                        eprintln!(
                            "[LOGGER ERROR] Async worker thread panicked during shutdown: {:?}",
                            e
                        );
                        return false;
                    }
                    break;
                }

                if start.elapsed() >= timeout {
                    eprintln!(
                        "[LOGGER WARNING] Async worker thread did not finish within {:?}. \
                         Some logs may be lost.",
                        timeout
                    );
                    return false;
                }

                thread::sleep(Duration::from_millis(10));
            }
        }

        with_registry(&self.registry, SinkRegistry::flush);
        true
    }
}

impl<M: SeverityModel> Drop for Inner<M> {
    fn drop(&mut self) {
        if !self.stopped.load(Ordering::Acquire) {
            self.stop(DEFAULT_SHUTDOWN_TIMEOUT);
        }

        let dropped = self.metrics.dropped_count();
        if dropped > 0 {
            eprintln!(
                "[LOGGER WARNING] Logger shutting down with {} dropped records",
                dropped
            );
        }
    }
}

/// Process-wide leveled line logger
///
/// Cloning is cheap; every clone shares sinks, metrics and the async worker.
/// The severity vocabulary is fixed by `M`: a `Logger<Syslog>` offers
/// `emerg` to `debug`, a `Logger<Npm>` offers `error` to `silly`.
///
/// # Example
///
/// ```
/// use context_logger_system::prelude::*;
///
/// let memory = MemorySink::new();
/// let logger = Logger::<Syslog>::builder()
///     .sink(SinkConfig::new("memory", "info"), memory.clone())
///     .call_site(CallSiteSource::Disabled)
///     .build();
///
/// logger.info(("listening on", 8080));
/// logger.debug("not admitted");
///
/// assert_eq!(memory.lines(), vec!["info listening on 8080\n"]);
/// ```
pub struct Logger<M: SeverityModel = Syslog> {
    inner: Arc<Inner<M>>,
}

impl<M: SeverityModel> Clone for Logger<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: SeverityModel> Logger<M> {
    /// Logger with a colorized, timestamped stdout sink admitting everything
    #[must_use]
    pub fn new() -> Self {
        Self::builder()
            .sink(
                SinkConfig::new("console", "debug")
                    .with_colorize(true)
                    .with_timestamp(true),
                StreamSink::stdout(),
            )
            .build()
    }

    /// Start configuring a logger
    ///
    /// Without [`LoggerBuilder::async_mode`] records are written inline on the
    /// calling thread, so a stalled sink (a full stdout pipe, a slow disk)
    /// stalls the log call with it. Services should enable `async_mode`, where
    /// a log call only ever enqueues and drops the record when the queue is full.
    #[must_use]
    pub fn builder() -> LoggerBuilder<M> {
        LoggerBuilder::new()
    }

    /// Register another sink after construction
    pub fn add_sink(&self, config: SinkConfig, sink: Box<dyn Sink>) {
        let threshold = i16::from(M::threshold_rank(&config.level));
        self.inner.registry.lock().register(config, sink);
        self.inner.loosest.fetch_max(threshold, Ordering::AcqRel);
    }

    /// Registered sink names in dispatch order
    pub fn sink_names(&self) -> Vec<String> {
        self.inner.registry.lock().names()
    }

    pub fn call_site_source(&self) -> CallSiteSource {
        self.inner.resolver.source()
    }

    pub fn project_root(&self) -> &Path {
        self.inner.resolver.project_root()
    }

    /// Log at a level given by name
    ///
    /// Names outside the model are rendered at the model's fallback level.
    #[track_caller]
    pub fn log_at(&self, level: &str, args: impl LogArgs) {
        let _ = self.emit(M::severity(level), args.into_args(), Location::caller());
    }

    /// Like [`log_at`](Self::log_at), but reports what happened to the record
    ///
    /// Fails with [`LoggerError::UnknownLevel`] for names outside the model,
    /// [`LoggerError::ChannelSendError`] when the async queue is full and
    /// [`LoggerError::LoggerStopped`] after [`shutdown`](Self::shutdown).
    /// A record no sink admits is not an error.
    #[track_caller]
    pub fn try_log(&self, level: &str, args: impl LogArgs) -> Result<()> {
        let severity = M::lookup(level).ok_or_else(|| LoggerError::unknown_level(level, M::NAME))?;
        self.emit(severity, args.into_args(), Location::caller())
    }

    /// True when some sink would accept a record at `severity`
    pub fn is_enabled(&self, severity: Severity) -> bool {
        let loosest = self.inner.loosest.load(Ordering::Acquire);
        loosest >= 0 && M::is_admitted(severity.rank(), loosest as u8)
    }

    #[inline(never)]
    fn emit(
        &self,
        severity: Severity,
        args: Vec<LogArg>,
        caller: &'static Location<'static>,
    ) -> Result<()> {
        if self.inner.stopped.load(Ordering::Acquire) {
            return Err(LoggerError::LoggerStopped);
        }
        if !self.is_enabled(severity) {
            return Ok(());
        }

        let record = LogRecord::new(severity, args)
            .with_context(ContextPropagator::current_context())
            .with_callsite(self.inner.resolver.resolve(caller));
        self.submit(record)
    }

    fn submit(&self, record: LogRecord) -> Result<()> {
        let sender = self.inner.sender.read();
        match sender.as_ref() {
            Some(sender) => match sender.try_send(record) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(_)) => {
                    self.alert_and_drop();
                    Err(LoggerError::ChannelSendError)
                }
                Err(TrySendError::Disconnected(_)) => Err(LoggerError::LoggerStopped),
            },
            None => {
                drop(sender);
                with_registry(&self.inner.registry, |registry| registry.dispatch(&record));
                Ok(())
            }
        }
    }

    fn alert_and_drop(&self) {
        self.inner.metrics.record_queue_full();
        let dropped_count = self.inner.metrics.record_dropped();

        // Alert on the first drop and every 1000th after it
        if dropped_count == 0 || (dropped_count + 1) % 1000 == 0 {
            eprintln!(
                "[LOGGER WARNING] Queue full, {} records dropped. \
                 Consider increasing the async buffer size.",
                dropped_count + 1
            );
        }
    }

    /// Write a warning about the logger's own configuration
    ///
    /// Goes to the sink named `console` regardless of its threshold, or to
    /// stderr when there is no such sink.
    pub(crate) fn report_warning(&self, message: impl Into<String>) {
        let message = message.into();
        let record = LogRecord::new(M::severity("warn"), vec![LogArg::Text(message.clone())]);
        if !with_registry(&self.inner.registry, |registry| {
            registry.write_to("console", &record)
        }) {
            eprintln!("[LOGGER WARNING] {}", message);
        }
    }

    /// Run `next` with a context built from `unit`
    ///
    /// Call once per unit of work at its entry point; every log call made
    /// while `next` runs, directly or through nested calls, carries the
    /// unit's request and user ids.
    pub fn setup_context<W, R>(&self, unit: &W, next: impl FnOnce() -> R) -> R
    where
        W: WorkUnit + ?Sized,
    {
        ContextPropagator::run_with_new_context(LogContext::from_work_unit(unit), next)
    }

    /// Async counterpart of [`setup_context`](Self::setup_context)
    pub fn setup_context_async<W, F>(
        &self,
        unit: &W,
        next: F,
    ) -> TaskLocalFuture<Option<Arc<LogContext>>, F>
    where
        W: WorkUnit + ?Sized,
        F: Future,
    {
        ContextPropagator::scope(LogContext::from_work_unit(unit), next)
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.inner.metrics
    }

    /// Flush every sink
    ///
    /// In async mode records still queued are not waited for; use
    /// [`shutdown`](Self::shutdown) for that.
    pub fn flush(&self) {
        with_registry(&self.inner.registry, SinkRegistry::flush);
    }

    /// Drain queued records, flush the sinks and stop accepting records
    ///
    /// Returns `false` if the worker did not finish within `timeout`. Later
    /// log calls on any clone are discarded.
    ///
    /// ```no_run
    /// use context_logger_system::{Logger, Syslog};
    /// use std::time::Duration;
    ///
    /// let logger = Logger::<Syslog>::builder().async_mode(1000).build();
    /// logger.info("Important message");
    ///
    /// if !logger.shutdown(Duration::from_secs(10)) {
    ///     eprintln!("Warning: logger shutdown timed out");
    /// }
    /// ```
    pub fn shutdown(&self, timeout: Duration) -> bool {
        if self.inner.stopped.load(Ordering::Acquire) {
            return true;
        }
        self.inner.stop(timeout)
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }
}

impl<M: SeverityModel> Default for Logger<M> {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! level_methods {
    ($model:ty { $($name:ident => $level:expr),* $(,)? }) => {
        impl Logger<$model> {
            $(
                #[track_caller]
                pub fn $name(&self, args: impl LogArgs) {
                    let _ = self.emit($level, args.into_args(), Location::caller());
                }
            )*
        }
    };
}

level_methods!(Syslog {
    emerg => Syslog::EMERG,
    emergency => Syslog::EMERG,
    alert => Syslog::ALERT,
    crit => Syslog::CRIT,
    critical => Syslog::CRIT,
    error => Syslog::ERROR,
    err => Syslog::ERROR,
    warn => Syslog::WARN,
    warning => Syslog::WARN,
    notice => Syslog::NOTICE,
    info => Syslog::INFO,
    log => Syslog::INFO,
    debug => Syslog::DEBUG,
    trace => Syslog::DEBUG,
});

level_methods!(Npm {
    error => Npm::ERROR,
    err => Npm::ERROR,
    warn => Npm::WARN,
    warning => Npm::WARN,
    info => Npm::INFO,
    verbose => Npm::VERBOSE,
    debug => Npm::DEBUG,
    silly => Npm::SILLY,
});

/// Builder for constructing a [`Logger`] with a fluent API
///
/// # Example
/// ```
/// use context_logger_system::prelude::*;
///
/// let logger = Logger::<Npm>::builder()
///     .sink(SinkConfig::new("console", "info").with_colorize(true), StreamSink::stdout())
///     .depth(4)
///     .async_mode(1000)
///     .build();
/// logger.verbose("dropped by the console threshold");
/// ```
pub struct LoggerBuilder<M: SeverityModel = Syslog> {
    sinks: Vec<(SinkConfig, Box<dyn Sink>)>,
    formatter: LineFormatter,
    call_site: CallSiteSource,
    project_root: Option<PathBuf>,
    async_buffer: Option<usize>,
    on_error: Option<ErrorHandler>,
    _model: std::marker::PhantomData<fn() -> M>,
}

impl<M: SeverityModel> LoggerBuilder<M> {
    pub fn new() -> Self {
        Self {
            sinks: Vec::new(),
            formatter: LineFormatter::new(),
            call_site: CallSiteSource::default(),
            project_root: None,
            async_buffer: None,
            on_error: None,
            _model: std::marker::PhantomData,
        }
    }

    /// Add a sink with its routing and formatting preferences
    #[must_use = "builder methods return a new value"]
    pub fn sink<S: Sink + 'static>(self, config: SinkConfig, sink: S) -> Self {
        self.boxed_sink(config, Box::new(sink))
    }

    #[must_use = "builder methods return a new value"]
    pub fn boxed_sink(mut self, config: SinkConfig, sink: Box<dyn Sink>) -> Self {
        self.sinks.push((config, sink));
        self
    }

    /// Replace the line formatter wholesale
    #[must_use = "builder methods return a new value"]
    pub fn formatter(mut self, formatter: LineFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    /// Nesting depth for structured arguments
    #[must_use = "builder methods return a new value"]
    pub fn depth(mut self, depth: usize) -> Self {
        self.formatter = self.formatter.with_depth(depth);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.formatter = self.formatter.with_timestamp_format(format);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn colorizer(mut self, colorizer: Colorizer) -> Self {
        self.formatter = self.formatter.with_colorizer(colorizer);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn call_site(mut self, source: CallSiteSource) -> Self {
        self.call_site = source;
        self
    }

    /// Directory call-site paths are reported relative to (default: cwd)
    #[must_use = "builder methods return a new value"]
    pub fn project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = Some(root.into());
        self
    }

    /// Dispatch on a worker thread through a queue of `buffer_size` records
    ///
    /// If not called, the logger dispatches synchronously and a blocked sink
    /// blocks the caller. In async mode the caller never waits on a sink.
    #[must_use = "builder methods return a new value"]
    pub fn async_mode(mut self, buffer_size: usize) -> Self {
        self.async_buffer = Some(buffer_size.max(1));
        self
    }

    /// Handler for sink failures (default: print to stderr)
    #[must_use = "builder methods return a new value"]
    pub fn on_error(mut self, handler: ErrorHandler) -> Self {
        self.on_error = Some(handler);
        self
    }

    pub fn build(self) -> Logger<M> {
        let metrics = Arc::new(LoggerMetrics::new());
        let mut registry = SinkRegistry::new(self.formatter, Arc::clone(&metrics));
        if let Some(handler) = self.on_error {
            registry.set_error_handler(handler);
        }

        let mut loosest = -1i16;
        for (config, sink) in self.sinks {
            loosest = loosest.max(i16::from(M::threshold_rank(&config.level)));
            registry.register(config, sink);
        }

        let resolver = match self.project_root {
            Some(root) => CallSiteResolver::with_root(self.call_site, root),
            None => CallSiteResolver::new(self.call_site),
        };

        let registry = Arc::new(Mutex::new(registry));
        let (sender, worker) = match self.async_buffer {
            Some(buffer_size) => match spawn_worker(buffer_size, Arc::clone(&registry)) {
                Ok((sender, handle)) => (Some(sender), Some(handle)),
                Err(e) => {
                    eprintln!(
                        "[LOGGER ERROR] Failed to start async worker, logging synchronously: {}",
                        e
                    );
                    (None, None)
                }
            },
            None => (None, None),
        };

        Logger {
            inner: Arc::new(Inner {
                registry,
                resolver,
                metrics,
                loosest: AtomicI16::new(loosest),
                stopped: AtomicBool::new(false),
                sender: RwLock::new(sender),
                worker: Mutex::new(worker),
            }),
        }
    }
}

impl<M: SeverityModel> Default for LoggerBuilder<M> {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_worker<M: SeverityModel>(
    buffer_size: usize,
    registry: Arc<Mutex<SinkRegistry<M>>>,
) -> std::io::Result<(Sender<LogRecord>, thread::JoinHandle<()>)> {
    let (sender, receiver) = bounded::<LogRecord>(buffer_size);

    let handle = thread::Builder::new()
        .name("log-dispatch".to_string())
        .spawn(move || {
            let mut batch = Vec::with_capacity(BATCH_SIZE);

            while let Ok(record) = receiver.recv() {
                batch.push(record);
                while batch.len() < BATCH_SIZE {
                    match receiver.try_recv() {
                        Ok(record) => batch.push(record),
                        Err(_) => break,
                    }
                }

                with_registry(&registry, |registry| {
                    for record in batch.drain(..) {
                        registry.dispatch(&record);
                    }
                    registry.flush();
                });
            }
        })?;

    Ok((sender, handle))
}
