//! Sink registry and fan-out dispatch
//!
//! Every registered sink carries its own threshold and formatting
//! preferences. Dispatch visits sinks in registration order; each sink is
//! rendered for and written to independently, and a failing or panicking sink
//! never affects the others.
//!
//! Failures are queued on the registry and handed to the error handler by
//! [`report_failures`] once the caller has released the registry lock, so a
//! handler may log through the same logger.

use super::error::LoggerError;
use super::formatter::LineFormatter;
use super::log_record::LogRecord;
use super::metrics::LoggerMetrics;
use super::severity::{Severity, SeverityModel};
use super::sink::{Sink, SinkConfig};
use std::any::Any;
use std::cell::Cell;
use std::marker::PhantomData;
use std::sync::Arc;

/// Receives `(sink name, error)` for every failed sink write
pub type ErrorHandler = Arc<dyn Fn(&str, &LoggerError) + Send + Sync>;

/// A sink name and what went wrong with it
pub type SinkFailure = (String, LoggerError);

thread_local! {
    static IN_ERROR_HANDLER: Cell<bool> = const { Cell::new(false) };
}

/// Handler printing failures to stderr
pub fn stderr_error_handler() -> ErrorHandler {
    Arc::new(print_failure)
}

fn print_failure(sink: &str, err: &LoggerError) {
    eprintln!("[LOGGER ERROR] sink '{}' write failed: {}", sink, err);
}

/// Hand `failures` to `handler`
///
/// Must be called without the registry lock held. Failures raised while the
/// handler itself is running on this thread go to stderr instead, which
/// stops a handler that logs through a failing sink from recursing.
pub fn report_failures(handler: &ErrorHandler, failures: Vec<SinkFailure>) {
    for (sink, err) in failures {
        if IN_ERROR_HANDLER.with(Cell::get) {
            print_failure(&sink, &err);
            continue;
        }

        IN_ERROR_HANDLER.with(|flag| flag.set(true));
        let result =
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler(&sink, &err)));
        IN_ERROR_HANDLER.with(|flag| flag.set(false));

        if result.is_err() {
            eprintln!("[LOGGER ERROR] error handler panicked while reporting sink '{}'", sink);
        }
    }
}

struct RegisteredSink {
    config: SinkConfig,
    threshold: u8,
    sink: Box<dyn Sink>,
}

pub struct SinkRegistry<M: SeverityModel> {
    sinks: Vec<RegisteredSink>,
    formatter: LineFormatter,
    on_error: ErrorHandler,
    failures: Vec<SinkFailure>,
    metrics: Arc<LoggerMetrics>,
    _model: PhantomData<fn() -> M>,
}

impl<M: SeverityModel> SinkRegistry<M> {
    pub fn new(formatter: LineFormatter, metrics: Arc<LoggerMetrics>) -> Self {
        Self {
            sinks: Vec::new(),
            formatter,
            on_error: stderr_error_handler(),
            failures: Vec::new(),
            metrics,
            _model: PhantomData,
        }
    }

    /// Add a sink; its threshold is resolved against the model now
    pub fn register(&mut self, config: SinkConfig, sink: Box<dyn Sink>) {
        let threshold = M::threshold_rank(&config.level);
        self.sinks.push(RegisteredSink {
            config,
            threshold,
            sink,
        });
    }

    pub fn set_error_handler(&mut self, handler: ErrorHandler) {
        self.on_error = handler;
    }

    pub fn error_handler(&self) -> ErrorHandler {
        Arc::clone(&self.on_error)
    }

    /// Failures queued since the last call
    pub fn take_failures(&mut self) -> Vec<SinkFailure> {
        std::mem::take(&mut self.failures)
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Registered sink names in dispatch order
    pub fn names(&self) -> Vec<String> {
        self.sinks.iter().map(|s| s.config.name.clone()).collect()
    }

    /// True when at least one sink would accept `severity`
    pub fn admits(&self, severity: Severity) -> bool {
        self.sinks
            .iter()
            .any(|s| M::is_admitted(severity.rank(), s.threshold))
    }

    /// Render and write `record` to every sink whose threshold admits it
    pub fn dispatch(&mut self, record: &LogRecord) {
        self.metrics.record_dispatched();
        let rank = record.severity.rank();
        let formatter = &self.formatter;

        for entry in self.sinks.iter_mut() {
            if !M::is_admitted(rank, entry.threshold) {
                self.metrics.record_filtered();
                continue;
            }

            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                let line = formatter.render::<M>(record, &entry.config);
                entry.sink.write(&line, rank)
            }));

            match result {
                Ok(Ok(())) => self.metrics.record_written(),
                Ok(Err(e)) => {
                    self.metrics.record_sink_failure();
                    self.failures.push((entry.config.name.clone(), e));
                }
                Err(panic_info) => {
                    self.metrics.record_sink_failure();
                    let err = LoggerError::sink_write(
                        entry.config.name.clone(),
                        format!("panicked: {}", panic_message(&panic_info)),
                    );
                    self.failures.push((entry.config.name.clone(), err));
                }
            }
        }
    }

    /// Render `record` for the sink registered as `name` and write it there
    ///
    /// The sink's threshold is bypassed. Returns `false` if no such sink exists.
    pub fn write_to(&mut self, name: &str, record: &LogRecord) -> bool {
        let formatter = &self.formatter;
        let Some(entry) = self.sinks.iter_mut().find(|s| s.config.name == name) else {
            return false;
        };

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let line = formatter.render::<M>(record, &entry.config);
            entry.sink.write(&line, record.severity.rank())
        }));
        match result {
            Ok(Ok(())) => self.metrics.record_written(),
            Ok(Err(e)) => {
                self.metrics.record_sink_failure();
                self.failures.push((entry.config.name.clone(), e));
            }
            Err(panic_info) => {
                self.metrics.record_sink_failure();
                let err = LoggerError::sink_write(
                    entry.config.name.clone(),
                    format!("panicked: {}", panic_message(&panic_info)),
                );
                self.failures.push((entry.config.name.clone(), err));
            }
        }
        true
    }

    /// Flush every sink, queueing failures for the error handler
    pub fn flush(&mut self) {
        for entry in self.sinks.iter_mut() {
            let result =
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| entry.sink.flush()));
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => self.failures.push((entry.config.name.clone(), e)),
                Err(panic_info) => {
                    let err = LoggerError::sink_write(
                        entry.config.name.clone(),
                        format!("panicked during flush: {}", panic_message(&panic_info)),
                    );
                    self.failures.push((entry.config.name.clone(), err));
                }
            }
        }
    }
}

fn panic_message(panic_info: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appenders::MemorySink;
    use crate::core::error::Result;
    use crate::core::severity::Syslog;
    use parking_lot::Mutex;

    struct FailingSink;

    impl Sink for FailingSink {
        fn write(&mut self, _line: &str, _severity: u8) -> Result<()> {
            Err(LoggerError::sink_write("failing", "disk full"))
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    struct PanickingSink;

    impl Sink for PanickingSink {
        fn write(&mut self, _line: &str, _severity: u8) -> Result<()> {
            panic!("sink exploded");
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "panicking"
        }
    }

    fn registry() -> SinkRegistry<Syslog> {
        SinkRegistry::new(LineFormatter::new(), Arc::new(LoggerMetrics::new()))
    }

    #[test]
    fn test_threshold_filtering() {
        let mut registry = registry();
        let info = MemorySink::new();
        let debug = MemorySink::new();
        registry.register(SinkConfig::new("info", "info"), Box::new(info.clone()));
        registry.register(SinkConfig::new("debug", "debug"), Box::new(debug.clone()));

        registry.dispatch(&LogRecord::new(Syslog::DEBUG, vec!["x".into()]));
        registry.dispatch(&LogRecord::new(Syslog::ERROR, vec!["y".into()]));

        assert_eq!(info.lines(), vec!["error y\n"]);
        assert_eq!(debug.lines(), vec!["debug x\n", "error y\n"]);
        assert_eq!(registry.metrics.filtered(), 1);
    }

    #[test]
    fn test_unknown_threshold_admits_all() {
        let mut registry = registry();
        let sink = MemorySink::new();
        registry.register(SinkConfig::new("mem", "verbose"), Box::new(sink.clone()));

        registry.dispatch(&LogRecord::new(Syslog::DEBUG, vec!["x".into()]));
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_failing_sink_does_not_block_others() {
        let mut registry = registry();
        let sink = MemorySink::new();
        registry.register(SinkConfig::new("failing", "debug"), Box::new(FailingSink));
        registry.register(SinkConfig::new("panicking", "debug"), Box::new(PanickingSink));
        registry.register(SinkConfig::new("mem", "debug"), Box::new(sink.clone()));

        registry.dispatch(&LogRecord::new(Syslog::INFO, vec!["still here".into()]));

        assert_eq!(sink.lines(), vec!["info still here\n"]);
        let failures = registry.take_failures();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].0, "failing");
        assert!(failures[1].1.to_string().contains("sink exploded"));
        assert!(registry.take_failures().is_empty());
        assert_eq!(registry.metrics.sink_failures(), 2);
        assert_eq!(registry.metrics.lines_written(), 1);
    }

    #[test]
    fn test_report_failures_calls_handler() {
        let reported = Arc::new(Mutex::new(Vec::new()));
        let reported_clone = Arc::clone(&reported);
        let handler: ErrorHandler = Arc::new(move |sink, err| {
            reported_clone.lock().push(format!("{}: {}", sink, err));
        });

        report_failures(
            &handler,
            vec![("disk".to_string(), LoggerError::sink_write("disk", "full"))],
        );

        assert_eq!(*reported.lock(), vec!["disk: Sink 'disk' write failed: full"]);
    }

    #[test]
    fn test_nested_report_does_not_reenter_handler() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let handler: Arc<parking_lot::Mutex<Option<ErrorHandler>>> =
            Arc::new(parking_lot::Mutex::new(None));

        let calls_clone = Arc::clone(&calls);
        let handler_slot = Arc::clone(&handler);
        let outer: ErrorHandler = Arc::new(move |sink, _| {
            calls_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if let Some(me) = handler_slot.lock().clone() {
                report_failures(
                    &me,
                    vec![(sink.to_string(), LoggerError::sink_write(sink, "again"))],
                );
            }
        });
        *handler.lock() = Some(Arc::clone(&outer));

        report_failures(
            &outer,
            vec![("loop".to_string(), LoggerError::sink_write("loop", "first"))],
        );

        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_render_failure_isolated_per_sink() {
        let mut registry = SinkRegistry::<Syslog>::new(
            LineFormatter::new().with_timestamp_format(crate::core::TimestampFormat::Custom(
                "%Q".to_string(),
            )),
            Arc::new(LoggerMetrics::new()),
        );
        let stamped = MemorySink::new();
        let plain = MemorySink::new();
        registry.register(
            SinkConfig::new("stamped", "debug").with_timestamp(true),
            Box::new(stamped.clone()),
        );
        registry.register(SinkConfig::new("plain", "debug"), Box::new(plain.clone()));

        registry.dispatch(&LogRecord::new(Syslog::INFO, vec!["hello".into()]));

        assert!(stamped.lines()[0].ends_with("Z info hello\n"));
        assert_eq!(plain.lines(), vec!["info hello\n"]);
        assert!(registry.take_failures().is_empty());
    }

    #[test]
    fn test_per_sink_formatting() {
        let mut registry = registry();
        let stamped = MemorySink::new();
        let plain = MemorySink::new();
        registry.register(
            SinkConfig::new("stamped", "debug").with_timestamp(true),
            Box::new(stamped.clone()),
        );
        registry.register(SinkConfig::new("plain", "debug"), Box::new(plain.clone()));

        registry.dispatch(&LogRecord::new(Syslog::NOTICE, vec!["n".into()]));

        assert_eq!(plain.lines(), vec!["notice n\n"]);
        let stamped_line = &stamped.lines()[0];
        assert!(stamped_line.ends_with("Z notice n\n"), "{}", stamped_line);
    }

    #[test]
    fn test_admits_and_names() {
        let mut registry = registry();
        assert!(!registry.admits(Syslog::EMERG));

        registry.register(SinkConfig::new("a", "warn"), Box::new(MemorySink::new()));
        registry.register(SinkConfig::new("b", "error"), Box::new(MemorySink::new()));

        assert!(registry.admits(Syslog::WARN));
        assert!(!registry.admits(Syslog::NOTICE));
        assert_eq!(registry.names(), vec!["a", "b"]);
    }

    #[test]
    fn test_write_to_named_sink() {
        let mut registry = registry();
        let sink = MemorySink::new();
        registry.register(SinkConfig::new("console", "emerg"), Box::new(sink.clone()));
        let record = LogRecord::new(Syslog::WARN, vec!["bad config".into()]);

        assert!(registry.write_to("console", &record));
        assert!(!registry.write_to("missing", &record));
        assert_eq!(sink.lines(), vec!["warn bad config\n"]);
    }
}
