//! Log record and argument types

use super::callsite::CallSite;
use super::inspect::{collapse_lines, Value};
use super::log_context::LogContext;
use super::severity::Severity;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// One argument of a log call
///
/// Strings and numbers are rendered verbatim; everything else goes through
/// the inspector.
#[derive(Debug, Clone)]
pub enum LogArg {
    Text(String),
    Number(String),
    Value(Value),
    /// Pre-rendered `Debug` output, already collapsed to one line
    Debug(String),
}

impl LogArg {
    /// Capture a value through its `Debug` implementation
    pub fn debug<T: fmt::Debug + ?Sized>(value: &T) -> Self {
        LogArg::Debug(collapse_lines(&format!("{:#?}", value)))
    }

    /// Capture a value through its `Serialize` implementation
    pub fn serialize<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(json) => LogArg::from(json),
            Err(e) => LogArg::Text(format!("[unserializable: {}]", e)),
        }
    }
}

impl From<&str> for LogArg {
    fn from(s: &str) -> Self {
        LogArg::Text(s.to_string())
    }
}

impl From<String> for LogArg {
    fn from(s: String) -> Self {
        LogArg::Text(s)
    }
}

impl From<&String> for LogArg {
    fn from(s: &String) -> Self {
        LogArg::Text(s.clone())
    }
}

macro_rules! number_arg {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for LogArg {
                fn from(n: $ty) -> Self {
                    LogArg::Number(n.to_string())
                }
            }
        )*
    };
}

number_arg!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

impl From<bool> for LogArg {
    fn from(b: bool) -> Self {
        LogArg::Value(Value::Bool(b))
    }
}

impl From<Value> for LogArg {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => LogArg::Text(s),
            Value::Int(i) => LogArg::Number(i.to_string()),
            other => LogArg::Value(other),
        }
    }
}

impl From<&Value> for LogArg {
    fn from(value: &Value) -> Self {
        LogArg::from(value.clone())
    }
}

impl From<serde_json::Value> for LogArg {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::String(s) => LogArg::Text(s),
            serde_json::Value::Number(n) => LogArg::Number(n.to_string()),
            other => LogArg::Value(Value::from(other)),
        }
    }
}

/// Argument lists accepted by the logging methods
///
/// Implemented for single values, tuples of up to eight convertible values,
/// `Vec<LogArg>` and arrays, so `logger.info(("user", id, "logged in"))`
/// passes three arguments.
pub trait LogArgs {
    fn into_args(self) -> Vec<LogArg>;
}

impl LogArgs for () {
    fn into_args(self) -> Vec<LogArg> {
        Vec::new()
    }
}

impl LogArgs for LogArg {
    fn into_args(self) -> Vec<LogArg> {
        vec![self]
    }
}

impl LogArgs for Vec<LogArg> {
    fn into_args(self) -> Vec<LogArg> {
        self
    }
}

impl<const N: usize> LogArgs for [LogArg; N] {
    fn into_args(self) -> Vec<LogArg> {
        self.into()
    }
}

macro_rules! single_args {
    ($($ty:ty),*) => {
        $(
            impl LogArgs for $ty {
                fn into_args(self) -> Vec<LogArg> {
                    vec![LogArg::from(self)]
                }
            }
        )*
    };
}

single_args!(
    &str, String, &String, bool, Value, serde_json::Value, i8, i16, i32, i64, i128, isize, u8,
    u16, u32, u64, u128, usize, f32, f64
);

macro_rules! tuple_args {
    ($($name:ident),+) => {
        impl<$($name: Into<LogArg>),+> LogArgs for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_args(self) -> Vec<LogArg> {
                let ($($name,)+) = self;
                vec![$($name.into()),+]
            }
        }
    };
}

tuple_args!(A);
tuple_args!(A, B);
tuple_args!(A, B, C);
tuple_args!(A, B, C, D);
tuple_args!(A, B, C, D, E);
tuple_args!(A, B, C, D, E, F);
tuple_args!(A, B, C, D, E, F, G);
tuple_args!(A, B, C, D, E, F, G, H);

/// A single log call, alive for one dispatch
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub severity: Severity,
    pub context: Option<Arc<LogContext>>,
    pub callsite: Option<CallSite>,
    pub args: Vec<LogArg>,
    pub timestamp: DateTime<Utc>,
}

impl LogRecord {
    pub fn new(severity: Severity, args: Vec<LogArg>) -> Self {
        Self {
            severity,
            context: None,
            callsite: None,
            args,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: Option<Arc<LogContext>>) -> Self {
        self.context = context;
        self
    }

    #[must_use]
    pub fn with_callsite(mut self, callsite: Option<CallSite>) -> Self {
        self.callsite = callsite;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    #[allow(dead_code)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[derive(Serialize)]
    struct User {
        id: u32,
        name: &'static str,
    }

    #[test]
    fn test_scalar_conversions() {
        assert!(matches!(LogArg::from("hi"), LogArg::Text(s) if s == "hi"));
        assert!(matches!(LogArg::from(42), LogArg::Number(s) if s == "42"));
        assert!(matches!(LogArg::from(2.5f64), LogArg::Number(s) if s == "2.5"));
        assert!(matches!(LogArg::from(true), LogArg::Value(Value::Bool(true))));
    }

    #[test]
    fn test_debug_arg_is_single_line() {
        let LogArg::Debug(rendered) = LogArg::debug(&Point { x: 1, y: 2 }) else {
            panic!("expected a debug argument");
        };
        assert_eq!(rendered, "Point { x: 1, y: 2, }");
    }

    #[test]
    fn test_serialize_arg() {
        let arg = LogArg::serialize(&User { id: 7, name: "ana" });
        assert!(matches!(arg, LogArg::Value(Value::Object(_))));

        let arg = LogArg::serialize("plain");
        assert!(matches!(arg, LogArg::Text(s) if s == "plain"));
    }

    #[test]
    fn test_log_args_shapes() {
        assert!(().into_args().is_empty());
        assert_eq!("one".into_args().len(), 1);
        assert_eq!(("user", 42, true).into_args().len(), 3);

        let args = ("count", 3u8).into_args();
        assert!(matches!(&args[1], LogArg::Number(s) if s == "3"));

        let args = [LogArg::from("a"), LogArg::debug(&Point { x: 0, y: 0 })].into_args();
        assert!(matches!(&args[1], LogArg::Debug(_)));
    }

    #[test]
    fn test_record_builder() {
        let record = LogRecord::new(crate::core::Syslog::INFO, vec!["x".into()])
            .with_context(Some(Arc::new(LogContext::new().with_request_id("r"))));
        assert_eq!(record.severity.name(), "info");
        assert!(record.callsite.is_none());
        assert_eq!(record.context.unwrap().request_id(), "r");
    }
}
