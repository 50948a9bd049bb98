//! Per-request log context
//!
//! A [`LogContext`] is the metadata of one logical unit of work: the event
//! (request) identifier, the acting user and any extra fields. It is built once
//! at the boundary where the unit of work starts and is read-only afterwards;
//! the propagator hands it around behind an `Arc`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Placeholder rendered for identifiers that are not set
pub const UNSET: &str = "-";

/// Value type for extra context fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Float(fl) => write!(f, "{}", fl),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Null => write!(f, "null"),
        }
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Int(i64::from(i))
    }
}

impl From<u32> for FieldValue {
    fn from(i: u32) -> Self {
        FieldValue::Int(i64::from(i))
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

/// Metadata attached to every record emitted by one logical unit of work
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    fields: BTreeMap<String, FieldValue>,
}

impl LogContext {
    /// Create an empty context (both identifiers unset)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the event / request identifier
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Set the acting user identifier
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Add an extra field
    #[must_use]
    pub fn with_field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Build a context from an inbound unit of work
    pub fn from_work_unit<W: WorkUnit + ?Sized>(unit: &W) -> Self {
        Self {
            request_id: unit.event_id(),
            user_id: unit.acting_user_id(),
            fields: BTreeMap::new(),
        }
    }

    /// Request identifier, or `-` when unset
    pub fn request_id(&self) -> &str {
        self.request_id.as_deref().unwrap_or(UNSET)
    }

    /// User identifier, or `-` when unset
    pub fn user_id(&self) -> &str {
        self.user_id.as_deref().unwrap_or(UNSET)
    }

    /// Extra fields in key order
    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    /// True when either identifier differs from the `-` placeholder
    pub fn has_identifiers(&self) -> bool {
        self.request_id() != UNSET || self.user_id() != UNSET
    }

    /// True when nothing would be rendered for this context
    pub fn is_empty(&self) -> bool {
        !self.has_identifiers() && self.fields.is_empty()
    }

    /// Identifier tag, `[requestId userId]`
    pub fn format_tag(&self) -> String {
        format!("[{} {}]", self.request_id(), self.user_id())
    }

    /// Extra fields as `key=value` pairs
    pub fn format_fields(&self) -> String {
        self.fields
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_tag())?;
        if !self.fields.is_empty() {
            write!(f, " {}", self.format_fields())?;
        }
        Ok(())
    }
}

/// An inbound unit of work that can seed a [`LogContext`]
///
/// Implement this for request types handed to
/// [`Logger::setup_context`](crate::Logger::setup_context).
pub trait WorkUnit {
    /// Identifier of the acting user, if the request carries one
    fn acting_user_id(&self) -> Option<String>;

    /// Identifier of the triggering event, if the request carries one
    fn event_id(&self) -> Option<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Inbound {
        user: Option<u64>,
        event: Option<&'static str>,
    }

    impl WorkUnit for Inbound {
        fn acting_user_id(&self) -> Option<String> {
            self.user.map(|u| u.to_string())
        }

        fn event_id(&self) -> Option<String> {
            self.event.map(String::from)
        }
    }

    #[test]
    fn test_empty_context_defaults() {
        let ctx = LogContext::new();
        assert_eq!(ctx.request_id(), "-");
        assert_eq!(ctx.user_id(), "-");
        assert!(ctx.is_empty());
        assert!(!ctx.has_identifiers());
    }

    #[test]
    fn test_context_tag() {
        let ctx = LogContext::new().with_request_id("42").with_user_id("7");
        assert_eq!(ctx.format_tag(), "[42 7]");
        assert!(ctx.has_identifiers());
    }

    #[test]
    fn test_partial_context_tag() {
        let ctx = LogContext::new().with_user_id("7");
        assert_eq!(ctx.format_tag(), "[- 7]");
    }

    #[test]
    fn test_context_fields_sorted() {
        let ctx = LogContext::new()
            .with_field("zone", "eu")
            .with_field("attempt", 2)
            .with_field("dry_run", true);

        assert_eq!(ctx.format_fields(), "attempt=2 dry_run=true zone=eu");
        assert!(!ctx.is_empty());
        assert!(!ctx.has_identifiers());
    }

    #[test]
    fn test_from_work_unit() {
        let ctx = LogContext::from_work_unit(&Inbound {
            user: Some(7),
            event: Some("42"),
        });
        assert_eq!(ctx.request_id(), "42");
        assert_eq!(ctx.user_id(), "7");

        let ctx = LogContext::from_work_unit(&Inbound {
            user: None,
            event: None,
        });
        assert!(ctx.is_empty());
    }

    #[test]
    fn test_display() {
        let ctx = LogContext::new()
            .with_request_id("r1")
            .with_field("route", "/users");
        assert_eq!(ctx.to_string(), "[r1 -] route=/users");
    }
}
