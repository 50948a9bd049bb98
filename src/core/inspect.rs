//! Cycle-safe, depth-bounded rendering of structured log arguments
//!
//! [`Value`] is a small dynamic value graph. Nodes wrapped in
//! [`Value::Shared`] can be referenced from several places, including from
//! inside themselves, so self-referential data can be logged. The
//! [`Inspector`] renders a graph on one line, replacing containers nested past
//! the depth limit with `[Object]` / `[Array]` and back-references with
//! `[Circular]`.

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Default nesting depth rendered before truncation
pub const DEFAULT_DEPTH: usize = 2;

/// Default number of elements rendered per container
pub const DEFAULT_MAX_ITEMS: usize = 100;

pub const CIRCULAR_MARKER: &str = "[Circular]";
pub const OBJECT_MARKER: &str = "[Object]";
pub const ARRAY_MARKER: &str = "[Array]";

pub type SharedValue = Arc<RwLock<Value>>;

/// Dynamic value passed as a log argument
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Object(Vec<(String, Value)>),
    Shared(SharedValue),
}

impl Value {
    /// Object from key/value pairs, keeping insertion order
    pub fn object<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn array<V, I>(items: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        Value::Array(items.into_iter().map(Into::into).collect())
    }

    /// Wrap a value in a shared node that can be referenced repeatedly
    pub fn shared(value: Value) -> Self {
        Value::Shared(Arc::new(RwLock::new(value)))
    }

    /// Add a field to a shared object node
    ///
    /// Returns `false` when this is not a shared object. Inserting a clone of
    /// the node into itself builds a cycle.
    pub fn set_field(&self, key: impl Into<String>, value: Value) -> bool {
        let Value::Shared(node) = self else {
            return false;
        };
        match &mut *node.write() {
            Value::Object(entries) => {
                entries.push((key.into(), value));
                true
            }
            _ => false,
        }
    }

    /// Append to a shared array node; returns `false` for anything else
    pub fn push_item(&self, value: Value) -> bool {
        let Value::Shared(node) = self else {
            return false;
        };
        match &mut *node.write() {
            Value::Array(items) => {
                items.push(value);
                true
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Inspector::default().inspect(self))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

/// Single-line renderer for [`Value`] graphs
#[derive(Debug, Clone, Copy)]
pub struct Inspector {
    depth: usize,
    max_items: usize,
}

impl Inspector {
    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            max_items: DEFAULT_MAX_ITEMS,
        }
    }

    #[must_use]
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn inspect(&self, value: &Value) -> String {
        let mut out = String::new();
        let mut path = Vec::new();
        self.write_value(value, 0, &mut path, &mut out);
        out
    }

    fn write_value(&self, value: &Value, level: usize, path: &mut Vec<usize>, out: &mut String) {
        match value {
            Value::Null => out.push_str("null"),
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Int(i) => out.push_str(&i.to_string()),
            Value::Float(f) => out.push_str(&format_float(*f)),
            Value::String(s) => write_quoted(s, out),
            Value::Array(items) => {
                if level > self.depth {
                    out.push_str(ARRAY_MARKER);
                    return;
                }
                if items.is_empty() {
                    out.push_str("[]");
                    return;
                }
                out.push_str("[ ");
                for (idx, item) in items.iter().take(self.max_items).enumerate() {
                    if idx > 0 {
                        out.push_str(", ");
                    }
                    self.write_value(item, level + 1, path, out);
                }
                self.write_overflow(items.len(), out);
                out.push_str(" ]");
            }
            Value::Object(entries) => {
                if level > self.depth {
                    out.push_str(OBJECT_MARKER);
                    return;
                }
                if entries.is_empty() {
                    out.push_str("{}");
                    return;
                }
                out.push_str("{ ");
                for (idx, (key, item)) in entries.iter().take(self.max_items).enumerate() {
                    if idx > 0 {
                        out.push_str(", ");
                    }
                    write_key(key, out);
                    out.push_str(": ");
                    self.write_value(item, level + 1, path, out);
                }
                self.write_overflow(entries.len(), out);
                out.push_str(" }");
            }
            Value::Shared(node) => {
                let id = Arc::as_ptr(node) as usize;
                if path.contains(&id) {
                    out.push_str(CIRCULAR_MARKER);
                    return;
                }
                path.push(id);
                self.write_value(&node.read(), level, path, out);
                path.pop();
            }
        }
    }

    fn write_overflow(&self, len: usize, out: &mut String) {
        if len > self.max_items {
            let more = len - self.max_items;
            out.push_str(&format!(
                ", ... {} more item{}",
                more,
                if more == 1 { "" } else { "s" }
            ));
        }
    }
}

impl Default for Inspector {
    fn default() -> Self {
        Self::new(DEFAULT_DEPTH)
    }
}

/// Collapse multi-line text to one line: trim every line, join with spaces
pub fn collapse_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        let sign = if f > 0.0 { "" } else { "-" };
        format!("{}Infinity", sign)
    } else {
        f.to_string()
    }
}

fn write_quoted(s: &str, out: &mut String) {
    out.push('\'');
    for c in s.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('\'');
}

fn write_key(key: &str, out: &mut String) {
    let is_identifier = key
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');

    if is_identifier {
        out.push_str(key);
    } else {
        write_quoted(key, out);
    }
}
