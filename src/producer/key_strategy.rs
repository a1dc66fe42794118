use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub type KeyFn<T> = Arc<dyn Fn(&T) -> anyhow::Result<Value> + Send + Sync>;

/// How a producer derives the routing key of a message from its object.
///
/// `Field` and `Composite` read dotted paths from the object's JSON form.
/// `Function` calls an arbitrary unary function on the object itself.
pub enum KeyStrategy<T> {
    None,
    Field(String),
    Composite(Vec<String>),
    Function(KeyFn<T>),
}

impl<T> KeyStrategy<T> {
    pub fn field(path: impl Into<String>) -> Self {
        KeyStrategy::Field(path.into())
    }

    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&T) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        KeyStrategy::Function(Arc::new(f))
    }

    /// Returns the key for `object`, whose JSON form is `value`.
    ///
    /// The error is a human-readable reason; the producer wraps it with
    /// its topic.
    pub fn extract_key(&self, object: &T, value: &Value) -> Result<Value, String> {
        match self {
            KeyStrategy::None => Ok(Value::Null),

            KeyStrategy::Field(path) => extract_field_value(value, path)
                .map(Value::String)
                .ok_or_else(|| format!("field '{}' is missing or null", path)),

            KeyStrategy::Composite(fields) => extract_composite_key(value, fields).map(Value::String),

            KeyStrategy::Function(f) => f(object).map_err(|e| format!("{:#}", e)),
        }
    }
}

fn extract_field_value(record: &Value, field_path: &str) -> Option<String> {
    let mut current = record;

    for part in field_path.split('.') {
        match current.get(part) {
            Some(value) => current = value,
            None => {
                debug!("Field '{}' not found in record", part);
                return None;
            }
        }
    }

    match current {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => None,
        _ => Some(current.to_string()),
    }
}

fn extract_composite_key(record: &Value, fields: &[String]) -> Result<String, String> {
    if fields.is_empty() {
        return Err("composite key has no fields".to_string());
    }

    let mut key_parts = Vec::with_capacity(fields.len());

    for field in fields {
        match extract_field_value(record, field) {
            Some(value) => key_parts.push(value),
            None => return Err(format!("field '{}' of composite key is missing or null", field)),
        }
    }

    Ok(key_parts.join(":"))
}

impl<T> Default for KeyStrategy<T> {
    fn default() -> Self {
        KeyStrategy::None
    }
}

impl<T> Clone for KeyStrategy<T> {
    fn clone(&self) -> Self {
        match self {
            KeyStrategy::None => KeyStrategy::None,
            KeyStrategy::Field(path) => KeyStrategy::Field(path.clone()),
            KeyStrategy::Composite(fields) => KeyStrategy::Composite(fields.clone()),
            KeyStrategy::Function(f) => KeyStrategy::Function(Arc::clone(f)),
        }
    }
}

impl<T> fmt::Debug for KeyStrategy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyStrategy::None => f.write_str("None"),
            KeyStrategy::Field(path) => f.debug_tuple("Field").field(path).finish(),
            KeyStrategy::Composite(fields) => f.debug_tuple("Composite").field(fields).finish(),
            KeyStrategy::Function(_) => f.write_str("Function(..)"),
        }
    }
}
