//! Schema constraint types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Declared kind of a configuration value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    String,
    Integer,
    Number,
    Boolean,
    List,
    Map,
    Null,
}

impl ValueKind {
    /// Kind of a concrete value. Whole numbers report `Integer`.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => ValueKind::Integer,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Array(_) => ValueKind::List,
            Value::Object(_) => ValueKind::Map,
        }
    }

    /// Whether `value` satisfies this kind. Integers satisfy `Number`.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, ValueKind::of(value)) {
            (ValueKind::Number, ValueKind::Integer) => true,
            (expected, found) => *expected == found,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Integer => "integer",
            ValueKind::Number => "number",
            ValueKind::Boolean => "boolean",
            ValueKind::List => "list",
            ValueKind::Map => "map",
            ValueKind::Null => "null",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a single constraint checks.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintKind {
    /// Field must be present and non-null.
    Required,
    /// Field, when present, must be of the declared kind.
    Type(ValueKind),
    /// Numeric field, when present, must lie in `[min, max]`.
    Range { min: Option<f64>, max: Option<f64> },
}

/// One constraint on one field path.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaConstraint {
    pub path: String,
    pub kind: ConstraintKind,
}

impl SchemaConstraint {
    pub fn required(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: ConstraintKind::Required,
        }
    }

    pub fn of_type(path: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            path: path.into(),
            kind: ConstraintKind::Type(kind),
        }
    }

    pub fn range(path: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            path: path.into(),
            kind: ConstraintKind::Range { min, max },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_of() {
        assert_eq!(ValueKind::of(&json!(8080)), ValueKind::Integer);
        assert_eq!(ValueKind::of(&json!(0.5)), ValueKind::Number);
        assert_eq!(ValueKind::of(&json!("x")), ValueKind::String);
        assert_eq!(ValueKind::of(&json!([1])), ValueKind::List);
        assert_eq!(ValueKind::of(&json!({})), ValueKind::Map);
        assert_eq!(ValueKind::of(&json!(true)), ValueKind::Boolean);
    }

    #[test]
    fn test_integer_satisfies_number() {
        assert!(ValueKind::Number.matches(&json!(3)));
        assert!(!ValueKind::Integer.matches(&json!(3.5)));
    }
}
