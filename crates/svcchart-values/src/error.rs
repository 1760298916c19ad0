//! Error types for layer construction and override parsing.

/// Errors raised when building a [`crate::ConfigLayer`].
#[derive(Debug, thiserror::Error)]
pub enum LayerError {
    #[error("layer '{name}' must be a mapping at the top level, found {found}")]
    NotAMapping { name: String, found: &'static str },
}

/// Errors raised while parsing `--set` style overrides.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OverrideError {
    #[error("override '{0}' is missing '='")]
    MissingEquals(String),

    #[error("override '{0}' has an empty key")]
    EmptyKey(String),

    #[error("override '{0}' has an unterminated list (missing '}}')")]
    UnterminatedList(String),
}

/// Short name of a JSON value's kind, used in error messages.
pub(crate) fn kind_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "list",
        serde_json::Value::Object(_) => "map",
    }
}
