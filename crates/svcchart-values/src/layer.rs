//! Named, immutable configuration layers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{kind_name, LayerError};
use crate::path::get_path;

/// Where a layer came from. Ordered from lowest to highest precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerOrigin {
    /// Built-in chart defaults
    Builtin,
    /// Chart base values file
    Values,
    /// Environment selection and its overlay file
    Environment,
    /// Explicit `-f` overlay file
    Overlay,
    /// `--set` / `--set-string` overrides
    Cli,
}

impl LayerOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerOrigin::Builtin => "builtin",
            LayerOrigin::Values => "values",
            LayerOrigin::Environment => "environment",
            LayerOrigin::Overlay => "overlay",
            LayerOrigin::Cli => "cli",
        }
    }
}

/// One source of configuration values.
///
/// The top-level value is always a map. Layers are not modified after
/// construction; the merge engine clones out of them.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigLayer {
    name: String,
    origin: LayerOrigin,
    values: Value,
}

impl ConfigLayer {
    /// Build a layer. A `null` document is accepted as an empty layer.
    pub fn new(
        name: impl Into<String>,
        origin: LayerOrigin,
        values: Value,
    ) -> Result<Self, LayerError> {
        let name = name.into();
        let values = match values {
            Value::Null => Value::Object(Map::new()),
            v @ Value::Object(_) => v,
            other => {
                return Err(LayerError::NotAMapping {
                    name,
                    found: kind_name(&other),
                })
            }
        };
        Ok(Self {
            name,
            origin,
            values,
        })
    }

    /// An empty layer (merging it is a no-op).
    pub fn empty(name: impl Into<String>, origin: LayerOrigin) -> Self {
        Self {
            name: name.into(),
            origin,
            values: Value::Object(Map::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn origin(&self) -> LayerOrigin {
        self.origin
    }

    pub fn values(&self) -> &Value {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.as_object().map_or(true, Map::is_empty)
    }

    /// Value at a dot path within this layer only.
    pub fn get(&self, path: &str) -> Option<&Value> {
        get_path(&self.values, path)
    }
}
