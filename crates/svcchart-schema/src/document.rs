//! Schema document format.
//!
//! ```yaml
//! fields:
//!   containerPort:
//!     type: integer
//!     required: true
//!     min: 1
//!     max: 65535
//! ```
//!
//! Each field entry expands into one constraint per facet, so a field with
//! `required`, `type` and bounds yields three independent constraints.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constraint::{SchemaConstraint, ValueKind};

/// Errors in a schema document's content.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("field '{path}': min {min} is greater than max {max}")]
    InvertedBounds { path: String, min: f64, max: f64 },

    #[error("field '{path}': bounds given for non-numeric type '{kind}'")]
    BoundsOnNonNumeric { path: String, kind: ValueKind },
}

/// Declared facets of one field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ValueKind>,

    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl FieldSpec {
    pub fn new(kind: ValueKind) -> Self {
        Self {
            kind: Some(kind),
            ..Default::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }
}

/// A set of field specifications keyed by dot path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub fields: BTreeMap<String, FieldSpec>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a field.
    pub fn field(mut self, path: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.insert(path.into(), spec);
        self
    }

    /// Overlay another schema; its fields replace same-path fields here.
    pub fn extend(&mut self, other: Schema) {
        self.fields.extend(other.fields);
    }

    /// Expand into independent constraints, ordered by path then facet
    /// (required, type, range).
    pub fn constraints(&self) -> Result<Vec<SchemaConstraint>, SchemaError> {
        let mut constraints = Vec::new();

        for (path, spec) in &self.fields {
            let has_bounds = spec.min.is_some() || spec.max.is_some();

            if let (Some(min), Some(max)) = (spec.min, spec.max) {
                if min > max {
                    return Err(SchemaError::InvertedBounds {
                        path: path.clone(),
                        min,
                        max,
                    });
                }
            }
            if let Some(kind) = spec.kind {
                if has_bounds && !matches!(kind, ValueKind::Integer | ValueKind::Number) {
                    return Err(SchemaError::BoundsOnNonNumeric {
                        path: path.clone(),
                        kind,
                    });
                }
            }

            if spec.required {
                constraints.push(SchemaConstraint::required(path.clone()));
            }
            if let Some(kind) = spec.kind {
                constraints.push(SchemaConstraint::of_type(path.clone(), kind));
            }
            if has_bounds {
                constraints.push(SchemaConstraint::range(path.clone(), spec.min, spec.max));
            }
        }

        Ok(constraints)
    }
}
