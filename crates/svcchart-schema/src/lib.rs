//! Exhaustive schema validation for resolved configuration.
//!
//! Every constraint is evaluated against the tree; a failing constraint
//! never stops the others. The result is the full list of violations, in
//! constraint order, and an empty list means the configuration is valid.

mod constraint;
mod document;
mod result;

pub use constraint::{ConstraintKind, SchemaConstraint, ValueKind};
pub use document::{FieldSpec, Schema, SchemaError};
pub use result::{Violation, ViolationReason};

use serde_json::Value;
use svcchart_values::get_path;

/// Validate a resolved configuration tree against a set of constraints.
///
/// Does not modify the tree. Each constraint contributes at most one
/// violation.
pub fn validate(config: &Value, constraints: &[SchemaConstraint]) -> Vec<Violation> {
    constraints
        .iter()
        .filter_map(|constraint| check(config, constraint))
        .collect()
}

fn check(config: &Value, constraint: &SchemaConstraint) -> Option<Violation> {
    let value = get_path(config, &constraint.path);

    let reason = match (&constraint.kind, value) {
        (ConstraintKind::Required, None | Some(Value::Null)) => ViolationReason::MissingRequired,
        (ConstraintKind::Required, Some(_)) => return None,

        // Absence is only reported by `Required`.
        (_, None | Some(Value::Null)) => return None,

        (ConstraintKind::Type(expected), Some(v)) => {
            if expected.matches(v) {
                return None;
            }
            ViolationReason::TypeMismatch {
                expected: *expected,
                found: ValueKind::of(v),
            }
        }

        (ConstraintKind::Range { min, max }, Some(v)) => {
            // Non-numeric values are the `Type` constraint's concern.
            let n = v.as_f64()?;
            let below = min.is_some_and(|m| n < m);
            let above = max.is_some_and(|m| n > m);
            if !below && !above {
                return None;
            }
            ViolationReason::OutOfRange {
                value: n,
                min: *min,
                max: *max,
            }
        }
    };

    Some(Violation {
        path: constraint.path.clone(),
        reason,
    })
}
