//! Validation result types.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constraint::ValueKind;

/// Machine-readable reason a constraint failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail")]
pub enum ViolationReason {
    /// Required field is missing or null.
    #[serde(rename = "MISSING_REQUIRED")]
    MissingRequired,

    /// Field is present with the wrong kind.
    #[serde(rename = "TYPE_MISMATCH")]
    TypeMismatch { expected: ValueKind, found: ValueKind },

    /// Numeric field lies outside its bounds.
    #[serde(rename = "OUT_OF_RANGE")]
    OutOfRange {
        value: f64,
        min: Option<f64>,
        max: Option<f64>,
    },
}

impl ViolationReason {
    pub fn code(&self) -> &'static str {
        match self {
            ViolationReason::MissingRequired => "MISSING_REQUIRED",
            ViolationReason::TypeMismatch { .. } => "TYPE_MISMATCH",
            ViolationReason::OutOfRange { .. } => "OUT_OF_RANGE",
        }
    }
}

/// A single failed constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub path: String,
    pub reason: ViolationReason,
}

impl Violation {
    pub fn code(&self) -> &'static str {
        self.reason.code()
    }

    /// `CODE:path`, stable for automation.
    pub fn to_code(&self) -> String {
        format!("{}:{}", self.code(), self.path)
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            ViolationReason::MissingRequired => write!(f, "{}: required value is missing", self.path),
            ViolationReason::TypeMismatch { expected, found } => {
                write!(f, "{}: expected {}, found {}", self.path, expected, found)
            }
            ViolationReason::OutOfRange { value, min, max } => {
                let lo = min.map_or("-inf".to_string(), |m| m.to_string());
                let hi = max.map_or("+inf".to_string(), |m| m.to_string());
                write!(f, "{}: value {} is outside [{}, {}]", self.path, value, lo, hi)
            }
        }
    }
}
