//! `--set` style override parsing.
//!
//! Each argument holds one or more `key=value` pairs separated by commas.
//! Commas inside `{...}` list literals and escaped commas (`\,`) do not
//! split pairs.

use serde_json::{Map, Number, Value};

use crate::error::OverrideError;
use crate::path::set_path;

/// How override values are typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetMode {
    /// Infer booleans, null, numbers and `{a,b}` lists; everything else is a string.
    Typed,
    /// Every value is kept as a string.
    String,
}

/// Parse override arguments into a value tree, applied in argument order.
pub fn parse_overrides<S: AsRef<str>>(args: &[S], mode: SetMode) -> Result<Value, OverrideError> {
    let mut tree = Value::Object(Map::new());
    for arg in args {
        for pair in split_pairs(arg.as_ref())? {
            let (key, raw) = pair
                .split_once('=')
                .ok_or_else(|| OverrideError::MissingEquals(pair.clone()))?;
            let key = unescape_commas(key.trim());
            if key.is_empty() {
                return Err(OverrideError::EmptyKey(pair.clone()));
            }
            let value = match mode {
                SetMode::Typed => parse_typed(raw),
                SetMode::String => Value::String(unescape_commas(raw)),
            };
            set_path(&mut tree, &key, value);
        }
    }
    Ok(tree)
}

fn split_pairs(arg: &str) -> Result<Vec<String>, OverrideError> {
    let mut pairs = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut chars = arg.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            // kept escaped until list items are split
            '\\' if chars.peek() == Some(&',') => {
                current.push_str("\\,");
                chars.next();
            }
            '{' => {
                depth += 1;
                current.push(c);
            }
            '}' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => pairs.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }

    if depth > 0 {
        return Err(OverrideError::UnterminatedList(arg.to_string()));
    }
    if !current.is_empty() || pairs.is_empty() {
        pairs.push(current);
    }
    Ok(pairs)
}

fn parse_typed(raw: &str) -> Value {
    if let Some(inner) = raw.strip_prefix('{').and_then(|r| r.strip_suffix('}')) {
        if inner.trim().is_empty() {
            return Value::Array(Vec::new());
        }
        return Value::Array(
            split_list_items(inner)
                .iter()
                .map(|item| parse_scalar(&unescape_commas(item.trim())))
                .collect(),
        );
    }
    parse_scalar(&unescape_commas(raw))
}

/// Split on commas not preceded by a backslash.
fn split_list_items(inner: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (i, c) in inner.char_indices() {
        match c {
            '\\' => escaped = !escaped,
            ',' if !escaped => {
                items.push(&inner[start..i]);
                start = i + 1;
            }
            _ => escaped = false,
        }
    }
    items.push(&inner[start..]);
    items
}

fn unescape_commas(raw: &str) -> String {
    raw.replace("\\,", ",")
}

fn parse_scalar(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" => return Value::Null,
        _ => {}
    }

    // Leading zeros stay strings so tags like "0123" survive.
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    if digits.len() > 1 && digits.starts_with('0') && !digits.starts_with("0.") {
        return Value::String(raw.to_string());
    }

    if let Ok(i) = raw.parse::<i64>() {
        return Value::Number(i.into());
    }
    // Floats are kept only when they print back unchanged, so "1.10" and
    // "1e3" stay strings.
    if raw.contains(['.', 'e', 'E']) {
        if let Some(n) = raw.parse::<f64>().ok().and_then(Number::from_f64) {
            if n.to_string() == raw {
                return Value::Number(n);
            }
        }
    }
    Value::String(raw.to_string())
}
