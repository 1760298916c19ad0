//! Dot-path addressing into a value tree.
//!
//! A path is a sequence of map keys joined by `.`. A literal dot inside a
//! key is written `\.`, so `podAnnotations.sidecar\.istio\.io/inject`
//! addresses the key `sidecar.istio.io/inject` under `podAnnotations`.

use serde_json::{Map, Value};

/// Split a dot path into its key segments, honoring `\.` escapes.
///
/// Empty paths yield no segments.
pub fn split_path(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    if path.is_empty() {
        return segments;
    }

    let mut current = String::new();
    let mut chars = path.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'.') => {
                current.push('.');
                chars.next();
            }
            '.' => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    segments.push(current);
    segments
}

/// Escape a single key so it survives [`split_path`].
pub fn escape_segment(segment: &str) -> String {
    segment.replace('.', "\\.")
}

/// Join key segments back into a dot path.
pub fn join_path<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| escape_segment(s.as_ref()))
        .collect::<Vec<_>>()
        .join(".")
}

/// Look up the value at `path`.
///
/// Returns `None` when any segment is missing or traverses a non-map.
pub fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in split_path(path) {
        current = current.as_object()?.get(&segment)?;
    }
    Some(current)
}

/// Set the value at `path`, creating intermediate maps as needed.
///
/// Any non-map value found along the way is replaced by a map.
pub fn set_path(root: &mut Value, path: &str, value: Value) {
    let segments = split_path(path);
    let Some((last, parents)) = segments.split_last() else {
        *root = value;
        return;
    };

    let mut current = root;
    for segment in parents {
        current = ensure_object(current)
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    ensure_object(current).insert(last.clone(), value);
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced with an object"),
    }
}

/// Whether a value counts as unset: missing, null, or the empty string.
pub fn is_unset(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}
