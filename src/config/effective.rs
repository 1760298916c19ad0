//! Resolved configuration with full provenance
//!
//! A `ResolvedConfig` is the single merged tree produced from the loaded
//! layers, plus the list of layers that contributed to it. It is computed
//! fresh on every invocation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use svcchart_values::{get_path, merge_layers};

use super::loader::{ConfigSource, LoadedLayer};

/// Schema version for the resolve report
pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// Schema identifier for the resolve report
pub const REPORT_SCHEMA_ID: &str = "svcchart/resolved_config@1";

/// Keys that contain secrets and should be redacted in reports
const SECRET_KEYS: &[&str] = &[
    "password",
    "token",
    "secret",
    "private_key",
    "api_key",
    "apikey",
    "credential",
];

/// Canonicalization failure while computing a checksum.
#[derive(Debug, thiserror::Error)]
#[error("failed to canonicalize configuration: {0}")]
pub struct ChecksumError(String);

/// The merged configuration tree and its contributing sources.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    tree: Value,
    sources: Vec<ConfigSource>,
}

impl ResolvedConfig {
    /// Merge loaded layers in order, lowest precedence first.
    pub fn from_layers(layers: &[LoadedLayer]) -> Self {
        let tree = merge_layers(layers.iter().map(|l| &l.layer));
        let sources = layers.iter().map(|l| l.source.clone()).collect();
        Self { tree, sources }
    }

    /// Wrap an already-merged tree (no provenance).
    pub fn from_tree(tree: Value) -> Self {
        Self {
            tree,
            sources: Vec::new(),
        }
    }

    /// Same provenance, new tree.
    pub(crate) fn with_tree(self, tree: Value) -> Self {
        Self {
            tree,
            sources: self.sources,
        }
    }

    pub fn tree(&self) -> &Value {
        &self.tree
    }

    pub fn sources(&self) -> &[ConfigSource] {
        &self.sources
    }

    /// Get a config value by path (dot-separated)
    pub fn get(&self, path: &str) -> Option<&Value> {
        get_path(&self.tree, path)
    }

    /// Get a config value as u64
    pub fn get_u64(&self, path: &str) -> Option<u64> {
        self.get(path).and_then(|v| v.as_u64())
    }

    /// Get a config value as string
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|v| v.as_str())
    }

    /// Get a non-empty string value
    pub fn get_nonempty_str(&self, path: &str) -> Option<&str> {
        self.get_str(path).filter(|s| !s.is_empty())
    }

    /// Get a config value as bool
    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(|v| v.as_bool())
    }

    /// Boolean flag with a default for absent values
    pub fn flag(&self, path: &str, default: bool) -> bool {
        self.get_bool(path).unwrap_or(default)
    }

    /// SHA-256 hex digest of the RFC 8785 canonical form of the tree.
    pub fn checksum(&self) -> Result<String, ChecksumError> {
        let jcs_bytes = serde_json_canonicalizer::to_vec(&self.tree)
            .map_err(|e| ChecksumError(e.to_string()))?;
        let mut hasher = Sha256::new();
        hasher.update(&jcs_bytes);
        Ok(hex::encode(hasher.finalize()))
    }
}

/// Printable view of a resolved configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveReport {
    /// Schema version
    pub schema_version: u32,

    /// Schema identifier
    pub schema_id: String,

    /// When this report was computed
    pub created_at: DateTime<Utc>,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,

    /// The resolved configuration object
    pub config: Value,

    /// Canonical checksum of the unredacted tree
    pub checksum: String,

    /// Redacted key paths
    pub redactions: Vec<String>,
}

impl ResolveReport {
    /// Build a report. Secret-looking scalar values are redacted unless
    /// `reveal_secrets` is set.
    pub fn new(resolved: &ResolvedConfig, reveal_secrets: bool) -> Result<Self, ChecksumError> {
        let mut config = resolved.tree().clone();
        let redactions = if reveal_secrets {
            Vec::new()
        } else {
            redact_secrets(&mut config)
        };

        Ok(Self {
            schema_version: REPORT_SCHEMA_VERSION,
            schema_id: REPORT_SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            sources: resolved.sources().to_vec(),
            config,
            checksum: resolved.checksum()?,
            redactions,
        })
    }
}

/// Redact secrets in the config, returning list of redacted paths
fn redact_secrets(value: &mut Value) -> Vec<String> {
    let mut redactions = Vec::new();
    redact_recursive(value, String::new(), &mut redactions);
    redactions
}

fn redact_recursive(value: &mut Value, path: String, redactions: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                let key_lower = key.to_lowercase();
                let current_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };

                let is_secret = SECRET_KEYS.iter().any(|s| key_lower.contains(s));

                if is_secret && !val.is_object() && !val.is_array() {
                    *val = Value::String("[REDACTED]".to_string());
                    redactions.push(current_path);
                } else {
                    redact_recursive(val, current_path, redactions);
                }
            }
        }
        Value::Array(arr) => {
            for (i, val) in arr.iter_mut().enumerate() {
                // env entries are {name, value}; redact the value by the name
                if let Some(name) = val.get("name").and_then(Value::as_str) {
                    let name_lower = name.to_lowercase();
                    if SECRET_KEYS.iter().any(|s| name_lower.contains(s)) {
                        if let Some(v) = val.get_mut("value") {
                            *v = Value::String("[REDACTED]".to_string());
                            redactions.push(format!("{}[{}].value", path, i));
                            continue;
                        }
                    }
                }
                let current_path = format!("{}[{}]", path, i);
                redact_recursive(val, current_path, redactions);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use svcchart_values::{ConfigLayer, LayerOrigin};

    fn loaded(origin: LayerOrigin, values: Value) -> LoadedLayer {
        LoadedLayer {
            layer: ConfigLayer::new(origin.as_str(), origin, values).unwrap(),
            source: ConfigSource {
                origin,
                name: origin.as_str().to_string(),
                path: None,
                digest: None,
            },
        }
    }

    #[test]
    fn test_from_layers() {
        let resolved = ResolvedConfig::from_layers(&[
            loaded(LayerOrigin::Builtin, json!({"containerPort": 8080, "image": {"pullPolicy": "IfNotPresent"}})),
            loaded(LayerOrigin::Cli, json!({"image": {"tag": "v2"}})),
        ]);

        assert_eq!(resolved.get_u64("containerPort"), Some(8080));
        assert_eq!(resolved.get_str("image.pullPolicy"), Some("IfNotPresent"));
        assert_eq!(resolved.get_str("image.tag"), Some("v2"));
        assert_eq!(resolved.sources().len(), 2);
        assert_eq!(resolved.sources()[1].origin, LayerOrigin::Cli);
    }

    #[test]
    fn test_flag_default() {
        let resolved = ResolvedConfig::from_tree(json!({"service": {"enabled": false}}));
        assert!(!resolved.flag("service.enabled", true));
        assert!(resolved.flag("virtualService.enabled", true));
    }

    #[test]
    fn test_checksum_ignores_key_order() {
        let a = ResolvedConfig::from_tree(json!({"a": 1, "b": {"c": 2, "d": 3}}));
        let b = ResolvedConfig::from_tree(serde_json::from_str(r#"{"b": {"d": 3, "c": 2}, "a": 1}"#).unwrap());
        assert_eq!(a.checksum().unwrap(), b.checksum().unwrap());
        assert_eq!(a.checksum().unwrap().len(), 64);
    }

    #[test]
    fn test_checksum_changes_with_content() {
        let a = ResolvedConfig::from_tree(json!({"containerPort": 8080}));
        let b = ResolvedConfig::from_tree(json!({"containerPort": 8081}));
        assert_ne!(a.checksum().unwrap(), b.checksum().unwrap());
    }

    #[test]
    fn test_report_redacts_secrets() {
        let resolved = ResolvedConfig::from_tree(json!({
            "database": {"password": "hunter2", "host": "db"},
            "env": [
                {"name": "API_TOKEN", "value": "abc"},
                {"name": "LOG_LEVEL", "value": "info"}
            ]
        }));
        let report = ResolveReport::new(&resolved, false).unwrap();

        assert_eq!(report.config["database"]["password"], "[REDACTED]");
        assert_eq!(report.config["database"]["host"], "db");
        assert_eq!(report.config["env"][0]["value"], "[REDACTED]");
        assert_eq!(report.config["env"][1]["value"], "info");
        assert!(report.redactions.contains(&"database.password".to_string()));
        assert!(report.redactions.contains(&"env[0].value".to_string()));
        // checksum is computed from the unredacted tree
        assert_eq!(report.checksum, resolved.checksum().unwrap());
    }

    #[test]
    fn test_report_reveal() {
        let resolved = ResolvedConfig::from_tree(json!({"token": "abc"}));
        let report = ResolveReport::new(&resolved, true).unwrap();
        assert_eq!(report.config["token"], "abc");
        assert!(report.redactions.is_empty());
        assert_eq!(report.schema_id, REPORT_SCHEMA_ID);
    }
}
