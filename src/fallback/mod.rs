//! Fallback resolution
//!
//! Post-merge pass that fills unset fields from other fields. Rules run
//! once, in declaration order, so a rule sees the results of the rules
//! declared before it and nothing else. A target that already holds a
//! value is never touched, which makes the pass idempotent.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use svcchart_values::{get_path, is_unset, set_path, split_path};
use tracing::debug;

use crate::config::ResolvedConfig;

/// Where a fallback value can come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FallbackSource {
    /// Copy the value at this path.
    Path { path: String },
    /// Build a string from `{path}` placeholders.
    Template { template: String },
}

impl FallbackSource {
    pub fn path(path: impl Into<String>) -> Self {
        FallbackSource::Path { path: path.into() }
    }

    pub fn template(template: impl Into<String>) -> Self {
        FallbackSource::Template {
            template: template.into(),
        }
    }

    /// Candidate value, or `None` when the source is itself unset.
    fn resolve(&self, tree: &Value) -> Option<Value> {
        match self {
            FallbackSource::Path { path } => {
                let value = get_path(tree, path);
                if is_unset(value) {
                    None
                } else {
                    value.cloned()
                }
            }
            FallbackSource::Template { template } => render_template(template, tree).map(Value::String),
        }
    }
}

/// A target path and its ordered candidate sources; the first non-empty wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackRule {
    pub target: String,
    pub sources: Vec<FallbackSource>,

    /// Only apply while this path holds a value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<String>,
}

impl FallbackRule {
    pub fn new(target: impl Into<String>, sources: Vec<FallbackSource>) -> Self {
        Self {
            target: target.into(),
            sources,
            when: None,
        }
    }

    /// Guard the rule on `path` being set.
    pub fn when(mut self, path: impl Into<String>) -> Self {
        self.when = Some(path.into());
        self
    }

    fn guarded(&self, tree: &Value) -> bool {
        self.when
            .as_deref()
            .is_some_and(|path| is_unset(get_path(tree, path)))
    }

    /// Single-source rule: `target` falls back to the value at `source`.
    pub fn copy(target: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(target, vec![FallbackSource::path(source)])
    }
}

/// Built-in rules, in application order.
pub fn default_rules() -> Vec<FallbackRule> {
    vec![
        FallbackRule::copy("service.targetPort", "containerPort"),
        // a cleared probe or handler stays cleared
        FallbackRule::copy("healthCheck.livenessProbe.httpGet.port", "containerPort")
            .when("healthCheck.livenessProbe.httpGet"),
        FallbackRule::copy("healthCheck.readinessProbe.httpGet.port", "containerPort")
            .when("healthCheck.readinessProbe.httpGet"),
        FallbackRule::new(
            "virtualService.effectiveDomain",
            vec![
                FallbackSource::path("virtualService.domainOverride"),
                FallbackSource::path("virtualService.domain"),
                FallbackSource::template("{environment}.local"),
            ],
        ),
        FallbackRule::copy("virtualService.destinationPort", "service.port"),
    ]
}

/// Apply rules in a single pass, in declaration order.
pub fn apply_fallbacks(config: ResolvedConfig, rules: &[FallbackRule]) -> ResolvedConfig {
    let mut tree = config.tree().clone();

    for rule in rules {
        if !is_unset(get_path(&tree, &rule.target)) || rule.guarded(&tree) {
            continue;
        }
        let candidate = rule
            .sources
            .iter()
            .enumerate()
            .find_map(|(i, source)| source.resolve(&tree).map(|v| (i, v)));

        if let Some((index, value)) = candidate {
            debug!(target_path = rule.target.as_str(), candidate = index, "applied fallback");
            set_path(&mut tree, &rule.target, value);
        }
    }

    config.with_tree(tree)
}

/// Replace `{path}` placeholders with scalar values from the tree.
///
/// Returns `None` if any placeholder is unset or not a scalar, or if the
/// template is malformed.
fn render_template(template: &str, tree: &Value) -> Option<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find('}')?;
        let path = &after[..end];
        if split_path(path).iter().any(String::is_empty) {
            return None;
        }

        let value = get_path(tree, path);
        if is_unset(value) {
            return None;
        }
        match value? {
            Value::String(s) => out.push_str(s),
            Value::Number(n) => out.push_str(&n.to_string()),
            Value::Bool(b) => out.push_str(&b.to_string()),
            _ => return None,
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Some(out)
}
