//! Pod anti-affinity
//!
//! Two independent spreading axes, each configured under
//! `podAntiAffinity.<axis>` with `enabled`, `override` and `custom`:
//!
//! | enabled | override | terms                        |
//! |---------|----------|------------------------------|
//! | false   | any      | none                         |
//! | true    | false    | the default weighted term    |
//! | true    | true     | `custom`, verbatim           |
//!
//! Node terms come first, then zone terms, all under one
//! `preferredDuringSchedulingIgnoredDuringExecution` list.

use serde_json::{json, Value};

use super::{RenderError, ResourceKind};
use crate::config::ResolvedConfig;
use crate::naming::Labels;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadingAxis {
    Node,
    Zone,
}

impl SpreadingAxis {
    pub const ALL: [SpreadingAxis; 2] = [SpreadingAxis::Node, SpreadingAxis::Zone];

    fn key(&self) -> &'static str {
        match self {
            SpreadingAxis::Node => "node",
            SpreadingAxis::Zone => "zone",
        }
    }

    pub fn weight(&self) -> u64 {
        match self {
            SpreadingAxis::Node => 100,
            SpreadingAxis::Zone => 50,
        }
    }

    pub fn topology_key(&self) -> &'static str {
        match self {
            SpreadingAxis::Node => "kubernetes.io/hostname",
            SpreadingAxis::Zone => "topology.kubernetes.io/zone",
        }
    }

    fn path(&self, field: &str) -> String {
        format!("podAntiAffinity.{}.{}", self.key(), field)
    }

    /// The canonical weighted term for this axis.
    pub fn default_term(&self, selector: &Labels) -> Value {
        json!({
            "weight": self.weight(),
            "podAffinityTerm": {
                "labelSelector": {"matchLabels": selector},
                "topologyKey": self.topology_key(),
            }
        })
    }
}

/// Terms contributed by one axis.
pub fn axis_terms(
    axis: SpreadingAxis,
    config: &ResolvedConfig,
    selector: &Labels,
) -> Result<Vec<Value>, RenderError> {
    if !config.flag(&axis.path("enabled"), false) {
        return Ok(Vec::new());
    }
    if !config.flag(&axis.path("override"), false) {
        return Ok(vec![axis.default_term(selector)]);
    }

    let custom_path = axis.path("custom");
    match config.get(&custom_path) {
        Some(Value::Object(term)) if !term.is_empty() => Ok(vec![Value::Object(term.clone())]),
        Some(Value::Array(terms)) if !terms.is_empty() => Ok(terms.clone()),
        Some(Value::Object(_)) | Some(Value::Array(_)) | Some(Value::Null) | None => {
            Err(RenderError::MissingValue {
                kind: ResourceKind::Deployment,
                path: custom_path,
            })
        }
        Some(other) => Err(RenderError::InvalidValue {
            kind: ResourceKind::Deployment,
            path: custom_path,
            reason: format!("expected a term map or list of terms, found {}", other),
        }),
    }
}

/// The pod `affinity` block, or `None` when there is nothing to emit.
///
/// A user `affinity` map (node affinity and the like) is kept; the computed
/// anti-affinity list replaces its soft pod anti-affinity terms.
pub fn anti_affinity(config: &ResolvedConfig, selector: &Labels) -> Result<Option<Value>, RenderError> {
    let mut terms = Vec::new();
    for axis in SpreadingAxis::ALL {
        terms.extend(axis_terms(axis, config, selector)?);
    }

    let mut affinity = match config.get("affinity") {
        Some(Value::Object(map)) => Value::Object(map.clone()),
        Some(Value::Null) | None => json!({}),
        Some(other) => {
            return Err(RenderError::InvalidValue {
                kind: ResourceKind::Deployment,
                path: "affinity".to_string(),
                reason: format!("expected a map, found {}", other),
            })
        }
    };

    if !terms.is_empty() {
        svcchart_values::set_path(
            &mut affinity,
            "podAntiAffinity.preferredDuringSchedulingIgnoredDuringExecution",
            Value::Array(terms),
        );
    }

    let empty = affinity.as_object().map_or(true, |map| map.is_empty());
    Ok(if empty { None } else { Some(affinity) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::LABEL_NAME;

    fn selector() -> Labels {
        let mut labels = Labels::new();
        labels.insert(LABEL_NAME.to_string(), "orders".to_string());
        labels
    }

    fn config(node: Value, zone: Value) -> ResolvedConfig {
        ResolvedConfig::from_tree(json!({"podAntiAffinity": {"node": node, "zone": zone}}))
    }

    #[test]
    fn test_disabled_axis_emits_nothing() {
        let cfg = config(json!({"enabled": false, "override": true, "custom": {"weight": 1}}), json!({}));
        assert!(axis_terms(SpreadingAxis::Node, &cfg, &selector()).unwrap().is_empty());
        assert!(axis_terms(SpreadingAxis::Zone, &cfg, &selector()).unwrap().is_empty());
        assert_eq!(anti_affinity(&cfg, &selector()).unwrap(), None);
    }

    #[test]
    fn test_default_terms() {
        let cfg = config(json!({"enabled": true}), json!({"enabled": true, "override": false}));
        let node = axis_terms(SpreadingAxis::Node, &cfg, &selector()).unwrap();
        assert_eq!(node, vec![SpreadingAxis::Node.default_term(&selector())]);
        assert_eq!(node[0]["weight"], 100);
        assert_eq!(node[0]["podAffinityTerm"]["topologyKey"], "kubernetes.io/hostname");
        assert_eq!(
            node[0]["podAffinityTerm"]["labelSelector"]["matchLabels"][LABEL_NAME],
            "orders"
        );

        let zone = axis_terms(SpreadingAxis::Zone, &cfg, &selector()).unwrap();
        assert_eq!(zone[0]["weight"], 50);
        assert_eq!(zone[0]["podAffinityTerm"]["topologyKey"], "topology.kubernetes.io/zone");
    }

    #[test]
    fn test_override_is_verbatim() {
        let custom = json!({
            "weight": 7,
            "podAffinityTerm": {"topologyKey": "rack", "labelSelector": {"matchLabels": {"x": "y"}}}
        });
        let cfg = config(json!({"enabled": true, "override": true, "custom": custom.clone()}), json!({}));
        assert_eq!(axis_terms(SpreadingAxis::Node, &cfg, &selector()).unwrap(), vec![custom]);
    }

    #[test]
    fn test_override_list_is_spliced() {
        let terms = json!([{"weight": 1}, {"weight": 2}]);
        let cfg = config(json!({"enabled": true}), json!({"enabled": true, "override": true, "custom": terms}));
        let affinity = anti_affinity(&cfg, &selector()).unwrap().unwrap();
        let list = affinity["podAntiAffinity"]["preferredDuringSchedulingIgnoredDuringExecution"]
            .as_array()
            .unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list[0]["weight"], 100);
        assert_eq!(list[1], json!({"weight": 1}));
        assert_eq!(list[2], json!({"weight": 2}));
    }

    #[test]
    fn test_override_without_custom_is_an_error() {
        let cfg = config(json!({"enabled": true, "override": true}), json!({}));
        let err = axis_terms(SpreadingAxis::Node, &cfg, &selector()).unwrap_err();
        assert_eq!(
            err,
            RenderError::MissingValue {
                kind: ResourceKind::Deployment,
                path: "podAntiAffinity.node.custom".to_string()
            }
        );
    }

    #[test]
    fn test_node_before_zone() {
        let cfg = config(json!({"enabled": true}), json!({"enabled": true}));
        let affinity = anti_affinity(&cfg, &selector()).unwrap().unwrap();
        let weights: Vec<_> = affinity["podAntiAffinity"]["preferredDuringSchedulingIgnoredDuringExecution"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["weight"].as_u64().unwrap())
            .collect();
        assert_eq!(weights, vec![100, 50]);
    }

    #[test]
    fn test_user_affinity_kept() {
        let cfg = ResolvedConfig::from_tree(json!({
            "affinity": {"nodeAffinity": {"requiredDuringSchedulingIgnoredDuringExecution": {}}},
            "podAntiAffinity": {"node": {"enabled": true}}
        }));
        let affinity = anti_affinity(&cfg, &selector()).unwrap().unwrap();
        assert!(affinity.get("nodeAffinity").is_some());
        assert_eq!(
            affinity["podAntiAffinity"]["preferredDuringSchedulingIgnoredDuringExecution"][0]["weight"],
            100
        );
    }
}
