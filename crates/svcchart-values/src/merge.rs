//! Configuration merge logic
//!
//! Layers fold left to right, lowest precedence first:
//! - Maps: deep-merge by key
//! - Lists: REPLACE (last wins)
//! - Scalars: override (last wins)

use serde_json::map::Entry;
use serde_json::{Map, Value};

use crate::layer::ConfigLayer;

/// Merge `overlay` over `base` and return the result.
///
/// Only a map over a map merges key by key. In every other pairing the
/// overlay replaces the base outright, so lists never concatenate and an
/// explicit `null` clears what was below it.
pub fn deep_merge(mut base: Value, overlay: Value) -> Value {
    merge_into(&mut base, overlay);
    base
}

fn merge_into(slot: &mut Value, overlay: Value) {
    match (slot, overlay) {
        (Value::Object(target), Value::Object(entries)) => {
            for (key, value) in entries {
                match target.entry(key) {
                    Entry::Occupied(mut existing) => merge_into(existing.get_mut(), value),
                    Entry::Vacant(vacant) => {
                        vacant.insert(value);
                    }
                }
            }
        }
        (slot, overlay) => *slot = overlay,
    }
}

/// Merge layers in order (first is base, last has highest precedence).
///
/// Starts from an empty map, so the result is always a map.
pub fn merge_layers<'a, I>(layers: I) -> Value
where
    I: IntoIterator<Item = &'a ConfigLayer>,
{
    layers
        .into_iter()
        .filter(|layer| !layer.is_empty())
        .fold(Value::Object(Map::new()), |acc, layer| {
            deep_merge(acc, layer.values().clone())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerOrigin;
    use serde_json::json;

    fn layer(origin: LayerOrigin, values: Value) -> ConfigLayer {
        ConfigLayer::new(origin.as_str(), origin, values).unwrap()
    }

    #[test]
    fn test_scalar_override() {
        let base = json!({"replicaCount": 1});
        let overlay = json!({"replicaCount": 3});
        let result = deep_merge(base, overlay);
        assert_eq!(result["replicaCount"], 3);
    }

    #[test]
    fn test_object_deep_merge() {
        let base = json!({
            "image": {
                "repository": "registry.local/orders",
                "pullPolicy": "IfNotPresent"
            }
        });
        let overlay = json!({
            "image": {
                "pullPolicy": "Always"
            }
        });
        let result = deep_merge(base, overlay);

        assert_eq!(result["image"]["pullPolicy"], "Always");
        assert_eq!(result["image"]["repository"], "registry.local/orders");
    }

    #[test]
    fn test_array_replace() {
        let base = json!({
            "args": ["--port", "8080", "--verbose"]
        });
        let overlay = json!({
            "args": ["--port", "9090"]
        });
        let result = deep_merge(base, overlay);

        let args = result["args"].as_array().unwrap();
        assert_eq!(args.len(), 2);
        assert_eq!(args[0], "--port");
        assert_eq!(args[1], "9090");
    }

    #[test]
    fn test_map_replaced_by_scalar() {
        let base = json!({"resources": {"limits": {"cpu": "500m"}}});
        let overlay = json!({"resources": "none"});
        let result = deep_merge(base, overlay);
        assert_eq!(result["resources"], "none");
    }

    #[test]
    fn test_scalar_and_null_replaced_by_map() {
        let base = json!({"resources": "none", "affinity": null});
        let overlay = json!({"resources": {"limits": {"cpu": "1"}}, "affinity": {"nodeAffinity": {}}});
        let result = deep_merge(base, overlay);
        assert_eq!(result["resources"], json!({"limits": {"cpu": "1"}}));
        assert_eq!(result["affinity"], json!({"nodeAffinity": {}}));
    }

    #[test]
    fn test_null_override() {
        let base = json!({"nodeSelector": {"pool": "general"}});
        let overlay = json!({"nodeSelector": null});
        let result = deep_merge(base, overlay);

        assert!(result["nodeSelector"].is_null());
    }

    #[test]
    fn test_merge_layers_precedence() {
        let l1 = layer(LayerOrigin::Builtin, json!({"environment": "dev", "service": {"port": 80}}));
        let l2 = layer(LayerOrigin::Values, json!({"service": {"type": "ClusterIP"}}));
        let l3 = layer(LayerOrigin::Cli, json!({"environment": "prod"}));

        let result = merge_layers(&[l1, l2, l3]);

        // scalar set in L1 and L3 ends with L3's value
        assert_eq!(result["environment"], "prod");
        // disjoint subkeys from L1 and L2 are unioned
        assert_eq!(result["service"]["port"], 80);
        assert_eq!(result["service"]["type"], "ClusterIP");
    }

    #[test]
    fn test_merge_no_layers_is_empty_map() {
        let layers: Vec<ConfigLayer> = Vec::new();
        assert_eq!(merge_layers(&layers), json!({}));
    }

    #[test]
    fn test_empty_layer_is_noop() {
        let base = layer(LayerOrigin::Builtin, json!({"a": {"b": 1}}));
        let empty = ConfigLayer::empty("empty", LayerOrigin::Overlay);
        let result = merge_layers(&[base.clone(), empty]);
        assert_eq!(result, base.values().clone());
    }

    #[test]
    fn test_nested_deep_merge() {
        let base = json!({
            "podAntiAffinity": {
                "node": {
                    "enabled": true,
                    "override": false
                }
            }
        });
        let overlay = json!({
            "podAntiAffinity": {
                "node": {
                    "override": true,
                    "custom": {"weight": 10}
                }
            }
        });
        let result = deep_merge(base, overlay);

        assert_eq!(result["podAntiAffinity"]["node"]["enabled"], true);
        assert_eq!(result["podAntiAffinity"]["node"]["override"], true);
        assert_eq!(result["podAntiAffinity"]["node"]["custom"]["weight"], 10);
    }
}
