//! Metadata and selector label sets.
//!
//! Selector labels identify live pods for Services, autoscalers and
//! anti-affinity terms, so they are kept to exactly three keys. Metadata
//! labels are a superset: user `commonLabels` go in first and the
//! canonical keys are written over them.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::warn;

use super::{NamingContext, MAX_NAME_LEN};
use crate::config::ResolvedConfig;

pub const LABEL_NAME: &str = "app.kubernetes.io/name";
pub const LABEL_INSTANCE: &str = "app.kubernetes.io/instance";
pub const LABEL_VERSION: &str = "app.kubernetes.io/version";
pub const LABEL_MANAGED_BY: &str = "app.kubernetes.io/managed-by";
pub const LABEL_CHART: &str = "helm.sh/chart";

/// Ordered label map.
pub type Labels = BTreeMap<String, String>;

/// Truncate a label value to 63 characters, trimming trailing characters
/// that may not end a label value.
pub fn truncate_label_value(value: &str) -> String {
    let truncated: String = value.chars().take(MAX_NAME_LEN).collect();
    truncated
        .trim_end_matches(|c: char| !c.is_ascii_alphanumeric())
        .to_string()
}

impl NamingContext {
    /// The minimal, stable label set used by selectors.
    pub fn selector_labels(&self) -> Labels {
        let mut labels = Labels::new();
        labels.insert(LABEL_NAME.to_string(), truncate_label_value(&self.name));
        labels.insert(LABEL_INSTANCE.to_string(), truncate_label_value(&self.release));
        labels.insert(LABEL_VERSION.to_string(), truncate_label_value(&self.version));
        labels
    }

    /// The full label set for resource metadata. Always contains every
    /// selector label with the same value.
    pub fn metadata_labels(&self, config: &ResolvedConfig) -> Labels {
        let mut labels = common_labels(config);
        labels.insert(LABEL_MANAGED_BY.to_string(), self.managed_by.clone());
        labels.insert(LABEL_CHART.to_string(), self.chart_label());
        labels.extend(self.selector_labels());
        labels
    }
}

fn common_labels(config: &ResolvedConfig) -> Labels {
    let Some(map) = config.get("commonLabels").and_then(Value::as_object) else {
        return Labels::new();
    };

    map.iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null => String::new(),
                _ => {
                    warn!(label = key.as_str(), "skipping non-scalar common label");
                    return None;
                }
            };
            Some((key.clone(), truncate_label_value(&text)))
        })
        .collect()
}
