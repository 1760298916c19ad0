//! Resource naming
//!
//! A [`NamingContext`] is derived once per invocation from the resolved
//! configuration and the invocation metadata, and is only read after that.
//! Every name the renderer emits comes from here.

mod labels;

pub use labels::{
    truncate_label_value, Labels, LABEL_CHART, LABEL_INSTANCE, LABEL_MANAGED_BY, LABEL_NAME,
    LABEL_VERSION,
};

use std::path::Path;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::config::{read_document, LoadError, ResolvedConfig};

/// Kubernetes object name length limit (DNS-1123 label).
pub const MAX_NAME_LEN: usize = 63;

/// Value of the managed-by label.
pub const MANAGED_BY: &str = "svcchart";

/// Default chart name when neither `Chart.yaml` nor the CLI provides one.
pub const DEFAULT_CHART_NAME: &str = "api-microservice";

/// Default chart version.
pub const DEFAULT_CHART_VERSION: &str = "0.1.0";

/// Naming errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NamingError {
    #[error("release name must not be empty")]
    EmptyRelease,

    #[error("chart name must not be empty")]
    EmptyChart,
}

/// Chart metadata (`Chart.yaml`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartMetadata {
    pub name: String,

    pub version: String,

    #[serde(rename = "appVersion", default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
}

impl Default for ChartMetadata {
    fn default() -> Self {
        Self {
            name: DEFAULT_CHART_NAME.to_string(),
            version: DEFAULT_CHART_VERSION.to_string(),
            app_version: None,
        }
    }
}

impl ChartMetadata {
    /// Load `<dir>/Chart.yaml` if present.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>, LoadError> {
        let path = dir.join("Chart.yaml");
        if !path.exists() {
            return Ok(None);
        }
        let (value, _) = read_document(&path)?;
        let metadata = serde_json::from_value(value).map_err(|e| LoadError::Parse {
            path: path.clone(),
            message: e.to_string(),
        })?;
        Ok(Some(metadata))
    }
}

/// Invocation metadata that is not part of the configuration tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub release: String,
    pub chart: ChartMetadata,
}

impl Invocation {
    pub fn new(release: impl Into<String>, chart: ChartMetadata) -> Self {
        Self {
            release: release.into(),
            chart,
        }
    }
}

/// Read-only naming facts for one render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamingContext {
    /// Release identifier
    pub release: String,

    /// Chart name as published (used in the chart label)
    pub chart_name: String,

    /// Chart version
    pub chart_version: String,

    /// Application name: `nameOverride` or the chart name
    pub name: String,

    /// Primary resource base: `fullnameOverride` or `{release}-{name}`
    pub fullname: String,

    /// Application version: chart `appVersion`, else chart version
    pub app_version: String,

    /// Version identifier: `version`, else the application version
    pub version: String,

    /// Managed-by marker
    pub managed_by: String,
}

impl NamingContext {
    /// Derive naming facts from the resolved tree and invocation metadata.
    pub fn derive(config: &ResolvedConfig, invocation: &Invocation) -> Result<Self, NamingError> {
        let release = invocation.release.trim();
        if release.is_empty() {
            return Err(NamingError::EmptyRelease);
        }
        let chart = &invocation.chart;
        if chart.name.trim().is_empty() {
            return Err(NamingError::EmptyChart);
        }

        let name = config
            .get_nonempty_str("nameOverride")
            .unwrap_or(&chart.name)
            .to_string();
        let fullname = match config.get_nonempty_str("fullnameOverride") {
            Some(full) => full.to_string(),
            None => format!("{}-{}", release, name),
        };
        let app_version = chart
            .app_version
            .clone()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| chart.version.clone());
        let version = config
            .get_nonempty_str("version")
            .map_or_else(|| app_version.clone(), str::to_string);

        Ok(Self {
            release: release.to_string(),
            chart_name: chart.name.clone(),
            chart_version: chart.version.clone(),
            name,
            fullname,
            app_version,
            version,
            managed_by: MANAGED_BY.to_string(),
        })
    }

    /// Name of the primary resource: `{release}-{chart}`, truncated.
    pub fn primary_name(&self) -> String {
        truncate_name(&self.fullname)
    }

    /// Name of a dependent resource: `{release}-{chart}-{suffix}`, truncated.
    pub fn dependent_name(&self, suffix: &str) -> String {
        truncate_name(&format!("{}-{}", self.fullname, suffix))
    }

    /// `helm.sh/chart` style label value.
    pub fn chart_label(&self) -> String {
        truncate_label_value(&format!("{}-{}", self.chart_name, self.chart_version).replace('+', "_"))
    }
}

/// Truncate to [`MAX_NAME_LEN`] characters and strip trailing separators.
pub fn truncate_name(name: &str) -> String {
    let truncated: String = name.chars().take(MAX_NAME_LEN).collect();
    truncated
        .trim_end_matches(|c| matches!(c, '-' | '.' | '_'))
        .to_string()
}

/// Whether `name` is a valid DNS-1123 label.
pub fn is_dns_label(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return false;
    }
    match Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$") {
        Ok(re) => re.is_match(name),
        Err(_) => false,
    }
}
