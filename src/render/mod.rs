//! Resource rendering
//!
//! Projects a validated configuration into Kubernetes resource documents.
//! Every resource kind is decided exactly once: it is either emitted as a
//! [`NamedArtifact`] or omitted with a reason. A kind that fails to render
//! is reported on its own and does not stop the other kinds.

mod affinity;
mod autoscaler;
mod deployment;
mod service;
mod service_account;
mod virtual_service;

pub use affinity::{anti_affinity, axis_terms, SpreadingAxis};
pub use service_account::service_account_name;

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::config::ResolvedConfig;
use crate::naming::{is_dns_label, Labels, NamingContext};

/// Resource kinds, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ResourceKind {
    ServiceAccount,
    Deployment,
    Service,
    HorizontalPodAutoscaler,
    VirtualService,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::ServiceAccount,
        ResourceKind::Deployment,
        ResourceKind::Service,
        ResourceKind::HorizontalPodAutoscaler,
        ResourceKind::VirtualService,
    ];

    /// Kubernetes `kind` string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::ServiceAccount => "ServiceAccount",
            ResourceKind::Deployment => "Deployment",
            ResourceKind::Service => "Service",
            ResourceKind::HorizontalPodAutoscaler => "HorizontalPodAutoscaler",
            ResourceKind::VirtualService => "VirtualService",
        }
    }

    pub fn api_version(&self) -> &'static str {
        match self {
            ResourceKind::ServiceAccount | ResourceKind::Service => "v1",
            ResourceKind::Deployment => "apps/v1",
            ResourceKind::HorizontalPodAutoscaler => "autoscaling/v2",
            ResourceKind::VirtualService => "networking.istio.io/v1beta1",
        }
    }

    /// Name suffix for dependent resources; the Deployment is primary.
    pub fn suffix(&self) -> Option<&'static str> {
        match self {
            ResourceKind::Deployment => None,
            ResourceKind::Service => Some("service"),
            ResourceKind::HorizontalPodAutoscaler => Some("hpa"),
            ResourceKind::VirtualService => Some("virtualservice"),
            ResourceKind::ServiceAccount => Some("serviceaccount"),
        }
    }

    /// Flag that switches this kind on or off, with its default.
    pub fn governing_flag(&self) -> Option<(&'static str, bool)> {
        match self {
            ResourceKind::Deployment => None,
            ResourceKind::Service => Some(("service.enabled", true)),
            ResourceKind::HorizontalPodAutoscaler => Some(("autoscaling.enabled", false)),
            ResourceKind::VirtualService => Some(("virtualService.enabled", false)),
            ResourceKind::ServiceAccount => Some(("serviceAccount.create", true)),
        }
    }

    /// Default resource name from the naming context.
    pub fn default_name(&self, ctx: &NamingContext) -> String {
        match self.suffix() {
            Some(suffix) => ctx.dependent_name(suffix),
            None => ctx.primary_name(),
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rendering errors, attributed to a single resource kind.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("{kind}: name {name:?} is not a valid DNS-1123 label")]
    InvalidName { kind: ResourceKind, name: String },

    #[error("{kind}: required value {path} is missing")]
    MissingValue { kind: ResourceKind, path: String },

    #[error("{kind}: invalid value at {path}: {reason}")]
    InvalidValue {
        kind: ResourceKind,
        path: String,
        reason: String,
    },

    #[error("{kind}: failed to compute configuration checksum: {message}")]
    Checksum { kind: ResourceKind, message: String },
}

impl RenderError {
    pub fn kind(&self) -> ResourceKind {
        match self {
            RenderError::InvalidName { kind, .. }
            | RenderError::MissingValue { kind, .. }
            | RenderError::InvalidValue { kind, .. }
            | RenderError::Checksum { kind, .. } => *kind,
        }
    }
}

/// One rendered resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedArtifact {
    pub kind: ResourceKind,
    pub name: String,
    pub metadata_labels: Labels,
    pub selector_labels: Labels,
    /// Full resource document (`apiVersion`, `kind`, `metadata`, `spec`)
    pub document: Value,
}

/// Per-kind decision.
#[derive(Debug, Clone, PartialEq)]
pub enum Emission {
    Emit(NamedArtifact),
    Omit { reason: String },
}

/// An omitted kind and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Omission {
    pub kind: ResourceKind,
    pub reason: String,
}

/// Everything one render produced.
#[derive(Debug, Clone, Default)]
pub struct Rendered {
    pub artifacts: Vec<NamedArtifact>,
    pub omitted: Vec<Omission>,
    pub failures: Vec<RenderError>,
}

impl Rendered {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Render every resource kind.
pub fn render(config: &ResolvedConfig, ctx: &NamingContext) -> Rendered {
    let mut rendered = Rendered::default();

    for kind in ResourceKind::ALL {
        match render_kind(kind, config, ctx) {
            Ok(Emission::Emit(artifact)) => {
                debug!(kind = %kind, name = artifact.name.as_str(), "rendered resource");
                rendered.artifacts.push(artifact);
            }
            Ok(Emission::Omit { reason }) => {
                debug!(kind = %kind, reason = reason.as_str(), "omitted resource");
                rendered.omitted.push(Omission { kind, reason });
            }
            Err(err) => {
                warn!(kind = %kind, error = %err, "resource failed to render");
                rendered.failures.push(err);
            }
        }
    }

    rendered
}

/// Decide and render a single kind.
pub fn render_kind(
    kind: ResourceKind,
    config: &ResolvedConfig,
    ctx: &NamingContext,
) -> Result<Emission, RenderError> {
    if let Some((flag, default)) = kind.governing_flag() {
        if !config.flag(flag, default) {
            return Ok(Emission::Omit {
                reason: format!("{} is false", flag),
            });
        }
    }

    let scope = RenderScope::new(kind, config, ctx);
    let artifact = match kind {
        ResourceKind::Deployment => deployment::render(&scope)?,
        ResourceKind::Service => service::render(&scope)?,
        ResourceKind::HorizontalPodAutoscaler => autoscaler::render(&scope)?,
        ResourceKind::VirtualService => virtual_service::render(&scope)?,
        ResourceKind::ServiceAccount => service_account::render(&scope)?,
    };
    Ok(Emission::Emit(artifact))
}

/// Shared state while rendering one kind.
pub(crate) struct RenderScope<'a> {
    pub kind: ResourceKind,
    pub config: &'a ResolvedConfig,
    pub ctx: &'a NamingContext,
    pub metadata_labels: Labels,
    pub selector_labels: Labels,
}

impl<'a> RenderScope<'a> {
    fn new(kind: ResourceKind, config: &'a ResolvedConfig, ctx: &'a NamingContext) -> Self {
        Self {
            kind,
            config,
            ctx,
            metadata_labels: ctx.metadata_labels(config),
            selector_labels: ctx.selector_labels(),
        }
    }

    /// Value at `path`, or a `MissingValue` error if unset.
    pub fn require(&self, path: &str) -> Result<&'a Value, RenderError> {
        match self.config.get(path) {
            Some(value) if !svcchart_values::is_unset(Some(value)) => Ok(value),
            _ => Err(RenderError::MissingValue {
                kind: self.kind,
                path: path.to_string(),
            }),
        }
    }

    /// Required port number in `[1, 65535]`.
    pub fn require_port(&self, path: &str) -> Result<u64, RenderError> {
        let value = self.require(path)?;
        match value.as_u64() {
            Some(port) if (1..=65535).contains(&port) => Ok(port),
            _ => Err(self.invalid(path, format!("{} is not a port number", value))),
        }
    }

    /// Optional value: present, non-null and non-empty.
    pub fn optional(&self, path: &str) -> Option<&'a Value> {
        self.config
            .get(path)
            .filter(|value| !svcchart_values::is_unset(Some(*value)))
    }

    /// Optional value that must be a map if set.
    pub fn optional_map(&self, path: &str) -> Result<Option<&'a Map<String, Value>>, RenderError> {
        match self.optional(path) {
            None => Ok(None),
            Some(Value::Object(map)) if map.is_empty() => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(other) => Err(self.invalid(path, format!("expected a map, found {}", other))),
        }
    }

    /// Optional value that must be a list if set.
    pub fn optional_list(&self, path: &str) -> Result<Option<&'a Vec<Value>>, RenderError> {
        match self.optional(path) {
            None => Ok(None),
            Some(Value::Array(items)) if items.is_empty() => Ok(None),
            Some(Value::Array(items)) => Ok(Some(items)),
            Some(other) => Err(self.invalid(path, format!("expected a list, found {}", other))),
        }
    }

    pub fn invalid(&self, path: &str, reason: impl Into<String>) -> RenderError {
        RenderError::InvalidValue {
            kind: self.kind,
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// Check a resource name against DNS-1123.
    pub fn checked_name(&self, name: String) -> Result<String, RenderError> {
        if is_dns_label(&name) {
            Ok(name)
        } else {
            Err(RenderError::InvalidName {
                kind: self.kind,
                name,
            })
        }
    }

    /// The `metadata` block for a resource called `name`.
    pub fn metadata(&self, name: &str, annotations: Option<&Map<String, Value>>) -> Value {
        let mut metadata = json!({
            "name": name,
            "labels": self.metadata_labels,
        });
        if let Some(namespace) = self.config.get_nonempty_str("namespace") {
            metadata["namespace"] = json!(namespace);
        }
        if let Some(annotations) = annotations {
            metadata["annotations"] = Value::Object(annotations.clone());
        }
        metadata
    }

    /// Wrap a finished `spec`.
    pub fn artifact(&self, name: String, metadata: Value, spec: Value) -> NamedArtifact {
        let mut fields = Map::new();
        fields.insert("spec".to_string(), spec);
        self.artifact_with(name, metadata, fields)
    }

    /// Wrap arbitrary top-level fields, for kinds without a `spec`.
    pub fn artifact_with(&self, name: String, metadata: Value, fields: Map<String, Value>) -> NamedArtifact {
        let mut document = Map::new();
        document.insert("apiVersion".to_string(), json!(self.kind.api_version()));
        document.insert("kind".to_string(), json!(self.kind.as_str()));
        document.insert("metadata".to_string(), metadata);
        document.extend(fields);
        let document = Value::Object(document);
        NamedArtifact {
            kind: self.kind,
            name,
            metadata_labels: self.metadata_labels.clone(),
            selector_labels: self.selector_labels.clone(),
            document,
        }
    }
}
