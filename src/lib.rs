//! svcchart - layered configuration resolver for service charts
//!
//! This crate resolves the configuration of a generic API microservice from
//! ordered layers (built-in defaults, chart values, environment overlays,
//! command-line overrides), fills derived fields, validates the result, and
//! renders the Kubernetes and Istio resources that deploy it.

pub mod config;
pub mod fallback;
pub mod logging;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod render;

pub use config::{LoadError, LoadRequest, ResolveReport, ResolvedConfig};
pub use fallback::{apply_fallbacks, default_rules, FallbackRule, FallbackSource};
pub use naming::{ChartMetadata, Invocation, NamingContext, NamingError};
pub use output::{OutputError, OutputFormat};
pub use pipeline::{Pipeline, PipelineError, PipelineRequest, PipelineResult, RenderOutcome};
pub use render::{render, Emission, NamedArtifact, RenderError, ResourceKind};
