//! Pipeline orchestration for svcchart
//!
//! One invocation runs the stages in order:
//! - Load configuration layers
//! - Merge them into one tree
//! - Apply fallback rules
//! - Validate against the schema
//! - Render resource documents
//!
//! Load, merge and fallback problems abort the run. Validation problems are
//! collected and returned together, and nothing is rendered. Render
//! problems are attributed to their resource kind; the other kinds are
//! still emitted.

use std::path::PathBuf;

use serde::Serialize;
use svcchart_schema::{validate, SchemaConstraint, Violation};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{
    default_schema, load_schema_document, ChecksumError, LoadError, LoadRequest, ResolvedConfig,
};
use crate::fallback::{apply_fallbacks, default_rules, FallbackRule};
use crate::naming::{ChartMetadata, Invocation, Labels, NamingContext, NamingError};
use crate::output::OutputError;
use crate::render::{render, NamedArtifact, Omission, RenderError, ResourceKind};

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("load error: {0}")]
    Load(#[from] LoadError),

    #[error("naming error: {0}")]
    Naming(#[from] NamingError),

    #[error("configuration is invalid ({} violation(s))", .0.len())]
    Validation(Vec<Violation>),

    #[error("{} resource(s) failed to render", .0.len())]
    Render(Vec<RenderError>),

    #[error("output error: {0}")]
    Output(#[from] OutputError),

    #[error("{0}")]
    Checksum(#[from] ChecksumError),
}

impl PipelineError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Load(_) => 1,
            PipelineError::Naming(_) => 1,
            PipelineError::Validation(_) => 2,
            PipelineError::Render(_) => 3,
            PipelineError::Output(_) => 1,
            PipelineError::Checksum(_) => 1,
        }
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Everything one invocation needs.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    /// Configuration sources
    pub load: LoadRequest,

    /// Schema document extending the built-in schema
    pub schema_path: Option<PathBuf>,

    /// Release name
    pub release: String,

    /// Chart name (overrides `Chart.yaml`)
    pub chart_name: Option<String>,

    /// Chart version (overrides `Chart.yaml`)
    pub chart_version: Option<String>,

    /// Application version (overrides `Chart.yaml`)
    pub app_version: Option<String>,
}

impl PipelineRequest {
    pub fn new(release: impl Into<String>, load: LoadRequest) -> Self {
        Self {
            load,
            schema_path: None,
            release: release.into(),
            chart_name: None,
            chart_version: None,
            app_version: None,
        }
    }

    /// Chart metadata: `Chart.yaml` from the chart directory, then CLI values.
    pub fn chart_metadata(&self) -> Result<ChartMetadata, LoadError> {
        let mut chart = match &self.load.chart_dir {
            Some(dir) => ChartMetadata::load_from_dir(dir)?.unwrap_or_default(),
            None => ChartMetadata::default(),
        };
        if let Some(name) = &self.chart_name {
            chart.name = name.clone();
        }
        if let Some(version) = &self.chart_version {
            chart.version = version.clone();
        }
        if let Some(app_version) = &self.app_version {
            chart.app_version = Some(app_version.clone());
        }
        Ok(chart)
    }
}

/// Result of a full run.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub config: ResolvedConfig,
    pub naming: NamingContext,
    pub artifacts: Vec<NamedArtifact>,
    pub omitted: Vec<Omission>,
    pub failures: Vec<RenderError>,
}

impl RenderOutcome {
    /// `Err(Render)` if any kind failed, after the rest was emitted.
    pub fn check(&self) -> PipelineResult<()> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::Render(self.failures.clone()))
        }
    }
}

/// Resource name listing for the `names` command.
#[derive(Debug, Clone, Serialize)]
pub struct NamesReport {
    pub release: String,
    pub name: String,
    pub fullname: String,
    pub version: String,
    pub resources: Vec<ResourceName>,
    pub selector_labels: Labels,
    pub metadata_labels: Labels,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceName {
    pub kind: ResourceKind,
    pub name: String,
    pub enabled: bool,
}

/// Pipeline execution context
pub struct Pipeline {
    request: PipelineRequest,
    constraints: Vec<SchemaConstraint>,
    rules: Vec<FallbackRule>,
}

impl Pipeline {
    /// Create a pipeline, loading the schema document if one is given.
    pub fn new(request: PipelineRequest) -> PipelineResult<Self> {
        let mut schema = default_schema();
        let mut rules = default_rules();

        if let Some(path) = &request.schema_path {
            let document = load_schema_document(path)?;
            schema.extend(document.schema);
            rules.extend(document.fallbacks);
        }
        let constraints = schema.constraints().map_err(LoadError::from)?;
        debug!(
            constraints = constraints.len(),
            fallbacks = rules.len(),
            "schema loaded"
        );

        Ok(Self {
            request,
            constraints,
            rules,
        })
    }

    pub fn request(&self) -> &PipelineRequest {
        &self.request
    }

    pub fn constraints(&self) -> &[SchemaConstraint] {
        &self.constraints
    }

    /// Load, merge and apply fallbacks.
    pub fn resolve(&self) -> PipelineResult<ResolvedConfig> {
        let layers = self.request.load.load()?;
        let merged = ResolvedConfig::from_layers(&layers);
        debug!(layers = layers.len(), "merged configuration layers");
        Ok(apply_fallbacks(merged, &self.rules))
    }

    /// Every violation of the schema in `config`.
    pub fn check(&self, config: &ResolvedConfig) -> Vec<Violation> {
        validate(config.tree(), &self.constraints)
    }

    /// Resolve and validate; `Err(Validation)` carries every violation.
    pub fn validate(&self) -> PipelineResult<ResolvedConfig> {
        let config = self.resolve()?;
        let violations = self.check(&config);
        if violations.is_empty() {
            Ok(config)
        } else {
            Err(PipelineError::Validation(violations))
        }
    }

    /// Naming facts for `config`.
    pub fn naming(&self, config: &ResolvedConfig) -> PipelineResult<NamingContext> {
        let invocation = Invocation::new(self.request.release.clone(), self.request.chart_metadata()?);
        Ok(NamingContext::derive(config, &invocation)?)
    }

    /// Resource names and label sets, without validating.
    pub fn names(&self) -> PipelineResult<NamesReport> {
        let config = self.resolve()?;
        let ctx = self.naming(&config)?;

        let resources = ResourceKind::ALL
            .iter()
            .map(|kind| ResourceName {
                kind: *kind,
                name: match kind {
                    ResourceKind::ServiceAccount => crate::render::service_account_name(&config, &ctx),
                    _ => kind.default_name(&ctx),
                },
                enabled: kind
                    .governing_flag()
                    .map_or(true, |(flag, default)| config.flag(flag, default)),
            })
            .collect();

        Ok(NamesReport {
            release: ctx.release.clone(),
            name: ctx.name.clone(),
            fullname: ctx.primary_name(),
            version: ctx.version.clone(),
            resources,
            selector_labels: ctx.selector_labels(),
            metadata_labels: ctx.metadata_labels(&config),
        })
    }

    /// Run every stage.
    pub fn run(&self) -> PipelineResult<RenderOutcome> {
        let config = self.validate()?;
        let naming = self.naming(&config)?;
        let rendered = render(&config, &naming);

        info!(
            release = naming.release.as_str(),
            artifacts = rendered.artifacts.len(),
            omitted = rendered.omitted.len(),
            failures = rendered.failures.len(),
            "render complete"
        );

        Ok(RenderOutcome {
            config,
            naming,
            artifacts: rendered.artifacts,
            omitted: rendered.omitted,
            failures: rendered.failures,
        })
    }
}
