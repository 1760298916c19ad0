//! Source loader
//!
//! Turns an invocation's inputs into an ordered list of configuration
//! layers with provenance. Reading is the only side effect; nothing is
//! cached between invocations.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use svcchart_schema::Schema;
use svcchart_values::{
    parse_overrides, ConfigLayer, LayerError, LayerOrigin, OverrideError, SetMode,
};
use tracing::debug;

use super::defaults::ChartDefaults;
use crate::fallback::FallbackRule;

/// Source loading errors. All are fatal for the invocation.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("unsupported document format: {0} (expected .yaml, .yml, .toml or .json)")]
    UnsupportedFormat(PathBuf),

    #[error(transparent)]
    Layer(#[from] LayerError),

    #[error("invalid override: {0}")]
    Override(#[from] OverrideError),

    #[error("invalid schema: {0}")]
    Schema(#[from] svcchart_schema::SchemaError),
}

/// Structured document formats, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Toml,
    Json,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("yaml") | Some("yml") => Some(DocumentFormat::Yaml),
            Some("toml") => Some(DocumentFormat::Toml),
            Some("json") => Some(DocumentFormat::Json),
            _ => None,
        }
    }
}

/// A contributing source with provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSource {
    /// Origin of this source
    pub origin: LayerOrigin,

    /// Layer name (file name, "builtin", "cli:set", ...)
    pub name: String,

    /// File path (None for builtin/inline/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (None for builtin/inline/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// A loaded layer and where it came from.
#[derive(Debug, Clone)]
pub struct LoadedLayer {
    pub layer: ConfigLayer,
    pub source: ConfigSource,
}

/// One configuration source to load.
#[derive(Debug, Clone)]
pub enum SourceSpec {
    /// A structured document on disk.
    File { path: PathBuf, origin: LayerOrigin },
    /// An in-memory map.
    Inline {
        name: String,
        origin: LayerOrigin,
        values: Value,
    },
    /// `key=value` overrides.
    Overrides { args: Vec<String>, mode: SetMode },
}

/// Inputs of one invocation, before any file is read.
#[derive(Debug, Clone, Default)]
pub struct LoadRequest {
    /// Chart directory holding `values.yaml`, `values-<env>.yaml`, `Chart.yaml`
    pub chart_dir: Option<PathBuf>,

    /// Environment name (selects the overlay and sets `environment`)
    pub environment: Option<String>,

    /// Explicit overlay files, lowest precedence first
    pub values_files: Vec<PathBuf>,

    /// `--set` arguments
    pub set: Vec<String>,

    /// `--set-string` arguments
    pub set_string: Vec<String>,

    /// Skip the built-in defaults layer
    pub no_defaults: bool,
}

impl LoadRequest {
    /// Ordered source list, lowest precedence first.
    ///
    /// The chart's base `values.yaml` is optional; an overlay for an
    /// explicitly requested environment is not.
    pub fn sources(&self) -> Vec<SourceSpec> {
        let mut sources = Vec::new();

        if !self.no_defaults {
            sources.push(SourceSpec::Inline {
                name: "builtin".to_string(),
                origin: LayerOrigin::Builtin,
                values: ChartDefaults::default().to_value(),
            });
        }

        if let Some(dir) = &self.chart_dir {
            let base = dir.join("values.yaml");
            if base.exists() {
                sources.push(SourceSpec::File {
                    path: base,
                    origin: LayerOrigin::Values,
                });
            }
        }

        if let Some(env) = &self.environment {
            sources.push(SourceSpec::Inline {
                name: format!("environment:{}", env),
                origin: LayerOrigin::Environment,
                values: serde_json::json!({ "environment": env }),
            });
            if let Some(dir) = &self.chart_dir {
                sources.push(SourceSpec::File {
                    path: dir.join(format!("values-{}.yaml", env)),
                    origin: LayerOrigin::Environment,
                });
            }
        }

        for path in &self.values_files {
            sources.push(SourceSpec::File {
                path: path.clone(),
                origin: LayerOrigin::Overlay,
            });
        }

        if !self.set.is_empty() {
            sources.push(SourceSpec::Overrides {
                args: self.set.clone(),
                mode: SetMode::Typed,
            });
        }
        if !self.set_string.is_empty() {
            sources.push(SourceSpec::Overrides {
                args: self.set_string.clone(),
                mode: SetMode::String,
            });
        }

        sources
    }

    /// Load every source in order.
    pub fn load(&self) -> Result<Vec<LoadedLayer>, LoadError> {
        load_sources(&self.sources())
    }
}

/// Load sources in input order. Stops at the first unreadable or malformed one.
pub fn load_sources(sources: &[SourceSpec]) -> Result<Vec<LoadedLayer>, LoadError> {
    sources.iter().map(load_source).collect()
}

fn load_source(spec: &SourceSpec) -> Result<LoadedLayer, LoadError> {
    let loaded = match spec {
        SourceSpec::File { path, origin } => {
            let (value, digest) = read_document(path)?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            LoadedLayer {
                layer: ConfigLayer::new(name.clone(), *origin, value)?,
                source: ConfigSource {
                    origin: *origin,
                    name,
                    path: Some(path.to_string_lossy().to_string()),
                    digest: Some(digest),
                },
            }
        }
        SourceSpec::Inline {
            name,
            origin,
            values,
        } => LoadedLayer {
            layer: ConfigLayer::new(name.clone(), *origin, values.clone())?,
            source: ConfigSource {
                origin: *origin,
                name: name.clone(),
                path: None,
                digest: None,
            },
        },
        SourceSpec::Overrides { args, mode } => {
            let name = match mode {
                SetMode::Typed => "cli:set",
                SetMode::String => "cli:set-string",
            };
            let values = parse_overrides(args, *mode)?;
            LoadedLayer {
                layer: ConfigLayer::new(name, LayerOrigin::Cli, values)?,
                source: ConfigSource {
                    origin: LayerOrigin::Cli,
                    name: name.to_string(),
                    path: None,
                    digest: None,
                },
            }
        }
    };

    debug!(
        layer = loaded.source.name.as_str(),
        origin = loaded.source.origin.as_str(),
        empty = loaded.layer.is_empty(),
        "loaded configuration layer"
    );
    Ok(loaded)
}

/// Read and parse a structured document, returning the value and the
/// SHA-256 digest of its raw bytes.
pub fn read_document(path: &Path) -> Result<(Value, String), LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }
    let format =
        DocumentFormat::from_path(path).ok_or_else(|| LoadError::UnsupportedFormat(path.to_path_buf()))?;

    let bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hex::encode(hasher.finalize());

    let contents = String::from_utf8(bytes).map_err(|e| LoadError::Parse {
        path: path.to_path_buf(),
        message: format!("invalid UTF-8: {}", e),
    })?;

    let value = parse_document(&contents, format).map_err(|message| LoadError::Parse {
        path: path.to_path_buf(),
        message,
    })?;

    Ok((value, digest))
}

/// Parse document text. Blank or comment-only YAML yields `null`.
pub fn parse_document(contents: &str, format: DocumentFormat) -> Result<Value, String> {
    match format {
        DocumentFormat::Yaml => {
            let blank = contents
                .lines()
                .map(str::trim)
                .all(|line| line.is_empty() || line.starts_with('#') || line == "---");
            if blank {
                return Ok(Value::Null);
            }
            serde_yaml::from_str(contents).map_err(|e| format!("YAML parse error: {}", e))
        }
        DocumentFormat::Toml => {
            let value: toml::Value =
                toml::from_str(contents).map_err(|e| format!("TOML parse error: {}", e))?;
            Ok(toml_to_json(value))
        }
        DocumentFormat::Json => {
            serde_json::from_str(contents).map_err(|e| format!("JSON parse error: {}", e))
        }
    }
}

/// Convert TOML Value to JSON Value
fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// A schema file: field constraints plus extra fallback rules.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaDocument {
    #[serde(flatten)]
    pub schema: Schema,

    #[serde(default)]
    pub fallbacks: Vec<FallbackRule>,
}

/// Load a schema document and check its bounds.
pub fn load_schema_document(path: &Path) -> Result<SchemaDocument, LoadError> {
    let (value, _) = read_document(path)?;
    let document: SchemaDocument = serde_json::from_value(value).map_err(|e| LoadError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    document.schema.constraints()?;
    debug!(
        path = %path.display(),
        fields = document.schema.fields.len(),
        fallbacks = document.fallbacks.len(),
        "loaded schema document"
    );
    Ok(document)
}
