//! Artifact serialization
//!
//! Rendered documents go to stdout as one multi-document YAML stream or a
//! JSON array, or to a directory with one file per artifact.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::render::NamedArtifact;

/// Errors writing rendered output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Output serialization format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Yaml => "yaml",
            OutputFormat::Json => "json",
        }
    }
}

/// Serialize any value (reports, name listings) in `format`.
pub fn to_string<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<String, OutputError> {
    Ok(match format {
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(value)?;
            json.push('\n');
            json
        }
    })
}

/// Serialize artifacts as a single stream.
pub fn render_documents(artifacts: &[NamedArtifact], format: OutputFormat) -> Result<String, OutputError> {
    match format {
        OutputFormat::Yaml => {
            let mut out = String::new();
            for artifact in artifacts {
                out.push_str("---\n");
                out.push_str(&serde_yaml::to_string(&artifact.document)?);
            }
            Ok(out)
        }
        OutputFormat::Json => {
            let documents: Vec<_> = artifacts.iter().map(|a| &a.document).collect();
            to_string(&documents, format)
        }
    }
}

/// `<kind-lowercase>-<name>.<ext>`
pub fn artifact_file_name(artifact: &NamedArtifact, format: OutputFormat) -> String {
    format!(
        "{}-{}.{}",
        artifact.kind.as_str().to_lowercase(),
        artifact.name,
        format.extension()
    )
}

/// Write one file per artifact into `dir`, creating it if needed.
pub fn write_artifacts(
    artifacts: &[NamedArtifact],
    dir: &Path,
    format: OutputFormat,
) -> Result<Vec<PathBuf>, OutputError> {
    fs::create_dir_all(dir).map_err(|source| OutputError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let path = dir.join(artifact_file_name(artifact, format));
        let contents = match format {
            OutputFormat::Yaml => serde_yaml::to_string(&artifact.document)?,
            OutputFormat::Json => to_string(&artifact.document, format)?,
        };
        write_atomic(&path, &contents)?;
        written.push(path);
    }
    Ok(written)
}

/// Write-then-rename
fn write_atomic(path: &Path, contents: &str) -> Result<(), OutputError> {
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, contents).map_err(|source| OutputError::Io {
        path: temp_path.clone(),
        source,
    })?;
    fs::rename(&temp_path, path).map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })
}
