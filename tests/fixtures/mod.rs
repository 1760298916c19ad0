//! Shared fixtures for integration tests
//!
//! `tests/fixtures/chart` is a small chart with base values and `dev` /
//! `prod` overlays.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use svcchart::config::LoadRequest;
use svcchart::pipeline::{Pipeline, PipelineRequest};

/// Path to the fixture chart
pub fn chart_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/chart")
}

/// Request against the fixture chart for `env`.
pub fn chart_request(release: &str, env: Option<&str>) -> PipelineRequest {
    PipelineRequest::new(
        release,
        LoadRequest {
            chart_dir: Some(chart_dir()),
            environment: env.map(str::to_string),
            ..Default::default()
        },
    )
}

/// Pipeline over the fixture chart, with extra `--set` arguments.
pub fn chart_pipeline(release: &str, env: Option<&str>, set: &[&str]) -> Pipeline {
    let mut request = chart_request(release, env);
    request.load.set = set.iter().map(|s| s.to_string()).collect();
    Pipeline::new(request).unwrap()
}

/// Write `contents` to `dir/name` and return the path.
pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}
