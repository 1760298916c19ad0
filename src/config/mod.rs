//! Layered configuration sources
//!
//! Layers are loaded and merged in precedence order:
//! 1. Built-in chart defaults
//! 2. Chart base values (`<chart-dir>/values.yaml`)
//! 3. Environment (`environment: <env>` and `<chart-dir>/values-<env>.yaml`)
//! 4. Explicit overlays (`-f`, in argument order)
//! 5. CLI overrides (`--set`, then `--set-string`)

mod defaults;
mod effective;
mod loader;

pub use defaults::{default_schema, ChartDefaults};
pub use effective::{ChecksumError, ResolveReport, ResolvedConfig, REPORT_SCHEMA_ID, REPORT_SCHEMA_VERSION};
pub use loader::{
    load_schema_document, load_sources, parse_document, read_document, ConfigSource,
    DocumentFormat, LoadError, LoadRequest, LoadedLayer, SchemaDocument, SourceSpec,
};
