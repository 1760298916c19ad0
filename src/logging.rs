//! Logging setup
//!
//! Diagnostics go to stderr so that rendered documents on stdout stay
//! machine-readable.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Directive applied when `RUST_LOG` is unset.
pub fn default_directive(quiet: bool) -> &'static str {
    if quiet {
        "svcchart=error"
    } else {
        "svcchart=info"
    }
}

/// Initialize logging.
///
/// When `quiet` is true, only error-level events are emitted. When `json`
/// is true, events are written as JSON lines. `RUST_LOG` takes precedence
/// over both defaults.
pub fn init_logging(quiet: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(quiet)));

    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(false)
            .with_span_list(false)
    });
    let text_layer = (!json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(true), "svcchart=error");
        assert_eq!(default_directive(false), "svcchart=info");
        // the subscriber itself can only be installed once per process and
        // is exercised by running the binary
        assert!(default_directive(false).parse::<tracing_subscriber::filter::Directive>().is_ok());
    }
}
