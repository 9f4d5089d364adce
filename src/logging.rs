//! Tracing subscriber setup.
//!
//! Logs go to a file when one is configured and to stderr otherwise, so they
//! never interleave with the chat transcript on stdout.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use tracing_subscriber::EnvFilter;

/// Filter used when none is configured.
pub const DEFAULT_LOG_FILTER: &str = "warn";

static INITIALIZED: OnceLock<()> = OnceLock::new();

/// Installs the global subscriber once. Later calls are no-ops.
pub fn init(filter: Option<&str>, log_file: Option<&Path>) -> io::Result<()> {
    if INITIALIZED.get().is_some() {
        return Ok(());
    }

    let filter = build_filter(filter);
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    // A subscriber installed elsewhere (tests, embedding hosts) wins.
    let _ = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            builder
                .with_ansi(false)
                .with_writer(Arc::new(file))
                .try_init()
        }
        None => builder.with_writer(io::stderr).try_init(),
    };
    let _ = INITIALIZED.set(());
    Ok(())
}

/// Parses `filter`, falling back to [`DEFAULT_LOG_FILTER`] when it is blank
/// or invalid.
#[must_use]
pub fn build_filter(filter: Option<&str>) -> EnvFilter {
    filter
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}
