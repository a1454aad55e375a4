//! Logging setup.
//!
//! Console output plus a plain-text append-mode log file carrying the
//! same lines, one per event, with human-readable timestamps. Setting
//! `LOG_FORMAT=json` switches the console to JSON for production runs;
//! the file stays plain text either way.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::WorkerResult;

/// Install the global subscriber.
pub fn init(log_file: &Path) -> WorkerResult<()> {
    let file = Arc::new(
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)?,
    );

    let env_filter = EnvFilter::from_default_env()
        .add_directive("disktube=info".parse().unwrap());

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    if use_json {
        let file_layer = fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(file.clone());
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(file_layer)
            .with(env_filter)
            .init();
    } else {
        let file_layer = fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(file.clone());
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(file_layer)
            .with(env_filter)
            .init();
    }

    Ok(())
}
