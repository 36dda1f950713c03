//! Tracing subscriber setup
//!
//! Workers run detached with their standard streams discarded, so every binary
//! logs to an append-only file instead. Each process tags its records with a
//! role span (`animate-title/run`, `typing-monitor/start`, ...).

use crate::session::config::{Config, DEFAULT_LOG_FILTER};
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

static LOGGING_INIT: OnceLock<()> = OnceLock::new();

/// Install the global subscriber (once per process) and return the role span
///
/// Never fails: if the log file cannot be opened, logging stays disabled.
pub fn init(config: &Config, role: &str) -> tracing::Span {
    init_once(config, &LOGGING_INIT);
    tracing::info_span!("tabglow", role = %role)
}

fn init_once(config: &Config, once: &OnceLock<()>) -> bool {
    let mut installed = false;
    once.get_or_init(|| {
        let file = match open_log_file(&config.log_file) {
            Ok(file) => file,
            Err(_) => return,
        };
        installed =
            tracing::subscriber::set_global_default(build_subscriber(file, &config.log_filter))
                .is_ok();
    });
    installed
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Subscriber writing plain-text records to `log_file`, filtered by `filter`
///
/// An invalid filter falls back to the default level.
pub fn build_subscriber(log_file: File, filter: &str) -> impl tracing::Subscriber + Send + Sync {
    let env_filter =
        EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let fmt_layer = fmt::layer()
        .with_writer(Arc::new(log_file))
        .with_ansi(false);

    tracing_subscriber::registry().with(fmt_layer).with(env_filter)
}
