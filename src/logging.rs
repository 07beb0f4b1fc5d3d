//! Logging setup for the provider process.
//!
//! All logs are written to **stderr**: stdout carries the plugin handshake and
//! must not be interleaved with anything else.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: full `tracing` filter directives (e.g. `terraform_provider_fram=debug`).
//! - `TF_LOG`: used when `RUST_LOG` is unset; accepts the host's level names
//!   (`TRACE`, `DEBUG`, `INFO`, `WARN`, `ERROR`, `JSON`).

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the default logging subscriber at `info` level.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default("info");
}

/// Initialize logging, using `default_level` when neither `RUST_LOG` nor
/// `TF_LOG` select a level.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging_with_default(default_level: &str) {
    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(stderr_layer())
        .init();
}

/// Try to initialize logging at `info` level, returning false if a subscriber
/// was already installed.
pub fn try_init_logging() -> bool {
    tracing_subscriber::registry()
        .with(env_filter("info"))
        .with(stderr_layer())
        .try_init()
        .is_ok()
}

fn stderr_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
}

fn env_filter(default_level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let level = std::env::var("TF_LOG")
        .ok()
        .and_then(|value| tf_log_level(&value))
        .unwrap_or(default_level);
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Map a `TF_LOG` value onto a `tracing` level directive.
fn tf_log_level(value: &str) -> Option<&'static str> {
    match value.trim().to_ascii_uppercase().as_str() {
        "TRACE" | "JSON" => Some("trace"),
        "DEBUG" => Some("debug"),
        "INFO" => Some("info"),
        "WARN" => Some("warn"),
        "ERROR" => Some("error"),
        _ => None,
    }
}
