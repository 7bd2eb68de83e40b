//! Observability: tracing init.
//!
//! Log lines go to stderr so the payload keeps stdout to itself.

use bootlaunch_core::config::ObservabilityConfig;
use tracing_subscriber::{prelude::*, EnvFilter};

/// Initialize tracing. Call once at process startup.
/// `BOOTLAUNCH_QUIET=1` keeps only WARN and above; `RUST_LOG` wins over both.
pub fn init_tracing(cfg: &ObservabilityConfig) {
    let level = if cfg.quiet {
        "bootlaunch=warn".to_string()
    } else {
        cfg.log_level.clone()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let _ = if cfg.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
}
