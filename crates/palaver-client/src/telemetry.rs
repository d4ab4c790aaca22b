//! Log subscriber setup for applications embedding the client.

use palaver_common::config::LogConfig;
use tracing_subscriber::EnvFilter;

/// Install the global `fmt` subscriber.
///
/// `RUST_LOG` wins; otherwise the configured filter applies. Returns `false`
/// if a subscriber was already installed.
pub fn init(cfg: &LogConfig) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(filter(cfg))
        .with_target(true)
        .with_thread_ids(true)
        .try_init()
        .is_ok()
}

/// Same as [`init`] with JSON lines instead of human-readable output.
pub fn init_json(cfg: &LogConfig) -> bool {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter(cfg))
        .try_init()
        .is_ok()
}

fn filter(cfg: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.filter))
}
