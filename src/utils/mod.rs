//! Shared utilities: configuration, tracing setup, date helper.

/// TOML configuration with per-section serde defaults.
pub mod config;

pub use config::DelverConfig;

use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber with env-filter support.
///
/// Honors `RUST_LOG`; falls back to `info`. Safe to call once from an
/// embedding application; returns quietly if a subscriber is already set.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Current date in the human-readable form used inside prompts.
pub fn today_str() -> String {
    chrono::Utc::now().format("%a %b %-d, %Y").to_string()
}
