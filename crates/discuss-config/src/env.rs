//! Environment variable overrides.

use crate::schema::DiscussConfig;
use tracing::debug;

/// Overrides `realtime.base_url`.
pub const WS_URL_VAR: &str = "DISCUSS_WS_URL";

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: &mut DiscussConfig) {
    apply_overrides_with(config, |key| std::env::var(key).ok());
}

/// Apply overrides using an arbitrary lookup, so tests need not touch the
/// process environment.
pub fn apply_overrides_with<F>(config: &mut DiscussConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(WS_URL_VAR).filter(|v| !v.trim().is_empty()) {
        debug!(var = WS_URL_VAR, "overriding realtime.base_url from environment");
        config.realtime.base_url = url.trim().to_string();
    }
}
