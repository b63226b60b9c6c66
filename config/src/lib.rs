//! Configuration for Steward.
//!
//! Three layers, later ones winning: built-in defaults, the TOML file at
//! [`config_path`], and `STEWARD_*` environment variables. [`StewardConfig`]
//! and [`EnvOverrides`] keep every field optional; [`ResolvedConfig`] is the
//! concrete form the runtime is built from.

mod env;
mod file;
mod resolved;

pub use env::{
    EnvOverrides, ENV_BUDGET_CEILING, ENV_BUDGET_WINDOW_MS, ENV_CONFIG, ENV_DEDUPE_TTL_MS,
    ENV_INBOX_DIR, ENV_INBOX_RETENTION_MS, ENV_MAX_CONCURRENT_STREAMS, ENV_RATE_LIMIT_PER_MINUTE,
};
pub use file::{ArbiterConfig, ConfigError, GuardsConfig, InboxConfig, StewardConfig, config_path};
pub use resolved::{GuardLimits, RATE_WINDOW, ResolvedConfig, default_inbox_root};
