use std::path::PathBuf;
use std::str::FromStr;

pub const ENV_CONFIG: &str = "STEWARD_CONFIG";
pub const ENV_INBOX_DIR: &str = "STEWARD_INBOX_DIR";
pub const ENV_INBOX_RETENTION_MS: &str = "STEWARD_INBOX_RETENTION_MS";
pub const ENV_DEDUPE_TTL_MS: &str = "STEWARD_DEDUPE_TTL_MS";
pub const ENV_RATE_LIMIT_PER_MINUTE: &str = "STEWARD_RATE_LIMIT_PER_MINUTE";
pub const ENV_MAX_CONCURRENT_STREAMS: &str = "STEWARD_MAX_CONCURRENT_STREAMS";
pub const ENV_BUDGET_CEILING: &str = "STEWARD_BUDGET_CEILING";
pub const ENV_BUDGET_WINDOW_MS: &str = "STEWARD_BUDGET_WINDOW_MS";

/// Values taken from `STEWARD_*` environment variables.
///
/// Unset, empty, and unparsable variables are all `None`; the last kind is
/// logged so a typo does not silently fall back to defaults.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EnvOverrides {
    pub inbox_dir: Option<PathBuf>,
    pub inbox_retention_ms: Option<u64>,
    pub dedupe_ttl_ms: Option<u64>,
    pub rate_limit_per_minute: Option<u32>,
    pub max_concurrent_streams: Option<u32>,
    pub budget_ceiling: Option<u64>,
    pub budget_window_ms: Option<u64>,
}

impl EnvOverrides {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let text = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            inbox_dir: text(ENV_INBOX_DIR).map(PathBuf::from),
            inbox_retention_ms: parse_var(ENV_INBOX_RETENTION_MS, text(ENV_INBOX_RETENTION_MS)),
            dedupe_ttl_ms: parse_var(ENV_DEDUPE_TTL_MS, text(ENV_DEDUPE_TTL_MS)),
            rate_limit_per_minute: parse_var(
                ENV_RATE_LIMIT_PER_MINUTE,
                text(ENV_RATE_LIMIT_PER_MINUTE),
            ),
            max_concurrent_streams: parse_var(
                ENV_MAX_CONCURRENT_STREAMS,
                text(ENV_MAX_CONCURRENT_STREAMS),
            ),
            budget_ceiling: parse_var(ENV_BUDGET_CEILING, text(ENV_BUDGET_CEILING)),
            budget_window_ms: parse_var(ENV_BUDGET_WINDOW_MS, text(ENV_BUDGET_WINDOW_MS)),
        }
    }
}

fn parse_var<T: FromStr>(name: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(var = name, value = %raw, "Ignoring unparsable environment override");
            None
        }
    }
}
