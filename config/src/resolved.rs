//! Concrete configuration: every knob has a value and every limit is usable.

use std::path::PathBuf;
use std::time::Duration;

use steward_inbox::InboxSettings;

use crate::env::EnvOverrides;
use crate::file::{ConfigError, StewardConfig};

const DEFAULT_DEDUPE_TTL_MS: u64 = 30_000;
const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 60;
const DEFAULT_MAX_CONCURRENT_STREAMS: u32 = 4;
const DEFAULT_BUDGET_CEILING: u64 = 200_000;
const DEFAULT_BUDGET_WINDOW_MS: u64 = 60 * 60 * 1_000;
const DEFAULT_INBOX_RETENTION_MS: u64 = 24 * 60 * 60 * 1_000;
const DEFAULT_SWEEP_INTERVAL_MS: u64 = 60_000;

/// Window for the per-minute request limit.
pub const RATE_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardLimits {
    pub rate_limit_per_minute: u32,
    pub rate_window: Duration,
    pub max_concurrent_streams: u32,
    pub budget_ceiling: u64,
    pub budget_window: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub dedupe_ttl: Duration,
    pub guards: GuardLimits,
    pub inbox: InboxSettings,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self::from_config(&StewardConfig::default(), &EnvOverrides::default())
    }
}

impl ResolvedConfig {
    /// Merge file values and environment overrides over the defaults.
    #[must_use]
    pub fn from_config(config: &StewardConfig, env: &EnvOverrides) -> Self {
        let arbiter = config.arbiter.as_ref();
        let guards = config.guards.as_ref();
        let inbox = config.inbox.as_ref();

        let dedupe_ttl_ms = env
            .dedupe_ttl_ms
            .or_else(|| arbiter.and_then(|a| a.dedupe_ttl_ms))
            .unwrap_or(DEFAULT_DEDUPE_TTL_MS);

        let limits = GuardLimits {
            rate_limit_per_minute: env
                .rate_limit_per_minute
                .or_else(|| guards.and_then(|g| g.rate_limit_per_minute))
                .unwrap_or(DEFAULT_RATE_LIMIT_PER_MINUTE)
                .max(1),
            rate_window: RATE_WINDOW,
            max_concurrent_streams: env
                .max_concurrent_streams
                .or_else(|| guards.and_then(|g| g.max_concurrent_streams))
                .unwrap_or(DEFAULT_MAX_CONCURRENT_STREAMS)
                .max(1),
            budget_ceiling: env
                .budget_ceiling
                .or_else(|| guards.and_then(|g| g.budget_ceiling))
                .unwrap_or(DEFAULT_BUDGET_CEILING)
                .max(1),
            budget_window: Duration::from_millis(
                env.budget_window_ms
                    .or_else(|| guards.and_then(|g| g.budget_window_ms))
                    .unwrap_or(DEFAULT_BUDGET_WINDOW_MS)
                    .max(1),
            ),
        };

        let root = env
            .inbox_dir
            .clone()
            .or_else(|| inbox.and_then(|i| i.dir.clone()))
            .unwrap_or_else(default_inbox_root);
        let retention_ms = env
            .inbox_retention_ms
            .or_else(|| inbox.and_then(|i| i.retention_ms))
            .unwrap_or(DEFAULT_INBOX_RETENTION_MS);
        let sweep_interval_ms = inbox
            .and_then(|i| i.sweep_interval_ms)
            .unwrap_or(DEFAULT_SWEEP_INTERVAL_MS);

        Self {
            dedupe_ttl: Duration::from_millis(dedupe_ttl_ms),
            guards: limits,
            inbox: InboxSettings::new(root)
                .with_retention(Duration::from_millis(retention_ms))
                .with_sweep_interval(Duration::from_millis(sweep_interval_ms)),
        }
    }

    /// Read the config file and environment and resolve them.
    pub fn load() -> Result<Self, ConfigError> {
        let file = StewardConfig::load()?.unwrap_or_default();
        Ok(Self::from_config(&file, &EnvOverrides::from_env()))
    }
}

/// `<cache dir>/steward/inbox`, or `<temp dir>/steward-inbox` without one.
#[must_use]
pub fn default_inbox_root() -> PathBuf {
    dirs::cache_dir().map_or_else(
        || std::env::temp_dir().join("steward-inbox"),
        |cache| cache.join("steward").join("inbox"),
    )
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use steward_inbox::MIN_RETENTION;

    use super::{ResolvedConfig, default_inbox_root};
    use crate::env::EnvOverrides;
    use crate::file::{ArbiterConfig, GuardsConfig, InboxConfig, StewardConfig};

    #[test]
    fn defaults() {
        let resolved = ResolvedConfig::default();
        assert_eq!(resolved.dedupe_ttl, Duration::from_secs(30));
        assert_eq!(resolved.guards.rate_limit_per_minute, 60);
        assert_eq!(resolved.guards.rate_window, Duration::from_secs(60));
        assert_eq!(resolved.guards.max_concurrent_streams, 4);
        assert_eq!(resolved.guards.budget_ceiling, 200_000);
        assert_eq!(resolved.guards.budget_window, Duration::from_secs(3_600));
        assert_eq!(resolved.inbox.retention(), Duration::from_secs(86_400));
        assert_eq!(resolved.inbox.sweep_interval, Duration::from_secs(60));
        assert_eq!(resolved.inbox.root, default_inbox_root());
    }

    #[test]
    fn file_values_apply() {
        let file = StewardConfig {
            arbiter: Some(ArbiterConfig {
                dedupe_ttl_ms: Some(1_000),
            }),
            guards: Some(GuardsConfig {
                rate_limit_per_minute: Some(10),
                ..GuardsConfig::default()
            }),
            inbox: Some(InboxConfig {
                dir: Some(PathBuf::from("/data/inbox")),
                ..InboxConfig::default()
            }),
        };
        let resolved = ResolvedConfig::from_config(&file, &EnvOverrides::default());
        assert_eq!(resolved.dedupe_ttl, Duration::from_secs(1));
        assert_eq!(resolved.guards.rate_limit_per_minute, 10);
        assert_eq!(resolved.guards.max_concurrent_streams, 4);
        assert_eq!(resolved.inbox.root, PathBuf::from("/data/inbox"));
    }

    #[test]
    fn env_beats_file() {
        let file = StewardConfig {
            guards: Some(GuardsConfig {
                max_concurrent_streams: Some(2),
                budget_ceiling: Some(10),
                ..GuardsConfig::default()
            }),
            ..StewardConfig::default()
        };
        let env = EnvOverrides {
            max_concurrent_streams: Some(16),
            inbox_dir: Some(PathBuf::from("/env/inbox")),
            ..EnvOverrides::default()
        };
        let resolved = ResolvedConfig::from_config(&file, &env);
        assert_eq!(resolved.guards.max_concurrent_streams, 16);
        assert_eq!(resolved.guards.budget_ceiling, 10);
        assert_eq!(resolved.inbox.root, PathBuf::from("/env/inbox"));
    }

    #[test]
    fn zero_limits_clamp_to_one() {
        let env = EnvOverrides {
            rate_limit_per_minute: Some(0),
            max_concurrent_streams: Some(0),
            budget_ceiling: Some(0),
            budget_window_ms: Some(0),
            ..EnvOverrides::default()
        };
        let resolved = ResolvedConfig::from_config(&StewardConfig::default(), &env);
        assert_eq!(resolved.guards.rate_limit_per_minute, 1);
        assert_eq!(resolved.guards.max_concurrent_streams, 1);
        assert_eq!(resolved.guards.budget_ceiling, 1);
        assert_eq!(resolved.guards.budget_window, Duration::from_millis(1));
    }

    #[test]
    fn short_retention_is_floored() {
        let env = EnvOverrides {
            inbox_retention_ms: Some(500),
            ..EnvOverrides::default()
        };
        let resolved = ResolvedConfig::from_config(&StewardConfig::default(), &env);
        assert_eq!(resolved.inbox.retention(), MIN_RETENTION);
    }
}
