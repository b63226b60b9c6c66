use std::path::{Path, PathBuf};
use std::{env, fs, io};

use serde::Deserialize;
use thiserror::Error;

use crate::env::ENV_CONFIG;

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct StewardConfig {
    pub arbiter: Option<ArbiterConfig>,
    pub guards: Option<GuardsConfig>,
    pub inbox: Option<InboxConfig>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct ArbiterConfig {
    /// How long a completed idempotency key suppresses repeats.
    pub dedupe_ttl_ms: Option<u64>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct GuardsConfig {
    pub rate_limit_per_minute: Option<u32>,
    pub max_concurrent_streams: Option<u32>,
    pub budget_ceiling: Option<u64>,
    pub budget_window_ms: Option<u64>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct InboxConfig {
    pub dir: Option<PathBuf>,
    pub retention_ms: Option<u64>,
    pub sweep_interval_ms: Option<u64>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

impl StewardConfig {
    /// Load the config file, if there is one.
    ///
    /// A missing file is `Ok(None)`; an unreadable or malformed one is an error.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                tracing::warn!("Failed to read config at {}: {err}", path.display());
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {}: {err}", path.display());
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }
}

/// `$STEWARD_CONFIG` if set, else `~/.steward/config.toml`.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    if let Some(explicit) = env::var_os(ENV_CONFIG).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(explicit));
    }
    dirs::home_dir().map(|home| home.join(".steward").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{ConfigError, StewardConfig, config_path};
    use crate::env::ENV_CONFIG;

    #[test]
    fn parses_all_sections() {
        let config: StewardConfig = toml::from_str(
            r#"
            [arbiter]
            dedupe_ttl_ms = 5000

            [guards]
            rate_limit_per_minute = 120
            max_concurrent_streams = 8
            budget_ceiling = 50000
            budget_window_ms = 600000

            [inbox]
            dir = "/var/lib/steward/inbox"
            retention_ms = 3600000
            "#,
        )
        .unwrap();

        assert_eq!(config.arbiter.unwrap().dedupe_ttl_ms, Some(5_000));
        let guards = config.guards.unwrap();
        assert_eq!(guards.rate_limit_per_minute, Some(120));
        assert_eq!(guards.max_concurrent_streams, Some(8));
        assert_eq!(guards.budget_ceiling, Some(50_000));
        assert_eq!(guards.budget_window_ms, Some(600_000));
        let inbox = config.inbox.unwrap();
        assert_eq!(inbox.dir.unwrap().to_str(), Some("/var/lib/steward/inbox"));
        assert_eq!(inbox.retention_ms, Some(3_600_000));
        assert_eq!(inbox.sweep_interval_ms, None);
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let config: StewardConfig = toml::from_str("").unwrap();
        assert_eq!(config, StewardConfig::default());
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = StewardConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[guards\nrate_limit_per_minute = ").unwrap();

        let err = StewardConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert_eq!(err.path(), path);
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn wrong_type_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[guards]\nrate_limit_per_minute = \"lots\"\n").unwrap();
        assert!(matches!(
            StewardConfig::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn explicit_config_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alt.toml");
        fs::write(&path, "[arbiter]\ndedupe_ttl_ms = 1\n").unwrap();

        unsafe {
            std::env::set_var(ENV_CONFIG, &path);
        }
        let resolved_path = config_path();
        let loaded = StewardConfig::load();
        unsafe {
            std::env::remove_var(ENV_CONFIG);
        }

        assert_eq!(resolved_path.as_deref(), Some(path.as_path()));
        let loaded = loaded.unwrap().unwrap();
        assert_eq!(loaded.arbiter.unwrap().dedupe_ttl_ms, Some(1));
    }
}
