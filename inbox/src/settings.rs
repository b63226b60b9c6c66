use std::path::PathBuf;
use std::time::Duration;

/// Records older than this read as absent.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);
/// Shortest retention accepted; shorter values are raised to it.
pub const MIN_RETENTION: Duration = Duration::from_secs(60);
/// Sweeps run at most this often, however busy the inbox is.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Subdirectory of the inbox root holding acknowledgements.
pub const ACK_DIR: &str = "acks";
/// Subdirectory of the inbox root holding screenshot payloads.
pub const SCREENSHOT_DIR: &str = "screenshots";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxSettings {
    pub root: PathBuf,
    retention: Duration,
    pub sweep_interval: Duration,
}

impl InboxSettings {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            retention: DEFAULT_RETENTION,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention.max(MIN_RETENTION);
        self
    }

    #[must_use]
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Same retention and sweep cadence, rooted at `root/<name>`.
    #[must_use]
    pub fn nested(&self, name: &str) -> Self {
        Self {
            root: self.root.join(name),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn retention(&self) -> Duration {
        self.retention
    }
}
