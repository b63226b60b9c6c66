//! Shared test utilities and fixtures

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use steward_config::{EnvOverrides, StewardConfig};
use steward_core::{ManualClock, ResolvedConfig, Steward};
use tempfile::TempDir;

pub const T0: u64 = 1_700_000_000_000;

/// A steward on a hand-driven clock with its inbox in a private temp dir.
pub struct Harness {
    pub steward: Steward,
    pub clock: Arc<ManualClock>,
    pub dir: TempDir,
}

pub fn harness() -> Harness {
    harness_with(|_| {})
}

pub fn harness_with(tweak: impl FnOnce(&mut EnvOverrides)) -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let clock = Arc::new(ManualClock::new(T0));
    let steward = Steward::with_clock(config_in(dir.path(), tweak), Arc::<ManualClock>::clone(&clock));
    Harness {
        steward,
        clock,
        dir,
    }
}

/// Resolve config the way the binary does, with the inbox rooted at `root`.
pub fn config_in(root: &Path, tweak: impl FnOnce(&mut EnvOverrides)) -> ResolvedConfig {
    let mut env = EnvOverrides {
        inbox_dir: Some(root.to_path_buf()),
        ..EnvOverrides::default()
    };
    tweak(&mut env);
    ResolvedConfig::from_config(&StewardConfig::default(), &env)
}
