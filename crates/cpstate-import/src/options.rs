//! Run configuration for an import

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Archive read when no input is given
pub const DEFAULT_INPUT_ARCHIVE: &str = "xp-state.tar.gz";

/// Options for an import run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportOptions {
    /// Path to the exported state archive
    pub input_archive: PathBuf,
    /// Unpause managed resources at the end of the run (activates the control plane)
    pub unpause_after_import: bool,
    /// Also wait for package revisions to become healthy.
    /// Needed for targets whose packages report ready before their revisions.
    pub legacy_revision_wait: bool,
    pub wait: WaitSettings,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            input_archive: PathBuf::from(DEFAULT_INPUT_ARCHIVE),
            unpause_after_import: false,
            legacy_revision_wait: true,
            wait: WaitSettings::default(),
        }
    }
}

/// Polling behavior of condition waits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WaitSettings {
    pub poll_interval_secs: u64,
    pub timeout_secs: u64,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            timeout_secs: 10 * 60,
        }
    }
}

impl WaitSettings {
    pub fn poll_interval(&self) -> Duration {
        // A zero period would make tokio's interval panic
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
