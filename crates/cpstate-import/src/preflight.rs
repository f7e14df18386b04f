//! Compatibility checks between an exported state and the target control plane

use cpstate_core::{ClientError, EngineInfo, ExportMeta};
use thiserror::Error;

use crate::error::ImportError;

/// A reason the target may not accept the exported state
#[derive(Error, Debug)]
pub enum PreflightIssue {
    #[error("Failed to get control plane information: {0}")]
    EngineInfo(#[source] ClientError),

    #[error("Failed to unarchive exported state: {0}")]
    Unarchive(#[source] ImportError),

    #[error("Failed to read export metadata: {0}")]
    Metadata(#[source] ImportError),

    #[error("Engine version {observed:?} does not match exported version {exported:?}")]
    VersionMismatch { observed: String, exported: String },

    #[error("Preflight checks cancelled")]
    Cancelled,

    #[error("Feature flag {0:?} was set in the exported control plane but is not set in the target control plane for import.")]
    MissingFeatureFlag(String),
}

/// Compare export metadata with what the target reports.
///
/// Versions must match exactly; every feature flag enabled at export time
/// must be enabled on the target too.
pub fn check_compatibility(exported: &ExportMeta, observed: &EngineInfo) -> Vec<PreflightIssue> {
    let mut issues = Vec::new();

    if observed.version != exported.engine_version {
        issues.push(PreflightIssue::VersionMismatch {
            observed: observed.version.clone(),
            exported: exported.engine_version.clone(),
        });
    }

    issues.extend(
        exported
            .feature_flags
            .iter()
            .filter(|flag| !observed.has_feature_flag(flag))
            .map(|flag| PreflightIssue::MissingFeatureFlag(flag.clone())),
    );

    issues
}
