//! Export metadata record stored at the root of an exported state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// File name of the metadata record in the archive root
pub const EXPORT_META_FILE: &str = "export.yaml";

/// Description of the environment a state was exported from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportMeta {
    /// Format version of the export
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<DateTime<Utc>>,
    /// Engine version running in the source control plane
    pub engine_version: String,
    /// Feature flags enabled in the source control plane
    #[serde(default)]
    pub feature_flags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution: Option<String>,
    /// Namespace the engine was installed in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub options: ExportOptions,
    #[serde(default)]
    pub stats: ExportStats,
}

impl ExportMeta {
    pub fn from_yaml_slice(bytes: &[u8]) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_slice(bytes)
    }
}

/// Filters the export was run with
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptions {
    #[serde(default)]
    pub included_namespaces: Vec<String>,
    #[serde(default)]
    pub excluded_namespaces: Vec<String>,
    #[serde(default)]
    pub included_resources: Vec<String>,
    #[serde(default)]
    pub excluded_resources: Vec<String>,
    #[serde(default)]
    pub paused_before_export: bool,
}

/// Resource counts recorded by the exporter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportStats {
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub native_resources: BTreeMap<String, usize>,
    #[serde(default)]
    pub custom_resources: BTreeMap<String, usize>,
}

/// Engine information observed on a live control plane
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineInfo {
    pub version: String,
    #[serde(default)]
    pub feature_flags: Vec<String>,
}

impl EngineInfo {
    pub fn has_feature_flag(&self, flag: &str) -> bool {
        self.feature_flags.iter().any(|f| f == flag)
    }
}
