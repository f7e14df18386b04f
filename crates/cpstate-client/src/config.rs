//! Connection settings for a control plane API server

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SERVER: &str = "https://127.0.0.1:6443";
pub const DEFAULT_ENGINE_NAMESPACE: &str = "example-system";
pub const DEFAULT_ENGINE_DEPLOYMENT: &str = "engine";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterConfig {
    /// API server base URL
    pub server: String,
    /// Bearer token sent with every request
    pub token: Option<String>,
    /// PEM bundle trusted in addition to the system roots
    pub certificate_authority: Option<PathBuf>,
    pub insecure_skip_tls_verify: bool,
    /// Namespace of the engine deployment inspected by preflight checks
    pub engine_namespace: String,
    pub engine_deployment: String,
    pub request_timeout_secs: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            token: None,
            certificate_authority: None,
            insecure_skip_tls_verify: false,
            engine_namespace: DEFAULT_ENGINE_NAMESPACE.to_string(),
            engine_deployment: DEFAULT_ENGINE_DEPLOYMENT.to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl ClusterConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
