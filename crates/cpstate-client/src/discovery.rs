//! Discovery documents served under `/api` and `/apis`

use cpstate_core::KindMapping;
use serde::Deserialize;

/// `APIResourceList` for one group version
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResourceList {
    pub group_version: String,
    #[serde(default)]
    pub resources: Vec<ApiResource>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResource {
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub namespaced: bool,
    #[serde(default)]
    pub categories: Vec<String>,
}

/// `APIGroupList` served at `/apis`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGroupList {
    #[serde(default)]
    pub groups: Vec<ApiGroup>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGroup {
    pub name: String,
    #[serde(default)]
    pub versions: Vec<GroupVersionForDiscovery>,
    pub preferred_version: Option<GroupVersionForDiscovery>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupVersionForDiscovery {
    pub group_version: String,
    pub version: String,
}

impl ApiGroup {
    /// Preferred group version, falling back to the first one listed
    pub fn preferred_group_version(&self) -> Option<&str> {
        self.preferred_version
            .as_ref()
            .or_else(|| self.versions.first())
            .map(|v| v.group_version.as_str())
    }

    /// Every served group version, preferred first
    pub fn group_versions(&self) -> Vec<&str> {
        let mut versions: Vec<&str> = self.preferred_group_version().into_iter().collect();
        for version in &self.versions {
            if !versions.contains(&version.group_version.as_str()) {
                versions.push(&version.group_version);
            }
        }
        versions
    }
}

impl ApiResourceList {
    /// Kind mappings for the top-level resources; subresources such as
    /// `deployments/status` are skipped
    pub fn mappings(&self) -> Vec<KindMapping> {
        let (group, version) = match self.group_version.split_once('/') {
            Some((group, version)) => (group, version),
            None => ("", self.group_version.as_str()),
        };

        self.resources
            .iter()
            .filter(|r| !r.name.contains('/'))
            .map(|r| KindMapping {
                group: group.to_string(),
                version: version.to_string(),
                kind: r.kind.clone(),
                resource: r.name.clone(),
                namespaced: r.namespaced,
                categories: r.categories.clone(),
            })
            .collect()
    }
}
