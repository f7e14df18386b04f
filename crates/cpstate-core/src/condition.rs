//! Status conditions reported by live resources

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Name of a status condition (e.g. `Established`, `Healthy`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConditionType(Cow<'static, str>);

impl ConditionType {
    pub const ESTABLISHED: ConditionType = ConditionType(Cow::Borrowed("Established"));
    pub const INSTALLED: ConditionType = ConditionType(Cow::Borrowed("Installed"));
    pub const HEALTHY: ConditionType = ConditionType(Cow::Borrowed("Healthy"));

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single entry of `status.conditions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,
    /// `True`, `False` or `Unknown`
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

impl Condition {
    pub fn new(condition_type: &ConditionType, status: bool) -> Self {
        Self {
            condition_type: condition_type.to_string(),
            status: if status { "True" } else { "False" }.to_string(),
            reason: None,
            message: None,
            last_transition_time: None,
        }
    }

    pub fn is_true(&self) -> bool {
        self.status == "True"
    }
}
