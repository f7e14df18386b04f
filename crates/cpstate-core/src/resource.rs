//! Unstructured resource model
//!
//! Manifests are kept as loosely typed JSON objects so that any kind found in
//! an exported state can be applied without knowing its schema.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::condition::{Condition, ConditionType};
use crate::error::{ClientError, ClientResult};

/// Metadata fields populated by the server that must not be sent on create
const SERVER_FIELDS: &[&str] = &[
    "resourceVersion",
    "uid",
    "creationTimestamp",
    "generation",
    "managedFields",
    "selfLink",
];

/// Split an `apiVersion` into group and version (`v1` has the empty group)
pub fn split_api_version(api_version: &str) -> (&str, &str) {
    match api_version.split_once('/') {
        Some((group, version)) => (group, version),
        None => ("", api_version),
    }
}

/// Kind identity independent of version
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKind {
    pub group: String,
    pub kind: String,
}

impl GroupKind {
    pub fn new(group: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            kind: kind.into(),
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}.{}", self.kind, self.group)
        }
    }
}

/// Plural resource identity, e.g. `compositions.apiextensions.example.io`
///
/// This is also the name of a resource group directory in an exported state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupResource {
    pub group: String,
    pub resource: String,
}

impl GroupResource {
    pub fn new(group: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            resource: resource.into(),
        }
    }

    /// Parse `<plural>` or `<plural>.<group>`
    pub fn parse(descriptor: &str) -> Self {
        match descriptor.split_once('.') {
            Some((resource, group)) => Self::new(group, resource),
            None => Self::new("", descriptor),
        }
    }
}

impl fmt::Display for GroupResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.resource)
        } else {
            write!(f, "{}.{}", self.resource, self.group)
        }
    }
}

/// How a kind is served by the control plane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindMapping {
    pub group: String,
    pub version: String,
    pub kind: String,
    /// Plural resource name used in URLs
    pub resource: String,
    pub namespaced: bool,
    /// Categories advertised through discovery (e.g. `claim`, `managed`)
    #[serde(default)]
    pub categories: Vec<String>,
}

impl KindMapping {
    pub fn group_kind(&self) -> GroupKind {
        GroupKind::new(&self.group, &self.kind)
    }

    pub fn group_resource(&self) -> GroupResource {
        GroupResource::new(&self.group, &self.resource)
    }

    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }
}

/// Namespace and name of an object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: Option<String>,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: Option<&str>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(str::to_string),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}", ns, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A single manifest: an object with at least `apiVersion`, `kind` and
/// `metadata.name`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Resource {
    object: Value,
}

impl Resource {
    pub fn from_value(object: Value) -> ClientResult<Self> {
        if !object.is_object() {
            return Err(ClientError::InvalidResource(
                "manifest is not an object".to_string(),
            ));
        }
        let resource = Self { object };
        if resource.api_version().is_empty() || resource.kind().is_empty() {
            return Err(ClientError::InvalidResource(
                "manifest has no apiVersion or kind".to_string(),
            ));
        }
        if resource.name().is_empty() {
            return Err(ClientError::InvalidResource(format!(
                "{} manifest has no metadata.name",
                resource.kind()
            )));
        }
        Ok(resource)
    }

    /// Parse a YAML (or JSON) manifest
    pub fn from_yaml_slice(bytes: &[u8]) -> ClientResult<Self> {
        let object: Value = serde_yaml::from_slice(bytes)
            .map_err(|e| ClientError::InvalidResource(format!("cannot parse manifest: {}", e)))?;
        Self::from_value(object)
    }

    pub fn as_value(&self) -> &Value {
        &self.object
    }

    pub fn into_value(self) -> Value {
        self.object
    }

    fn str_at(&self, pointer: &str) -> &str {
        self.object
            .pointer(pointer)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    pub fn api_version(&self) -> &str {
        self.str_at("/apiVersion")
    }

    pub fn kind(&self) -> &str {
        self.str_at("/kind")
    }

    pub fn name(&self) -> &str {
        self.str_at("/metadata/name")
    }

    pub fn namespace(&self) -> Option<&str> {
        Some(self.str_at("/metadata/namespace")).filter(|ns| !ns.is_empty())
    }

    pub fn group_kind(&self) -> GroupKind {
        let (group, _) = split_api_version(self.api_version());
        GroupKind::new(group, self.kind())
    }

    /// Version part of `apiVersion`
    pub fn version(&self) -> &str {
        split_api_version(self.api_version()).1
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace(), self.name())
    }

    /// Fill in `apiVersion` and `kind` when missing (list items omit them)
    pub fn with_type_meta(mut object: Value, api_version: &str, kind: &str) -> ClientResult<Self> {
        if let Some(map) = object.as_object_mut() {
            map.entry("apiVersion")
                .or_insert_with(|| Value::String(api_version.to_string()));
            map.entry("kind")
                .or_insert_with(|| Value::String(kind.to_string()));
        }
        Self::from_value(object)
    }

    fn metadata_mut(&mut self) -> Option<&mut Map<String, Value>> {
        self.object
            .get_mut("metadata")
            .and_then(Value::as_object_mut)
    }

    pub fn annotations(&self) -> BTreeMap<String, String> {
        self.object
            .get("metadata")
            .and_then(|m| m.get("annotations"))
            .and_then(Value::as_object)
            .map(|annotations| {
                annotations
                    .iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.object
            .get("metadata")
            .and_then(|m| m.get("annotations"))
            .and_then(|a| a.get(key))
            .and_then(Value::as_str)
    }

    pub fn set_annotation(&mut self, key: impl Into<String>, value: impl Into<String>) {
        if let Some(metadata) = self.metadata_mut() {
            let annotations = metadata
                .entry("annotations")
                .or_insert_with(|| Value::Object(Map::new()));
            if !annotations.is_object() {
                *annotations = Value::Object(Map::new());
            }
            if let Some(annotations) = annotations.as_object_mut() {
                annotations.insert(key.into(), Value::String(value.into()));
            }
        }
    }

    /// Returns whether the annotation was present
    pub fn remove_annotation(&mut self, key: &str) -> bool {
        self.metadata_mut()
            .and_then(|m| m.get_mut("annotations"))
            .and_then(Value::as_object_mut)
            .map(|annotations| annotations.remove(key).is_some())
            .unwrap_or(false)
    }

    /// Decode `status.conditions`; a missing status yields no conditions
    pub fn conditions(&self) -> Result<Vec<Condition>, serde_json::Error> {
        match self.object.pointer("/status/conditions") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(conditions) => serde_json::from_value(conditions.clone()),
        }
    }

    /// Set (or replace) a status condition
    pub fn set_condition(&mut self, condition: Condition) -> ClientResult<()> {
        let value = serde_json::to_value(&condition)?;
        let Some(root) = self.object.as_object_mut() else {
            return Ok(());
        };
        let status = root
            .entry("status")
            .or_insert_with(|| Value::Object(Map::new()));
        if !status.is_object() {
            *status = Value::Object(Map::new());
        }
        let Some(status) = status.as_object_mut() else {
            return Ok(());
        };
        let conditions = status
            .entry("conditions")
            .or_insert_with(|| Value::Array(Vec::new()));
        if !conditions.is_array() {
            *conditions = Value::Array(Vec::new());
        }
        if let Some(conditions) = conditions.as_array_mut() {
            conditions.retain(|c| {
                c.get("type").and_then(Value::as_str) != Some(condition.condition_type.as_str())
            });
            conditions.push(value);
        }
        Ok(())
    }

    /// Whether every requested condition is `True`
    pub fn satisfies(&self, required: &[ConditionType]) -> Result<bool, serde_json::Error> {
        let conditions = self.conditions()?;
        Ok(required.iter().all(|wanted| {
            conditions
                .iter()
                .any(|c| c.condition_type == wanted.as_str() && c.is_true())
        }))
    }

    /// Drop metadata the server owns so the object can be created elsewhere
    pub fn strip_server_fields(&mut self) {
        if let Some(metadata) = self.metadata_mut() {
            for field in SERVER_FIELDS {
                metadata.remove(*field);
            }
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.group_kind(), self.key())
    }
}
