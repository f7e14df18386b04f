//! In-memory control plane for tests
//!
//! Records every call it receives so tests can assert on ordering, and can be
//! told to fail list/create calls or to mark objects ready as they are created.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::category::Category;
use crate::condition::{Condition, ConditionType};
use crate::error::{ClientError, ClientResult};
use crate::export::EngineInfo;
use crate::live::{CategoryResolver, EnvironmentInspector, KindMapper, ResourceClient};
use crate::resource::{GroupKind, KindMapping, ObjectKey, Resource};

/// A call received by the in-memory control plane
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List(GroupKind),
    Create(GroupKind, ObjectKey),
    Update(GroupKind, ObjectKey),
    Resolve(String),
    Reset,
    Observe,
}

#[derive(Default)]
struct State {
    kinds: Vec<KindMapping>,
    objects: BTreeMap<GroupKind, BTreeMap<ObjectKey, Resource>>,
    calls: Vec<Call>,
    engine: EngineInfo,
    list_failures: HashMap<GroupKind, usize>,
    create_failures: HashSet<(GroupKind, String)>,
    ready_on_create: HashMap<GroupKind, Vec<ConditionType>>,
    hidden_until_reset: HashSet<GroupKind>,
    observe_failure: Option<String>,
}

/// Control plane that keeps every object in memory
#[derive(Default)]
pub struct MemoryControlPlane {
    state: Mutex<State>,
}

impl MemoryControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a served kind
    pub fn with_kind(
        self,
        group: &str,
        version: &str,
        kind: &str,
        resource: &str,
        namespaced: bool,
        categories: &[&str],
    ) -> Self {
        self.state().kinds.push(KindMapping {
            group: group.to_string(),
            version: version.to_string(),
            kind: kind.to_string(),
            resource: resource.to_string(),
            namespaced,
            categories: categories.iter().map(|c| c.to_string()).collect(),
        });
        self
    }

    pub fn with_engine(self, version: &str, feature_flags: &[&str]) -> Self {
        self.state().engine = EngineInfo {
            version: version.to_string(),
            feature_flags: feature_flags.iter().map(|f| f.to_string()).collect(),
        };
        self
    }

    /// Objects of this kind get these conditions set to `True` when created
    pub fn ready_on_create(self, kind: GroupKind, conditions: &[ConditionType]) -> Self {
        self.state()
            .ready_on_create
            .insert(kind, conditions.to_vec());
        self
    }

    /// Kind is not resolvable until the mapper is reset
    pub fn hidden_until_reset(self, kind: GroupKind) -> Self {
        self.state().hidden_until_reset.insert(kind);
        self
    }

    pub fn insert(&self, resource: Resource) {
        self.state()
            .objects
            .entry(resource.group_kind())
            .or_default()
            .insert(resource.key(), resource);
    }

    /// The next `times` list calls for `kind` fail
    pub fn fail_lists(&self, kind: GroupKind, times: usize) {
        self.state().list_failures.insert(kind, times);
    }

    /// Creating the named object of `kind` fails
    pub fn fail_create(&self, kind: GroupKind, name: &str) {
        self.state()
            .create_failures
            .insert((kind, name.to_string()));
    }

    pub fn fail_observe(&self, message: &str) {
        self.state().observe_failure = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn get(&self, kind: &GroupKind, key: &ObjectKey) -> Option<Resource> {
        self.state()
            .objects
            .get(kind)
            .and_then(|objects| objects.get(key))
            .cloned()
    }

    pub fn objects(&self, kind: &GroupKind) -> Vec<Resource> {
        self.state()
            .objects
            .get(kind)
            .map(|objects| objects.values().cloned().collect())
            .unwrap_or_default()
    }

    fn no_mapping(kind: &GroupKind) -> ClientError {
        ClientError::NoMapping(kind.to_string())
    }
}

#[async_trait]
impl ResourceClient for MemoryControlPlane {
    async fn list(&self, mapping: &KindMapping) -> ClientResult<Vec<Resource>> {
        let kind = mapping.group_kind();
        let mut state = self.state();
        state.calls.push(Call::List(kind.clone()));

        if let Some(remaining) = state.list_failures.get_mut(&kind) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ClientError::Transport(format!(
                    "simulated list failure for {}",
                    kind
                )));
            }
        }

        Ok(state
            .objects
            .get(&kind)
            .map(|objects| objects.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn create(&self, mapping: &KindMapping, resource: &Resource) -> ClientResult<Resource> {
        let kind = mapping.group_kind();
        let key = resource.key();
        let mut state = self.state();
        state.calls.push(Call::Create(kind.clone(), key.clone()));

        if !state.kinds.iter().any(|k| k.group_kind() == kind) {
            return Err(Self::no_mapping(&kind));
        }
        if state
            .create_failures
            .contains(&(kind.clone(), key.name.clone()))
        {
            return Err(ClientError::Api {
                status: 422,
                message: format!("simulated create failure for {}", key),
            });
        }
        if state
            .objects
            .get(&kind)
            .is_some_and(|objects| objects.contains_key(&key))
        {
            return Err(ClientError::AlreadyExists {
                kind: kind.to_string(),
                name: key.to_string(),
            });
        }

        let mut stored = resource.clone();
        if let Some(conditions) = state.ready_on_create.get(&kind) {
            for condition in conditions {
                stored.set_condition(Condition::new(condition, true))?;
            }
        }
        state
            .objects
            .entry(kind)
            .or_default()
            .insert(key, stored.clone());
        Ok(stored)
    }

    async fn update(&self, mapping: &KindMapping, resource: &Resource) -> ClientResult<Resource> {
        let kind = mapping.group_kind();
        let key = resource.key();
        let mut state = self.state();
        state.calls.push(Call::Update(kind.clone(), key.clone()));

        let objects = state.objects.entry(kind.clone()).or_default();
        match objects.get_mut(&key) {
            Some(existing) => {
                *existing = resource.clone();
                Ok(resource.clone())
            }
            None => Err(ClientError::NotFound {
                kind: kind.to_string(),
                name: key.to_string(),
            }),
        }
    }
}

#[async_trait]
impl KindMapper for MemoryControlPlane {
    async fn mapping_for_kind(&self, kind: &GroupKind) -> ClientResult<KindMapping> {
        let state = self.state();
        if state.hidden_until_reset.contains(kind) {
            return Err(Self::no_mapping(kind));
        }
        state
            .kinds
            .iter()
            .find(|k| &k.group_kind() == kind)
            .cloned()
            .ok_or_else(|| Self::no_mapping(kind))
    }

    async fn mapping_for_version(
        &self,
        kind: &GroupKind,
        version: &str,
    ) -> ClientResult<KindMapping> {
        let state = self.state();
        if state.hidden_until_reset.contains(kind) {
            return Err(Self::no_mapping(kind));
        }
        state
            .kinds
            .iter()
            .find(|k| &k.group_kind() == kind && k.version == version)
            .cloned()
            .ok_or_else(|| ClientError::NoMapping(format!("{} in version {}", kind, version)))
    }

    async fn reset(&self) {
        let mut state = self.state();
        state.calls.push(Call::Reset);
        state.hidden_until_reset.clear();
    }
}

#[async_trait]
impl CategoryResolver for MemoryControlPlane {
    async fn resolve(&self, category: Category) -> ClientResult<Vec<KindMapping>> {
        let mut state = self.state();
        state.calls.push(Call::Resolve(category.to_string()));
        Ok(state
            .kinds
            .iter()
            .filter(|k| k.has_category(category.as_str()))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl EnvironmentInspector for MemoryControlPlane {
    async fn observe(&self) -> ClientResult<EngineInfo> {
        let mut state = self.state();
        state.calls.push(Call::Observe);
        match &state.observe_failure {
            Some(message) => Err(ClientError::Transport(message.clone())),
            None => Ok(state.engine.clone()),
        }
    }
}
