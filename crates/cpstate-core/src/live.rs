//! Live control plane boundary
//!
//! The importer only talks to a control plane through these traits. The HTTP
//! implementation lives in `cpstate-client`; tests use the in-memory one.

use async_trait::async_trait;
use std::sync::Arc;

use crate::category::Category;
use crate::error::ClientResult;
use crate::export::EngineInfo;
use crate::resource::{GroupKind, KindMapping, Resource};

/// Create/update capable store of resources addressed by kind, namespace and name
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// List every object of a kind across all namespaces
    async fn list(&self, mapping: &KindMapping) -> ClientResult<Vec<Resource>>;

    /// Create an object; fails with `AlreadyExists` if it is already present
    async fn create(&self, mapping: &KindMapping, resource: &Resource) -> ClientResult<Resource>;

    /// Replace an existing object
    async fn update(&self, mapping: &KindMapping, resource: &Resource) -> ClientResult<Resource>;
}

/// Resolves kinds to their served resource and forgets cached answers on demand
#[async_trait]
pub trait KindMapper: Send + Sync {
    /// Mapping of a kind at its preferred served version
    async fn mapping_for_kind(&self, kind: &GroupKind) -> ClientResult<KindMapping>;

    /// Mapping of a kind at one specific version, as named by a manifest
    async fn mapping_for_version(&self, kind: &GroupKind, version: &str)
        -> ClientResult<KindMapping>;

    /// Drop cached mappings so newly installed kinds become resolvable
    async fn reset(&self);
}

/// Resolves a category to the kinds currently registered in it
#[async_trait]
pub trait CategoryResolver: Send + Sync {
    async fn resolve(&self, category: Category) -> ClientResult<Vec<KindMapping>>;
}

/// Reads engine version and feature flags from the target control plane
#[async_trait]
pub trait EnvironmentInspector: Send + Sync {
    async fn observe(&self) -> ClientResult<EngineInfo>;
}

/// All collaborators the importer needs from a live control plane
#[derive(Clone)]
pub struct LiveSystem {
    pub resources: Arc<dyn ResourceClient>,
    pub mapper: Arc<dyn KindMapper>,
    pub categories: Arc<dyn CategoryResolver>,
    pub environment: Arc<dyn EnvironmentInspector>,
}

impl LiveSystem {
    pub fn new(
        resources: Arc<dyn ResourceClient>,
        mapper: Arc<dyn KindMapper>,
        categories: Arc<dyn CategoryResolver>,
        environment: Arc<dyn EnvironmentInspector>,
    ) -> Self {
        Self {
            resources,
            mapper,
            categories,
            environment,
        }
    }

    /// Use one object that implements every boundary trait
    pub fn from_control_plane<T>(plane: Arc<T>) -> Self
    where
        T: ResourceClient + KindMapper + CategoryResolver + EnvironmentInspector + 'static,
    {
        Self {
            resources: plane.clone(),
            mapper: plane.clone(),
            categories: plane.clone(),
            environment: plane,
        }
    }
}
