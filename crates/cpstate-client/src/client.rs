//! reqwest implementation of the live control plane boundary

use async_trait::async_trait;
use cpstate_core::{
    Category, CategoryResolver, ClientError, ClientResult, EngineInfo, EnvironmentInspector,
    GroupKind, KindMapper, KindMapping, ObjectKey, Resource, ResourceClient,
};
use reqwest::{Certificate, Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::ClusterConfig;
use crate::discovery::{ApiGroupList, ApiResourceList};
use crate::engine::engine_info_from_deployment;
use crate::error::{status_error, transport_error, ConfigError, ConfigResult, Operation};

/// Page size for list requests
const LIST_LIMIT: usize = 500;

/// Namespace used for namespaced objects that do not name one
const DEFAULT_NAMESPACE: &str = "default";

/// Control plane reached over its HTTP API
pub struct HttpControlPlane {
    client: Client,
    base_url: String,
    token: Option<String>,
    engine_namespace: String,
    engine_deployment: String,
    discovery: RwLock<Option<Arc<Vec<KindMapping>>>>,
}

fn group_version_path(mapping: &KindMapping) -> String {
    if mapping.group.is_empty() {
        format!("/api/{}", mapping.version)
    } else {
        format!("/apis/{}/{}", mapping.group, mapping.version)
    }
}

fn collection_path(mapping: &KindMapping, namespace: Option<&str>) -> String {
    let base = group_version_path(mapping);
    if mapping.namespaced {
        format!(
            "{}/namespaces/{}/{}",
            base,
            namespace.unwrap_or(DEFAULT_NAMESPACE),
            mapping.resource
        )
    } else {
        format!("{}/{}", base, mapping.resource)
    }
}

fn object_path(mapping: &KindMapping, key: &ObjectKey) -> String {
    format!(
        "{}/{}",
        collection_path(mapping, key.namespace.as_deref()),
        key.name
    )
}

impl HttpControlPlane {
    pub fn new(config: &ClusterConfig) -> ConfigResult<Self> {
        let base_url = config.server.trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::InvalidServer(config.server.clone()));
        }

        let mut builder = Client::builder()
            .timeout(config.request_timeout())
            .danger_accept_invalid_certs(config.insecure_skip_tls_verify);

        if let Some(path) = &config.certificate_authority {
            let pem = std::fs::read(path).map_err(|source| ConfigError::ReadCertificate {
                path: path.clone(),
                source,
            })?;
            let certificate =
                Certificate::from_pem(&pem).map_err(|source| ConfigError::InvalidCertificate {
                    path: path.clone(),
                    source,
                })?;
            builder = builder.add_root_certificate(certificate);
        }

        let client = builder.build().map_err(ConfigError::Build)?;

        Ok(Self {
            client,
            base_url,
            token: config.token.clone().filter(|t| !t.is_empty()),
            engine_namespace: config.engine_namespace.clone(),
            engine_deployment: config.engine_deployment.clone(),
            discovery: RwLock::new(None),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("Control plane API request: {} {}", method, path);

        let request = self
            .client
            .request(method, url)
            .header("Accept", "application/json");
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(
        &self,
        request: RequestBuilder,
        operation: Operation,
        kind: &str,
        name: &str,
    ) -> ClientResult<Response> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body, operation, kind, name))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let response = self
            .send(
                self.request(Method::GET, path),
                Operation::Read,
                "discovery document",
                path,
            )
            .await?;
        response.json().await.map_err(transport_error)
    }

    /// Cached discovery, fetched on first use
    async fn mappings(&self) -> ClientResult<Arc<Vec<KindMapping>>> {
        if let Some(mappings) = self.discovery.read().await.as_ref() {
            return Ok(mappings.clone());
        }

        let mut cache = self.discovery.write().await;
        if let Some(mappings) = cache.as_ref() {
            return Ok(mappings.clone());
        }
        let mappings = Arc::new(self.discover().await?);
        *cache = Some(mappings.clone());
        Ok(mappings)
    }

    async fn discover(&self) -> ClientResult<Vec<KindMapping>> {
        let discovery_error = |e: ClientError| ClientError::Discovery(e.to_string());

        let core: ApiResourceList = self.get_json("/api/v1").await.map_err(discovery_error)?;
        let mut mappings = core.mappings();

        let groups: ApiGroupList = self.get_json("/apis").await.map_err(discovery_error)?;
        // Preferred versions come first so version-less lookups find them
        for group in &groups.groups {
            for group_version in group.group_versions() {
                match self
                    .get_json::<ApiResourceList>(&format!("/apis/{}", group_version))
                    .await
                {
                    Ok(list) => mappings.extend(list.mappings()),
                    // Unavailable aggregated APIs are skipped
                    Err(e) => warn!("Skipping discovery of {}: {}", group_version, e),
                }
            }
        }

        debug!("Discovered {} kinds", mappings.len());
        Ok(mappings)
    }
}

#[async_trait]
impl ResourceClient for HttpControlPlane {
    async fn list(&self, mapping: &KindMapping) -> ClientResult<Vec<Resource>> {
        let kind = mapping.group_kind().to_string();
        let path = format!("{}/{}", group_version_path(mapping), mapping.resource);
        let api_version = mapping.api_version();

        let mut resources = Vec::new();
        let mut continue_token: Option<String> = None;
        loop {
            let mut request = self
                .request(Method::GET, &path)
                .query(&[("limit", LIST_LIMIT.to_string())]);
            if let Some(token) = &continue_token {
                request = request.query(&[("continue", token)]);
            }

            let page: Value = self
                .send(request, Operation::Read, &kind, "")
                .await?
                .json()
                .await
                .map_err(transport_error)?;

            if let Some(items) = page.get("items").and_then(Value::as_array) {
                for item in items {
                    resources.push(Resource::with_type_meta(
                        item.clone(),
                        &api_version,
                        &mapping.kind,
                    )?);
                }
            }

            continue_token = page
                .pointer("/metadata/continue")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .map(str::to_string);
            if continue_token.is_none() {
                break;
            }
        }

        Ok(resources)
    }

    async fn create(&self, mapping: &KindMapping, resource: &Resource) -> ClientResult<Resource> {
        let path = collection_path(mapping, resource.namespace());
        let request = self.request(Method::POST, &path).json(resource);
        let created: Value = self
            .send(
                request,
                Operation::Create,
                &mapping.group_kind().to_string(),
                &resource.key().to_string(),
            )
            .await?
            .json()
            .await
            .map_err(transport_error)?;
        Resource::with_type_meta(created, &mapping.api_version(), &mapping.kind)
    }

    async fn update(&self, mapping: &KindMapping, resource: &Resource) -> ClientResult<Resource> {
        let path = object_path(mapping, &resource.key());
        let request = self.request(Method::PUT, &path).json(resource);
        let updated: Value = self
            .send(
                request,
                Operation::Update,
                &mapping.group_kind().to_string(),
                &resource.key().to_string(),
            )
            .await?
            .json()
            .await
            .map_err(transport_error)?;
        Resource::with_type_meta(updated, &mapping.api_version(), &mapping.kind)
    }
}

#[async_trait]
impl KindMapper for HttpControlPlane {
    async fn mapping_for_kind(&self, kind: &GroupKind) -> ClientResult<KindMapping> {
        self.mappings()
            .await?
            .iter()
            .find(|m| m.group == kind.group && m.kind == kind.kind)
            .cloned()
            .ok_or_else(|| ClientError::NoMapping(kind.to_string()))
    }

    async fn mapping_for_version(
        &self,
        kind: &GroupKind,
        version: &str,
    ) -> ClientResult<KindMapping> {
        self.mappings()
            .await?
            .iter()
            .find(|m| m.group == kind.group && m.kind == kind.kind && m.version == version)
            .cloned()
            .ok_or_else(|| ClientError::NoMapping(format!("{} in version {}", kind, version)))
    }

    async fn reset(&self) {
        *self.discovery.write().await = None;
        debug!("Discovery cache reset");
    }
}

#[async_trait]
impl CategoryResolver for HttpControlPlane {
    /// One mapping per kind, at the first version discovery listed it
    async fn resolve(&self, category: Category) -> ClientResult<Vec<KindMapping>> {
        let mut seen = HashSet::new();
        Ok(self
            .mappings()
            .await?
            .iter()
            .filter(|m| m.has_category(category.as_str()))
            .filter(|m| seen.insert(m.group_kind()))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl EnvironmentInspector for HttpControlPlane {
    async fn observe(&self) -> ClientResult<EngineInfo> {
        let path = format!(
            "/apis/apps/v1/namespaces/{}/deployments/{}",
            self.engine_namespace, self.engine_deployment
        );
        let deployment: Value = self
            .send(
                self.request(Method::GET, &path),
                Operation::Read,
                "Deployment.apps",
                &format!("{}/{}", self.engine_namespace, self.engine_deployment),
            )
            .await?
            .json()
            .await
            .map_err(transport_error)?;
        engine_info_from_deployment(&deployment)
    }
}
