//! HTTP client for Kubernetes-style control plane APIs
//!
//! [`HttpControlPlane`] implements every live boundary trait from
//! `cpstate-core`: object list/create/update, kind mapping through a cached
//! discovery, category resolution and engine inspection.

pub mod client;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;

pub use client::HttpControlPlane;
pub use config::{ClusterConfig, DEFAULT_ENGINE_DEPLOYMENT, DEFAULT_ENGINE_NAMESPACE, DEFAULT_SERVER};
pub use engine::engine_info_from_deployment;
pub use error::{ConfigError, ConfigResult};
