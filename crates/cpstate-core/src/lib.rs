//! Core types and traits for cpstate
//!
//! This crate provides the foundational abstractions shared by the importer,
//! the HTTP client and the command line.
//!
//! # Architecture
//!
//! - **Traits**: `ResourceClient`, `KindMapper`, `CategoryResolver` and
//!   `EnvironmentInspector` describe the live control plane boundary
//! - **Types**: `Resource`, `GroupKind`, `KindMapping`, `ExportMeta`, etc.
//! - **Errors**: `ClientError` for everything that crosses the boundary
//!
//! # Usage
//!
//! Control plane implementations (e.g., `cpstate-client`) depend on this crate
//! and implement the boundary traits. Enable the `test-utils` feature to get an
//! in-memory control plane for tests.

pub mod category;
pub mod condition;
pub mod error;
pub mod export;
pub mod live;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod resource;

pub use category::{Category, PAUSED_ANNOTATION};
pub use condition::{Condition, ConditionType};
pub use error::{ClientError, ClientResult};
pub use export::{EngineInfo, ExportMeta, ExportOptions, ExportStats, EXPORT_META_FILE};
pub use live::{CategoryResolver, EnvironmentInspector, KindMapper, LiveSystem, ResourceClient};
pub use resource::{GroupKind, GroupResource, KindMapping, ObjectKey, Resource};
