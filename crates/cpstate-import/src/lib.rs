//! Control plane state importer
//!
//! Restores a state exported from one control plane into another:
//!
//! - **archive**: extracts the exported `tar.gz` into an in-memory [`ExportedState`]
//! - **resource_importer**: applies one resource group with create-or-adopt
//!   semantics, pausing claims, composites and managed resources
//! - **waiter**: polls until every object of a kind reports readiness conditions
//! - **category**: bulk updates objects by category (used to unpause)
//! - **importer**: the phase controller tying it all together, plus preflight checks
//!
//! Everything that talks to a live control plane goes through the traits in
//! `cpstate-core`, so the whole flow runs against the in-memory control plane
//! in tests.

pub mod applier;
pub mod archive;
mod cancel;
pub mod category;
pub mod error;
pub mod importer;
pub mod options;
pub mod preflight;
pub mod progress;
pub mod resource_importer;
pub mod state;
pub mod waiter;

pub use applier::{ApplyOutcome, ResourceApplier};
pub use archive::{extract_archive, unarchive};
pub use category::{unpause, CategoryModifier};
pub use error::{ImportError, ImportResult};
pub use importer::{is_base_resource, ControlPlaneStateImporter, ImportReport, BASE_RESOURCES};
pub use options::{ImportOptions, WaitSettings, DEFAULT_INPUT_ARCHIVE};
pub use preflight::{check_compatibility, PreflightIssue};
pub use progress::{ProgressEvent, ProgressReporter, ProgressStep, RecordingProgress, TracingProgress};
pub use resource_importer::PausingResourceImporter;
pub use state::{DirEntry, ExportedState, GroupManifest, StateEntry, StateSummary};
pub use waiter::{format_conditions, ConditionWaiter};
