//! Create-or-adopt application of a single manifest

use cpstate_core::{KindMapper, Resource, ResourceClient};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cancel::until_cancelled;
use crate::error::{ImportError, ImportResult};

/// What applying a manifest did to the live system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Created,
    /// The object was already present and was left as it is
    Adopted,
}

/// Creates manifests in the live system, adopting objects that already exist
pub struct ResourceApplier {
    resources: Arc<dyn ResourceClient>,
    mapper: Arc<dyn KindMapper>,
}

impl ResourceApplier {
    pub fn new(resources: Arc<dyn ResourceClient>, mapper: Arc<dyn KindMapper>) -> Self {
        Self { resources, mapper }
    }

    pub async fn apply(
        &self,
        resource: &Resource,
        cancel: &CancellationToken,
    ) -> ImportResult<ApplyOutcome> {
        let apply_error = |source| ImportError::Apply {
            resource: resource.to_string(),
            source,
        };

        // The manifest is created at the version it was exported with
        let kind = resource.group_kind();
        let mapping = until_cancelled(
            cancel,
            self.mapper.mapping_for_version(&kind, resource.version()),
        )
        .await?
        .map_err(apply_error)?;

        let mut object = resource.clone();
        object.strip_server_fields();

        match until_cancelled(cancel, self.resources.create(&mapping, &object)).await? {
            Ok(_) => {
                debug!("Created {}", resource);
                Ok(ApplyOutcome::Created)
            }
            Err(e) if e.is_already_exists() => {
                debug!("{} already exists, adopting it", resource);
                Ok(ApplyOutcome::Adopted)
            }
            Err(e) => Err(apply_error(e)),
        }
    }
}
