//! Imports one resource group, pausing claims, composites and managed resources

use cpstate_core::{Category, CategoryResolver, GroupKind, PAUSED_ANNOTATION};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::applier::{ApplyOutcome, ResourceApplier};
use crate::cancel::until_cancelled;
use crate::error::{ImportError, ImportResult};
use crate::state::{ExportedState, GroupManifest};

/// Applies every manifest of a group from the exported state
pub struct PausingResourceImporter {
    state: Arc<ExportedState>,
    applier: ResourceApplier,
    categories: Arc<dyn CategoryResolver>,
    pausable: OnceCell<HashSet<GroupKind>>,
}

impl PausingResourceImporter {
    pub fn new(
        state: Arc<ExportedState>,
        applier: ResourceApplier,
        categories: Arc<dyn CategoryResolver>,
    ) -> Self {
        Self {
            state,
            applier,
            categories,
            pausable: OnceCell::new(),
        }
    }

    /// Kinds in the claim, composite and managed categories, resolved once
    async fn pausable_kinds(&self, cancel: &CancellationToken) -> ImportResult<&HashSet<GroupKind>> {
        self.pausable
            .get_or_try_init(|| async {
                let mut kinds = HashSet::new();
                for category in Category::PAUSABLE {
                    let mappings = until_cancelled(cancel, self.categories.resolve(category))
                        .await?
                        .map_err(|e| ImportError::Client(e).in_category(category.as_str()))?;
                    kinds.extend(mappings.iter().map(|m| m.group_kind()));
                }
                debug!("Resolved {} pausable kinds", kinds.len());
                Ok::<_, ImportError>(kinds)
            })
            .await
    }

    /// Import all manifests of `group`, returning how many were applied
    /// (created or adopted)
    pub async fn import_resources(
        &self,
        group: &str,
        pause: bool,
        cancel: &CancellationToken,
    ) -> ImportResult<usize> {
        self.import(group, pause, cancel)
            .await
            .map_err(|e| e.in_group(group))
    }

    async fn import(
        &self,
        group: &str,
        pause: bool,
        cancel: &CancellationToken,
    ) -> ImportResult<usize> {
        let resources = self.state.read_group(group)?;
        let total = resources.len();

        let mut created = 0;
        for GroupManifest { file, mut resource } in resources {
            if pause && self.pausable_kinds(cancel).await?.contains(&resource.group_kind()) {
                resource.set_annotation(PAUSED_ANNOTATION, "true");
            }
            let outcome = self
                .applier
                .apply(&resource, cancel)
                .await
                .map_err(|e| e.in_file(&file))?;
            if outcome == ApplyOutcome::Created {
                created += 1;
            }
        }

        info!(
            "Imported {} {} resources ({} created)",
            total, group, created
        );
        Ok(total)
    }
}
