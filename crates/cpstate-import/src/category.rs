//! Bulk mutation of every object in a category

use cpstate_core::{Category, CategoryResolver, Resource, ResourceClient, PAUSED_ANNOTATION};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cancel::until_cancelled;
use crate::error::ImportResult;

/// Drop the pause marker from a resource
pub fn unpause(resource: &mut Resource) {
    resource.remove_annotation(PAUSED_ANNOTATION);
}

/// Applies a mutation to all objects of all kinds in a category
pub struct CategoryModifier {
    resources: Arc<dyn ResourceClient>,
    categories: Arc<dyn CategoryResolver>,
}

impl CategoryModifier {
    pub fn new(resources: Arc<dyn ResourceClient>, categories: Arc<dyn CategoryResolver>) -> Self {
        Self {
            resources,
            categories,
        }
    }

    /// Mutate and persist every object in `category`, returning how many were
    /// updated
    pub async fn modify_resources<F>(
        &self,
        category: Category,
        mut mutate: F,
        cancel: &CancellationToken,
    ) -> ImportResult<usize>
    where
        F: FnMut(&mut Resource) + Send,
    {
        self.modify(category, &mut mutate, cancel)
            .await
            .map_err(|e| e.in_category(category.as_str()))
    }

    async fn modify(
        &self,
        category: Category,
        mutate: &mut (dyn FnMut(&mut Resource) + Send),
        cancel: &CancellationToken,
    ) -> ImportResult<usize> {
        let kinds = until_cancelled(cancel, self.categories.resolve(category)).await??;

        let mut modified = 0;
        for mapping in &kinds {
            let objects = until_cancelled(cancel, self.resources.list(mapping)).await??;
            for mut object in objects {
                mutate(&mut object);
                until_cancelled(cancel, self.resources.update(mapping, &object)).await??;
                modified += 1;
            }
            debug!(
                "Modified {} in category {}",
                mapping.group_resource(),
                category
            );
        }
        Ok(modified)
    }
}
