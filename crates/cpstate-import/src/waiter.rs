//! Bounded polling until every object of a kind reports the wanted conditions

use cpstate_core::{ConditionType, GroupKind, KindMapper, KindMapping, ResourceClient};
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cancel::until_cancelled;
use crate::error::{ImportError, ImportResult};
use crate::options::WaitSettings;
use crate::progress::ProgressStep;

/// Render condition names as `A`, `A and B` or `A, B, and C`
pub fn format_conditions(conditions: &[ConditionType]) -> String {
    match conditions {
        [] => String::new(),
        [only] => only.to_string(),
        [first, second] => format!("{} and {}", first, second),
        [init @ .., last] => {
            let head: Vec<&str> = init.iter().map(ConditionType::as_str).collect();
            format!("{}, and {}", head.join(", "), last)
        }
    }
}

/// Waits for readiness conditions on all objects of a kind
pub struct ConditionWaiter {
    resources: Arc<dyn ResourceClient>,
    mapper: Arc<dyn KindMapper>,
    settings: WaitSettings,
}

impl ConditionWaiter {
    pub fn new(
        resources: Arc<dyn ResourceClient>,
        mapper: Arc<dyn KindMapper>,
        settings: WaitSettings,
    ) -> Self {
        Self {
            resources,
            mapper,
            settings,
        }
    }

    /// Block until every listed object of `kind` satisfies all `conditions`.
    ///
    /// Polls right away, then on every poll interval until the timeout. A kind
    /// with no objects is satisfied. List failures and undecodable status are
    /// logged and retried on the next tick.
    pub async fn wait_for_conditions(
        &self,
        kind: &GroupKind,
        conditions: &[ConditionType],
        step: &dyn ProgressStep,
        cancel: &CancellationToken,
    ) -> ImportResult<()> {
        let mapping = until_cancelled(cancel, self.mapper.mapping_for_kind(kind)).await??;
        let rendered = format_conditions(conditions);

        let deadline = tokio::time::sleep(self.settings.timeout());
        tokio::pin!(deadline);
        let mut ticker = tokio::time::interval(self.settings.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ImportError::Cancelled),
                _ = &mut deadline => break,
                _ = ticker.tick() => {}
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ImportError::Cancelled),
                _ = &mut deadline => break,
                outcome = self.poll(&mapping, conditions) => outcome,
            };

            match outcome {
                Some((satisfied, total)) if satisfied == total => {
                    debug!(
                        "All {} {} are {}",
                        total,
                        mapping.group_resource(),
                        rendered
                    );
                    return Ok(());
                }
                Some((satisfied, total)) => step.update(&format!(
                    "({} / {}) Waiting for {} to be {}...",
                    satisfied,
                    total,
                    mapping.group_resource(),
                    rendered
                )),
                None => {}
            }
        }

        Err(ImportError::WaitTimeout {
            kind: kind.kind.clone(),
            conditions: rendered,
        })
    }

    /// Returns `(satisfied, total)`, or `None` when this poll failed
    async fn poll(
        &self,
        mapping: &KindMapping,
        conditions: &[ConditionType],
    ) -> Option<(usize, usize)> {
        let resources = match self.resources.list(mapping).await {
            Ok(resources) => resources,
            Err(e) => {
                warn!("Cannot list {}: {}", mapping.group_resource(), e);
                return None;
            }
        };

        let total = resources.len();
        let mut unmet = 0;
        for resource in &resources {
            match resource.satisfies(conditions) {
                Ok(true) => {}
                Ok(false) => unmet += 1,
                Err(e) => {
                    warn!("Cannot get status for {}: {}", resource, e);
                    return None;
                }
            }
        }
        Some((total - unmet, total))
    }
}
