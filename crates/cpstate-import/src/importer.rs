//! Phase controller driving an import from archive to unpaused control plane

use cpstate_core::{Category, ConditionType, GroupKind, LiveSystem, EXPORT_META_FILE};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::applier::ResourceApplier;
use crate::archive::extract_archive;
use crate::cancel::until_cancelled;
use crate::category::{unpause, CategoryModifier};
use crate::error::{ImportError, ImportResult};
use crate::options::ImportOptions;
use crate::preflight::{check_compatibility, PreflightIssue};
use crate::progress::{ProgressReporter, ProgressStep, TracingProgress};
use crate::resource_importer::PausingResourceImporter;
use crate::state::ExportedState;
use crate::waiter::ConditionWaiter;

/// Groups imported before anything else, in this order.
///
/// None of them depend on packages or definitions installed by the others,
/// so they can be created against a bare control plane.
pub const BASE_RESOURCES: [&str; 12] = [
    "namespaces",
    "configmaps",
    "secrets",
    "controllerconfigs.pkg.example.io",
    "deploymentruntimeconfigs.pkg.example.io",
    "storeconfigs.secrets.example.io",
    "compositionrevisions.apiextensions.example.io",
    "compositions.apiextensions.example.io",
    "compositeresourcedefinitions.apiextensions.example.io",
    "providers.pkg.example.io",
    "functions.pkg.example.io",
    "configurations.pkg.example.io",
];

const DEFINITION_GROUP: &str = "apiextensions.example.io";
const PACKAGE_GROUP: &str = "pkg.example.io";
const PACKAGE_KINDS: [&str; 3] = ["Provider", "Function", "Configuration"];
const REVISION_KINDS: [&str; 3] = ["ProviderRevision", "FunctionRevision", "ConfigurationRevision"];

const STEP_FAILED: &str = "Failed!";

pub fn is_base_resource(group: &str) -> bool {
    BASE_RESOURCES.contains(&group)
}

/// Per-group counts of an import run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub base: BTreeMap<String, usize>,
    pub remaining: BTreeMap<String, usize>,
    /// Objects unpaused per category during finalization
    pub unpaused: BTreeMap<String, usize>,
}

impl ImportReport {
    pub fn base_total(&self) -> usize {
        self.base.values().sum()
    }

    pub fn remaining_total(&self) -> usize {
        self.remaining.values().sum()
    }

    pub fn total(&self) -> usize {
        self.base_total() + self.remaining_total()
    }
}

fn failed(step: &dyn ProgressStep, title: &str, err: ImportError, context: &str) -> ImportError {
    step.fail(&format!("{}{}", title, STEP_FAILED));
    err.in_phase(context)
}

/// Restores an exported state into a live control plane
pub struct ControlPlaneStateImporter {
    live: LiveSystem,
    options: ImportOptions,
    progress: Arc<dyn ProgressReporter>,
    state: Option<Arc<ExportedState>>,
}

impl ControlPlaneStateImporter {
    pub fn new(live: LiveSystem, options: ImportOptions) -> Self {
        Self {
            live,
            options,
            progress: Arc::new(TracingProgress),
            state: None,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// The extracted state, once preflight or import has read the archive
    pub fn state(&self) -> Option<&ExportedState> {
        self.state.as_deref()
    }

    async fn ensure_state(&mut self, cancel: &CancellationToken) -> ImportResult<Arc<ExportedState>> {
        if let Some(state) = &self.state {
            return Ok(state.clone());
        }
        let state = Arc::new(
            extract_archive(self.options.input_archive.clone(), cancel.clone()).await?,
        );
        self.state = Some(state.clone());
        Ok(state)
    }

    /// Compare the exported environment with the target.
    ///
    /// Problems are collected rather than returned on the first one; the
    /// caller decides whether they block the import. The extracted state is
    /// kept for the import that follows.
    pub async fn preflight_checks(&mut self, cancel: &CancellationToken) -> Vec<PreflightIssue> {
        let observed = match until_cancelled(cancel, self.live.environment.observe()).await {
            Ok(Ok(observed)) => observed,
            Ok(Err(e)) => return vec![PreflightIssue::EngineInfo(e)],
            Err(_) => return vec![PreflightIssue::Cancelled],
        };

        let state = match self.ensure_state(cancel).await {
            Ok(state) => state,
            Err(e) if e.is_cancelled() => return vec![PreflightIssue::Cancelled],
            Err(e) => return vec![PreflightIssue::Unarchive(e)],
        };

        let meta = match state.export_meta() {
            Ok(meta) => meta,
            Err(e) => return vec![PreflightIssue::Metadata(e)],
        };

        let issues = check_compatibility(&meta, &observed);
        debug!("Preflight checks found {} issues", issues.len());
        issues
    }

    /// Run every import phase in order, stopping at the first failure.
    ///
    /// Nothing is rolled back on failure. Running again against a partially
    /// imported control plane adopts what already exists.
    pub async fn import(&mut self, cancel: &CancellationToken) -> ImportResult<ImportReport> {
        let mut report = ImportReport::default();

        let title = "Reading state from the archive... ";
        let step = self.progress.start(title);
        let state = match self.ensure_state(cancel).await {
            Ok(state) => state,
            Err(e) => return Err(failed(step.as_ref(), title, e, "cannot unarchive export archive")),
        };
        step.success(&format!("{}Done!", title));

        let importer = PausingResourceImporter::new(
            state.clone(),
            ResourceApplier::new(self.live.resources.clone(), self.live.mapper.clone()),
            self.live.categories.clone(),
        );

        self.import_base(&importer, &mut report, cancel).await?;
        self.wait_for_dependencies(cancel).await?;

        // Kinds installed by packages and definitions only resolve after this
        self.live.mapper.reset().await;

        self.import_remaining(&state, &importer, &mut report, cancel)
            .await?;
        self.finalize(&mut report, cancel).await?;

        info!(
            "Imported {} resources ({} base, {} remaining)",
            report.total(),
            report.base_total(),
            report.remaining_total()
        );
        Ok(report)
    }

    async fn import_base(
        &self,
        importer: &PausingResourceImporter,
        report: &mut ImportReport,
        cancel: &CancellationToken,
    ) -> ImportResult<()> {
        let title = "Importing base resources... ";
        let step = self
            .progress
            .start(&format!("{}0 / {}", title, BASE_RESOURCES.len()));

        for (i, group) in BASE_RESOURCES.iter().enumerate() {
            let count = importer
                .import_resources(group, false, cancel)
                .await
                .map_err(|e| failed(step.as_ref(), title, e, "cannot import base resources"))?;
            report.base.insert(group.to_string(), count);
            step.update(&format!(
                "({} / {}) Importing {}...",
                i + 1,
                BASE_RESOURCES.len(),
                group
            ));
        }

        step.success(&format!(
            "{}{} resources imported!",
            title,
            report.base_total()
        ));
        Ok(())
    }

    async fn wait_for_dependencies(&self, cancel: &CancellationToken) -> ImportResult<()> {
        let waiter = ConditionWaiter::new(
            self.live.resources.clone(),
            self.live.mapper.clone(),
            self.options.wait,
        );

        let title = "Waiting for XRDs... ";
        let step = self.progress.start(title);
        waiter
            .wait_for_conditions(
                &GroupKind::new(DEFINITION_GROUP, "CompositeResourceDefinition"),
                &[ConditionType::ESTABLISHED],
                step.as_ref(),
                cancel,
            )
            .await
            .map_err(|e| {
                failed(
                    step.as_ref(),
                    title,
                    e,
                    "there are unhealthy CompositeResourceDefinitions",
                )
            })?;
        step.success(&format!("{}Established!", title));

        let title = "Waiting for Packages... ";
        let step = self.progress.start(title);
        for kind in PACKAGE_KINDS {
            waiter
                .wait_for_conditions(
                    &GroupKind::new(PACKAGE_GROUP, kind),
                    &[ConditionType::INSTALLED, ConditionType::HEALTHY],
                    step.as_ref(),
                    cancel,
                )
                .await
                .map_err(|e| {
                    failed(
                        step.as_ref(),
                        title,
                        e,
                        &format!("there are unhealthy {:?}s", kind),
                    )
                })?;
        }
        if self.options.legacy_revision_wait {
            self.wait_for_legacy_revisions(&waiter, step.as_ref(), cancel)
                .await
                .map_err(|(kind, e)| {
                    failed(
                        step.as_ref(),
                        title,
                        e,
                        &format!("there are unhealthy {:?}s", kind),
                    )
                })?;
        }
        step.success(&format!("{}Installed and Healthy!", title));
        Ok(())
    }

    /// Older engines report packages ready before their revisions are, so
    /// revisions are checked on their own.
    async fn wait_for_legacy_revisions(
        &self,
        waiter: &ConditionWaiter,
        step: &dyn ProgressStep,
        cancel: &CancellationToken,
    ) -> Result<(), (&'static str, ImportError)> {
        for kind in REVISION_KINDS {
            waiter
                .wait_for_conditions(
                    &GroupKind::new(PACKAGE_GROUP, kind),
                    &[ConditionType::HEALTHY],
                    step,
                    cancel,
                )
                .await
                .map_err(|e| (kind, e))?;
        }
        Ok(())
    }

    async fn import_remaining(
        &self,
        state: &ExportedState,
        importer: &PausingResourceImporter,
        report: &mut ImportReport,
        cancel: &CancellationToken,
    ) -> ImportResult<()> {
        let title = "Importing remaining resources... ";
        let step = self.progress.start(title);
        let context = "cannot import remaining resources";

        let entries = state
            .read_dir("/")
            .map_err(|e| failed(step.as_ref(), title, e, "cannot list group resources"))?;

        let mut groups = Vec::new();
        for entry in entries {
            if entry.name == EXPORT_META_FILE {
                continue;
            }
            if !entry.is_dir {
                return Err(failed(
                    step.as_ref(),
                    title,
                    ImportError::UnexpectedRootFile(entry.name),
                    context,
                ));
            }
            if !is_base_resource(&entry.name) {
                groups.push(entry.name);
            }
        }

        let total = groups.len();
        for (i, group) in groups.into_iter().enumerate() {
            let count = importer
                .import_resources(&group, true, cancel)
                .await
                .map_err(|e| failed(step.as_ref(), title, e, context))?;
            step.update(&format!("({} / {}) Importing {}...", i + 1, total, group));
            report.remaining.insert(group, count);
        }

        step.success(&format!(
            "{}{} resources imported!",
            title,
            report.remaining_total()
        ));
        Ok(())
    }

    async fn finalize(&self, report: &mut ImportReport, cancel: &CancellationToken) -> ImportResult<()> {
        let modifier =
            CategoryModifier::new(self.live.resources.clone(), self.live.categories.clone());

        let title = "Finalizing import... ";
        let step = self.progress.start(title);
        for (category, context) in [
            (Category::COMPOSITE, "cannot unpause composites"),
            (Category::CLAIM, "cannot unpause claims"),
        ] {
            let count = modifier
                .modify_resources(category, unpause, cancel)
                .await
                .map_err(|e| failed(step.as_ref(), title, e, context))?;
            report.unpaused.insert(category.to_string(), count);
        }
        step.success(&format!("{}Done!", title));

        if self.options.unpause_after_import {
            let title = "Unpausing managed resources ... ";
            let step = self.progress.start(title);
            let count = modifier
                .modify_resources(Category::MANAGED, unpause, cancel)
                .await
                .map_err(|e| {
                    failed(step.as_ref(), title, e, "cannot unpause managed resources")
                })?;
            report.unpaused.insert(Category::MANAGED.to_string(), count);
            step.success(&format!("{}Done!", title));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_resource_predicate() {
        assert!(is_base_resource("namespaces"));
        assert!(is_base_resource("configurations.pkg.example.io"));
        assert!(!is_base_resource("widgets.example.io"));
        assert!(!is_base_resource(EXPORT_META_FILE));
    }

    #[test]
    fn test_base_order_puts_namespaces_first_and_packages_last() {
        assert_eq!(BASE_RESOURCES[0], "namespaces");
        let definitions = BASE_RESOURCES
            .iter()
            .position(|g| *g == "compositeresourcedefinitions.apiextensions.example.io")
            .unwrap();
        let providers = BASE_RESOURCES
            .iter()
            .position(|g| *g == "providers.pkg.example.io")
            .unwrap();
        assert!(definitions < providers);
    }

    #[test]
    fn test_report_totals() {
        let mut report = ImportReport::default();
        report.base.insert("namespaces".to_string(), 2);
        report.base.insert("secrets".to_string(), 1);
        report.remaining.insert("widgets.example.io".to_string(), 4);

        assert_eq!(report.base_total(), 3);
        assert_eq!(report.remaining_total(), 4);
        assert_eq!(report.total(), 7);
    }
}
