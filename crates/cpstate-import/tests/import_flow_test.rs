//! End-to-end import flows against the in-memory control plane

mod common;

use common::*;
use cpstate_core::memory::{Call, MemoryControlPlane};
use cpstate_core::{GroupKind, LiveSystem, ObjectKey, PAUSED_ANNOTATION};
use cpstate_import::{
    is_base_resource, ControlPlaneStateImporter, ImportError, ImportOptions, PreflightIssue,
    ProgressEvent, RecordingProgress, WaitSettings,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn importer(
    plane: &Arc<MemoryControlPlane>,
    archive: PathBuf,
    unpause_after_import: bool,
) -> ControlPlaneStateImporter {
    ControlPlaneStateImporter::new(
        LiveSystem::from_control_plane(plane.clone()),
        ImportOptions {
            input_archive: archive,
            unpause_after_import,
            ..Default::default()
        },
    )
}

fn non_zero(counts: &BTreeMap<String, usize>) -> BTreeMap<&str, usize> {
    counts
        .iter()
        .filter(|(_, count)| **count > 0)
        .map(|(group, count)| (group.as_str(), *count))
        .collect()
}

fn widget(plane: &MemoryControlPlane) -> cpstate_core::Resource {
    plane
        .get(
            &GroupKind::new("example.io", "Widget"),
            &ObjectKey::new(None, "w1"),
        )
        .unwrap()
}

#[tokio::test]
async fn test_scenario_import() {
    let dir = TempDir::new().unwrap();
    let plane = Arc::new(plane());
    let progress = RecordingProgress::new();
    let mut importer = importer(&plane, scenario_archive(&dir), false)
        .with_progress(Arc::new(progress.clone()));

    let report = importer.import(&CancellationToken::new()).await.unwrap();

    assert_eq!(
        non_zero(&report.base),
        BTreeMap::from([
            ("compositions.apiextensions.example.io", 1),
            ("namespaces", 1),
            ("secrets", 1),
        ])
    );
    assert_eq!(
        non_zero(&report.remaining),
        BTreeMap::from([("widgets.example.io", 1)])
    );
    assert_eq!(report.total(), 4);
    assert_eq!(report.unpaused["composite"], 0);
    assert_eq!(report.unpaused["claim"], 0);
    assert!(!report.unpaused.contains_key("managed"));

    assert_eq!(widget(&plane).annotation(PAUSED_ANNOTATION), Some("true"));

    let secret = plane
        .get(
            &GroupKind::new("", "Secret"),
            &ObjectKey::new(Some("ns1"), "s1"),
        )
        .unwrap();
    assert_eq!(secret.as_value()["data"]["token"], "c2VjcmV0");
    assert!(secret.as_value()["metadata"].get("uid").is_none());

    let events = progress.events();
    assert_eq!(
        events[0],
        ProgressEvent::Start("Reading state from the archive... ".to_string())
    );
    assert!(events.contains(&ProgressEvent::Success(
        "Importing base resources... 3 resources imported!".to_string()
    )));
    assert!(events.contains(&ProgressEvent::Update(
        "(1 / 1) Importing widgets.example.io...".to_string()
    )));
    assert!(events.contains(&ProgressEvent::Success(
        "Finalizing import... Done!".to_string()
    )));
    assert!(!events.iter().any(|e| matches!(e, ProgressEvent::Fail(_))));
}

#[tokio::test]
async fn test_base_resources_precede_remaining_and_reset_happens_once() {
    let dir = TempDir::new().unwrap();
    let plane = Arc::new(plane());
    let mut importer = importer(&plane, scenario_archive(&dir), false);

    importer.import(&CancellationToken::new()).await.unwrap();

    let calls = plane.calls();
    let reset = calls.iter().position(|c| *c == Call::Reset).unwrap();
    assert_eq!(calls.iter().filter(|c| **c == Call::Reset).count(), 1);

    let widget_kind = GroupKind::new("example.io", "Widget");
    let first_remaining = calls
        .iter()
        .position(|c| matches!(c, Call::Create(kind, _) if *kind == widget_kind))
        .unwrap();
    let last_base = calls
        .iter()
        .rposition(|c| matches!(c, Call::Create(kind, _) if *kind != widget_kind))
        .unwrap();

    assert!(last_base < reset);
    assert!(reset < first_remaining);
}

#[tokio::test]
async fn test_finalize_unpauses_composites_before_claims() {
    let dir = TempDir::new().unwrap();
    let meta = export_meta(ENGINE_VERSION, &[]);
    let archive = write_archive(
        &dir,
        &[
            ("export.yaml", meta.as_str()),
            ("namespaces/ns1.yaml", NAMESPACE),
            ("widgetgroups.example.io/g1.yaml", CLAIM),
            ("xwidgetgroups.example.io/xg1.yaml", COMPOSITE),
            ("widgets.example.io/w1.yaml", WIDGET),
        ],
    );
    let plane = Arc::new(plane());
    let mut importer = importer(&plane, archive, false);

    let report = importer.import(&CancellationToken::new()).await.unwrap();

    assert_eq!(report.unpaused["composite"], 1);
    assert_eq!(report.unpaused["claim"], 1);

    let calls = plane.calls();
    let composite_update = calls
        .iter()
        .position(|c| matches!(c, Call::Update(kind, _) if kind.kind == "XWidgetGroup"))
        .unwrap();
    let claim_update = calls
        .iter()
        .position(|c| matches!(c, Call::Update(kind, _) if kind.kind == "WidgetGroup"))
        .unwrap();
    assert!(composite_update < claim_update);

    let claim = plane
        .get(
            &GroupKind::new("example.io", "WidgetGroup"),
            &ObjectKey::new(Some("ns1"), "g1"),
        )
        .unwrap();
    assert_eq!(claim.annotation(PAUSED_ANNOTATION), None);

    // Managed resources stay paused
    assert_eq!(widget(&plane).annotation(PAUSED_ANNOTATION), Some("true"));
    assert!(!calls
        .iter()
        .any(|c| matches!(c, Call::Update(kind, _) if kind.kind == "Widget")));
}

#[tokio::test]
async fn test_unpause_after_import_activates_managed_resources() {
    let dir = TempDir::new().unwrap();
    let plane = Arc::new(plane());
    let mut importer = importer(&plane, scenario_archive(&dir), true);

    let report = importer.import(&CancellationToken::new()).await.unwrap();

    assert_eq!(report.unpaused["managed"], 1);
    assert_eq!(widget(&plane).annotation(PAUSED_ANNOTATION), None);
}

#[tokio::test]
async fn test_reimport_adopts_existing_objects() {
    let dir = TempDir::new().unwrap();
    let archive = scenario_archive(&dir);
    let plane = Arc::new(plane());

    let first = importer(&plane, archive.clone(), false)
        .import(&CancellationToken::new())
        .await
        .unwrap();
    let second = importer(&plane, archive, false)
        .import(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(plane.objects(&GroupKind::new("", "Namespace")).len(), 1);
    assert_eq!(
        plane
            .objects(&GroupKind::new("example.io", "Widget"))
            .len(),
        1
    );
}

#[tokio::test]
async fn test_unexpected_root_file_fails_remaining_phase() {
    let dir = TempDir::new().unwrap();
    let meta = export_meta(ENGINE_VERSION, &[]);
    let archive = write_archive(
        &dir,
        &[
            ("export.yaml", meta.as_str()),
            ("namespaces/ns1.yaml", NAMESPACE),
            ("notes.txt", "left behind"),
        ],
    );
    let plane = Arc::new(plane());
    let mut importer = importer(&plane, archive, false);

    let err = importer.import(&CancellationToken::new()).await.unwrap_err();

    match err {
        ImportError::Phase { source, .. } => {
            assert!(matches!(*source, ImportError::UnexpectedRootFile(ref name) if name == "notes.txt"));
        }
        other => panic!("unexpected error: {other}"),
    }
    // Base phase already ran
    assert_eq!(plane.objects(&GroupKind::new("", "Namespace")).len(), 1);
}

#[tokio::test]
async fn test_failed_base_group_stops_import() {
    let dir = TempDir::new().unwrap();
    let plane = Arc::new(plane());
    plane.fail_create(GroupKind::new("", "Secret"), "s1");
    let progress = RecordingProgress::new();
    let mut importer = importer(&plane, scenario_archive(&dir), false)
        .with_progress(Arc::new(progress.clone()));

    let err = importer.import(&CancellationToken::new()).await.unwrap_err();

    assert!(err.to_string().contains("cannot import \"secrets\" resources"));
    assert!(progress.events().contains(&ProgressEvent::Fail(
        "Importing base resources... Failed!".to_string()
    )));
    assert!(plane
        .objects(&GroupKind::new("apiextensions.example.io", "Composition"))
        .is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_definition_that_never_establishes_times_out() {
    let dir = TempDir::new().unwrap();
    let meta = export_meta(ENGINE_VERSION, &[]);
    let definition = "apiVersion: apiextensions.example.io/v1
kind: CompositeResourceDefinition
metadata:
  name: xwidgetgroups.example.io
";
    let archive = write_archive(
        &dir,
        &[
            ("export.yaml", meta.as_str()),
            (
                "compositeresourcedefinitions.apiextensions.example.io/xwidgetgroups.yaml",
                definition,
            ),
            ("widgets.example.io/w1.yaml", WIDGET),
        ],
    );
    let plane = Arc::new(bare_plane());
    let mut importer = ControlPlaneStateImporter::new(
        LiveSystem::from_control_plane(plane.clone()),
        ImportOptions {
            input_archive: archive,
            wait: WaitSettings {
                poll_interval_secs: 5,
                timeout_secs: 30,
            },
            ..Default::default()
        },
    );

    let err = importer.import(&CancellationToken::new()).await.unwrap_err();

    assert!(err.to_string().contains(
        "timeout waiting for conditions \"Established\" to be satisfied for all \"CompositeResourceDefinition\""
    ));
    assert!(plane
        .objects(&GroupKind::new("example.io", "Widget"))
        .is_empty());
    assert!(!plane.calls().contains(&Call::Reset));
}

fn short_wait_importer(
    plane: &Arc<MemoryControlPlane>,
    archive: PathBuf,
    legacy_revision_wait: bool,
) -> ControlPlaneStateImporter {
    ControlPlaneStateImporter::new(
        LiveSystem::from_control_plane(plane.clone()),
        ImportOptions {
            input_archive: archive,
            legacy_revision_wait,
            wait: WaitSettings {
                poll_interval_secs: 5,
                timeout_secs: 30,
            },
            ..Default::default()
        },
    )
}

#[tokio::test(start_paused = true)]
async fn test_unhealthy_provider_blocks_remaining_import() {
    let dir = TempDir::new().unwrap();
    let meta = export_meta(ENGINE_VERSION, &[]);
    let provider = "apiVersion: pkg.example.io/v1
kind: Provider
metadata:
  name: provider-widgets
";
    let archive = write_archive(
        &dir,
        &[
            ("export.yaml", meta.as_str()),
            ("providers.pkg.example.io/provider-widgets.yaml", provider),
            ("widgets.example.io/w1.yaml", WIDGET),
        ],
    );
    let plane = Arc::new(bare_plane());
    let mut importer = short_wait_importer(&plane, archive, true);

    let err = importer.import(&CancellationToken::new()).await.unwrap_err();

    assert!(err.to_string().contains(
        "timeout waiting for conditions \"Installed and Healthy\" to be satisfied for all \"Provider\""
    ));
    assert_eq!(
        plane
            .objects(&GroupKind::new("pkg.example.io", "Provider"))
            .len(),
        1
    );
    assert!(plane
        .objects(&GroupKind::new("example.io", "Widget"))
        .is_empty());
    assert!(!plane.calls().contains(&Call::Reset));
}

fn unhealthy_revision() -> cpstate_core::Resource {
    cpstate_core::Resource::from_value(serde_json::json!({
        "apiVersion": "pkg.example.io/v1",
        "kind": "ProviderRevision",
        "metadata": { "name": "provider-widgets-1a2b3c" },
        "status": { "conditions": [{ "type": "Healthy", "status": "False" }] }
    }))
    .unwrap()
}

fn revision_archive(dir: &TempDir) -> PathBuf {
    let meta = export_meta(ENGINE_VERSION, &[]);
    write_archive(
        dir,
        &[
            ("export.yaml", meta.as_str()),
            ("widgets.example.io/w1.yaml", WIDGET),
        ],
    )
}

#[tokio::test(start_paused = true)]
async fn test_unhealthy_revision_blocks_import_with_legacy_wait() {
    let dir = TempDir::new().unwrap();
    let plane = Arc::new(bare_plane());
    plane.insert(unhealthy_revision());
    let mut importer = short_wait_importer(&plane, revision_archive(&dir), true);

    let err = importer.import(&CancellationToken::new()).await.unwrap_err();

    assert!(err.to_string().contains(
        "timeout waiting for conditions \"Healthy\" to be satisfied for all \"ProviderRevision\""
    ));
    assert!(plane
        .objects(&GroupKind::new("example.io", "Widget"))
        .is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unhealthy_revision_is_ignored_without_legacy_wait() {
    let dir = TempDir::new().unwrap();
    let plane = Arc::new(bare_plane());
    plane.insert(unhealthy_revision());
    let mut importer = short_wait_importer(&plane, revision_archive(&dir), false);

    let report = importer.import(&CancellationToken::new()).await.unwrap();

    assert_eq!(report.remaining["widgets.example.io"], 1);
    assert_eq!(widget(&plane).annotation(PAUSED_ANNOTATION), Some("true"));
}

#[tokio::test]
async fn test_legacy_revision_wait_can_be_disabled() {
    let dir = TempDir::new().unwrap();
    let plane = Arc::new(plane());
    let mut importer = ControlPlaneStateImporter::new(
        LiveSystem::from_control_plane(plane.clone()),
        ImportOptions {
            input_archive: scenario_archive(&dir),
            legacy_revision_wait: false,
            ..Default::default()
        },
    );

    importer.import(&CancellationToken::new()).await.unwrap();

    assert!(!plane
        .calls()
        .iter()
        .any(|c| matches!(c, Call::List(kind) if kind.kind.ends_with("Revision"))));
}

#[tokio::test]
async fn test_cancelled_before_extraction() {
    let dir = TempDir::new().unwrap();
    let plane = Arc::new(plane());
    let mut importer = importer(&plane, scenario_archive(&dir), false);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = importer.import(&cancel).await.unwrap_err();

    assert!(err.is_cancelled());
    assert!(!plane
        .calls()
        .iter()
        .any(|c| matches!(c, Call::Create(..))));
}

#[tokio::test]
async fn test_preflight_reports_missing_feature_flag() {
    let dir = TempDir::new().unwrap();
    let meta = export_meta(ENGINE_VERSION, &["--enable-a", "--enable-b"]);
    let archive = write_archive(&dir, &[("export.yaml", meta.as_str())]);
    let plane = Arc::new(MemoryControlPlane::new().with_engine(ENGINE_VERSION, &["--enable-a"]));
    let mut importer = importer(&plane, archive, false);

    let issues = importer.preflight_checks(&CancellationToken::new()).await;

    assert_eq!(issues.len(), 1);
    assert!(matches!(&issues[0], PreflightIssue::MissingFeatureFlag(flag) if flag == "--enable-b"));
}

#[tokio::test]
async fn test_preflight_reports_version_mismatch() {
    let dir = TempDir::new().unwrap();
    let plane = Arc::new(plane());
    let meta = export_meta("v1.13.2", &["--enable-usages"]);
    let archive = write_archive(&dir, &[("export.yaml", meta.as_str())]);
    let mut importer = importer(&plane, archive, false);

    let issues = importer.preflight_checks(&CancellationToken::new()).await;

    assert_eq!(issues.len(), 1);
    assert!(matches!(&issues[0], PreflightIssue::VersionMismatch { exported, .. } if exported == "v1.13.2"));
}

#[tokio::test]
async fn test_preflight_state_is_reused_by_import() {
    let dir = TempDir::new().unwrap();
    let archive = scenario_archive(&dir);
    let plane = Arc::new(plane());
    let mut importer = importer(&plane, archive.clone(), false);

    assert!(importer
        .preflight_checks(&CancellationToken::new())
        .await
        .is_empty());
    assert!(importer.state().is_some());

    std::fs::remove_file(&archive).unwrap();
    let report = importer.import(&CancellationToken::new()).await.unwrap();
    assert_eq!(report.total(), 4);
}

#[tokio::test]
async fn test_preflight_unreachable_target() {
    let dir = TempDir::new().unwrap();
    let plane = Arc::new(plane());
    plane.fail_observe("connection refused");
    let mut importer = importer(&plane, scenario_archive(&dir), false);

    let issues = importer.preflight_checks(&CancellationToken::new()).await;

    assert_eq!(issues.len(), 1);
    assert!(matches!(issues[0], PreflightIssue::EngineInfo(_)));
    assert!(importer.state().is_none());
}

#[tokio::test]
async fn test_preflight_missing_archive() {
    let dir = TempDir::new().unwrap();
    let plane = Arc::new(plane());
    let mut importer = importer(&plane, dir.path().join("missing.tar.gz"), false);

    let issues = importer.preflight_checks(&CancellationToken::new()).await;

    assert_eq!(issues.len(), 1);
    assert!(matches!(
        issues[0],
        PreflightIssue::Unarchive(ImportError::ArchiveOpen { .. })
    ));
}

#[test]
fn test_scenario_groups_are_classified() {
    assert!(is_base_resource("compositions.apiextensions.example.io"));
    assert!(!is_base_resource("widgets.example.io"));
}
