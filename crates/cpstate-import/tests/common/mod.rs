//! Common test utilities shared across import flow tests
//!
//! - Exported state archives written to a temp dir
//! - An in-memory control plane serving the kinds an import touches

#![allow(dead_code)]

use cpstate_core::memory::MemoryControlPlane;
use cpstate_core::{ConditionType, GroupKind};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::BTreeSet;
use std::fs::File;
use std::path::PathBuf;
use tar::{EntryType, Header};
use tempfile::TempDir;

pub const ENGINE_VERSION: &str = "v1.14.0";

pub const NAMESPACE: &str = "apiVersion: v1
kind: Namespace
metadata:
  name: ns1
";

pub const SECRET: &str = "apiVersion: v1
kind: Secret
metadata:
  name: s1
  namespace: ns1
  uid: 0b8c3a0e
  resourceVersion: \"1042\"
data:
  token: c2VjcmV0
";

pub const COMPOSITION: &str = "apiVersion: apiextensions.example.io/v1
kind: Composition
metadata:
  name: c1
spec:
  compositeTypeRef:
    apiVersion: example.io/v1
    kind: XWidget
";

/// Managed resource
pub const WIDGET: &str = "apiVersion: example.io/v1
kind: Widget
metadata:
  name: w1
spec:
  size: 3
";

pub const COMPOSITE: &str = "apiVersion: example.io/v1
kind: XWidgetGroup
metadata:
  name: xg1
";

pub const CLAIM: &str = "apiVersion: example.io/v1
kind: WidgetGroup
metadata:
  name: g1
  namespace: ns1
";

pub fn export_meta(version: &str, flags: &[&str]) -> String {
    let mut meta = format!("version: v1alpha1\nengineVersion: {}\n", version);
    if !flags.is_empty() {
        meta.push_str("featureFlags:\n");
        for flag in flags {
            meta.push_str(&format!("  - \"{}\"\n", flag));
        }
    }
    meta
}

/// Write an exported state archive; directory entries are added for every
/// parent of a file
pub fn write_archive(dir: &TempDir, files: &[(&str, &str)]) -> PathBuf {
    let path = dir.path().join("xp-state.tar.gz");
    let file = File::create(&path).unwrap();
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

    let dirs: BTreeSet<&str> = files
        .iter()
        .filter_map(|(name, _)| name.rsplit_once('/').map(|(dir, _)| dir))
        .collect();
    for dir in dirs {
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Directory);
        header.set_mode(0o700);
        header.set_size(0);
        builder
            .append_data(&mut header, dir, std::io::empty())
            .unwrap();
    }

    for (name, contents) in files {
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_mode(0o600);
        header.set_size(contents.len() as u64);
        builder
            .append_data(&mut header, name, contents.as_bytes())
            .unwrap();
    }

    builder.into_inner().unwrap().finish().unwrap();
    path
}

/// Archive for the reference scenario: three base resources and one
/// managed resource in a non-base group
pub fn scenario_archive(dir: &TempDir) -> PathBuf {
    let meta = export_meta(ENGINE_VERSION, &["--enable-usages"]);
    write_archive(
        dir,
        &[
            ("export.yaml", meta.as_str()),
            ("namespaces/ns1.yaml", NAMESPACE),
            ("secrets/s1.yaml", SECRET),
            ("compositions.apiextensions.example.io/c1.yaml", COMPOSITION),
            ("widgets.example.io/w1.yaml", WIDGET),
        ],
    )
}

pub fn definition_kind() -> GroupKind {
    GroupKind::new("apiextensions.example.io", "CompositeResourceDefinition")
}

pub fn package_kinds() -> Vec<GroupKind> {
    ["Provider", "Function", "Configuration"]
        .into_iter()
        .map(|kind| GroupKind::new("pkg.example.io", kind))
        .collect()
}

/// Control plane without readiness behavior: definitions and packages never
/// report conditions on their own
pub fn bare_plane() -> MemoryControlPlane {
    MemoryControlPlane::new()
        .with_engine(ENGINE_VERSION, &["--enable-usages"])
        .with_kind("", "v1", "Namespace", "namespaces", false, &[])
        .with_kind("", "v1", "ConfigMap", "configmaps", true, &[])
        .with_kind("", "v1", "Secret", "secrets", true, &[])
        .with_kind(
            "apiextensions.example.io",
            "v1",
            "Composition",
            "compositions",
            false,
            &[],
        )
        .with_kind(
            "apiextensions.example.io",
            "v1",
            "CompositeResourceDefinition",
            "compositeresourcedefinitions",
            false,
            &[],
        )
        .with_kind("pkg.example.io", "v1", "Provider", "providers", false, &[])
        .with_kind("pkg.example.io", "v1", "Function", "functions", false, &[])
        .with_kind("pkg.example.io", "v1", "Configuration", "configurations", false, &[])
        .with_kind("pkg.example.io", "v1", "ProviderRevision", "providerrevisions", false, &[])
        .with_kind("pkg.example.io", "v1", "FunctionRevision", "functionrevisions", false, &[])
        .with_kind(
            "pkg.example.io",
            "v1",
            "ConfigurationRevision",
            "configurationrevisions",
            false,
            &[],
        )
        .with_kind("example.io", "v1", "Widget", "widgets", false, &["managed"])
        .with_kind("example.io", "v1", "XWidgetGroup", "xwidgetgroups", false, &["composite"])
        .with_kind("example.io", "v1", "WidgetGroup", "widgetgroups", true, &["claim"])
}

/// Control plane where definitions establish and packages install as soon as
/// they are created; example.io kinds only resolve after a mapper reset
pub fn plane() -> MemoryControlPlane {
    let mut plane = bare_plane()
        .ready_on_create(definition_kind(), &[ConditionType::ESTABLISHED])
        .hidden_until_reset(GroupKind::new("example.io", "Widget"))
        .hidden_until_reset(GroupKind::new("example.io", "XWidgetGroup"))
        .hidden_until_reset(GroupKind::new("example.io", "WidgetGroup"));
    for kind in package_kinds() {
        plane = plane.ready_on_create(kind, &[ConditionType::INSTALLED, ConditionType::HEALTHY]);
    }
    plane
}
