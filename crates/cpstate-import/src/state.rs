//! In-memory store holding an extracted state
//!
//! Mirrors the archive layout: `export.yaml` plus one directory per resource
//! group, each holding one manifest file per resource.

use cpstate_core::{ExportMeta, Resource, EXPORT_META_FILE};
use std::collections::BTreeMap;

use crate::error::{ImportError, ImportResult};

/// Mode given to directories created implicitly for a file's parents
const IMPLICIT_DIR_MODE: u32 = 0o755;

/// A node in the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateEntry {
    Dir { mode: u32 },
    File { mode: u32, contents: Vec<u8> },
}

/// Directory listing item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

/// A manifest of a resource group with the file it was read from
#[derive(Debug, Clone)]
pub struct GroupManifest {
    pub file: String,
    pub resource: Resource,
}

/// Counts of what an exported state holds
#[derive(Debug, Clone)]
pub struct StateSummary {
    pub meta: ExportMeta,
    /// Manifest count per resource group
    pub groups: BTreeMap<String, usize>,
}

impl StateSummary {
    pub fn total(&self) -> usize {
        self.groups.values().sum()
    }
}

/// Normalize an archive path to `a/b/c` form, rejecting parent references
pub fn normalize_path(path: &str) -> ImportResult<String> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(ImportError::InvalidPath(path.to_string())),
            s => segments.push(s),
        }
    }
    Ok(segments.join("/"))
}

fn parent_of(path: &str) -> Option<&str> {
    path.rsplit_once('/').map(|(parent, _)| parent)
}

/// Exported state extracted from an archive
#[derive(Debug, Clone, Default)]
pub struct ExportedState {
    entries: BTreeMap<String, StateEntry>,
}

impl ExportedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, path: &str) -> Option<&StateEntry> {
        normalize_path(path)
            .ok()
            .and_then(|path| self.entries.get(&path))
    }

    pub fn is_dir(&self, path: &str) -> bool {
        match normalize_path(path) {
            Ok(path) if path.is_empty() => true,
            Ok(path) => matches!(self.entries.get(&path), Some(StateEntry::Dir { .. })),
            Err(_) => false,
        }
    }

    fn ensure_parents(&mut self, path: &str) -> ImportResult<()> {
        let mut missing = Vec::new();
        let mut current = parent_of(path);
        while let Some(dir) = current {
            match self.entries.get(dir) {
                Some(StateEntry::Dir { .. }) => break,
                Some(StateEntry::File { .. }) => {
                    return Err(ImportError::PathConflict(dir.to_string()))
                }
                None => missing.push(dir.to_string()),
            }
            current = parent_of(dir);
        }
        for dir in missing {
            self.entries.insert(dir, StateEntry::Dir {
                mode: IMPLICIT_DIR_MODE,
            });
        }
        Ok(())
    }

    /// Create a directory (and any missing parents)
    pub fn create_dir(&mut self, path: &str, mode: u32) -> ImportResult<()> {
        let path = normalize_path(path)?;
        if path.is_empty() {
            return Ok(());
        }
        if let Some(StateEntry::File { .. }) = self.entries.get(&path) {
            return Err(ImportError::PathConflict(path));
        }
        self.ensure_parents(&path)?;
        self.entries.insert(path, StateEntry::Dir { mode });
        Ok(())
    }

    /// Write a file, replacing previous contents
    pub fn write_file(&mut self, path: &str, contents: Vec<u8>, mode: u32) -> ImportResult<()> {
        let path = normalize_path(path)?;
        if path.is_empty() {
            return Err(ImportError::InvalidPath("/".to_string()));
        }
        if let Some(StateEntry::Dir { .. }) = self.entries.get(&path) {
            return Err(ImportError::PathConflict(path));
        }
        self.ensure_parents(&path)?;
        self.entries.insert(path, StateEntry::File { mode, contents });
        Ok(())
    }

    pub fn read_file(&self, path: &str) -> ImportResult<&[u8]> {
        let path = normalize_path(path)?;
        match self.entries.get(&path) {
            Some(StateEntry::File { contents, .. }) => Ok(contents),
            Some(StateEntry::Dir { .. }) => Err(ImportError::NotAFile(path)),
            None => Err(ImportError::NotFound(path)),
        }
    }

    /// List the direct children of a directory, sorted by name
    pub fn read_dir(&self, path: &str) -> ImportResult<Vec<DirEntry>> {
        let path = normalize_path(path)?;
        let prefix = if path.is_empty() {
            String::new()
        } else {
            match self.entries.get(&path) {
                Some(StateEntry::Dir { .. }) => format!("{}/", path),
                Some(StateEntry::File { .. }) => return Err(ImportError::NotADirectory(path)),
                None => return Err(ImportError::NotFound(path)),
            }
        };

        Ok(self
            .entries
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter_map(|(key, entry)| {
                let name = &key[prefix.len()..];
                (!name.contains('/')).then(|| DirEntry {
                    name: name.to_string(),
                    is_dir: matches!(entry, StateEntry::Dir { .. }),
                })
            })
            .collect())
    }

    /// Parse the root metadata record
    pub fn export_meta(&self) -> ImportResult<ExportMeta> {
        let bytes = self.read_file(EXPORT_META_FILE)?;
        Ok(ExportMeta::from_yaml_slice(bytes)?)
    }

    /// Read every manifest of a resource group in file name order.
    /// A group missing from the state has no resources.
    pub fn read_group(&self, group: &str) -> ImportResult<Vec<GroupManifest>> {
        if self.entry(group).is_none() {
            return Ok(Vec::new());
        }

        let mut resources = Vec::new();
        for item in self.read_dir(group)? {
            let file = format!("{}/{}", group, item.name);
            if item.is_dir {
                return Err(ImportError::NotAFile(file));
            }
            let bytes = self.read_file(&file)?;
            let resource = Resource::from_yaml_slice(bytes).map_err(|source| {
                ImportError::Manifest {
                    file: file.clone(),
                    source,
                }
            })?;
            resources.push(GroupManifest { file, resource });
        }
        Ok(resources)
    }

    /// Metadata record and manifest count per group
    pub fn summary(&self) -> ImportResult<StateSummary> {
        let meta = self.export_meta()?;
        let mut groups = BTreeMap::new();
        for item in self.read_dir("/")? {
            if !item.is_dir {
                continue;
            }
            let count = self
                .read_dir(&item.name)?
                .iter()
                .filter(|child| !child.is_dir)
                .count();
            groups.insert(item.name, count);
        }
        Ok(StateSummary { meta, groups })
    }
}
