//! Extraction of a gzip-compressed tar archive into an [`ExportedState`]

use flate2::bufread::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{ImportError, ImportResult};
use crate::state::ExportedState;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Read the archive at `path` into memory.
///
/// Directories keep their recorded mode, regular files their contents and
/// mode. Any other entry type (links, devices) fails the extraction.
pub fn unarchive(path: &Path, cancel: &CancellationToken) -> ImportResult<ExportedState> {
    let file = File::open(path).map_err(|source| ImportError::ArchiveOpen {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(file);

    let head = reader.fill_buf().map_err(|source| ImportError::ArchiveRead {
        path: path.to_path_buf(),
        source,
    })?;
    if !head.starts_with(&GZIP_MAGIC) {
        return Err(ImportError::Decompress {
            path: path.to_path_buf(),
            message: "input is not gzip compressed".to_string(),
        });
    }

    read_archive(reader, path, cancel)
}

/// Read a gzip tar stream; `path` names the archive in errors
fn read_archive<R: BufRead>(
    reader: R,
    path: &Path,
    cancel: &CancellationToken,
) -> ImportResult<ExportedState> {
    let mut archive = tar::Archive::new(GzDecoder::new(reader));
    let read_error = |source| ImportError::ArchiveRead {
        path: path.to_path_buf(),
        source,
    };

    let mut state = ExportedState::new();
    for entry in archive.entries().map_err(read_error)? {
        if cancel.is_cancelled() {
            return Err(ImportError::Cancelled);
        }

        let mut entry = entry.map_err(read_error)?;
        let name = entry.path().map_err(read_error)?.to_string_lossy().into_owned();
        let entry_type = entry.header().entry_type();
        let mode = entry.header().mode().map_err(read_error)?;

        if entry_type.is_dir() {
            state.create_dir(&name, mode)?;
        } else if entry_type.is_file() {
            let mut contents = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut contents)
                .map_err(|source| ImportError::ArchiveEntryRead {
                    path: path.to_path_buf(),
                    entry: name.clone(),
                    source,
                })?;
            state.write_file(&name, contents, mode)?;
        } else if entry_type.is_pax_global_extensions() {
            debug!("Skipping pax global header {:?}", name);
        } else {
            return Err(ImportError::UnsupportedEntry {
                entry: name,
                entry_type: format!("{:?}", entry_type),
            });
        }
    }

    debug!(
        "Extracted {} entries from {}",
        state.len(),
        path.display()
    );
    Ok(state)
}

/// Run [`unarchive`] on the blocking pool
pub async fn extract_archive(
    path: PathBuf,
    cancel: CancellationToken,
) -> ImportResult<ExportedState> {
    tokio::task::spawn_blocking(move || unarchive(&path, &cancel))
        .await
        .map_err(|e| ImportError::Internal(format!("archive extraction task failed: {}", e)))?
}
