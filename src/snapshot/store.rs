//! Snapshot Storage
//!
//! Holds the latest rendered exposition document in two redundant forms: a file at
//! the configured path, which also survives restarts, and an in-process copy.
//!
//! # Write protocol
//!
//! 1. write the full document to `<path>.tmp`
//! 2. rename it over `<path>` (atomic on the same filesystem)
//! 3. replace the in-memory copy under the write lock
//!
//! Readers of the file therefore see either the previous or the new document, never
//! a partial one, and the `.tmp` sibling is never read.
//!
//! # Read protocol
//!
//! The file is tried first. Any error (missing, permissions, racing an external
//! cleanup) falls back to the in-memory copy under the read lock. When neither holds
//! anything yet, the result is an empty document, which means "no metrics yet".
//!
//! # Blocking
//!
//! Both paths use plain `std::fs`. The fetch scheduler moves `write` onto the
//! blocking pool; `read` runs inline on the scrape handler, which is acceptable for
//! a document of a few hundred kilobytes read once per scrape.

use crate::error::{ExporterError, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tracing::debug;

/// Where a snapshot read was served from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    File,
    Memory,
}

/// Owned snapshot storage shared by the fetch scheduler (writer) and the snapshot
/// collector (reader)
#[derive(Debug)]
pub struct SnapshotStore {
    path: PathBuf,
    tmp_path: PathBuf,
    memory: RwLock<Vec<u8>>,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let tmp_path = tmp_sibling(&path);
        Self {
            path,
            tmp_path,
            memory: RwLock::new(Vec::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist a complete document and make it the current snapshot.
    ///
    /// On error the previous snapshot, both on disk and in memory, stays current.
    pub fn write(&self, document: &[u8]) -> Result<()> {
        std::fs::write(&self.tmp_path, document).map_err(|source| ExporterError::Persist {
            path: self.tmp_path.clone(),
            source,
        })?;

        if let Err(source) = std::fs::rename(&self.tmp_path, &self.path) {
            let _ = std::fs::remove_file(&self.tmp_path);
            return Err(ExporterError::Persist {
                path: self.path.clone(),
                source,
            });
        }

        // The buffer is always replaced whole, so a poisoned lock holds no torn data.
        let mut memory = self.memory.write().unwrap_or_else(PoisonError::into_inner);
        *memory = document.to_vec();

        Ok(())
    }

    /// Current document, from the file or the in-memory fallback
    pub fn read(&self) -> Vec<u8> {
        self.read_with_source().0
    }

    pub fn read_with_source(&self) -> (Vec<u8>, SnapshotSource) {
        match std::fs::read(&self.path) {
            Ok(data) => (data, SnapshotSource::File),
            Err(e) => {
                debug!(
                    "Snapshot file {} unreadable ({}), using in-memory copy",
                    self.path.display(),
                    e
                );
                (self.read_memory(), SnapshotSource::Memory)
            }
        }
    }

    fn read_memory(&self) -> Vec<u8> {
        self.memory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// True once a snapshot is available from either form
    pub fn has_snapshot(&self) -> bool {
        self.path.is_file()
            || !self
                .memory
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .is_empty()
    }
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}
