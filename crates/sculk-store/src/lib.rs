//! On-disk pack model, dependency graph, format migration, and integrity checks for Sculk.
//!
//! This crate provides the storage layer: `PackLayout` for the well-known files
//! of a pack directory, `InMemoryPack` for hash-verified load/mutate/save of the
//! root manifest and its file manifests, `DependencyGraph` for tracking which
//! manifests were pulled in as dependencies of others, the `Migrator` chain that
//! upgrades older packs to the current `FormatVersion`, and `refresh_pack` for
//! reconciling the root manifest with what is actually on disk.

pub mod graph;
pub mod ignore;
pub mod integrity;
pub mod layout;
pub mod migration;
pub mod pack;

pub use graph::DependencyGraph;
pub use ignore::SculkIgnore;
pub use integrity::{refresh_pack, RefreshChange, RefreshReport};
pub use layout::{
    validate_pack_path, PackLayout, DEPENDENCY_GRAPH, FILE_MANIFEST_SUFFIX, IGNORE_FILE,
    INSTALL_STATE, ROOT_MANIFEST,
};
pub use migration::{
    apply_chain, migrate_pack, migrators, MigrationResult, Migrator, Migrator1_0, Migrator1_1,
    PackDocuments,
};
pub use pack::{check_format_version, InMemoryPack};

use sculk_schema::{FormatVersion, SchemaError};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use thiserror::Error;

/// Source of artifact bytes for operations that must re-hash remote content.
///
/// Implementations are expected to retry internally and report exhaustion as
/// [`StoreError::Fetch`].
pub trait ArtifactFetcher: Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, StoreError>;
}

/// Fsync a directory so that a preceding `rename()` is durable.
pub(crate) fn fsync_dir(dir: &Path) -> Result<(), std::io::Error> {
    let f = std::fs::File::open(dir)?;
    f.sync_all()
}

/// Replace `path` with `data` via a temp file in the same directory.
///
/// Parent directories are created as needed.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    fsync_dir(dir)?;
    Ok(())
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("pack I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no pack manifest found at {0}")]
    MissingManifest(String),
    #[error("file manifest '{0}' is referenced by the pack but does not exist")]
    MissingFileManifest(String),
    #[error("tracked file '{0}' does not exist")]
    MissingFile(String),
    #[error("hash mismatch for '{path}': expected {expected}, got {actual}")]
    HashMismatch {
        path: String,
        expected: String,
        actual: String,
    },
    #[error("pack format version {found} is out of date (current is {current}), run `sculk migrate`")]
    StaleFormatVersion {
        found: FormatVersion,
        current: FormatVersion,
    },
    #[error("pack format version {found} is newer than this build supports ({current})")]
    NewerFormatVersion {
        found: FormatVersion,
        current: FormatVersion,
    },
    #[error("'{0}' has no usable download source")]
    NoValidSource(String),
    #[error("invalid pack path '{0}': must be relative and stay inside the pack")]
    InvalidPath(String),
    #[error("'{0}' is reserved for pack metadata")]
    ReservedPath(String),
    #[error("download of {url} failed: {reason}")]
    Fetch { url: String, reason: String },
    #[error("pack is out of sync with its manifest: {}", .0.join("; "))]
    OutOfSync(Vec<String>),
    #[error("malformed document '{path}': {reason}")]
    Malformed { path: String, reason: String },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_atomic_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mods").join("a.sculk.json");
        write_atomic(&path, b"{}\n").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"{}\n");
        write_atomic(&path, b"[]\n").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"[]\n");
    }

    #[test]
    fn store_error_display_hash_mismatch() {
        let e = StoreError::HashMismatch {
            path: "mods/sodium.sculk.json".to_owned(),
            expected: "exp".to_owned(),
            actual: "act".to_owned(),
        };
        let msg = e.to_string();
        assert!(msg.starts_with("hash mismatch"));
        assert!(msg.contains("mods/sodium.sculk.json"));
        assert!(msg.contains("exp"));
        assert!(msg.contains("act"));
    }

    #[test]
    fn store_error_display_stale_version() {
        let e = StoreError::StaleFormatVersion {
            found: FormatVersion::new(1, 0),
            current: FormatVersion::CURRENT,
        };
        let msg = e.to_string();
        assert!(msg.contains("1.0"));
        assert!(msg.contains("migrate"));
    }

    #[test]
    fn store_error_display_out_of_sync() {
        let e = StoreError::OutOfSync(vec!["a".to_owned(), "b".to_owned()]);
        assert!(e.to_string().ends_with("a; b"));
    }

    #[test]
    fn store_error_display_no_valid_source() {
        let e = StoreError::NoValidSource("mods/x.sculk.json".to_owned());
        assert!(e.to_string().contains("mods/x.sculk.json"));
    }
}
