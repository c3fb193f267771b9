//! Reconcile the root manifest with the files actually present in the pack.

use crate::ignore::SculkIgnore;
use crate::layout::{PackLayout, FILE_MANIFEST_SUFFIX};
use crate::pack::check_format_version;
use crate::{write_atomic, StoreError};
use sculk_schema::{encode_json, sha256_hex, FileRef, ManifestRef, PackManifest, Side};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshChange {
    ManifestMissing(String),
    ManifestRehashed(String),
    ManifestAdded(String),
    FileMissing(String),
    FileIgnored(String),
    FileRehashed(String),
    FileAdded(String),
}

impl fmt::Display for RefreshChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshChange::ManifestMissing(p) => write!(f, "manifest {p} does not exist"),
            RefreshChange::ManifestRehashed(p) => write!(f, "manifest {p} has a bad hash"),
            RefreshChange::ManifestAdded(p) => {
                write!(f, "manifest {p} is not included in the root manifest")
            }
            RefreshChange::FileMissing(p) => write!(f, "file {p} does not exist"),
            RefreshChange::FileIgnored(p) => {
                write!(f, "file {p} is ignored but tracked in the root manifest")
            }
            RefreshChange::FileRehashed(p) => write!(f, "file {p} has a bad hash"),
            RefreshChange::FileAdded(p) => {
                write!(f, "file {p} is not included in the root manifest")
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct RefreshReport {
    pub changes: Vec<RefreshChange>,
    pub written: bool,
}

impl RefreshReport {
    pub fn is_clean(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Bring `manifest.sculk.json` in line with the pack directory.
///
/// Drops references to missing files, rehashes changed ones, drops tracked
/// files now covered by `.sculkignore`, and adds untracked `*.sculk.json`
/// manifests and loose files (as [`Side::Both`]). With `check`, any divergence
/// is returned as [`StoreError::OutOfSync`] and nothing is written.
pub fn refresh_pack(root: &Path, check: bool) -> Result<RefreshReport, StoreError> {
    let layout = PackLayout::new(root);
    let manifest_path = layout.root_manifest();
    if !manifest_path.is_file() {
        return Err(StoreError::MissingManifest(
            manifest_path.display().to_string(),
        ));
    }
    let json: serde_json::Value = serde_json::from_slice(&fs::read(&manifest_path)?)?;
    check_format_version(sculk_schema::FormatVersion::from_root_json(&json)?)?;
    let mut manifest: PackManifest = serde_json::from_value(json)?;
    let ignore = SculkIgnore::load(&layout)?;

    let mut changes = Vec::new();

    let mut kept = Vec::with_capacity(manifest.manifests.len());
    for mut entry in std::mem::take(&mut manifest.manifests) {
        let full = layout.resolve(&entry.path)?;
        if !full.is_file() {
            changes.push(RefreshChange::ManifestMissing(entry.path));
            continue;
        }
        let actual = sha256_hex(&fs::read(&full)?);
        if actual != entry.sha256 {
            entry.sha256 = actual;
            changes.push(RefreshChange::ManifestRehashed(entry.path.clone()));
        }
        kept.push(entry);
    }
    manifest.manifests = kept;

    let mut kept = Vec::with_capacity(manifest.files.len());
    for mut entry in std::mem::take(&mut manifest.files) {
        let full = layout.resolve(&entry.path)?;
        if !full.is_file() {
            changes.push(RefreshChange::FileMissing(entry.path));
            continue;
        }
        if ignore.is_ignored(&entry.path) {
            changes.push(RefreshChange::FileIgnored(entry.path));
            continue;
        }
        let actual = sha256_hex(&fs::read(&full)?);
        if actual != entry.sha256 {
            entry.sha256 = actual;
            changes.push(RefreshChange::FileRehashed(entry.path.clone()));
        }
        kept.push(entry);
    }
    manifest.files = kept;

    let walker = WalkDir::new(layout.root())
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            layout
                .relative(e.path())
                .map_or(true, |rel| !PackLayout::is_reserved(&rel))
        });
    for entry in walker {
        let entry = entry.map_err(|e| StoreError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(rel) = layout.relative(entry.path()) else {
            continue;
        };
        if ignore.is_ignored(&rel) {
            continue;
        }
        if rel.ends_with(FILE_MANIFEST_SUFFIX) {
            if manifest.manifest_ref(&rel).is_none() {
                manifest.manifests.push(ManifestRef {
                    sha256: sha256_hex(&fs::read(entry.path())?),
                    path: rel.clone(),
                });
                changes.push(RefreshChange::ManifestAdded(rel));
            }
        } else if manifest.file_ref(&rel).is_none() {
            manifest.files.push(FileRef {
                sha256: sha256_hex(&fs::read(entry.path())?),
                path: rel.clone(),
                side: Side::Both,
            });
            changes.push(RefreshChange::FileAdded(rel));
        }
    }

    if check {
        if changes.is_empty() {
            return Ok(RefreshReport {
                changes,
                written: false,
            });
        }
        return Err(StoreError::OutOfSync(
            changes.iter().map(ToString::to_string).collect(),
        ));
    }

    for change in &changes {
        match change {
            RefreshChange::ManifestMissing(_)
            | RefreshChange::FileMissing(_)
            | RefreshChange::FileIgnored(_) => warn!("{change}, removing it"),
            _ => info!("{change}, updating"),
        }
    }

    let written = !changes.is_empty();
    if written {
        write_atomic(&manifest_path, &encode_json(&manifest)?)?;
    }
    Ok(RefreshReport { changes, written })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pack::InMemoryPack;
    use sculk_schema::ModLoader;

    fn init(root: &Path) {
        let mut pack = InMemoryPack::create(
            root,
            PackManifest::new("Test", "1.20.1", ModLoader::Fabric, "0.15.7"),
        );
        pack.save().unwrap();
    }

    #[test]
    fn clean_pack_is_clean() {
        let dir = tempfile::tempdir().unwrap();
        init(dir.path());
        let report = refresh_pack(dir.path(), true).unwrap();
        assert!(report.is_clean());
        assert!(!report.written);
    }

    #[test]
    fn new_loose_file_is_added_as_both() {
        let dir = tempfile::tempdir().unwrap();
        init(dir.path());
        fs::create_dir_all(dir.path().join("config")).unwrap();
        fs::write(dir.path().join("config/a.toml"), b"x = 1").unwrap();

        let report = refresh_pack(dir.path(), false).unwrap();
        assert_eq!(
            report.changes,
            vec![RefreshChange::FileAdded("config/a.toml".to_owned())]
        );
        let pack = InMemoryPack::load(dir.path()).unwrap();
        let entry = pack.manifest().file_ref("config/a.toml").unwrap();
        assert_eq!(entry.side, Side::Both);
        assert_eq!(entry.sha256, sha256_hex(b"x = 1"));
    }

    #[test]
    fn check_mode_reports_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        init(dir.path());
        let before = fs::read(dir.path().join("manifest.sculk.json")).unwrap();
        fs::write(dir.path().join("options.txt"), b"fov:90").unwrap();

        let err = refresh_pack(dir.path(), true).unwrap_err();
        assert!(matches!(err, StoreError::OutOfSync(ref v) if v.len() == 1));
        assert_eq!(fs::read(dir.path().join("manifest.sculk.json")).unwrap(), before);
    }

    #[test]
    fn ignored_and_reserved_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        init(dir.path());
        fs::write(dir.path().join(".sculkignore"), "*.log\n").unwrap();
        fs::write(dir.path().join("latest.log"), b"log").unwrap();
        fs::write(dir.path().join("install.sculk.json"), b"{}").unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".git/HEAD"), b"ref").unwrap();

        let report = refresh_pack(dir.path(), true).unwrap();
        assert!(report.is_clean());
    }

    #[test]
    fn missing_and_changed_files_are_reconciled() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"one").unwrap();
        fs::write(dir.path().join("b.txt"), b"two").unwrap();
        let mut pack = InMemoryPack::create(
            dir.path(),
            PackManifest::new("Test", "1.20.1", ModLoader::Fabric, "0.15.7"),
        );
        pack.add_file("a.txt", Side::Both).unwrap();
        pack.add_file("b.txt", Side::ClientOnly).unwrap();
        pack.save().unwrap();

        fs::remove_file(dir.path().join("a.txt")).unwrap();
        fs::write(dir.path().join("b.txt"), b"three").unwrap();

        let report = refresh_pack(dir.path(), false).unwrap();
        assert_eq!(
            report.changes,
            vec![
                RefreshChange::FileMissing("a.txt".to_owned()),
                RefreshChange::FileRehashed("b.txt".to_owned()),
            ]
        );
        let pack = InMemoryPack::load(dir.path()).unwrap();
        assert_eq!(pack.files().len(), 1);
        assert_eq!(pack.files()[0].side, Side::ClientOnly);
        assert_eq!(pack.files()[0].sha256, sha256_hex(b"three"));
    }
}
