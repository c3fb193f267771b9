//! The authoritative runtime view of a pack.
//!
//! `InMemoryPack` owns the root manifest and every file manifest it references
//! for the duration of one command. Loading verifies every file manifest
//! against the sha256 recorded in the root; mutations stay in memory until
//! [`InMemoryPack::save`], which rewrites each manifest and then hashes the
//! bytes it actually wrote.

use crate::layout::PackLayout;
use crate::{validate_pack_path, write_atomic, StoreError};
use sculk_schema::{
    encode_json, sha256_hex, FileManifest, FileRef, FormatVersion, ManifestRef, PackManifest,
    Side,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Content paths must stay inside the pack and off the metadata files.
fn check_content_path(path: &str) -> Result<(), StoreError> {
    validate_pack_path(path)?;
    if PackLayout::is_reserved(path) {
        return Err(StoreError::ReservedPath(path.to_owned()));
    }
    Ok(())
}

#[derive(Debug)]
pub struct InMemoryPack {
    layout: PackLayout,
    manifest: PackManifest,
    manifests: BTreeMap<String, FileManifest>,
    removed: Vec<String>,
}

impl InMemoryPack {
    /// Start a pack that exists only in memory until saved (init, import).
    pub fn create(root: impl Into<std::path::PathBuf>, manifest: PackManifest) -> Self {
        Self {
            layout: PackLayout::new(root),
            manifest,
            manifests: BTreeMap::new(),
            removed: Vec::new(),
        }
    }

    /// Load and verify the pack rooted at `root`.
    ///
    /// Fails if the root manifest is missing, its format version is not
    /// exactly current, or any referenced file manifest is missing or does
    /// not hash to its recorded sha256.
    pub fn load(root: &Path) -> Result<Self, StoreError> {
        let layout = PackLayout::new(root);
        let manifest_path = layout.root_manifest();
        if !manifest_path.is_file() {
            return Err(StoreError::MissingManifest(
                manifest_path.display().to_string(),
            ));
        }

        let raw = fs::read(&manifest_path)?;
        let json: serde_json::Value = serde_json::from_slice(&raw)?;
        check_format_version(FormatVersion::from_root_json(&json)?)?;
        let manifest: PackManifest = serde_json::from_value(json)?;

        let mut manifests = BTreeMap::new();
        for entry in &manifest.manifests {
            let path = layout.resolve(&entry.path)?;
            if !path.is_file() {
                return Err(StoreError::MissingFileManifest(entry.path.clone()));
            }
            let bytes = fs::read(&path)?;
            let actual = sha256_hex(&bytes);
            if actual != entry.sha256 {
                return Err(StoreError::HashMismatch {
                    path: entry.path.clone(),
                    expected: entry.sha256.clone(),
                    actual,
                });
            }
            let file_manifest: FileManifest =
                serde_json::from_slice(&bytes).map_err(|e| StoreError::Malformed {
                    path: entry.path.clone(),
                    reason: e.to_string(),
                })?;
            manifests.insert(entry.path.clone(), file_manifest);
        }
        for file in &manifest.files {
            validate_pack_path(&file.path)?;
        }

        debug!(
            "loaded pack '{}' ({} manifests, {} files)",
            manifest.name,
            manifests.len(),
            manifest.files.len()
        );

        Ok(Self {
            layout,
            manifest,
            manifests,
            removed: Vec::new(),
        })
    }

    pub fn layout(&self) -> &PackLayout {
        &self.layout
    }

    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    pub fn manifest(&self) -> &PackManifest {
        &self.manifest
    }

    /// Mutable access to pack metadata (name, version, loader, ...).
    ///
    /// Reference lists are rebuilt by [`save`](Self::save); edit them through
    /// the manifest and file accessors instead.
    pub fn manifest_mut(&mut self) -> &mut PackManifest {
        &mut self.manifest
    }

    pub fn manifests(&self) -> &BTreeMap<String, FileManifest> {
        &self.manifests
    }

    pub fn get_manifest(&self, path: &str) -> Option<&FileManifest> {
        self.manifests.get(path)
    }

    pub fn get_manifest_mut(&mut self, path: &str) -> Option<&mut FileManifest> {
        self.manifests.get_mut(path)
    }

    pub fn contains_manifest(&self, path: &str) -> bool {
        self.manifests.contains_key(path)
    }

    /// Insert or replace the manifest at `path`.
    ///
    /// A new path gets a placeholder reference that `save` fills in.
    pub fn set_manifest(&mut self, path: &str, manifest: FileManifest) -> Result<(), StoreError> {
        check_content_path(path)?;
        if self.manifest.manifest_ref(path).is_none() {
            self.manifest.manifests.push(ManifestRef {
                path: path.to_owned(),
                sha256: String::new(),
            });
        }
        self.removed.retain(|p| p != path);
        self.manifests.insert(path.to_owned(), manifest);
        Ok(())
    }

    /// Drop a manifest from the pack; its sidecar file is deleted on save.
    pub fn remove_manifest(&mut self, path: &str) -> Option<FileManifest> {
        let removed = self.manifests.remove(path);
        self.manifest.manifests.retain(|r| r.path != path);
        if removed.is_some() && !self.removed.iter().any(|p| p == path) {
            self.removed.push(path.to_owned());
        }
        removed
    }

    pub fn files(&self) -> &[FileRef] {
        &self.manifest.files
    }

    /// Track a loose file. Its hash is computed from disk on save.
    pub fn add_file(&mut self, path: &str, side: Side) -> Result<(), StoreError> {
        check_content_path(path)?;
        match self.manifest.files.iter_mut().find(|f| f.path == path) {
            Some(existing) => existing.side = side,
            None => self.manifest.files.push(FileRef {
                path: path.to_owned(),
                side,
                sha256: String::new(),
            }),
        }
        Ok(())
    }

    /// Stop tracking a loose file. The file itself is left on disk.
    pub fn remove_file(&mut self, path: &str) -> bool {
        let before = self.manifest.files.len();
        self.manifest.files.retain(|f| f.path != path);
        self.manifest.files.len() != before
    }

    /// Write every file manifest, hash what was written, then write the root.
    ///
    /// Not atomic across files: an interrupted save is detected as a
    /// `HashMismatch` on the next load.
    pub fn save(&mut self) -> Result<(), StoreError> {
        for (path, file_manifest) in &self.manifests {
            let full = self.layout.resolve(path)?;
            write_atomic(&full, &encode_json(file_manifest)?)?;
            let sha256 = sha256_hex(&fs::read(&full)?);
            match self.manifest.manifests.iter_mut().find(|r| &r.path == path) {
                Some(entry) => entry.sha256 = sha256,
                None => self.manifest.manifests.push(ManifestRef {
                    path: path.clone(),
                    sha256,
                }),
            }
        }

        for file in &mut self.manifest.files {
            let full = self.layout.resolve(&file.path)?;
            if !full.is_file() {
                return Err(StoreError::MissingFile(file.path.clone()));
            }
            file.sha256 = sha256_hex(&fs::read(&full)?);
        }

        write_atomic(&self.layout.root_manifest(), &encode_json(&self.manifest)?)?;

        for path in self.removed.drain(..) {
            let full = self.layout.resolve(&path)?;
            if full.is_file() {
                fs::remove_file(&full)?;
                debug!("deleted {path}");
            }
        }

        info!(
            "saved pack '{}' ({} manifests, {} files)",
            self.manifest.name,
            self.manifests.len(),
            self.manifest.files.len()
        );
        Ok(())
    }
}

/// Only the current format version may be loaded; older packs need `migrate`.
pub fn check_format_version(found: FormatVersion) -> Result<(), StoreError> {
    let current = FormatVersion::CURRENT;
    if found < current {
        return Err(StoreError::StaleFormatVersion { found, current });
    }
    if found > current {
        return Err(StoreError::NewerFormatVersion { found, current });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sculk_schema::{FileHashes, ModLoader, Sources, UrlSource};

    fn artifact(name: &str) -> FileManifest {
        FileManifest {
            filename: format!("{name}.jar"),
            side: Side::Both,
            hashes: FileHashes {
                sha1: "1".repeat(40),
                sha512: "5".repeat(128),
                murmur2: 7,
            },
            file_size: 42,
            sources: Sources {
                url: Some(UrlSource {
                    url: format!("https://example.com/{name}.jar"),
                }),
                ..Sources::default()
            },
        }
    }

    fn new_pack(root: &Path) -> InMemoryPack {
        InMemoryPack::create(
            root,
            PackManifest::new("Test", "1.20.1", ModLoader::Fabric, "0.15.7"),
        )
    }

    #[test]
    fn missing_root_manifest() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            InMemoryPack::load(dir.path()),
            Err(StoreError::MissingManifest(_))
        ));
    }

    #[test]
    fn set_manifest_creates_placeholder_ref() {
        let dir = tempfile::tempdir().unwrap();
        let mut pack = new_pack(dir.path());
        pack.set_manifest("mods/a.sculk.json", artifact("a")).unwrap();
        let entry = pack.manifest().manifest_ref("mods/a.sculk.json").unwrap();
        assert!(entry.sha256.is_empty());
        assert!(!dir.path().join("mods/a.sculk.json").exists());
    }

    #[test]
    fn set_manifest_rejects_escaping_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut pack = new_pack(dir.path());
        assert!(matches!(
            pack.set_manifest("../a.sculk.json", artifact("a")),
            Err(StoreError::InvalidPath(_))
        ));
    }

    #[test]
    fn metadata_paths_cannot_hold_content() {
        let dir = tempfile::tempdir().unwrap();
        let mut pack = new_pack(dir.path());
        for reserved in ["manifest.sculk.json", "dependency-graph.sculk.json", "install.sculk.json"] {
            assert!(matches!(
                pack.set_manifest(reserved, artifact("a")),
                Err(StoreError::ReservedPath(_))
            ));
        }
        assert!(matches!(
            pack.add_file(".sculkignore", Side::Both),
            Err(StoreError::ReservedPath(_))
        ));
        assert!(pack.manifest().manifests.is_empty());
        assert!(pack.files().is_empty());
    }

    #[test]
    fn save_then_load_verifies_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let mut pack = new_pack(dir.path());
        pack.set_manifest("mods/a.sculk.json", artifact("a")).unwrap();
        pack.save().unwrap();

        let bytes = fs::read(dir.path().join("mods/a.sculk.json")).unwrap();
        let loaded = InMemoryPack::load(dir.path()).unwrap();
        assert_eq!(
            loaded.manifest().manifest_ref("mods/a.sculk.json").unwrap().sha256,
            sha256_hex(&bytes)
        );
        assert_eq!(loaded.get_manifest("mods/a.sculk.json"), Some(&artifact("a")));
    }

    #[test]
    fn remove_manifest_deletes_sidecar_on_save() {
        let dir = tempfile::tempdir().unwrap();
        let mut pack = new_pack(dir.path());
        pack.set_manifest("mods/a.sculk.json", artifact("a")).unwrap();
        pack.save().unwrap();

        let mut pack = InMemoryPack::load(dir.path()).unwrap();
        assert!(pack.remove_manifest("mods/a.sculk.json").is_some());
        assert!(dir.path().join("mods/a.sculk.json").exists());
        pack.save().unwrap();
        assert!(!dir.path().join("mods/a.sculk.json").exists());
        assert!(pack.manifest().manifests.is_empty());
    }

    #[test]
    fn loose_files_hashed_on_save() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("config")).unwrap();
        fs::write(dir.path().join("config/options.txt"), b"fov:90").unwrap();

        let mut pack = new_pack(dir.path());
        pack.add_file("config/options.txt", Side::ClientOnly).unwrap();
        pack.save().unwrap();
        let entry = pack.manifest().file_ref("config/options.txt").unwrap();
        assert_eq!(entry.sha256, sha256_hex(b"fov:90"));
        assert_eq!(entry.side, Side::ClientOnly);

        assert!(pack.remove_file("config/options.txt"));
        assert!(!pack.remove_file("config/options.txt"));
    }

    #[test]
    fn missing_loose_file_fails_save() {
        let dir = tempfile::tempdir().unwrap();
        let mut pack = new_pack(dir.path());
        pack.add_file("config/gone.txt", Side::Both).unwrap();
        assert!(matches!(pack.save(), Err(StoreError::MissingFile(_))));
    }

    #[test]
    fn format_version_gate() {
        assert!(check_format_version(FormatVersion::CURRENT).is_ok());
        assert!(matches!(
            check_format_version(FormatVersion::new(1, 0)),
            Err(StoreError::StaleFormatVersion { .. })
        ));
        assert!(matches!(
            check_format_version(FormatVersion::new(1, 2)),
            Err(StoreError::NewerFormatVersion { .. })
        ));
    }
}
