use crate::StoreError;
use std::path::{Component, Path, PathBuf};

pub const ROOT_MANIFEST: &str = "manifest.sculk.json";
pub const DEPENDENCY_GRAPH: &str = "dependency-graph.sculk.json";
pub const IGNORE_FILE: &str = ".sculkignore";
pub const INSTALL_STATE: &str = "install.sculk.json";
pub const FILE_MANIFEST_SUFFIX: &str = ".sculk.json";

/// Well-known paths inside a pack directory.
#[derive(Debug, Clone)]
pub struct PackLayout {
    root: PathBuf,
}

impl PackLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn root_manifest(&self) -> PathBuf {
        self.root.join(ROOT_MANIFEST)
    }

    #[inline]
    pub fn dependency_graph(&self) -> PathBuf {
        self.root.join(DEPENDENCY_GRAPH)
    }

    #[inline]
    pub fn ignore_file(&self) -> PathBuf {
        self.root.join(IGNORE_FILE)
    }

    /// Backup location used by migration, stamped with `timestamp`.
    pub fn root_manifest_backup(&self, timestamp: &str) -> PathBuf {
        self.root.join(format!("{ROOT_MANIFEST}.backup.{timestamp}"))
    }

    /// Resolve a pack-relative path, rejecting anything that escapes the pack.
    pub fn resolve(&self, rel: &str) -> Result<PathBuf, StoreError> {
        validate_pack_path(rel)?;
        Ok(self.root.join(rel))
    }

    /// Express `path` (inside the pack) as a `/`-separated pack-relative string.
    pub fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<&str> = rel
            .components()
            .map(|c| match c {
                Component::Normal(s) => s.to_str(),
                _ => None,
            })
            .collect::<Option<_>>()?;
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("/"))
        }
    }

    /// Files owned by sculk itself, never tracked as loose pack files.
    pub fn is_reserved(rel: &str) -> bool {
        rel == ROOT_MANIFEST
            || rel == DEPENDENCY_GRAPH
            || rel == IGNORE_FILE
            || rel == INSTALL_STATE
            || rel.starts_with(&format!("{ROOT_MANIFEST}.backup."))
            || rel == ".git"
            || rel.starts_with(".git/")
    }
}

/// Pack paths are `/`-separated, relative, and free of `.`/`..` segments.
pub fn validate_pack_path(rel: &str) -> Result<(), StoreError> {
    let invalid = || StoreError::InvalidPath(rel.to_owned());
    if rel.is_empty() || rel.starts_with('/') || rel.contains('\\') {
        return Err(invalid());
    }
    let path = Path::new(rel);
    if path.is_absolute() {
        return Err(invalid());
    }
    for segment in rel.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return Err(invalid());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_paths() {
        let layout = PackLayout::new("/packs/demo");
        assert_eq!(
            layout.root_manifest(),
            PathBuf::from("/packs/demo/manifest.sculk.json")
        );
        assert_eq!(
            layout.dependency_graph(),
            PathBuf::from("/packs/demo/dependency-graph.sculk.json")
        );
        assert!(layout
            .root_manifest_backup("20250101T000000Z")
            .ends_with("manifest.sculk.json.backup.20250101T000000Z"));
    }

    #[test]
    fn resolve_rejects_escapes() {
        let layout = PackLayout::new("/packs/demo");
        assert!(layout.resolve("mods/sodium.sculk.json").is_ok());
        for bad in ["", "/etc/passwd", "../x", "mods/../../x", "mods//x", "./x", "a\\b"] {
            assert!(
                matches!(layout.resolve(bad), Err(StoreError::InvalidPath(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn relative_uses_forward_slashes() {
        let layout = PackLayout::new("/packs/demo");
        let rel = layout.relative(Path::new("/packs/demo/config/sodium/options.json"));
        assert_eq!(rel.as_deref(), Some("config/sodium/options.json"));
        assert_eq!(layout.relative(Path::new("/packs/demo")), None);
        assert_eq!(layout.relative(Path::new("/elsewhere/x")), None);
    }

    #[test]
    fn reserved_files() {
        assert!(PackLayout::is_reserved("manifest.sculk.json"));
        assert!(PackLayout::is_reserved("manifest.sculk.json.backup.20250101T000000Z"));
        assert!(PackLayout::is_reserved(".git/HEAD"));
        assert!(PackLayout::is_reserved("install.sculk.json"));
        assert!(!PackLayout::is_reserved("config/options.txt"));
        assert!(!PackLayout::is_reserved("mods/sodium.sculk.json"));
    }
}
