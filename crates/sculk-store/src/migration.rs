//! Pack format migration engine.
//!
//! Migrators operate on untyped JSON trees so that no Rust type is needed for
//! historical schemas; only the fully migrated documents are deserialized into
//! the current strong types. Every step runs in memory, the result is validated,
//! and only then are files written: changed file manifests first, then the
//! dependency graph, and the root manifest last.

use crate::layout::PackLayout;
use crate::{validate_pack_path, write_atomic, ArtifactFetcher, StoreError};
use rayon::prelude::*;
use sculk_schema::{
    encode_json, murmur2, sha256_hex, FileManifest, FormatVersion, PackManifest,
};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One schema upgrade step producing [`output_version`](Migrator::output_version).
pub trait Migrator {
    fn output_version(&self) -> FormatVersion;

    /// Called once with every file manifest before any per-file migration.
    fn prepare(&mut self, _files: &BTreeMap<String, Value>) -> Result<(), StoreError> {
        Ok(())
    }

    fn migrate_root_manifest(&mut self, root: Value) -> Result<Value, StoreError> {
        stamp_format_version(root, self.output_version())
    }

    fn migrate_file_manifest(&mut self, _path: &str, json: Value) -> Result<Value, StoreError> {
        Ok(json)
    }

    /// Second pass over the root once every file manifest has been migrated.
    ///
    /// `file_hashes` maps each file manifest path to the sha256 of its
    /// migrated, encoded form.
    fn manipulate_root_post_migration(
        &mut self,
        root: Value,
        file_hashes: &BTreeMap<String, String>,
    ) -> Result<Value, StoreError> {
        apply_ref_hashes(root, file_hashes)
    }

    fn migrate_dependency_graph(&mut self, graph: Value) -> Result<Value, StoreError> {
        Ok(graph)
    }
}

/// Introduces the `formatVersion` field.
pub struct Migrator1_0;

impl Migrator for Migrator1_0 {
    fn output_version(&self) -> FormatVersion {
        FormatVersion::new(1, 0)
    }
}

/// Adds the Curseforge `murmur2` fingerprint to every file manifest.
///
/// The fingerprint is content-derived, so each artifact is downloaded again
/// from its preferred source.
pub struct Migrator1_1<'a> {
    fetcher: &'a dyn ArtifactFetcher,
    fingerprints: BTreeMap<String, u32>,
}

impl<'a> Migrator1_1<'a> {
    pub fn new(fetcher: &'a dyn ArtifactFetcher) -> Self {
        Self {
            fetcher,
            fingerprints: BTreeMap::new(),
        }
    }
}

impl Migrator for Migrator1_1<'_> {
    fn output_version(&self) -> FormatVersion {
        FormatVersion::new(1, 1)
    }

    fn prepare(&mut self, files: &BTreeMap<String, Value>) -> Result<(), StoreError> {
        let mut pending = Vec::new();
        for (path, json) in files {
            if json.pointer("/hashes/murmur2").is_some() {
                continue;
            }
            let url = preferred_download_url(json)
                .ok_or_else(|| StoreError::NoValidSource(path.clone()))?;
            pending.push((path.clone(), url));
        }

        let fetcher = self.fetcher;
        let computed: Vec<(String, u32)> = pending
            .into_par_iter()
            .map(|(path, url)| {
                debug!("fingerprinting {path} from {url}");
                fetcher.fetch(&url).map(|bytes| (path, murmur2(&bytes)))
            })
            .collect::<Result<_, _>>()?;
        self.fingerprints.extend(computed);
        Ok(())
    }

    fn migrate_file_manifest(&mut self, path: &str, mut json: Value) -> Result<Value, StoreError> {
        let Some(fingerprint) = self.fingerprints.get(path) else {
            return Ok(json);
        };
        let hashes = json
            .get_mut("hashes")
            .and_then(Value::as_object_mut)
            .ok_or_else(|| malformed(path, "missing 'hashes' object"))?;
        hashes.insert("murmur2".to_owned(), Value::from(*fingerprint));
        Ok(json)
    }
}

/// The full chain in increasing output-version order.
pub fn migrators(fetcher: &dyn ArtifactFetcher) -> Vec<Box<dyn Migrator + '_>> {
    vec![Box::new(Migrator1_0), Box::new(Migrator1_1::new(fetcher))]
}

/// Every document a migration may rewrite, as untyped JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct PackDocuments {
    pub root: Value,
    pub files: BTreeMap<String, Value>,
    pub graph: Option<Value>,
}

/// Run each migrator whose output is newer than the documents' version, in order.
///
/// Returns the migrated documents and the versions that were applied. Documents
/// already at or beyond every migrator's output are returned untouched.
pub fn apply_chain(
    mut docs: PackDocuments,
    chain: &mut [Box<dyn Migrator + '_>],
) -> Result<(PackDocuments, Vec<FormatVersion>), StoreError> {
    let mut current = FormatVersion::from_root_json(&docs.root)?;
    let mut applied = Vec::new();

    for migrator in chain.iter_mut() {
        let output = migrator.output_version();
        if output <= current {
            continue;
        }

        migrator.prepare(&docs.files)?;
        let PackDocuments { root, files, graph } = docs;
        let root = migrator.migrate_root_manifest(root)?;

        let mut migrated = BTreeMap::new();
        let mut file_hashes = BTreeMap::new();
        for (path, json) in files {
            let json = migrator.migrate_file_manifest(&path, json)?;
            file_hashes.insert(path.clone(), sha256_hex(&encode_json(&json)?));
            migrated.insert(path, json);
        }

        let root = migrator.manipulate_root_post_migration(root, &file_hashes)?;
        let graph = graph
            .map(|g| migrator.migrate_dependency_graph(g))
            .transpose()?;

        docs = PackDocuments {
            root,
            files: migrated,
            graph,
        };
        debug!("applied migrator {current} -> {output}");
        current = output;
        applied.push(output);
    }

    Ok((docs, applied))
}

/// Result of a successful migration.
#[derive(Debug)]
pub struct MigrationResult {
    pub from_version: FormatVersion,
    pub to_version: FormatVersion,
    pub applied: Vec<FormatVersion>,
    pub manifests_rewritten: usize,
    pub backup_path: PathBuf,
}

/// Migrate the pack at `root` to [`FormatVersion::CURRENT`].
///
/// - Returns `Ok(None)` if the pack is already current.
/// - Returns `Err(NewerFormatVersion)` for packs written by a newer build.
/// - Verifies every file manifest hash before migrating.
/// - Backs up the root manifest to `manifest.sculk.json.backup.{timestamp}`.
/// - Writes nothing unless the whole chain succeeds and validates.
pub fn migrate_pack(
    root: &Path,
    fetcher: &dyn ArtifactFetcher,
) -> Result<Option<MigrationResult>, StoreError> {
    let layout = PackLayout::new(root);
    let manifest_path = layout.root_manifest();
    if !manifest_path.is_file() {
        return Err(StoreError::MissingManifest(
            manifest_path.display().to_string(),
        ));
    }

    let root_json: Value = serde_json::from_slice(&fs::read(&manifest_path)?)?;
    let found = FormatVersion::from_root_json(&root_json)?;
    let current = FormatVersion::CURRENT;
    if found == current {
        return Ok(None);
    }
    if found > current {
        return Err(StoreError::NewerFormatVersion { found, current });
    }

    let mut originals = BTreeMap::new();
    let mut files = BTreeMap::new();
    for (path, sha256) in root_refs(&root_json)? {
        let full = layout.resolve(&path)?;
        if !full.is_file() {
            return Err(StoreError::MissingFileManifest(path));
        }
        let bytes = fs::read(&full)?;
        let actual = sha256_hex(&bytes);
        if actual != sha256 {
            return Err(StoreError::HashMismatch {
                path,
                expected: sha256,
                actual,
            });
        }
        let json: Value =
            serde_json::from_slice(&bytes).map_err(|e| malformed(&path, &e.to_string()))?;
        files.insert(path.clone(), json);
        originals.insert(path, bytes);
    }

    let graph_path = layout.dependency_graph();
    let graph_original = if graph_path.is_file() {
        Some(fs::read(&graph_path)?)
    } else {
        None
    };
    let graph = graph_original
        .as_deref()
        .map(serde_json::from_slice::<Value>)
        .transpose()?;

    let docs = PackDocuments {
        root: root_json,
        files,
        graph,
    };
    let mut chain = migrators(fetcher);
    let (docs, applied) = apply_chain(docs, &mut chain)?;

    // Validate against the current schema before touching the disk.
    let manifest: PackManifest = serde_json::from_value(docs.root.clone())?;
    if manifest.format_version != current {
        return Err(StoreError::StaleFormatVersion {
            found: manifest.format_version,
            current,
        });
    }
    let mut encoded = BTreeMap::new();
    for entry in &manifest.manifests {
        let json = docs
            .files
            .get(&entry.path)
            .ok_or_else(|| StoreError::MissingFileManifest(entry.path.clone()))?;
        serde_json::from_value::<FileManifest>(json.clone())
            .map_err(|e| malformed(&entry.path, &e.to_string()))?;
        let bytes = encode_json(json)?;
        let actual = sha256_hex(&bytes);
        if actual != entry.sha256 {
            return Err(StoreError::HashMismatch {
                path: entry.path.clone(),
                expected: entry.sha256.clone(),
                actual,
            });
        }
        encoded.insert(entry.path.clone(), bytes);
    }

    let timestamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
    let backup_path = layout.root_manifest_backup(&timestamp);
    fs::copy(&manifest_path, &backup_path)?;
    info!("backed up root manifest to {}", backup_path.display());

    let mut manifests_rewritten = 0;
    for (path, bytes) in &encoded {
        if originals.get(path) == Some(bytes) {
            continue;
        }
        write_atomic(&layout.resolve(path)?, bytes)?;
        manifests_rewritten += 1;
    }

    if let Some(graph) = &docs.graph {
        let bytes = encode_json(graph)?;
        if graph_original.as_deref() != Some(bytes.as_slice()) {
            write_atomic(&graph_path, &bytes)?;
        }
    }

    write_atomic(&manifest_path, &encode_json(&docs.root)?)?;

    info!(
        "migrated pack from {found} to {current} ({manifests_rewritten} manifests rewritten)"
    );

    Ok(Some(MigrationResult {
        from_version: found,
        to_version: current,
        applied,
        manifests_rewritten,
        backup_path,
    }))
}

/// Set `formatVersion`, keeping it the first key when newly added.
fn stamp_format_version(root: Value, version: FormatVersion) -> Result<Value, StoreError> {
    let Value::Object(mut obj) = root else {
        return Err(malformed(crate::layout::ROOT_MANIFEST, "not a JSON object"));
    };
    let stamped = Value::String(version.to_string());
    if let Some(existing) = obj.get_mut("formatVersion") {
        *existing = stamped;
        return Ok(Value::Object(obj));
    }
    let mut out = Map::with_capacity(obj.len() + 1);
    out.insert("formatVersion".to_owned(), stamped);
    out.append(&mut obj);
    Ok(Value::Object(out))
}

/// Rewrite `manifests[].sha256` for every path present in `file_hashes`.
fn apply_ref_hashes(
    mut root: Value,
    file_hashes: &BTreeMap<String, String>,
) -> Result<Value, StoreError> {
    let Some(refs) = root.get_mut("manifests").and_then(Value::as_array_mut) else {
        return Ok(root);
    };
    for entry in refs {
        let Some(path) = entry.get("path").and_then(Value::as_str) else {
            return Err(malformed(
                crate::layout::ROOT_MANIFEST,
                "manifest reference without a path",
            ));
        };
        if let Some(hash) = file_hashes.get(path) {
            entry["sha256"] = Value::String(hash.clone());
        }
    }
    Ok(root)
}

fn root_refs(root: &Value) -> Result<Vec<(String, String)>, StoreError> {
    let Some(refs) = root.get("manifests") else {
        return Ok(Vec::new());
    };
    let refs = refs
        .as_array()
        .ok_or_else(|| malformed(crate::layout::ROOT_MANIFEST, "'manifests' is not an array"))?;
    refs.iter()
        .map(|entry| {
            let path = entry.get("path").and_then(Value::as_str);
            let sha256 = entry.get("sha256").and_then(Value::as_str);
            match (path, sha256) {
                (Some(path), Some(sha256)) => {
                    validate_pack_path(path)?;
                    Ok((path.to_owned(), sha256.to_owned()))
                }
                _ => Err(malformed(
                    crate::layout::ROOT_MANIFEST,
                    "manifest reference needs 'path' and 'sha256'",
                )),
            }
        })
        .collect()
}

/// Download URL in install priority order: direct URL, Modrinth, Curseforge.
fn preferred_download_url(file: &Value) -> Option<String> {
    ["/sources/url/url", "/sources/modrinth/fileUrl", "/sources/curseforge/fileUrl"]
        .iter()
        .find_map(|ptr| file.pointer(ptr).and_then(Value::as_str))
        .map(str::to_owned)
}

fn malformed(path: &str, reason: &str) -> StoreError {
    StoreError::Malformed {
        path: path.to_owned(),
        reason: reason.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct NoFetch;

    impl ArtifactFetcher for NoFetch {
        fn fetch(&self, url: &str) -> Result<Vec<u8>, StoreError> {
            Err(StoreError::Fetch {
                url: url.to_owned(),
                reason: "offline".to_owned(),
            })
        }
    }

    #[test]
    fn stamp_puts_new_version_first() {
        let root = stamp_format_version(json!({ "name": "x" }), FormatVersion::new(1, 0)).unwrap();
        let keys: Vec<&String> = root.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["formatVersion", "name"]);
        assert_eq!(root["formatVersion"], "1.0");

        let root = stamp_format_version(root, FormatVersion::new(1, 1)).unwrap();
        assert_eq!(root["formatVersion"], "1.1");
        assert_eq!(root.as_object().unwrap().len(), 2);
    }

    #[test]
    fn ref_hashes_only_touch_known_paths() {
        let root = json!({
            "manifests": [
                { "path": "a", "sha256": "old-a" },
                { "path": "b", "sha256": "old-b" }
            ]
        });
        let hashes = BTreeMap::from([("a".to_owned(), "new-a".to_owned())]);
        let root = apply_ref_hashes(root, &hashes).unwrap();
        assert_eq!(root["manifests"][0]["sha256"], "new-a");
        assert_eq!(root["manifests"][1]["sha256"], "old-b");
    }

    #[test]
    fn preferred_url_order() {
        let file = json!({
            "sources": {
                "curseforge": { "fileUrl": "cf" },
                "modrinth": { "fileUrl": "mr" }
            }
        });
        assert_eq!(preferred_download_url(&file).as_deref(), Some("mr"));
        assert_eq!(preferred_download_url(&json!({ "sources": {} })), None);
    }

    #[test]
    fn chain_is_a_noop_on_current_documents() {
        let docs = PackDocuments {
            root: json!({ "formatVersion": "1.1", "name": "x", "manifests": [] }),
            files: BTreeMap::new(),
            graph: None,
        };
        let mut chain = migrators(&NoFetch);
        let (out, applied) = apply_chain(docs.clone(), &mut chain).unwrap();
        assert!(applied.is_empty());
        assert_eq!(out, docs);
    }

    #[test]
    fn chain_skips_migrators_already_applied() {
        let file = json!({
            "filename": "a.jar",
            "hashes": { "sha1": "1", "sha512": "5", "murmur2": 9 },
            "sources": {}
        });
        let docs = PackDocuments {
            root: json!({ "name": "x", "manifests": [ { "path": "a", "sha256": "stale" } ] }),
            files: BTreeMap::from([("a".to_owned(), file.clone())]),
            graph: Some(json!({})),
        };
        let mut chain = migrators(&NoFetch);
        let (out, applied) = apply_chain(docs, &mut chain).unwrap();
        assert_eq!(applied, vec![FormatVersion::new(1, 0), FormatVersion::new(1, 1)]);
        assert_eq!(out.root["formatVersion"], "1.1");
        assert_eq!(out.files["a"], file);
        assert_eq!(
            out.root["manifests"][0]["sha256"],
            sha256_hex(&encode_json(&file).unwrap())
        );
    }

    #[test]
    fn fingerprint_needs_a_source() {
        let docs = PackDocuments {
            root: json!({ "formatVersion": "1.0", "manifests": [] }),
            files: BTreeMap::from([(
                "a".to_owned(),
                json!({ "hashes": { "sha1": "1", "sha512": "5" }, "sources": {} }),
            )]),
            graph: None,
        };
        let mut chain = migrators(&NoFetch);
        assert!(matches!(
            apply_chain(docs, &mut chain),
            Err(StoreError::NoValidSource(p)) if p == "a"
        ));
    }

    #[test]
    fn fetch_failure_propagates() {
        let docs = PackDocuments {
            root: json!({ "formatVersion": "1.0", "manifests": [] }),
            files: BTreeMap::from([(
                "a".to_owned(),
                json!({
                    "hashes": { "sha1": "1", "sha512": "5" },
                    "sources": { "url": { "url": "https://example.com/a.jar" } }
                }),
            )]),
            graph: None,
        };
        let mut chain = migrators(&NoFetch);
        assert!(matches!(
            apply_chain(docs, &mut chain),
            Err(StoreError::Fetch { .. })
        ));
    }
}
