//! In-memory pack load/save and dependency cascade tests.

use sculk_schema::{
    sha256_hex, FileHashes, FileManifest, ModLoader, ModrinthSource, PackManifest, Side, Sources,
};
use sculk_store::{DependencyGraph, InMemoryPack, PackLayout, StoreError};
use std::fs;
use std::path::Path;

fn artifact(slug: &str, side: Side) -> FileManifest {
    FileManifest {
        filename: format!("{slug}-1.0.0.jar"),
        side,
        hashes: FileHashes {
            sha1: sha256_hex(slug.as_bytes())[..40].to_owned(),
            sha512: format!("{:0<128}", slug.len()),
            murmur2: slug.len() as u32,
        },
        file_size: 1000 + slug.len() as u64,
        sources: Sources {
            modrinth: Some(ModrinthSource {
                project_id: slug.to_uppercase(),
                file_url: format!("https://cdn.modrinth.com/data/{slug}/{slug}.jar"),
            }),
            ..Sources::default()
        },
    }
}

fn path(slug: &str) -> String {
    format!("mods/{slug}.sculk.json")
}

fn create_pack(root: &Path, slugs: &[&str]) -> InMemoryPack {
    let mut pack = InMemoryPack::create(
        root,
        PackManifest::new("Cascade", "1.20.1", ModLoader::Fabric, "0.15.7"),
    );
    for slug in slugs {
        pack.set_manifest(&path(slug), artifact(slug, Side::Both)).unwrap();
    }
    pack.save().unwrap();
    pack
}

/// Remove `target` and everything only it kept alive, as the remove command does.
fn remove_with_cascade(pack: &mut InMemoryPack, graph: &mut DependencyGraph, target: &str) {
    pack.remove_manifest(target);
    for freed in graph.release(target) {
        pack.remove_manifest(&freed);
    }
}

#[test]
fn save_then_load_roundtrips() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("options.txt"), b"fov:90").unwrap();
    let mut pack = InMemoryPack::create(
        dir.path(),
        PackManifest::new("Roundtrip", "1.20.1", ModLoader::Quilt, "0.23.1"),
    );
    pack.manifest_mut().summary = Some("a test pack".to_owned());
    pack.manifest_mut().author = Some("someone".to_owned());
    pack.set_manifest(&path("sodium"), artifact("sodium", Side::ClientOnly))
        .unwrap();
    pack.set_manifest(&path("lithium"), artifact("lithium", Side::Both))
        .unwrap();
    pack.add_file("options.txt", Side::ClientOnly).unwrap();
    pack.save().unwrap();

    let loaded = InMemoryPack::load(dir.path()).unwrap();
    assert_eq!(loaded.manifest(), pack.manifest());
    assert_eq!(loaded.manifests(), pack.manifests());

    // Saving an unchanged pack produces identical bytes.
    let before = fs::read(dir.path().join("manifest.sculk.json")).unwrap();
    let mut loaded = loaded;
    loaded.save().unwrap();
    assert_eq!(fs::read(dir.path().join("manifest.sculk.json")).unwrap(), before);
}

#[test]
fn refs_match_disk_after_save() {
    let dir = tempfile::tempdir().unwrap();
    let mut pack = create_pack(dir.path(), &["sodium", "iris"]);
    pack.get_manifest_mut(&path("iris")).unwrap().filename = "iris-2.0.jar".to_owned();
    pack.save().unwrap();

    for entry in &pack.manifest().manifests {
        let bytes = fs::read(dir.path().join(&entry.path)).unwrap();
        assert_eq!(entry.sha256, sha256_hex(&bytes), "{}", entry.path);
    }
}

#[test]
fn tampered_manifest_fails_load_without_mutation() {
    let dir = tempfile::tempdir().unwrap();
    create_pack(dir.path(), &["sodium"]);
    let sidecar = dir.path().join(path("sodium"));
    let mut text = fs::read_to_string(&sidecar).unwrap();
    text = text.replace("sodium-1.0.0.jar", "sodium-6.6.6.jar");
    fs::write(&sidecar, &text).unwrap();
    let root_before = fs::read(dir.path().join("manifest.sculk.json")).unwrap();

    let err = InMemoryPack::load(dir.path()).unwrap_err();
    assert!(matches!(err, StoreError::HashMismatch { ref path, .. } if path == "mods/sodium.sculk.json"));
    assert_eq!(fs::read_to_string(&sidecar).unwrap(), text);
    assert_eq!(
        fs::read(dir.path().join("manifest.sculk.json")).unwrap(),
        root_before
    );
}

#[test]
fn missing_file_manifest_fails_load() {
    let dir = tempfile::tempdir().unwrap();
    create_pack(dir.path(), &["sodium"]);
    fs::remove_file(dir.path().join(path("sodium"))).unwrap();
    assert!(matches!(
        InMemoryPack::load(dir.path()),
        Err(StoreError::MissingFileManifest(p)) if p == "mods/sodium.sculk.json"
    ));
}

#[test]
fn escaping_ref_is_rejected_on_load() {
    let dir = tempfile::tempdir().unwrap();
    create_pack(dir.path(), &[]);
    let manifest_path = dir.path().join("manifest.sculk.json");
    let mut root: serde_json::Value =
        serde_json::from_slice(&fs::read(&manifest_path).unwrap()).unwrap();
    root["manifests"] = serde_json::json!([{ "path": "../outside.sculk.json", "sha256": "x" }]);
    fs::write(&manifest_path, serde_json::to_vec(&root).unwrap()).unwrap();

    assert!(matches!(
        InMemoryPack::load(dir.path()),
        Err(StoreError::InvalidPath(_))
    ));
}

#[test]
fn cascade_removes_whole_chain() {
    // c depends on b depends on a
    let dir = tempfile::tempdir().unwrap();
    let mut pack = create_pack(dir.path(), &["a", "b", "c"]);
    let layout = PackLayout::new(dir.path());
    let mut graph = DependencyGraph::new();
    graph.add_dependency(&path("a"), &path("b"));
    graph.add_dependency(&path("b"), &path("c"));
    graph.save(&layout).unwrap();

    remove_with_cascade(&mut pack, &mut graph, &path("c"));
    pack.save().unwrap();
    graph.save(&layout).unwrap();

    let pack = InMemoryPack::load(dir.path()).unwrap();
    assert!(pack.manifests().is_empty());
    assert!(pack.manifest().manifests.is_empty());
    assert!(DependencyGraph::load(&layout).unwrap().is_empty());
    for slug in ["a", "b", "c"] {
        assert!(!dir.path().join(path(slug)).exists(), "{slug} not deleted");
    }
}

#[test]
fn cascade_keeps_dependencies_with_live_dependants() {
    let dir = tempfile::tempdir().unwrap();
    let mut pack = create_pack(dir.path(), &["fabric-api", "sodium", "lithium", "indium"]);
    let mut graph = DependencyGraph::new();
    graph.add_dependency(&path("fabric-api"), &path("sodium"));
    graph.add_dependency(&path("fabric-api"), &path("lithium"));
    graph.add_dependency(&path("indium"), &path("sodium"));

    remove_with_cascade(&mut pack, &mut graph, &path("sodium"));
    pack.save().unwrap();

    let pack = InMemoryPack::load(dir.path()).unwrap();
    let remaining: Vec<&str> = pack.manifests().keys().map(String::as_str).collect();
    assert_eq!(remaining, ["mods/fabric-api.sculk.json", "mods/lithium.sculk.json"]);
    assert_eq!(
        graph.dependants(&path("fabric-api")).unwrap(),
        [path("lithium")]
    );
}

#[test]
fn fabric_api_becomes_unused_when_sodium_goes() {
    let mut graph = DependencyGraph::new();
    graph.add_dependency("fabric-api.sculk.json", "sodium.sculk.json");
    assert!(graph.unused_dependencies().is_empty());
    graph.remove_dependant_from_all("sodium.sculk.json");
    assert_eq!(graph.unused_dependencies(), ["fabric-api.sculk.json"]);
}
