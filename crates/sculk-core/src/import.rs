//! Create a pack from a Modrinth `.mrpack` or a Curseforge modpack zip.

use crate::archive::read_zip;
use crate::artifact::{slug_from_filename, Artifact};
use crate::formats::{
    CurseforgePackFile, CurseforgePackManifest, MrpackFile, MrpackIndex, CURSEFORGE_MANIFEST,
    MRPACK_CLIENT_OVERRIDES, MRPACK_INDEX, MRPACK_OVERRIDES, MRPACK_SERVER_OVERRIDES,
};
use crate::init::ensure_empty_dir;
use crate::{Context, CoreError};
use rayon::prelude::*;
use sculk_remote::modrinth::HashAlgorithm;
use sculk_schema::compat::loader_from_mrpack_dependency;
use sculk_schema::{
    CurseforgeModLoader, CurseforgeSource, FileManifest, ModrinthEnvSupport, ModrinthSource,
    PackManifest, Side, Sources, UrlSource,
};
use sculk_store::{validate_pack_path, write_atomic, InMemoryPack, PackLayout, StoreError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const MODRINTH_CDN: &str = "cdn.modrinth.com";

#[derive(Debug, Default, Serialize)]
pub struct ImportReport {
    pub root: PathBuf,
    pub manifests: Vec<String>,
    pub files: Vec<String>,
    /// Entries that could not be turned into a manifest, with the reason.
    pub skipped: Vec<(String, String)>,
}

/// A file manifest resolved from an archive entry, before its path is final.
struct Resolved {
    dir: String,
    slug: String,
    manifest: FileManifest,
}

fn document<T: serde::de::DeserializeOwned>(
    entries: &BTreeMap<String, Vec<u8>>,
    name: &str,
) -> Result<T, CoreError> {
    let bytes = entries.get(name).ok_or_else(|| StoreError::Malformed {
        path: name.to_owned(),
        reason: "not present in the archive".to_owned(),
    })?;
    serde_json::from_slice(bytes).map_err(|e| {
        StoreError::Malformed {
            path: name.to_owned(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// Pick a free `<dir>/<slug>.sculk.json`, suffixing `-2`, `-3`, ... on collision.
fn free_sidecar(pack: &InMemoryPack, dir: &str, slug: &str) -> String {
    let candidate = |slug: &str| {
        if dir.is_empty() {
            format!("{slug}{}", sculk_store::FILE_MANIFEST_SUFFIX)
        } else {
            format!("{dir}/{slug}{}", sculk_store::FILE_MANIFEST_SUFFIX)
        }
    };
    let mut path = candidate(slug);
    let mut n = 2;
    while pack.contains_manifest(&path) || PackLayout::is_reserved(&path) {
        path = candidate(&format!("{slug}-{n}"));
        n += 1;
    }
    path
}

/// Write archive entries under `prefix/` into the pack as loose files.
fn write_overrides(
    pack: &mut InMemoryPack,
    entries: &BTreeMap<String, Vec<u8>>,
    prefix: &str,
    side: Side,
    report: &mut ImportReport,
) -> Result<(), CoreError> {
    let prefix = format!("{prefix}/");
    for (name, bytes) in entries {
        let Some(rel) = name.strip_prefix(&prefix) else {
            continue;
        };
        validate_pack_path(rel)?;
        if PackLayout::is_reserved(rel) {
            warn!("not importing {name}, {rel} is reserved");
            report.skipped.push((name.clone(), "reserved path".to_owned()));
            continue;
        }
        // Side-specific overrides come later and take the path over.
        let replaced = pack.manifest().file_ref(rel).map(|f| f.side);
        write_atomic(&pack.layout().resolve(rel)?, bytes)?;
        pack.add_file(rel, side)?;
        match replaced {
            Some(previous) => {
                warn!("{name} replaces the {previous} copy of {rel}");
                report
                    .skipped
                    .push((rel.to_owned(), format!("{previous} copy replaced by {name}")));
            }
            None => {
                debug!("imported {rel} ({side})");
                report.files.push(rel.to_owned());
            }
        }
    }
    Ok(())
}

fn finish(
    mut pack: InMemoryPack,
    resolved: Vec<(String, Result<Option<Resolved>, CoreError>)>,
    mut report: ImportReport,
) -> Result<ImportReport, CoreError> {
    for (label, result) in resolved {
        match result? {
            Some(r) => {
                let path = free_sidecar(&pack, &r.dir, &r.slug);
                pack.set_manifest(&path, r.manifest)?;
                report.manifests.push(path);
            }
            None => report
                .skipped
                .push((label, "no downloadable file".to_owned())),
        }
    }
    pack.save()?;
    info!(
        "imported {} manifests and {} files into {}",
        report.manifests.len(),
        report.files.len(),
        report.root.display()
    );
    Ok(report)
}

// Modrinth

fn fetch_mrpack_file(ctx: &Context<'_>, file: &MrpackFile) -> Result<(String, Artifact), CoreError> {
    let mut last_error = None;
    for url in &file.downloads {
        match Artifact::fetch(ctx, url) {
            Ok(artifact) => {
                artifact.verify_sha512(&file.path, &file.hashes.sha512)?;
                return Ok((url.clone(), artifact));
            }
            Err(e @ CoreError::Remote(_)) => {
                warn!("download of {} from {url} failed: {e}", file.path);
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_error.unwrap_or_else(|| StoreError::NoValidSource(file.path.clone()).into()))
}

fn resolve_mrpack_file(ctx: &Context<'_>, file: &MrpackFile) -> Result<Resolved, CoreError> {
    validate_pack_path(&file.path)?;
    let (dir, filename) = file
        .path
        .rsplit_once('/')
        .map_or(("", file.path.as_str()), |(d, f)| (d, f));
    let (url, artifact) = fetch_mrpack_file(ctx, file)?;
    let side = file
        .env
        .map_or(Side::Both, |env| ModrinthEnvSupport::to_side(env.client, env.server));

    let on_cdn = url::Url::parse(&url)
        .ok()
        .is_some_and(|u| u.host_str() == Some(MODRINTH_CDN));
    let project = if on_cdn {
        match ctx
            .modrinth
            .version_by_hash(&artifact.hashes.sha1, HashAlgorithm::Sha1)?
        {
            Some(version) => ctx.modrinth.project(&version.project_id)?,
            None => None,
        }
    } else {
        None
    };

    let (slug, sources) = match project {
        Some(project) => (
            project.slug,
            Sources {
                modrinth: Some(ModrinthSource {
                    project_id: project.id,
                    file_url: url,
                }),
                ..Sources::default()
            },
        ),
        None => (
            slug_from_filename(filename),
            Sources {
                url: Some(UrlSource { url }),
                ..Sources::default()
            },
        ),
    };
    let size = artifact.size();
    Ok(Resolved {
        dir: dir.to_owned(),
        slug,
        manifest: FileManifest {
            filename: filename.to_owned(),
            side,
            hashes: artifact.hashes,
            file_size: size,
            sources,
        },
    })
}

/// Import the `.mrpack` at `archive` into the new pack directory `target`.
///
/// Artifacts hosted on the Modrinth CDN are matched back to their project;
/// anything else keeps its download as a URL source.
pub fn import_modrinth(
    ctx: &Context<'_>,
    archive: &Path,
    target: &Path,
) -> Result<ImportReport, CoreError> {
    let entries = read_zip(archive)?;
    let index: MrpackIndex = document(&entries, MRPACK_INDEX)?;
    let minecraft = index.dependencies.get("minecraft").ok_or_else(|| {
        CoreError::InvalidInput(format!("{MRPACK_INDEX} does not name a Minecraft version"))
    })?;
    let (loader, loader_version) = index
        .dependencies
        .iter()
        .find_map(|(key, version)| loader_from_mrpack_dependency(key).map(|l| (l, version)))
        .ok_or_else(|| {
            CoreError::InvalidInput(format!("{MRPACK_INDEX} does not name a mod loader"))
        })?;
    ensure_empty_dir(target)?;

    let mut manifest = PackManifest::new(&index.name, minecraft, loader, loader_version);
    manifest.version.clone_from(&index.version_id);
    manifest.summary.clone_from(&index.summary);
    let mut pack = InMemoryPack::create(target, manifest);
    let mut report = ImportReport {
        root: target.to_path_buf(),
        ..ImportReport::default()
    };

    for (prefix, side) in [
        (MRPACK_OVERRIDES, Side::Both),
        (MRPACK_CLIENT_OVERRIDES, Side::ClientOnly),
        (MRPACK_SERVER_OVERRIDES, Side::ServerOnly),
    ] {
        write_overrides(&mut pack, &entries, prefix, side, &mut report)?;
    }

    let total = index.files.len();
    let resolved = index
        .files
        .par_iter()
        .enumerate()
        .map(|(i, file)| {
            let result = resolve_mrpack_file(ctx, file).map(Some);
            ctx.ui.progress(i + 1, total, &file.path);
            (file.path.clone(), result)
        })
        .collect();
    finish(pack, resolved, report)
}

// Curseforge

fn resolve_curseforge_file(
    ctx: &Context<'_>,
    entry: &CurseforgePackFile,
) -> Result<Option<Resolved>, CoreError> {
    let Some(project) = ctx.curseforge.mod_by_id(entry.project_id)? else {
        warn!("Curseforge project {} no longer exists", entry.project_id);
        return Ok(None);
    };
    let Some(file) = ctx.curseforge.file(entry.project_id, entry.file_id)? else {
        warn!("file {} of {} no longer exists", entry.file_id, project.slug);
        return Ok(None);
    };
    let Some(url) = file.download_url.clone() else {
        warn!(
            "{} does not allow third-party downloads, add it manually",
            project.name
        );
        return Ok(None);
    };

    let artifact = Artifact::fetch(ctx, &url)?;
    if let Some(sha1) = file.sha1() {
        artifact.verify_sha1(&file.file_name, sha1)?;
    }
    let kind = project.kind()?;
    debug!("resolved {} to {}", file.file_name, project.slug);
    let size = artifact.size();
    Ok(Some(Resolved {
        dir: kind.dir().to_owned(),
        slug: project.slug.clone(),
        manifest: FileManifest {
            filename: file.file_name.clone(),
            side: file.side(),
            hashes: artifact.hashes,
            file_size: size,
            sources: Sources {
                curseforge: Some(CurseforgeSource {
                    project_id: project.id,
                    file_url: url,
                    file_id: file.id,
                }),
                ..Sources::default()
            },
        },
    }))
}

/// Import the Curseforge modpack zip at `archive` into the new pack directory `target`.
///
/// Files that are gone or withheld from third-party download are reported
/// as skipped.
pub fn import_curseforge(
    ctx: &Context<'_>,
    archive: &Path,
    target: &Path,
) -> Result<ImportReport, CoreError> {
    let entries = read_zip(archive)?;
    let cf: CurseforgePackManifest = document(&entries, CURSEFORGE_MANIFEST)?;
    let loader_id = cf
        .minecraft
        .mod_loaders
        .iter()
        .find(|l| l.primary)
        .or_else(|| cf.minecraft.mod_loaders.first())
        .ok_or_else(|| {
            CoreError::InvalidInput(format!("{CURSEFORGE_MANIFEST} does not name a mod loader"))
        })?;
    let (loader, loader_version) = CurseforgeModLoader::parse_pack_loader_id(&loader_id.id)?;
    ensure_empty_dir(target)?;

    let mut manifest = PackManifest::new(&cf.name, &cf.minecraft.version, loader, &loader_version);
    manifest.version.clone_from(&cf.version);
    if !cf.author.is_empty() {
        manifest.author = Some(cf.author.clone());
    }
    let mut pack = InMemoryPack::create(target, manifest);
    let mut report = ImportReport {
        root: target.to_path_buf(),
        ..ImportReport::default()
    };
    write_overrides(&mut pack, &entries, &cf.overrides, Side::Both, &mut report)?;

    let total = cf.files.len();
    let resolved = cf
        .files
        .par_iter()
        .enumerate()
        .map(|(i, entry)| {
            let label = format!("{}/{}", entry.project_id, entry.file_id);
            let result = resolve_curseforge_file(ctx, entry);
            ctx.ui.progress(i + 1, total, &label);
            (label, result)
        })
        .collect();
    finish(pack, resolved, report)
}
