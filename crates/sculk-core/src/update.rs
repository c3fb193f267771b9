//! Move manifests to the newest compatible file on their platform.
//!
//! Checks run in parallel against a snapshot of the pack; the results are
//! applied to the session serially afterwards.

use crate::add::{curseforge_file_for, modrinth_version_for};
use crate::artifact::Artifact;
use crate::{Context, CoreError, PackSession};
use rayon::prelude::*;
use sculk_remote::modrinth::HashAlgorithm;
use sculk_schema::{CurseforgeSource, FileManifest, ModrinthSource, PackManifest};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct UpdatedManifest {
    pub path: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Default, Serialize)]
pub struct UpdateReport {
    pub updated: Vec<UpdatedManifest>,
    pub up_to_date: Vec<String>,
    /// Manifests with no usable newer file, with the reason.
    pub skipped: Vec<(String, String)>,
}

enum Check {
    Updated(FileManifest),
    Current,
    Skipped(String),
}

/// Update every platform-sourced manifest, or only `target`.
///
/// The caller commits the session.
pub fn update_pack(
    ctx: &Context<'_>,
    session: &mut PackSession,
    target: Option<&str>,
) -> Result<UpdateReport, CoreError> {
    let candidates: Vec<(String, FileManifest)> = match target {
        Some(path) => {
            let manifest = session.pack.get_manifest(path).ok_or_else(|| {
                CoreError::InvalidInput(format!("'{path}' is not a file manifest in this pack"))
            })?;
            if manifest.sources.curseforge.is_none() && manifest.sources.modrinth.is_none() {
                return Err(CoreError::InvalidInput(format!(
                    "'{path}' has no Modrinth or Curseforge source to update from"
                )));
            }
            vec![(path.to_owned(), manifest.clone())]
        }
        None => session
            .pack
            .manifests()
            .iter()
            .filter(|(_, m)| m.sources.curseforge.is_some() || m.sources.modrinth.is_some())
            .map(|(p, m)| (p.clone(), m.clone()))
            .collect(),
    };

    let pack_manifest = session.pack.manifest().clone();
    let total = candidates.len();
    let done = AtomicUsize::new(0);
    let checks: Vec<(String, String, Result<Check, CoreError>)> = candidates
        .into_par_iter()
        .map(|(path, manifest)| {
            let result = check_manifest(ctx, &pack_manifest, &manifest);
            ctx.ui
                .progress(done.fetch_add(1, Ordering::Relaxed) + 1, total, &path);
            (path, manifest.filename, result)
        })
        .collect();

    let mut report = UpdateReport::default();
    for (path, old_filename, result) in checks {
        match result? {
            Check::Updated(manifest) => {
                info!("updated {path}: {old_filename} -> {}", manifest.filename);
                report.updated.push(UpdatedManifest {
                    path: path.clone(),
                    from: old_filename,
                    to: manifest.filename.clone(),
                });
                session.pack.set_manifest(&path, manifest)?;
            }
            Check::Current => {
                debug!("{path} is up to date");
                report.up_to_date.push(path);
            }
            Check::Skipped(reason) => {
                warn!("not updating {path}: {reason}");
                report.skipped.push((path, reason));
            }
        }
    }
    Ok(report)
}

fn check_manifest(
    ctx: &Context<'_>,
    pack: &PackManifest,
    manifest: &FileManifest,
) -> Result<Check, CoreError> {
    let outcome = if let Some(cf) = &manifest.sources.curseforge {
        check_curseforge(ctx, pack, manifest, cf)
    } else if let Some(mr) = &manifest.sources.modrinth {
        check_modrinth(ctx, pack, manifest, mr)
    } else {
        return Ok(Check::Current);
    };
    match outcome {
        Err(
            e @ (CoreError::NoCompatibleVersion(_)
            | CoreError::NotDistributable(_)
            | CoreError::NotFound(_)),
        ) => Ok(Check::Skipped(e.to_string())),
        other => other,
    }
}

fn check_curseforge(
    ctx: &Context<'_>,
    pack: &PackManifest,
    manifest: &FileManifest,
    source: &CurseforgeSource,
) -> Result<Check, CoreError> {
    let project = ctx
        .curseforge
        .mod_by_id(source.project_id)?
        .ok_or_else(|| CoreError::NotFound(source.project_id.to_string()))?;
    let file = curseforge_file_for(ctx, pack, &project)?;
    if file.id == source.file_id {
        return Ok(Check::Current);
    }
    let Some(url) = file.download_url.clone() else {
        return Err(CoreError::NotDistributable(project.name));
    };

    let artifact = Artifact::fetch(ctx, &url)?;
    if let Some(sha1) = file.sha1() {
        artifact.verify_sha1(&file.file_name, sha1)?;
    }
    let mut updated = manifest.clone();
    updated.filename.clone_from(&file.file_name);
    updated.file_size = artifact.size();
    updated.hashes = artifact.hashes;
    updated.sources.curseforge = Some(CurseforgeSource {
        project_id: source.project_id,
        file_url: url,
        file_id: file.id,
    });
    updated.sources.url = None;
    if let Some(mr) = &manifest.sources.modrinth {
        updated.sources.modrinth = matching_modrinth_source(ctx, &updated, &mr.project_id)?;
    }
    Ok(Check::Updated(updated))
}

fn check_modrinth(
    ctx: &Context<'_>,
    pack: &PackManifest,
    manifest: &FileManifest,
    source: &ModrinthSource,
) -> Result<Check, CoreError> {
    let project = ctx
        .modrinth
        .project(&source.project_id)?
        .ok_or_else(|| CoreError::NotFound(source.project_id.clone()))?;
    let version = modrinth_version_for(ctx, pack, &project)?;
    let file = version
        .primary_file()
        .ok_or_else(|| CoreError::NoCompatibleVersion(project.slug.clone()))?;
    if file.url == source.file_url || file.hashes.sha512 == manifest.hashes.sha512 {
        return Ok(Check::Current);
    }

    let artifact = Artifact::fetch(ctx, &file.url)?;
    artifact.verify_sha512(&file.filename, &file.hashes.sha512)?;
    let mut updated = manifest.clone();
    updated.filename.clone_from(&file.filename);
    updated.file_size = artifact.size();
    updated.hashes = artifact.hashes;
    updated.sources.modrinth = Some(ModrinthSource {
        project_id: source.project_id.clone(),
        file_url: file.url.clone(),
    });
    updated.sources.url = None;
    Ok(Check::Updated(updated))
}

/// The same Modrinth project's file for the updated hashes, if it has one.
fn matching_modrinth_source(
    ctx: &Context<'_>,
    updated: &FileManifest,
    project_id: &str,
) -> Result<Option<ModrinthSource>, CoreError> {
    let found = ctx
        .modrinth
        .version_by_hash(&updated.hashes.sha512, HashAlgorithm::Sha512)?
        .filter(|v| v.project_id == project_id)
        .and_then(|v| {
            v.files
                .into_iter()
                .find(|f| f.hashes.sha512.eq_ignore_ascii_case(&updated.hashes.sha512))
        });
    if found.is_none() {
        warn!(
            "{} is not on Modrinth, dropping its Modrinth source",
            updated.filename
        );
    }
    Ok(found.map(|f| ModrinthSource {
        project_id: project_id.to_owned(),
        file_url: f.url,
    }))
}
