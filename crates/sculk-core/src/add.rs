//! Adding projects to a pack from Modrinth, Curseforge or a plain URL.
//!
//! Every add ends in the same upsert: a new manifest is downloaded, hashed
//! and written to `<kind dir>/<slug>.sculk.json`. An existing manifest only
//! gains the new source, and only when its recorded hashes match what the
//! platform reports. Required dependencies are added recursively and
//! recorded in the dependency graph so that `remove` can cascade.

use crate::artifact::{artifact_path, sidecar_path, slug_from_name, Artifact};
use crate::{Context, CoreError, PackSession};
use sculk_remote::curseforge::{self, File as CurseforgeFile, Mod as CurseforgeMod};
use sculk_remote::modrinth::{self, DependencyType, Project, Version, VersionFile};
use sculk_schema::{
    CurseforgeModLoader, CurseforgeSource, FileManifest, ModLoader, ModrinthLoader,
    ModrinthSource, PackManifest, ProjectKind, Side, Sources, UrlSource,
};
use sculk_store::{validate_pack_path, StoreError};
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct AddOptions {
    pub skip_dependencies: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddedManifest {
    pub path: String,
    pub filename: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependency_of: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct AddReport {
    /// Newly created manifests, dependencies included.
    pub added: Vec<AddedManifest>,
    /// Existing manifests that gained a source.
    pub linked: Vec<String>,
    /// Dependencies or list entries that were already present.
    pub existing: Vec<String>,
}

impl AddReport {
    pub(crate) fn absorb(&mut self, other: AddReport) {
        self.added.extend(other.added);
        self.linked.extend(other.linked);
        self.existing.extend(other.existing);
    }
}

/// Where a manifest ended up after an upsert.
pub(crate) enum Upsert {
    Created(String),
    Existing(String),
}

impl Upsert {
    pub(crate) fn path(&self) -> &str {
        match self {
            Upsert::Created(p) | Upsert::Existing(p) => p,
        }
    }
}

/// Per-call knobs shared by the top-level add, dependencies and `link`.
#[derive(Clone, Copy, Default)]
pub(crate) struct Request<'a> {
    /// Manifest the new one is a dependency of.
    pub dependant: Option<&'a str>,
    /// Write to this manifest instead of `<kind dir>/<slug>.sculk.json`.
    pub path: Option<&'a str>,
    pub skip_dependencies: bool,
    /// Treat an already sourced manifest as present instead of a conflict.
    pub ignore_existing: bool,
}

fn record_edge(session: &mut PackSession, outcome: &Upsert, dependant: &str) {
    match outcome {
        Upsert::Created(path) => session.graph.add_dependency(path, dependant),
        // Never adopt something the user added explicitly.
        Upsert::Existing(path) if session.graph.is_file_dependency(path) => {
            session.graph.add_dependency(path, dependant);
        }
        Upsert::Existing(_) => {}
    }
}

fn already_sourced(
    path: &str,
    platform: &str,
    request: &Request<'_>,
    report: &mut AddReport,
) -> Result<Upsert, CoreError> {
    if request.dependant.is_some() || request.ignore_existing {
        debug!("{path} is already in the pack");
        report.existing.push(path.to_owned());
        return Ok(Upsert::Existing(path.to_owned()));
    }
    Err(CoreError::Conflict(format!(
        "{path} already has a {platform} source, did you mean `sculk update`?"
    )))
}

// Modrinth

pub fn add_modrinth(
    ctx: &Context<'_>,
    session: &mut PackSession,
    query: &str,
    options: AddOptions,
) -> Result<AddReport, CoreError> {
    let request = Request {
        skip_dependencies: options.skip_dependencies,
        ..Request::default()
    };
    add_modrinth_query(ctx, session, query, request)
}

pub(crate) fn add_modrinth_query(
    ctx: &Context<'_>,
    session: &mut PackSession,
    query: &str,
    request: Request<'_>,
) -> Result<AddReport, CoreError> {
    let (project, version) = match ctx.modrinth.project(query)? {
        Some(project) => {
            let version = modrinth_version_for(ctx, session.pack.manifest(), &project)?;
            (project, version)
        }
        None => match ctx.modrinth.version(query)? {
            Some(version) => {
                let project = ctx
                    .modrinth
                    .project(&version.project_id)?
                    .ok_or_else(|| CoreError::NotFound(version.project_id.clone()))?;
                (project, version)
            }
            None => {
                let project = search_modrinth(ctx, session.pack.manifest(), query)?;
                let version = modrinth_version_for(ctx, session.pack.manifest(), &project)?;
                (project, version)
            }
        },
    };

    let mut report = AddReport::default();
    let file = primary_file(&project, &version)?;
    add_modrinth_version(ctx, session, &project, &version, file, request, &mut report)?;
    Ok(report)
}

fn search_modrinth(
    ctx: &Context<'_>,
    manifest: &PackManifest,
    query: &str,
) -> Result<Project, CoreError> {
    let hits = ctx.modrinth.search(
        query,
        ModrinthLoader::from_loader(manifest.loader.kind),
        &manifest.minecraft,
    )?;
    let options: Vec<String> = hits
        .iter()
        .map(|h| format!("{} ({})", h.title, h.slug))
        .collect();
    let hit = if options.is_empty() {
        None
    } else {
        ctx.ui
            .select(&format!("Modrinth projects matching '{query}'"), &options)
            .and_then(|i| hits.get(i))
    }
    .ok_or_else(|| CoreError::NotFound(query.to_owned()))?;
    ctx.modrinth
        .project(&hit.project_id)?
        .ok_or_else(|| CoreError::NotFound(hit.slug.clone()))
}

/// Newest version of `project` usable in this pack.
///
/// Mods must match the pack loader (Quilt packs also take Fabric builds);
/// other project kinds only need the game version.
pub(crate) fn modrinth_version_for(
    ctx: &Context<'_>,
    manifest: &PackManifest,
    project: &Project,
) -> Result<Version, CoreError> {
    let loaders: &[ModrinthLoader] = match project.kind()? {
        ProjectKind::Mod => ModrinthLoader::compatible_with(manifest.loader.kind),
        _ => &[],
    };
    let minecraft = manifest.minecraft.as_str();
    let versions = ctx
        .modrinth
        .project_versions(&project.id, loaders, minecraft)?
        .into_iter()
        .filter(|v| {
            if loaders.is_empty() {
                v.game_versions.iter().any(|g| g == minecraft)
            } else {
                v.supports(loaders, minecraft)
            }
        })
        .collect();
    modrinth::newest(versions).ok_or_else(|| CoreError::NoCompatibleVersion(project.slug.clone()))
}

pub(crate) fn primary_file<'v>(
    project: &Project,
    version: &'v Version,
) -> Result<&'v VersionFile, CoreError> {
    version
        .primary_file()
        .ok_or_else(|| CoreError::NoCompatibleVersion(project.slug.clone()))
}

pub(crate) fn add_modrinth_version(
    ctx: &Context<'_>,
    session: &mut PackSession,
    project: &Project,
    version: &Version,
    file: &VersionFile,
    request: Request<'_>,
    report: &mut AddReport,
) -> Result<Upsert, CoreError> {
    let kind = project.kind()?;
    let path = request
        .path
        .map_or_else(|| sidecar_path(kind, &project.slug), str::to_owned);
    let source = ModrinthSource {
        project_id: project.id.clone(),
        file_url: file.url.clone(),
    };

    if let Some(existing) = session.pack.get_manifest_mut(&path) {
        if existing.sources.modrinth.is_some() {
            return already_sourced(&path, "Modrinth", &request, report);
        }
        if !existing.hashes.sha512.eq_ignore_ascii_case(&file.hashes.sha512) {
            return Err(StoreError::HashMismatch {
                path,
                expected: existing.hashes.sha512.clone(),
                actual: file.hashes.sha512.clone(),
            }
            .into());
        }
        existing.sources.modrinth = Some(source);
        info!("linked {path} to Modrinth project {}", project.slug);
        report.linked.push(path.clone());
        return Ok(Upsert::Existing(path));
    }

    validate_pack_path(&artifact_path(&path, &file.filename))?;
    let artifact = Artifact::fetch(ctx, &file.url)?;
    artifact.verify_sha512(&path, &file.hashes.sha512)?;
    let size = artifact.size();
    session.pack.set_manifest(
        &path,
        FileManifest {
            filename: file.filename.clone(),
            side: project.side(),
            hashes: artifact.hashes,
            file_size: size,
            sources: Sources {
                modrinth: Some(source),
                ..Sources::default()
            },
        },
    )?;
    info!("added {path} ({} {})", project.title, version.version_number);
    report.added.push(AddedManifest {
        path: path.clone(),
        filename: file.filename.clone(),
        dependency_of: request.dependant.map(str::to_owned),
    });

    if kind == ProjectKind::Mod && !request.skip_dependencies {
        add_modrinth_dependencies(ctx, session, version, &path, report)?;
    }
    Ok(Upsert::Created(path))
}

fn add_modrinth_dependencies(
    ctx: &Context<'_>,
    session: &mut PackSession,
    version: &Version,
    dependant: &str,
    report: &mut AddReport,
) -> Result<(), CoreError> {
    for dependency in &version.dependencies {
        let required = match dependency.dependency_type {
            DependencyType::Required => true,
            DependencyType::Optional => false,
            DependencyType::Incompatible | DependencyType::Embedded => continue,
        };
        let label = dependency
            .project_id
            .as_deref()
            .or(dependency.version_id.as_deref())
            .or(dependency.file_name.as_deref())
            .unwrap_or("unknown project")
            .to_owned();

        let resolved = match resolve_modrinth_dependency(ctx, session.pack.manifest(), dependency) {
            Ok(resolved) => resolved,
            Err(CoreError::NoCompatibleVersion(_)) => None,
            Err(e) => return Err(e),
        };
        let Some((project, dep_version)) = resolved else {
            if required {
                return Err(CoreError::UnresolvedDependency(format!(
                    "{label} (required by {dependant})"
                )));
            }
            warn!("skipping optional dependency {label} of {dependant}: no compatible version");
            continue;
        };

        if !required {
            let path = sidecar_path(project.kind()?, &project.slug);
            if session.pack.contains_manifest(&path)
                || !ctx.ui.confirm(
                    &format!(
                        "Add optional dependency {} of {dependant}?",
                        project.title
                    ),
                    false,
                )
            {
                continue;
            }
        }

        let request = Request {
            dependant: Some(dependant),
            ..Request::default()
        };
        let file = primary_file(&project, &dep_version)?;
        let outcome =
            add_modrinth_version(ctx, session, &project, &dep_version, file, request, report)?;
        record_edge(session, &outcome, dependant);
    }
    Ok(())
}

fn resolve_modrinth_dependency(
    ctx: &Context<'_>,
    manifest: &PackManifest,
    dependency: &modrinth::Dependency,
) -> Result<Option<(Project, Version)>, CoreError> {
    if let Some(version_id) = &dependency.version_id {
        if let Some(version) = ctx.modrinth.version(version_id)? {
            if let Some(project) = ctx.modrinth.project(&version.project_id)? {
                return Ok(Some((project, version)));
            }
        }
    }
    if let Some(project_id) = &dependency.project_id {
        if let Some(project) = ctx.modrinth.project(project_id)? {
            let version = modrinth_version_for(ctx, manifest, &project)?;
            return Ok(Some((project, version)));
        }
    }
    Ok(None)
}

// Curseforge

pub fn add_curseforge(
    ctx: &Context<'_>,
    session: &mut PackSession,
    query: &str,
    options: AddOptions,
) -> Result<AddReport, CoreError> {
    let request = Request {
        skip_dependencies: options.skip_dependencies,
        ..Request::default()
    };
    add_curseforge_query(ctx, session, query, request)
}

pub(crate) fn add_curseforge_query(
    ctx: &Context<'_>,
    session: &mut PackSession,
    query: &str,
    request: Request<'_>,
) -> Result<AddReport, CoreError> {
    let project = resolve_curseforge_mod(ctx, session.pack.manifest(), query)?;
    let file = curseforge_file_for(ctx, session.pack.manifest(), &project)?;
    let mut report = AddReport::default();
    add_curseforge_file(ctx, session, &project, &file, request, &mut report)?;
    Ok(report)
}

fn resolve_curseforge_mod(
    ctx: &Context<'_>,
    manifest: &PackManifest,
    query: &str,
) -> Result<CurseforgeMod, CoreError> {
    if let Ok(id) = query.parse::<u32>() {
        if let Some(found) = ctx.curseforge.mod_by_id(id)? {
            return Ok(found);
        }
    }
    if let Some(found) = ctx.curseforge.mod_by_slug(query)? {
        return Ok(found);
    }

    let mut results = ctx.curseforge.search(query, &manifest.minecraft)?;
    let options: Vec<String> = results
        .iter()
        .map(|m| format!("{} ({})", m.name, m.slug))
        .collect();
    let index = if options.is_empty() {
        None
    } else {
        ctx.ui
            .select(&format!("Curseforge projects matching '{query}'"), &options)
            .filter(|&i| i < results.len())
    }
    .ok_or_else(|| CoreError::NotFound(query.to_owned()))?;
    Ok(results.swap_remove(index))
}

/// Loaders whose Curseforge files run in a pack on `loader`.
///
/// NeoForge on 1.20.1 still loads most Forge builds.
fn curseforge_loaders(loader: ModLoader, minecraft: &str) -> Vec<CurseforgeModLoader> {
    let mut loaders = vec![CurseforgeModLoader::from_loader(loader)];
    if loader == ModLoader::Neoforge && minecraft == "1.20.1" {
        loaders.push(CurseforgeModLoader::Forge);
    }
    loaders
}

/// Newest downloadable file of `project` usable in this pack.
pub(crate) fn curseforge_file_for(
    ctx: &Context<'_>,
    manifest: &PackManifest,
    project: &CurseforgeMod,
) -> Result<CurseforgeFile, CoreError> {
    if !project.distributable() {
        return Err(CoreError::NotDistributable(project.name.clone()));
    }
    let minecraft = manifest.minecraft.as_str();
    let loaders: Vec<Option<CurseforgeModLoader>> = match project.kind()? {
        ProjectKind::Mod => curseforge_loaders(manifest.loader.kind, minecraft)
            .into_iter()
            .map(Some)
            .collect(),
        _ => vec![None],
    };

    let mut files = Vec::new();
    for loader in loaders {
        files.extend(ctx.curseforge.mod_files(project.id, minecraft, loader)?);
    }
    let files = files
        .into_iter()
        .filter(|f| f.download_url.is_some() && f.game_versions.iter().any(|g| g == minecraft))
        .collect();
    curseforge::newest(files).ok_or_else(|| CoreError::NoCompatibleVersion(project.slug.clone()))
}

pub(crate) fn add_curseforge_file(
    ctx: &Context<'_>,
    session: &mut PackSession,
    project: &CurseforgeMod,
    file: &CurseforgeFile,
    request: Request<'_>,
    report: &mut AddReport,
) -> Result<Upsert, CoreError> {
    let kind = project.kind()?;
    let path = request
        .path
        .map_or_else(|| sidecar_path(kind, &project.slug), str::to_owned);
    let url = file
        .download_url
        .as_deref()
        .ok_or_else(|| CoreError::NotDistributable(project.name.clone()))?;
    let source = CurseforgeSource {
        project_id: project.id,
        file_url: url.to_owned(),
        file_id: file.id,
    };

    if let Some(existing) = session.pack.get_manifest_mut(&path) {
        if existing.sources.curseforge.is_some() {
            return already_sourced(&path, "Curseforge", &request, report);
        }
        let matches = match (file.sha1(), file.file_fingerprint) {
            (Some(sha1), _) => existing.hashes.sha1.eq_ignore_ascii_case(sha1),
            (None, Some(fingerprint)) => existing.hashes.murmur2 == fingerprint,
            (None, None) => false,
        };
        if !matches {
            return Err(StoreError::HashMismatch {
                path,
                expected: existing.hashes.sha1.clone(),
                actual: file.sha1().unwrap_or("unknown").to_owned(),
            }
            .into());
        }
        existing.sources.curseforge = Some(source);
        info!("linked {path} to Curseforge project {}", project.slug);
        report.linked.push(path.clone());
        return Ok(Upsert::Existing(path));
    }

    validate_pack_path(&artifact_path(&path, &file.file_name))?;
    let artifact = Artifact::fetch(ctx, url)?;
    if let Some(sha1) = file.sha1() {
        artifact.verify_sha1(&path, sha1)?;
    }
    let size = artifact.size();
    session.pack.set_manifest(
        &path,
        FileManifest {
            filename: file.file_name.clone(),
            side: file.side(),
            hashes: artifact.hashes,
            file_size: size,
            sources: Sources {
                curseforge: Some(source),
                ..Sources::default()
            },
        },
    )?;
    info!("added {path} ({} {})", project.name, file.display_name);
    report.added.push(AddedManifest {
        path: path.clone(),
        filename: file.file_name.clone(),
        dependency_of: request.dependant.map(str::to_owned),
    });

    if kind == ProjectKind::Mod && !request.skip_dependencies {
        add_curseforge_dependencies(ctx, session, file, &path, report)?;
    }
    Ok(Upsert::Created(path))
}

fn add_curseforge_dependencies(
    ctx: &Context<'_>,
    session: &mut PackSession,
    file: &CurseforgeFile,
    dependant: &str,
    report: &mut AddReport,
) -> Result<(), CoreError> {
    let required: Vec<u32> = file.required_dependencies().collect();
    let optional: Vec<u32> = file.optional_dependencies().collect();
    let wanted = required
        .iter()
        .map(|&id| (id, true))
        .chain(optional.iter().map(|&id| (id, false)));

    for (mod_id, is_required) in wanted {
        let Some(project) = ctx.curseforge.mod_by_id(mod_id)? else {
            if is_required {
                return Err(CoreError::UnresolvedDependency(format!(
                    "Curseforge project {mod_id} (required by {dependant})"
                )));
            }
            warn!("skipping unknown optional dependency {mod_id} of {dependant}");
            continue;
        };

        if !is_required {
            let path = sidecar_path(project.kind()?, &project.slug);
            if session.pack.contains_manifest(&path)
                || !ctx.ui.confirm(
                    &format!("Add optional dependency {} of {dependant}?", project.name),
                    false,
                )
            {
                continue;
            }
        }

        let dep_file = match curseforge_file_for(ctx, session.pack.manifest(), &project) {
            Ok(f) => f,
            Err(e @ (CoreError::NoCompatibleVersion(_) | CoreError::NotDistributable(_))) => {
                if is_required {
                    return Err(CoreError::UnresolvedDependency(format!(
                        "{} (required by {dependant}): {e}",
                        project.slug
                    )));
                }
                warn!("skipping optional dependency {}: {e}", project.slug);
                continue;
            }
            Err(e) => return Err(e),
        };

        let request = Request {
            dependant: Some(dependant),
            ..Request::default()
        };
        let outcome = add_curseforge_file(ctx, session, &project, &dep_file, request, report)?;
        record_edge(session, &outcome, dependant);
    }
    Ok(())
}

// URL

#[derive(Debug, Clone)]
pub struct UrlAddition {
    pub name: String,
    pub url: String,
    /// Defaults to the last segment of the URL path.
    pub filename: Option<String>,
    pub side: Side,
    pub kind: ProjectKind,
}

fn filename_from_url(raw: &str) -> Result<String, CoreError> {
    let url = url::Url::parse(raw).map_err(|e| CoreError::InvalidInput(format!("{raw}: {e}")))?;
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| CoreError::InvalidInput(format!("cannot derive a filename from {raw}")))
}

pub fn add_url(
    ctx: &Context<'_>,
    session: &mut PackSession,
    addition: &UrlAddition,
) -> Result<AddReport, CoreError> {
    let slug = slug_from_name(&addition.name);
    if slug.is_empty() {
        return Err(CoreError::InvalidInput("name is empty".to_owned()));
    }
    let filename = match &addition.filename {
        Some(f) => f.clone(),
        None => filename_from_url(&addition.url)?,
    };
    let path = sidecar_path(addition.kind, &slug);
    validate_pack_path(&artifact_path(&path, &filename))?;

    let artifact = Artifact::fetch(ctx, &addition.url)?;
    let source = UrlSource {
        url: addition.url.clone(),
    };
    let mut report = AddReport::default();

    if let Some(existing) = session.pack.get_manifest_mut(&path) {
        if existing.hashes.sha512 != artifact.hashes.sha512 {
            return Err(StoreError::HashMismatch {
                path,
                expected: existing.hashes.sha512.clone(),
                actual: artifact.hashes.sha512,
            }
            .into());
        }
        existing.sources.url = Some(source);
        info!("linked {path} to {}", addition.url);
        report.linked.push(path);
        return Ok(report);
    }

    let size = artifact.size();
    session.pack.set_manifest(
        &path,
        FileManifest {
            filename: filename.clone(),
            side: addition.side,
            hashes: artifact.hashes,
            file_size: size,
            sources: Sources {
                url: Some(source),
                ..Sources::default()
            },
        },
    )?;
    info!("added {path} from {}", addition.url);
    report.added.push(AddedManifest {
        path,
        filename,
        dependency_of: None,
    });
    Ok(report)
}
