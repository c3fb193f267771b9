//! Attach a second platform's source to manifests that already have one.
//!
//! Lookups go by content hash only, so nothing is downloaded: Modrinth is
//! asked for the version owning each sha512, Curseforge for exact Murmur2
//! fingerprint matches in one batch.

use crate::add::{add_curseforge_file, add_modrinth_version, AddReport, Request};
use crate::{Context, CoreError, PackSession};
use rayon::prelude::*;
use sculk_remote::curseforge::FingerprintMatch;
use sculk_remote::modrinth::{HashAlgorithm, Project, Version};
use sculk_schema::FileManifest;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTarget {
    Modrinth,
    Curseforge,
}

impl fmt::Display for LinkTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LinkTarget::Modrinth => "Modrinth",
            LinkTarget::Curseforge => "Curseforge",
        })
    }
}

impl FromStr for LinkTarget {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "modrinth" | "mr" => Ok(LinkTarget::Modrinth),
            "curseforge" | "cf" => Ok(LinkTarget::Curseforge),
            _ => Err(CoreError::InvalidInput(format!(
                "unknown platform '{s}', expected modrinth or curseforge"
            ))),
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct LinkReport {
    pub linked: Vec<String>,
    pub declined: Vec<String>,
    /// Manifests the platform has no matching file for.
    pub not_found: Vec<String>,
}

fn lacks(manifest: &FileManifest, target: LinkTarget) -> bool {
    match target {
        LinkTarget::Modrinth => manifest.sources.modrinth.is_none(),
        LinkTarget::Curseforge => manifest.sources.curseforge.is_none(),
    }
}

/// Link every manifest missing a `target` source. The caller commits.
pub fn link_pack(
    ctx: &Context<'_>,
    session: &mut PackSession,
    target: LinkTarget,
    accept_all: bool,
) -> Result<LinkReport, CoreError> {
    let candidates: Vec<(String, FileManifest)> = session
        .pack
        .manifests()
        .iter()
        .filter(|(_, m)| lacks(m, target) && m.has_source())
        .map(|(p, m)| (p.clone(), m.clone()))
        .collect();
    debug!("{} manifests have no {target} source", candidates.len());

    let mut report = LinkReport::default();
    if candidates.is_empty() {
        return Ok(report);
    }
    match target {
        LinkTarget::Modrinth => {
            link_modrinth(ctx, session, candidates, accept_all, &mut report)?;
        }
        LinkTarget::Curseforge => {
            link_curseforge(ctx, session, candidates, accept_all, &mut report)?;
        }
    }
    Ok(report)
}

fn confirmed(
    ctx: &Context<'_>,
    accept_all: bool,
    path: &str,
    target: LinkTarget,
    name: &str,
) -> bool {
    accept_all
        || ctx
            .ui
            .confirm(&format!("Link {path} to {target} project {name}?"), true)
}

fn link_modrinth(
    ctx: &Context<'_>,
    session: &mut PackSession,
    candidates: Vec<(String, FileManifest)>,
    accept_all: bool,
    report: &mut LinkReport,
) -> Result<(), CoreError> {
    type Found = Option<(Project, Version)>;
    let lookups: Vec<(String, String, Result<Found, CoreError>)> = candidates
        .into_par_iter()
        .map(|(path, manifest)| {
            let found = lookup_modrinth(ctx, &manifest.hashes.sha512);
            (path, manifest.hashes.sha512, found)
        })
        .collect();

    let mut added = AddReport::default();
    for (path, sha512, found) in lookups {
        let Some((project, version)) = found? else {
            report.not_found.push(path);
            continue;
        };
        let Some(file) = version
            .files
            .iter()
            .find(|f| f.hashes.sha512.eq_ignore_ascii_case(&sha512))
        else {
            report.not_found.push(path);
            continue;
        };
        if !confirmed(ctx, accept_all, &path, LinkTarget::Modrinth, &project.title) {
            report.declined.push(path);
            continue;
        }
        let request = Request {
            path: Some(path.as_str()),
            skip_dependencies: true,
            ..Request::default()
        };
        let outcome =
            add_modrinth_version(ctx, session, &project, &version, file, request, &mut added)?;
        info!(
            "linked {} to Modrinth project {}",
            outcome.path(),
            project.slug
        );
        report.linked.push(path);
    }
    Ok(())
}

fn lookup_modrinth(
    ctx: &Context<'_>,
    sha512: &str,
) -> Result<Option<(Project, Version)>, CoreError> {
    let Some(version) = ctx.modrinth.version_by_hash(sha512, HashAlgorithm::Sha512)? else {
        return Ok(None);
    };
    Ok(ctx
        .modrinth
        .project(&version.project_id)?
        .map(|project| (project, version)))
}

/// The match for `manifest`, preferring one with the same filename.
fn best_match<'m>(
    matches: &'m [FingerprintMatch],
    manifest: &FileManifest,
) -> Option<&'m FingerprintMatch> {
    let mut candidates = matches
        .iter()
        .filter(|m| m.file.file_fingerprint == Some(manifest.hashes.murmur2));
    let first = candidates.next()?;
    Some(
        std::iter::once(first)
            .chain(candidates)
            .find(|m| m.file.file_name == manifest.filename)
            .unwrap_or(first),
    )
}

fn link_curseforge(
    ctx: &Context<'_>,
    session: &mut PackSession,
    candidates: Vec<(String, FileManifest)>,
    accept_all: bool,
    report: &mut LinkReport,
) -> Result<(), CoreError> {
    let fingerprints: Vec<u32> = candidates.iter().map(|(_, m)| m.hashes.murmur2).collect();
    let matches = ctx.curseforge.fingerprint_matches(&fingerprints)?;
    debug!("{} Curseforge fingerprint matches", matches.len());

    let mut added = AddReport::default();
    for (path, manifest) in candidates {
        let Some(found) = best_match(&matches, &manifest) else {
            report.not_found.push(path);
            continue;
        };
        let Some(project) = ctx.curseforge.mod_by_id(found.id)? else {
            report.not_found.push(path);
            continue;
        };
        if !confirmed(ctx, accept_all, &path, LinkTarget::Curseforge, &project.name) {
            report.declined.push(path);
            continue;
        }
        let request = Request {
            path: Some(path.as_str()),
            skip_dependencies: true,
            ..Request::default()
        };
        match add_curseforge_file(ctx, session, &project, &found.file, request, &mut added) {
            Ok(outcome) => {
                info!(
                    "linked {} to Curseforge project {}",
                    outcome.path(),
                    project.slug
                );
                report.linked.push(path);
            }
            Err(e @ CoreError::NotDistributable(_)) => {
                warn!("cannot link {path}: {e}");
                report.not_found.push(path);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
