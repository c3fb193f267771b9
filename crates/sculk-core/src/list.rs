//! Bulk adds from a project list.
//!
//! A list holds one `site:slug` entry per line, where `site` is `modrinth` or
//! `curseforge`.

use crate::add::{add_curseforge_query, add_modrinth_query, AddReport, Request};
use crate::{Context, CoreError, PackSession};
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEntry {
    Modrinth(String),
    Curseforge(String),
}

impl fmt::Display for ListEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListEntry::Modrinth(slug) => write!(f, "modrinth:{slug}"),
            ListEntry::Curseforge(slug) => write!(f, "curseforge:{slug}"),
        }
    }
}

impl ListEntry {
    /// Parse one list line. Blank lines give `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let parts: Vec<&str> = line.split(':').collect();
        let [site, slug] = parts.as_slice() else {
            return Err(format!("invalid line '{line}', expected <site>:<slug>"));
        };
        let slug = slug.trim();
        if slug.is_empty() {
            return Err(format!("invalid line '{line}', the slug is empty"));
        }
        match site.trim().to_ascii_lowercase().as_str() {
            "modrinth" => Ok(Some(ListEntry::Modrinth(slug.to_owned()))),
            "curseforge" => Ok(Some(ListEntry::Curseforge(slug.to_owned()))),
            other => Err(format!("invalid site '{other}'")),
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct ListReport {
    #[serde(flatten)]
    pub report: AddReport,
    /// Lines that were not added, with the reason.
    pub skipped: Vec<(String, String)>,
}

/// Add every entry of `list` to the pack. The caller commits once.
///
/// Malformed lines and projects that cannot be found or have no compatible
/// file are skipped; entries already in the pack are reported as existing.
pub fn add_list(
    ctx: &Context<'_>,
    session: &mut PackSession,
    list: &str,
) -> Result<ListReport, CoreError> {
    let mut out = ListReport::default();
    let request = Request {
        ignore_existing: true,
        ..Request::default()
    };

    for line in list.lines() {
        let entry = match ListEntry::parse(line) {
            Ok(Some(entry)) => entry,
            Ok(None) => continue,
            Err(reason) => {
                warn!("{reason}");
                out.skipped.push((line.trim().to_owned(), reason));
                continue;
            }
        };
        let result = match &entry {
            ListEntry::Modrinth(slug) => add_modrinth_query(ctx, session, slug, request),
            ListEntry::Curseforge(slug) => add_curseforge_query(ctx, session, slug, request),
        };
        match result {
            Ok(report) => out.report.absorb(report),
            Err(
                e @ (CoreError::NotFound(_)
                | CoreError::NoCompatibleVersion(_)
                | CoreError::NotDistributable(_)),
            ) => {
                warn!("skipping {entry}: {e}");
                out.skipped.push((entry.to_string(), e.to_string()));
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        "added {} manifests from the list, skipped {} lines",
        out.report.added.len(),
        out.skipped.len()
    );
    Ok(out)
}
