//! Materialize a pack into a game or server directory.
//!
//! The pack is read from a local directory or over HTTP from a base URL that
//! serves the pack files verbatim. Every manifest is verified against the
//! root before its artifact is fetched, and every artifact against its
//! manifest before it is written. `install.sculk.json` in the target records
//! what was installed so that a later install can remove what the pack no
//! longer contains.

use crate::artifact::artifact_path;
use crate::{Context, CoreError};
use rayon::prelude::*;
use sculk_schema::{
    encode_json, sha256_hex, sha512_hex, FileManifest, FileRef, FormatVersion, ManifestRef,
    PackManifest, Side,
};
use sculk_store::{
    check_format_version, validate_pack_path, write_atomic, StoreError, INSTALL_STATE,
    ROOT_MANIFEST,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackSource {
    Local(PathBuf),
    Remote(String),
}

impl PackSource {
    /// `http(s)://` locations are remote, anything else a directory.
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            PackSource::Remote(location.trim_end_matches('/').to_owned())
        } else {
            PackSource::Local(PathBuf::from(location))
        }
    }

    fn read(&self, ctx: &Context<'_>, rel: &str) -> Result<Option<Vec<u8>>, CoreError> {
        validate_pack_path(rel)?;
        match self {
            PackSource::Local(root) => {
                let path = root.join(rel);
                if path.is_file() {
                    Ok(Some(fs::read(path)?))
                } else {
                    Ok(None)
                }
            }
            PackSource::Remote(base) => match ctx.download(&format!("{base}/{rel}")) {
                Ok(bytes) => Ok(Some(bytes)),
                Err(sculk_remote::RemoteError::NotFound(_)) => Ok(None),
                Err(e) => Err(e.into()),
            },
        }
    }

    fn describe(&self) -> String {
        match self {
            PackSource::Local(root) => root.display().to_string(),
            PackSource::Remote(base) => base.clone(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstallState {
    #[serde(default)]
    sculk_installed_items: Vec<String>,
}

impl InstallState {
    fn load(path: &Path) -> Result<Self, CoreError> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_slice(&fs::read(path)?)?)
    }
}

#[derive(Debug, Default, Serialize)]
pub struct InstallReport {
    pub pack: String,
    pub downloaded: Vec<String>,
    pub unchanged: Vec<String>,
    pub copied: Vec<String>,
    /// Manifests and files declared for the other side.
    pub other_side: Vec<String>,
    /// Previously installed items no longer in the pack.
    pub removed: Vec<String>,
}

enum Installed {
    Downloaded(String),
    Unchanged(String),
    Copied(String),
    OtherSide(String),
}

fn verified(rel: &str, bytes: &[u8], expected_sha256: &str) -> Result<(), CoreError> {
    let actual = sha256_hex(bytes);
    if actual == expected_sha256 {
        Ok(())
    } else {
        Err(StoreError::HashMismatch {
            path: rel.to_owned(),
            expected: expected_sha256.to_owned(),
            actual,
        }
        .into())
    }
}

fn read_root(ctx: &Context<'_>, source: &PackSource) -> Result<PackManifest, CoreError> {
    let bytes = source
        .read(ctx, ROOT_MANIFEST)?
        .ok_or_else(|| StoreError::MissingManifest(source.describe()))?;
    let json: serde_json::Value = serde_json::from_slice(&bytes)?;
    check_format_version(FormatVersion::from_root_json(&json)?)?;
    Ok(serde_json::from_value(json)?)
}

fn install_manifest(
    ctx: &Context<'_>,
    source: &PackSource,
    target: &Path,
    side: Side,
    entry: &ManifestRef,
) -> Result<Installed, CoreError> {
    let bytes = source
        .read(ctx, &entry.path)?
        .ok_or_else(|| StoreError::MissingFileManifest(entry.path.clone()))?;
    verified(&entry.path, &bytes, &entry.sha256)?;
    let manifest: FileManifest =
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Malformed {
            path: entry.path.clone(),
            reason: e.to_string(),
        })?;
    if !manifest.side.installs_on(side) {
        return Ok(Installed::OtherSide(entry.path.clone()));
    }

    let rel = artifact_path(&entry.path, &manifest.filename);
    validate_pack_path(&rel)?;
    let dest = target.join(&rel);
    if dest.is_file() && sha512_hex(&fs::read(&dest)?) == manifest.hashes.sha512 {
        return Ok(Installed::Unchanged(rel));
    }

    let urls = manifest.download_urls();
    if urls.is_empty() {
        return Err(StoreError::NoValidSource(entry.path.clone()).into());
    }
    let mut last_error = None;
    for url in urls {
        match ctx.download(url) {
            Ok(bytes) => {
                let actual = sha512_hex(&bytes);
                if actual != manifest.hashes.sha512 {
                    return Err(StoreError::HashMismatch {
                        path: rel,
                        expected: manifest.hashes.sha512.clone(),
                        actual,
                    }
                    .into());
                }
                write_atomic(&dest, &bytes)?;
                debug!("downloaded {rel} from {url}");
                return Ok(Installed::Downloaded(rel));
            }
            Err(e) => {
                warn!("download of {rel} from {url} failed: {e}");
                last_error = Some(e);
            }
        }
    }
    match last_error {
        Some(e) => Err(e.into()),
        None => Err(StoreError::NoValidSource(entry.path.clone()).into()),
    }
}

fn install_file(
    ctx: &Context<'_>,
    source: &PackSource,
    target: &Path,
    side: Side,
    file: &FileRef,
) -> Result<Installed, CoreError> {
    if !file.side.installs_on(side) {
        return Ok(Installed::OtherSide(file.path.clone()));
    }
    let bytes = source
        .read(ctx, &file.path)?
        .ok_or_else(|| StoreError::MissingFile(file.path.clone()))?;
    verified(&file.path, &bytes, &file.sha256)?;
    let dest = target.join(&file.path);
    if dest.is_file() && sha256_hex(&fs::read(&dest)?) == file.sha256 {
        return Ok(Installed::Unchanged(file.path.clone()));
    }
    write_atomic(&dest, &bytes)?;
    Ok(Installed::Copied(file.path.clone()))
}

/// Install the pack at `source` into `target` for `side`.
pub fn install_pack(
    ctx: &Context<'_>,
    source: &PackSource,
    target: &Path,
    side: Side,
) -> Result<InstallReport, CoreError> {
    let manifest = read_root(ctx, source)?;
    info!(
        "installing pack '{}' {} to {}",
        manifest.name,
        manifest.version,
        target.display()
    );
    fs::create_dir_all(target)?;
    let state_path = target.join(INSTALL_STATE);
    let previous = InstallState::load(&state_path)?;

    let total = manifest.manifests.len() + manifest.files.len();
    let done = AtomicUsize::new(0);
    let tick = |item: &str| {
        ctx.ui
            .progress(done.fetch_add(1, Ordering::Relaxed) + 1, total, item);
    };

    let from_manifests: Vec<Result<Installed, CoreError>> = manifest
        .manifests
        .par_iter()
        .map(|entry| {
            let result = install_manifest(ctx, source, target, side, entry);
            tick(&entry.path);
            result
        })
        .collect();
    let from_files: Vec<Result<Installed, CoreError>> = manifest
        .files
        .par_iter()
        .map(|file| {
            let result = install_file(ctx, source, target, side, file);
            tick(&file.path);
            result
        })
        .collect();

    let mut report = InstallReport {
        pack: manifest.name.clone(),
        ..InstallReport::default()
    };
    let mut installed = BTreeSet::new();
    for result in from_manifests.into_iter().chain(from_files) {
        match result? {
            Installed::Downloaded(rel) => {
                installed.insert(rel.clone());
                report.downloaded.push(rel);
            }
            Installed::Unchanged(rel) => {
                installed.insert(rel.clone());
                report.unchanged.push(rel);
            }
            Installed::Copied(rel) => {
                installed.insert(rel.clone());
                report.copied.push(rel);
            }
            Installed::OtherSide(rel) => {
                debug!("{rel} is not for the {side} side");
                report.other_side.push(rel);
            }
        }
    }

    for stale in previous
        .sculk_installed_items
        .iter()
        .filter(|item| !installed.contains(*item))
    {
        if validate_pack_path(stale).is_err() {
            warn!("ignoring invalid install record '{stale}'");
            continue;
        }
        let path = target.join(stale);
        if path.is_file() {
            fs::remove_file(&path)?;
            info!("removed {stale}, it is no longer part of the pack");
        }
        report.removed.push(stale.clone());
    }

    let state = InstallState {
        sculk_installed_items: installed.into_iter().collect(),
    };
    write_atomic(&state_path, &encode_json(&state)?)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_parsing() {
        assert_eq!(
            PackSource::parse("https://example.com/pack/"),
            PackSource::Remote("https://example.com/pack".to_owned())
        );
        assert_eq!(
            PackSource::parse("./pack"),
            PackSource::Local(PathBuf::from("./pack"))
        );
    }

    #[test]
    fn install_state_field_name() {
        let state = InstallState {
            sculk_installed_items: vec!["mods/a.jar".to_owned()],
        };
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["sculkInstalledItems"][0], "mods/a.jar");
    }

    #[test]
    fn missing_state_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let state = InstallState::load(&dir.path().join(INSTALL_STATE)).unwrap();
        assert!(state.sculk_installed_items.is_empty());
    }
}
