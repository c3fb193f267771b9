//! Export a pack to formats other launchers understand.

use crate::archive::write_zip;
use crate::artifact::artifact_path;
use crate::formats::{
    CurseforgePackFile, CurseforgePackManifest, CurseforgePackMinecraft, CurseforgePackModLoader,
    MrpackEnv, MrpackFile, MrpackHashes, MrpackIndex, MultiMcComponent, MultiMcPack,
    CURSEFORGE_MANIFEST, CURSEFORGE_MANIFEST_TYPE, CURSEFORGE_MANIFEST_VERSION,
    CURSEFORGE_OVERRIDES, MRPACK_ALLOWED_HOSTS, MRPACK_CLIENT_OVERRIDES, MRPACK_FORMAT_VERSION,
    MRPACK_GAME, MRPACK_INDEX, MRPACK_OVERRIDES, MRPACK_SERVER_OVERRIDES, MULTIMC_GAME_DIR,
    MULTIMC_INSTANCE_CFG, MULTIMC_PACK_JSON,
};
use crate::{Context, CoreError};
use rayon::prelude::*;
use sculk_schema::compat::{mrpack_dependency_key, multimc_uid};
use sculk_schema::{
    encode_json, sha512_hex, CurseforgeModLoader, FileManifest, ModrinthEnvSupport, PackManifest,
    Side,
};
use sculk_store::{InMemoryPack, StoreError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Serialize)]
pub struct ExportReport {
    pub path: PathBuf,
    /// File manifests written into the export.
    pub included: usize,
    /// Loose files bundled as overrides.
    pub overrides: usize,
    /// File manifests left out, with the reason.
    pub skipped: Vec<(String, String)>,
}

fn archive_path(out_dir: &Path, manifest: &PackManifest, suffix: &str) -> PathBuf {
    let stem = format!("{}-{}", manifest.name, manifest.version).replace(['/', '\\'], "-");
    out_dir.join(format!("{stem}{suffix}"))
}

fn loose_file(pack: &InMemoryPack, rel: &str) -> Result<Vec<u8>, CoreError> {
    let path = pack.layout().resolve(rel)?;
    if !path.is_file() {
        return Err(StoreError::MissingFile(rel.to_owned()).into());
    }
    Ok(fs::read(path)?)
}

fn allowed_mrpack_download(raw: &str) -> bool {
    url::Url::parse(raw)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .is_some_and(|host| MRPACK_ALLOWED_HOSTS.contains(&host.as_str()))
}

fn mrpack_file(path: &str, manifest: &FileManifest) -> Option<MrpackFile> {
    let downloads: Vec<String> = manifest
        .sources
        .modrinth
        .iter()
        .map(|s| s.file_url.as_str())
        .chain(manifest.sources.url.iter().map(|s| s.url.as_str()))
        .filter(|u| allowed_mrpack_download(u))
        .map(str::to_owned)
        .collect();
    if downloads.is_empty() {
        return None;
    }
    let (client, server) = ModrinthEnvSupport::from_side(manifest.side);
    Some(MrpackFile {
        path: artifact_path(path, &manifest.filename),
        hashes: MrpackHashes {
            sha1: manifest.hashes.sha1.clone(),
            sha512: manifest.hashes.sha512.clone(),
        },
        env: Some(MrpackEnv { client, server }),
        downloads,
        file_size: manifest.file_size,
    })
}

/// Write `<name>-<version>.mrpack` into `out_dir`.
///
/// Manifests without a Modrinth or allowed-host URL source are left out.
pub fn export_modrinth(pack: &InMemoryPack, out_dir: &Path) -> Result<ExportReport, CoreError> {
    let manifest = pack.manifest();
    let mut files = Vec::new();
    let mut skipped = Vec::new();
    for (path, file_manifest) in pack.manifests() {
        match mrpack_file(path, file_manifest) {
            Some(file) => files.push(file),
            None => {
                warn!("{path} will not be included, it has no Modrinth-compatible source");
                skipped.push((path.clone(), "no Modrinth-compatible source".to_owned()));
            }
        }
    }

    let dependencies = BTreeMap::from([
        ("minecraft".to_owned(), manifest.minecraft.clone()),
        (
            mrpack_dependency_key(manifest.loader.kind).to_owned(),
            manifest.loader.version.clone(),
        ),
    ]);
    let index = MrpackIndex {
        format_version: MRPACK_FORMAT_VERSION,
        game: MRPACK_GAME.to_owned(),
        version_id: manifest.version.clone(),
        name: manifest.name.clone(),
        summary: manifest.summary.clone(),
        files,
        dependencies,
    };

    let mut entries = BTreeMap::new();
    for file in pack.files() {
        let dir = match file.side {
            Side::Both => MRPACK_OVERRIDES,
            Side::ClientOnly => MRPACK_CLIENT_OVERRIDES,
            Side::ServerOnly => MRPACK_SERVER_OVERRIDES,
        };
        entries.insert(format!("{dir}/{}", file.path), loose_file(pack, &file.path)?);
    }
    let overrides = entries.len();
    let included = index.files.len();
    entries.insert(MRPACK_INDEX.to_owned(), encode_json(&index)?);

    let path = archive_path(out_dir, manifest, ".mrpack");
    write_zip(&path, &entries)?;
    info!("exported {}", path.display());
    Ok(ExportReport {
        path,
        included,
        overrides,
        skipped,
    })
}

/// Write `<name>-<version>.zip` in the Curseforge modpack format into `out_dir`.
pub fn export_curseforge(pack: &InMemoryPack, out_dir: &Path) -> Result<ExportReport, CoreError> {
    let manifest = pack.manifest();
    let mut files = Vec::new();
    let mut skipped = Vec::new();
    for (path, file_manifest) in pack.manifests() {
        match &file_manifest.sources.curseforge {
            Some(cf) => files.push(CurseforgePackFile {
                project_id: cf.project_id,
                file_id: cf.file_id,
                required: true,
            }),
            None => {
                warn!("{path} will not be included, it has no Curseforge source");
                skipped.push((path.clone(), "no Curseforge source".to_owned()));
            }
        }
    }

    let cf_manifest = CurseforgePackManifest {
        minecraft: CurseforgePackMinecraft {
            version: manifest.minecraft.clone(),
            mod_loaders: vec![CurseforgePackModLoader {
                id: CurseforgeModLoader::pack_loader_id(
                    manifest.loader.kind,
                    &manifest.loader.version,
                ),
                primary: true,
            }],
        },
        manifest_type: CURSEFORGE_MANIFEST_TYPE.to_owned(),
        manifest_version: CURSEFORGE_MANIFEST_VERSION,
        name: manifest.name.clone(),
        version: manifest.version.clone(),
        author: manifest
            .author
            .clone()
            .unwrap_or_else(|| "Unknown".to_owned()),
        files,
        overrides: CURSEFORGE_OVERRIDES.to_owned(),
    };

    let mut entries = BTreeMap::new();
    for file in pack.files() {
        entries.insert(
            format!("{CURSEFORGE_OVERRIDES}/{}", file.path),
            loose_file(pack, &file.path)?,
        );
    }
    let overrides = entries.len();
    let included = cf_manifest.files.len();
    entries.insert(CURSEFORGE_MANIFEST.to_owned(), encode_json(&cf_manifest)?);

    let path = archive_path(out_dir, manifest, ".zip");
    write_zip(&path, &entries)?;
    info!("exported {}", path.display());
    Ok(ExportReport {
        path,
        included,
        overrides,
        skipped,
    })
}

fn instance_cfg(name: &str, pack_url: Option<&str>) -> String {
    let mut cfg = format!(
        "[General]\nConfigVersion=1.2\nInstanceType=OneSix\niconKey=default\nname={name}\n"
    );
    if let Some(url) = pack_url {
        cfg.push_str("OverrideCommands=true\n");
        cfg.push_str(&format!(
            "PreLaunchCommand=sculk install \\\"{url}\\\" \\\"$INST_MC_DIR\\\" --side client\n"
        ));
    }
    cfg
}

/// Write `<name>-<version>-multimc.zip` into `out_dir`.
///
/// Without `pack_url` every client-side artifact is downloaded and bundled
/// under `.minecraft/`. With one, the instance instead runs `sculk install`
/// against that URL before each launch.
pub fn export_multimc(
    ctx: &Context<'_>,
    pack: &InMemoryPack,
    out_dir: &Path,
    pack_url: Option<&str>,
) -> Result<ExportReport, CoreError> {
    let manifest = pack.manifest();
    let mmc_pack = MultiMcPack {
        format_version: 1,
        components: vec![
            MultiMcComponent {
                uid: "net.minecraft".to_owned(),
                version: manifest.minecraft.clone(),
            },
            MultiMcComponent {
                uid: multimc_uid(manifest.loader.kind).to_owned(),
                version: manifest.loader.version.clone(),
            },
        ],
    };

    let mut entries = BTreeMap::new();
    entries.insert(
        MULTIMC_INSTANCE_CFG.to_owned(),
        instance_cfg(&manifest.name, pack_url).into_bytes(),
    );
    entries.insert(MULTIMC_PACK_JSON.to_owned(), encode_json(&mmc_pack)?);

    let mut included = 0;
    let mut overrides = 0;
    let mut skipped = Vec::new();
    if pack_url.is_none() {
        let wanted: Vec<(&String, &FileManifest)> = pack
            .manifests()
            .iter()
            .filter(|(_, m)| m.side != Side::ServerOnly)
            .collect();
        let total = wanted.len();
        let downloads: Vec<Result<(String, Vec<u8>), CoreError>> = wanted
            .into_par_iter()
            .enumerate()
            .map(|(i, (path, file_manifest))| {
                let bytes = download_artifact(ctx, path, file_manifest)?;
                ctx.ui.progress(i + 1, total, path);
                Ok((artifact_path(path, &file_manifest.filename), bytes))
            })
            .collect();
        for download in downloads {
            let (rel, bytes) = download?;
            entries.insert(format!("{MULTIMC_GAME_DIR}/{rel}"), bytes);
            included += 1;
        }
        for file in pack.files().iter().filter(|f| f.side != Side::ServerOnly) {
            entries.insert(
                format!("{MULTIMC_GAME_DIR}/{}", file.path),
                loose_file(pack, &file.path)?,
            );
            overrides += 1;
        }
        skipped.extend(
            pack.manifests()
                .iter()
                .filter(|(_, m)| m.side == Side::ServerOnly)
                .map(|(p, _)| (p.clone(), "server only".to_owned())),
        );
    }

    let path = archive_path(out_dir, manifest, "-multimc.zip");
    write_zip(&path, &entries)?;
    info!("exported {}", path.display());
    Ok(ExportReport {
        path,
        included,
        overrides,
        skipped,
    })
}

fn download_artifact(
    ctx: &Context<'_>,
    path: &str,
    manifest: &FileManifest,
) -> Result<Vec<u8>, CoreError> {
    let url = manifest
        .download_urls()
        .first()
        .copied()
        .ok_or_else(|| StoreError::NoValidSource(path.to_owned()))?;
    let bytes = ctx.download(url)?;
    let actual = sha512_hex(&bytes);
    if actual != manifest.hashes.sha512 {
        return Err(StoreError::HashMismatch {
            path: artifact_path(path, &manifest.filename),
            expected: manifest.hashes.sha512.clone(),
            actual,
        }
        .into());
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_allowed_hosts_survive() {
        assert!(allowed_mrpack_download(
            "https://cdn.modrinth.com/data/AANobbMI/versions/x/sodium.jar"
        ));
        assert!(allowed_mrpack_download(
            "https://github.com/owner/repo/releases/download/v1/a.jar"
        ));
        assert!(!allowed_mrpack_download("https://edge.forgecdn.net/files/a.jar"));
        assert!(!allowed_mrpack_download("not a url"));
    }

    #[test]
    fn instance_cfg_with_pack_url_runs_install() {
        let plain = instance_cfg("My Pack", None);
        assert!(plain.contains("name=My Pack\n"));
        assert!(!plain.contains("PreLaunchCommand"));

        let auto = instance_cfg("My Pack", Some("https://example.com/pack"));
        assert!(auto.contains("OverrideCommands=true\n"));
        assert!(auto.contains(
            "PreLaunchCommand=sculk install \\\"https://example.com/pack\\\" \\\"$INST_MC_DIR\\\" --side client"
        ));
    }

    #[test]
    fn archive_names_are_flattened() {
        let manifest = PackManifest::new("A/B", "1.20.1", sculk_schema::ModLoader::Fabric, "0.1");
        assert_eq!(
            archive_path(Path::new("/out"), &manifest, ".mrpack"),
            PathBuf::from("/out/A-B-1.0.0.mrpack")
        );
    }
}
