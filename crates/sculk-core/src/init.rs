use crate::CoreError;
use sculk_schema::{ModLoader, PackManifest};
use sculk_store::InMemoryPack;
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone)]
pub struct InitOptions {
    pub name: String,
    pub minecraft: String,
    pub loader: ModLoader,
    pub loader_version: String,
    pub summary: Option<String>,
    pub author: Option<String>,
}

/// Directories that do not exist yet count as empty.
pub(crate) fn ensure_empty_dir(dir: &Path) -> Result<(), CoreError> {
    if dir.exists() {
        if !dir.is_dir() {
            return Err(CoreError::InvalidInput(format!(
                "'{}' is not a directory",
                dir.display()
            )));
        }
        if fs::read_dir(dir)?.next().is_some() {
            return Err(CoreError::NotEmpty(dir.to_path_buf()));
        }
    }
    fs::create_dir_all(dir)?;
    Ok(())
}

/// Create a new, empty pack in `dir`.
pub fn init_pack(dir: &Path, options: &InitOptions) -> Result<InMemoryPack, CoreError> {
    if options.name.trim().is_empty() {
        return Err(CoreError::InvalidInput("pack name is empty".to_owned()));
    }
    ensure_empty_dir(dir)?;

    let mut manifest = PackManifest::new(
        options.name.trim(),
        &options.minecraft,
        options.loader,
        &options.loader_version,
    );
    manifest.summary.clone_from(&options.summary);
    manifest.author.clone_from(&options.author);

    let mut pack = InMemoryPack::create(dir, manifest);
    pack.save()?;
    info!(
        "initialized pack '{}' for Minecraft {} ({} {})",
        options.name, options.minecraft, options.loader, options.loader_version
    );
    Ok(pack)
}
