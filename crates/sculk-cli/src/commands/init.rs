use super::{describe, json_pretty, EXIT_SUCCESS};
use sculk_core::{init_pack, InitOptions};
use std::path::Path;

pub fn run(pack: &Path, options: &InitOptions, json: bool) -> Result<u8, String> {
    let created = init_pack(pack, options).map_err(describe)?;
    let manifest = created.manifest();
    if json {
        println!("{}", json_pretty(manifest)?);
    } else {
        println!(
            "initialized pack '{}' for Minecraft {} ({} {}) in {}",
            manifest.name,
            manifest.minecraft,
            manifest.loader.kind,
            manifest.loader.version,
            pack.display()
        );
    }
    Ok(EXIT_SUCCESS)
}
