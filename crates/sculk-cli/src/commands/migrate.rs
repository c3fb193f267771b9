use super::{describe, dim, green, json_pretty, services, TerminalUi, EXIT_SUCCESS};
use std::path::Path;

pub fn run(pack: &Path, json: bool) -> Result<u8, String> {
    let services = services()?;
    let ui = TerminalUi::new(json);
    let ctx = services.context(&ui);

    let result = sculk_core::migrate(&ctx, pack).map_err(describe)?;

    if json {
        let payload = match &result {
            Some(r) => serde_json::json!({
                "migrated": true,
                "from_version": r.from_version,
                "to_version": r.to_version,
                "applied": r.applied,
                "manifests_rewritten": r.manifests_rewritten,
                "backup_path": r.backup_path,
            }),
            None => serde_json::json!({ "migrated": false }),
        };
        println!("{}", json_pretty(&payload)?);
        return Ok(EXIT_SUCCESS);
    }
    match result {
        Some(r) => {
            println!(
                "{} pack from {} to {}",
                green("migrated"),
                r.from_version,
                r.to_version
            );
            println!("  manifests rewritten: {}", r.manifests_rewritten);
            println!("  backup: {}", r.backup_path.display());
        }
        None => println!("{}", dim("pack is already current")),
    }
    Ok(EXIT_SUCCESS)
}
