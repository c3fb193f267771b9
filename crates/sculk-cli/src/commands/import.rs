use super::{describe, green, json_pretty, services, yellow, TerminalUi, EXIT_SUCCESS};
use sculk_core::{import_curseforge, import_modrinth, Context, CoreError, ImportReport};
use std::path::Path;

fn import_with(
    json: bool,
    op: impl FnOnce(&Context<'_>) -> Result<ImportReport, CoreError>,
) -> Result<u8, String> {
    let services = services()?;
    let ui = TerminalUi::new(json);
    let ctx = services.context(&ui);
    let report = op(&ctx).map_err(describe)?;

    if json {
        println!("{}", json_pretty(&report)?);
        return Ok(EXIT_SUCCESS);
    }
    println!(
        "{} {} manifests and {} files into {}",
        green("imported"),
        report.manifests.len(),
        report.files.len(),
        report.root.display()
    );
    for (path, reason) in &report.skipped {
        println!("{} {path}: {reason}", yellow("skipped"));
    }
    Ok(EXIT_SUCCESS)
}

pub fn modrinth(archive: &Path, target: &Path, json: bool) -> Result<u8, String> {
    import_with(json, |ctx| import_modrinth(ctx, archive, target))
}

pub fn curseforge(archive: &Path, target: &Path, json: bool) -> Result<u8, String> {
    import_with(json, |ctx| import_curseforge(ctx, archive, target))
}
