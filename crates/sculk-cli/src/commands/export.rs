use super::{
    describe, green, json_pretty, open_session, services, with_spinner, yellow, TerminalUi,
    EXIT_SUCCESS,
};
use sculk_core::{export_curseforge, export_modrinth, export_multimc, ExportReport};
use std::path::Path;

fn print_report(report: &ExportReport, json: bool) -> Result<u8, String> {
    if json {
        println!("{}", json_pretty(report)?);
        return Ok(EXIT_SUCCESS);
    }
    println!(
        "{} {} ({} files, {} overrides)",
        green("exported"),
        report.path.display(),
        report.included,
        report.overrides
    );
    for (path, reason) in &report.skipped {
        println!("{} {path}: {reason}", yellow("skipped"));
    }
    Ok(EXIT_SUCCESS)
}

pub fn modrinth(pack: &Path, out: &Path, json: bool) -> Result<u8, String> {
    let session = open_session(pack)?;
    let report = export_modrinth(&session.pack, out).map_err(describe)?;
    print_report(&report, json)
}

pub fn curseforge(pack: &Path, out: &Path, json: bool) -> Result<u8, String> {
    let session = open_session(pack)?;
    let report = export_curseforge(&session.pack, out).map_err(describe)?;
    print_report(&report, json)
}

pub fn multimc(pack: &Path, out: &Path, pack_url: Option<&str>, json: bool) -> Result<u8, String> {
    let session = open_session(pack)?;
    let services = services()?;
    let ui = TerminalUi::new(json);
    let ctx = services.context(&ui);

    let report = with_spinner(json, "building instance", "instance built", || {
        export_multimc(&ctx, &session.pack, out, pack_url)
    })?;
    print_report(&report, json)
}
