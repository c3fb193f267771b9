use super::{
    describe, dim, green, json_pretty, open_session, services, yellow, TerminalUi, EXIT_SUCCESS,
};
use sculk_core::update_pack;
use std::path::Path;

pub fn run(pack: &Path, target: Option<&str>, json: bool) -> Result<u8, String> {
    let mut session = open_session(pack)?;
    let services = services()?;
    let ui = TerminalUi::new(json);
    let ctx = services.context(&ui);

    let report = update_pack(&ctx, &mut session, target).map_err(describe)?;
    session.commit().map_err(describe)?;

    if json {
        println!("{}", json_pretty(&report)?);
        return Ok(EXIT_SUCCESS);
    }
    for updated in &report.updated {
        println!(
            "{} {}: {} -> {}",
            green("updated"),
            updated.path,
            updated.from,
            updated.to
        );
    }
    for (path, reason) in &report.skipped {
        println!("{} {path}: {reason}", yellow("skipped"));
    }
    if report.updated.is_empty() {
        println!("{}", dim("everything is up to date"));
    }
    Ok(EXIT_SUCCESS)
}
