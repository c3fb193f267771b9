use super::{
    describe, dim, green, json_pretty, open_session, services, yellow, TerminalUi, EXIT_SUCCESS,
};
use sculk_core::{link_pack, LinkTarget};
use std::path::Path;

pub fn run(pack: &Path, platform: &str, yes: bool, json: bool) -> Result<u8, String> {
    let target: LinkTarget = platform.parse().map_err(describe)?;
    let mut session = open_session(pack)?;
    let services = services()?;
    let ui = TerminalUi::new(json);
    let ctx = services.context(&ui);

    let report = link_pack(&ctx, &mut session, target, yes).map_err(describe)?;
    session.commit().map_err(describe)?;

    if json {
        println!("{}", json_pretty(&report)?);
        return Ok(EXIT_SUCCESS);
    }
    for path in &report.linked {
        println!("{} {path} to {target}", green("linked"));
    }
    for path in &report.declined {
        println!("{}", dim(&format!("declined {path}")));
    }
    for path in &report.not_found {
        println!("{} {path} is not on {target}", yellow("skipped"));
    }
    Ok(EXIT_SUCCESS)
}
