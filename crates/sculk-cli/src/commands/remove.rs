use super::{describe, dim, green, json_pretty, open_session, yellow, EXIT_SUCCESS};
use sculk_core::remove_path;
use std::path::Path;

pub fn run(pack: &Path, path: &str, json: bool) -> Result<u8, String> {
    let mut session = open_session(pack)?;
    let report = remove_path(&mut session, path).map_err(describe)?;
    session.commit().map_err(describe)?;

    if json {
        println!("{}", json_pretty(&report)?);
        return Ok(EXIT_SUCCESS);
    }
    println!("{} {}", green("removed"), report.removed);
    for cascaded in &report.cascaded {
        println!("{} {cascaded} {}", green("removed"), dim("(no longer needed)"));
    }
    if !report.dependants.is_empty() {
        println!(
            "{} still required by: {}",
            yellow("warning:"),
            report.dependants.join(", ")
        );
    }
    Ok(EXIT_SUCCESS)
}
