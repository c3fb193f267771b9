use super::{describe, dim, green, json_pretty, services, TerminalUi, EXIT_SUCCESS};
use sculk_core::{install_pack, PackSource};
use sculk_schema::Side;
use std::path::Path;

pub fn run(location: &str, target: &Path, side: Side, json: bool) -> Result<u8, String> {
    let source = PackSource::parse(location);
    let services = services()?;
    let ui = TerminalUi::new(json);
    let ctx = services.context(&ui);

    let report = install_pack(&ctx, &source, target, side).map_err(describe)?;

    if json {
        println!("{}", json_pretty(&report)?);
        return Ok(EXIT_SUCCESS);
    }
    println!(
        "{} {} into {}",
        green("installed"),
        report.pack,
        target.display()
    );
    println!(
        "  {} downloaded, {} copied, {} unchanged, {} removed",
        report.downloaded.len(),
        report.copied.len(),
        report.unchanged.len(),
        report.removed.len()
    );
    if !report.other_side.is_empty() {
        println!(
            "  {}",
            dim(&format!(
                "{} files skipped for the other side",
                report.other_side.len()
            ))
        );
    }
    Ok(EXIT_SUCCESS)
}
