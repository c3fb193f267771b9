use super::{describe, dim, green, json_pretty, EXIT_SUCCESS};
use sculk_core::refresh_pack;
use std::path::Path;

pub fn run(pack: &Path, check: bool, json: bool) -> Result<u8, String> {
    let report = refresh_pack(pack, check).map_err(describe)?;

    if json {
        let payload = serde_json::json!({
            "changes": report.changes.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "written": report.written,
        });
        println!("{}", json_pretty(&payload)?);
        return Ok(EXIT_SUCCESS);
    }
    for change in &report.changes {
        println!("{change}");
    }
    if report.is_clean() {
        println!("{}", dim("pack is in sync"));
    } else if report.written {
        println!("{} root manifest", green("updated"));
    }
    Ok(EXIT_SUCCESS)
}
