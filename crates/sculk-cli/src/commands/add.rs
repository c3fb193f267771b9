use super::{
    describe, dim, green, json_pretty, open_session, services, with_spinner, yellow, TerminalUi,
    EXIT_SUCCESS,
};
use sculk_core::{
    add_curseforge, add_list, add_modrinth, add_url, AddOptions, AddReport, Context, CoreError,
    PackSession, UrlAddition,
};
use std::fs;
use std::path::Path;

fn add_with(
    pack: &Path,
    json: bool,
    op: impl FnOnce(&Context<'_>, &mut PackSession) -> Result<AddReport, CoreError>,
) -> Result<u8, String> {
    let mut session = open_session(pack)?;
    let services = services()?;
    let ui = TerminalUi::new(json);
    let ctx = services.context(&ui);

    let report = op(&ctx, &mut session).map_err(describe)?;
    session.commit().map_err(describe)?;
    print_report(&report, json)?;
    Ok(EXIT_SUCCESS)
}

fn print_report(report: &AddReport, json: bool) -> Result<(), String> {
    if json {
        println!("{}", json_pretty(report)?);
        return Ok(());
    }
    for added in &report.added {
        match &added.dependency_of {
            Some(dependant) => println!(
                "{} {} ({}) {}",
                green("added"),
                added.path,
                added.filename,
                dim(&format!("dependency of {dependant}"))
            ),
            None => println!("{} {} ({})", green("added"), added.path, added.filename),
        }
    }
    for path in &report.linked {
        println!("{} {path}", green("linked"));
    }
    for path in &report.existing {
        println!("{}", dim(&format!("{path} is already in the pack")));
    }
    Ok(())
}

pub fn modrinth(pack: &Path, query: &str, no_deps: bool, json: bool) -> Result<u8, String> {
    let options = AddOptions {
        skip_dependencies: no_deps,
    };
    add_with(pack, json, |ctx, session| {
        add_modrinth(ctx, session, query, options)
    })
}

pub fn curseforge(pack: &Path, query: &str, no_deps: bool, json: bool) -> Result<u8, String> {
    let options = AddOptions {
        skip_dependencies: no_deps,
    };
    add_with(pack, json, |ctx, session| {
        add_curseforge(ctx, session, query, options)
    })
}

pub fn url(pack: &Path, addition: &UrlAddition, json: bool) -> Result<u8, String> {
    let mut session = open_session(pack)?;
    let services = services()?;
    let ui = TerminalUi::new(json);
    let ctx = services.context(&ui);

    let report = with_spinner(
        json,
        &format!("downloading {}", addition.url),
        "downloaded",
        || add_url(&ctx, &mut session, addition),
    )?;
    session.commit().map_err(describe)?;
    print_report(&report, json)?;
    Ok(EXIT_SUCCESS)
}

pub fn list(pack: &Path, file: &Path, json: bool) -> Result<u8, String> {
    let list = fs::read_to_string(file)
        .map_err(|e| format!("failed to read {}: {e}", file.display()))?;
    let mut session = open_session(pack)?;
    let services = services()?;
    let ui = TerminalUi::new(json);
    let ctx = services.context(&ui);

    let out = add_list(&ctx, &mut session, &list).map_err(describe)?;
    session.commit().map_err(describe)?;
    if json {
        println!("{}", json_pretty(&out)?);
        return Ok(EXIT_SUCCESS);
    }
    print_report(&out.report, false)?;
    for (line, reason) in &out.skipped {
        println!("{} {line}: {reason}", yellow("skipped"));
    }
    Ok(EXIT_SUCCESS)
}
