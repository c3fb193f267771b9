mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_FAILURE, EXIT_INTEGRITY_ERROR, EXIT_MANIFEST_ERROR};
use sculk_schema::{ModLoader, ProjectKind, Side};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "sculk",
    version,
    about = "Declarative, hash-verified Minecraft modpack manager"
)]
struct Cli {
    /// Pack directory to operate on.
    #[arg(long, default_value = ".", global = true)]
    pack: PathBuf,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create a new, empty pack in the pack directory.
    Init {
        /// Pack name.
        name: String,
        /// Minecraft version, e.g. 1.20.1.
        #[arg(long)]
        minecraft: String,
        /// Mod loader: fabric, forge, neoforge or quilt.
        #[arg(long, value_parser = parse_loader)]
        loader: ModLoader,
        /// Mod loader version.
        #[arg(long)]
        loader_version: String,
        #[arg(long)]
        summary: Option<String>,
        #[arg(long)]
        author: Option<String>,
    },
    /// Add a project to the pack.
    Add {
        #[command(subcommand)]
        source: AddSource,
    },
    /// Remove a file manifest or loose file, and dependencies only it needed.
    #[command(alias = "rm")]
    Remove {
        /// Pack-relative path, e.g. mods/sodium.sculk.json.
        path: String,
    },
    /// Move manifests to the newest compatible file.
    Update {
        /// Only update this manifest.
        path: Option<String>,
    },
    /// Attach Modrinth or Curseforge sources to manifests by content hash.
    Link {
        /// Platform to link to: modrinth (mr) or curseforge (cf).
        platform: String,
        /// Link every match without asking.
        #[arg(short, long, default_value_t = false)]
        yes: bool,
    },
    /// Reconcile the root manifest with the files in the pack directory.
    Refresh {
        /// Report divergences as an error instead of fixing them.
        #[arg(long, default_value_t = false)]
        check: bool,
    },
    /// Install a pack into a game or server directory.
    Install {
        /// Pack directory or http(s) URL serving the pack files.
        location: String,
        /// Directory to install into.
        #[arg(default_value = ".")]
        target: PathBuf,
        /// Side to install: both, client or server.
        #[arg(long, default_value = "both", value_parser = parse_side)]
        side: Side,
    },
    /// Export the pack for another launcher.
    Export {
        #[command(subcommand)]
        format: ExportFormat,
    },
    /// Create a pack in the (empty) pack directory from a modpack archive.
    Import {
        #[command(subcommand)]
        format: ImportFormat,
    },
    /// Upgrade the pack to the current format version.
    Migrate,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
enum AddSource {
    /// Add a Modrinth project by slug, id, version id or search term.
    #[command(alias = "mr")]
    Modrinth {
        query: String,
        /// Do not add dependencies.
        #[arg(long, default_value_t = false)]
        no_deps: bool,
    },
    /// Add a Curseforge project by slug, id or search term.
    #[command(alias = "cf")]
    Curseforge {
        query: String,
        /// Do not add dependencies.
        #[arg(long, default_value_t = false)]
        no_deps: bool,
    },
    /// Add a file from a direct download URL.
    Url {
        /// Display name; its slug names the manifest.
        name: String,
        url: String,
        /// Artifact filename, defaults to the last URL segment.
        #[arg(long)]
        filename: Option<String>,
        #[arg(long, default_value = "both", value_parser = parse_side)]
        side: Side,
        /// mod, resourcepack, shaderpack or datapack.
        #[arg(long, default_value = "mod", value_parser = parse_kind)]
        kind: ProjectKind,
    },
    /// Add every `modrinth:<slug>` or `curseforge:<slug>` line of a file.
    List {
        /// File with one project per line.
        file: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
enum ExportFormat {
    /// Modrinth .mrpack.
    #[command(alias = "mr")]
    Modrinth {
        /// Directory to write the archive to.
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Curseforge modpack zip.
    #[command(alias = "cf")]
    Curseforge {
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// MultiMC / Prism Launcher instance zip.
    #[command(alias = "mmc")]
    Multimc {
        #[arg(long, default_value = ".")]
        out: PathBuf,
        /// Install from this pack URL before every launch instead of bundling files.
        #[arg(long)]
        pack_url: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
enum ImportFormat {
    /// Modrinth .mrpack.
    #[command(alias = "mr")]
    Modrinth { archive: PathBuf },
    /// Curseforge modpack zip.
    #[command(alias = "cf")]
    Curseforge { archive: PathBuf },
}

fn parse_loader(s: &str) -> Result<ModLoader, String> {
    s.parse().map_err(|e: sculk_schema::SchemaError| e.to_string())
}

fn parse_side(s: &str) -> Result<Side, String> {
    s.parse().map_err(|e: sculk_schema::SchemaError| e.to_string())
}

fn parse_kind(s: &str) -> Result<ProjectKind, String> {
    match s.to_ascii_lowercase().as_str() {
        "mod" | "mods" => Ok(ProjectKind::Mod),
        "resourcepack" | "resourcepacks" => Ok(ProjectKind::ResourcePack),
        "shaderpack" | "shaderpacks" | "shader" => Ok(ProjectKind::ShaderPack),
        "datapack" | "datapacks" => Ok(ProjectKind::DataPack),
        _ => Err(format!(
            "unknown kind '{s}', expected mod, resourcepack, shaderpack or datapack"
        )),
    }
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("SCULK_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let pack = cli.pack.as_path();
    let json = cli.json;

    let result = match cli.command {
        Commands::Init {
            name,
            minecraft,
            loader,
            loader_version,
            summary,
            author,
        } => commands::init::run(
            pack,
            &sculk_core::InitOptions {
                name,
                minecraft,
                loader,
                loader_version,
                summary,
                author,
            },
            json,
        ),
        Commands::Add { source } => match source {
            AddSource::Modrinth { query, no_deps } => {
                commands::add::modrinth(pack, &query, no_deps, json)
            }
            AddSource::Curseforge { query, no_deps } => {
                commands::add::curseforge(pack, &query, no_deps, json)
            }
            AddSource::Url {
                name,
                url,
                filename,
                side,
                kind,
            } => commands::add::url(
                pack,
                &sculk_core::UrlAddition {
                    name,
                    url,
                    filename,
                    side,
                    kind,
                },
                json,
            ),
            AddSource::List { file } => commands::add::list(pack, &file, json),
        },
        Commands::Remove { path } => commands::remove::run(pack, &path, json),
        Commands::Update { path } => commands::update::run(pack, path.as_deref(), json),
        Commands::Link { platform, yes } => commands::link::run(pack, &platform, yes, json),
        Commands::Refresh { check } => commands::refresh::run(pack, check, json),
        Commands::Install {
            location,
            target,
            side,
        } => commands::install::run(&location, &target, side, json),
        Commands::Export { format } => match format {
            ExportFormat::Modrinth { out } => commands::export::modrinth(pack, &out, json),
            ExportFormat::Curseforge { out } => commands::export::curseforge(pack, &out, json),
            ExportFormat::Multimc { out, pack_url } => {
                commands::export::multimc(pack, &out, pack_url.as_deref(), json)
            }
        },
        Commands::Import { format } => match format {
            ImportFormat::Modrinth { archive } => {
                commands::import::modrinth(&archive, pack, json)
            }
            ImportFormat::Curseforge { archive } => {
                commands::import::curseforge(&archive, pack, json)
            }
        },
        Commands::Migrate => commands::migrate::run(pack, json),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("manifest error:") {
                EXIT_MANIFEST_ERROR
            } else if msg.starts_with("integrity error:") {
                EXIT_INTEGRITY_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}
