//! Certificate template tool: starter layouts, document checks and
//! thumbnails from the command line.

mod diagnostics;

use anyhow::{Context, Result, bail};
use cert_core::codec;
use cert_core::model::Orientation;
use cert_core::{PlaceholderValues, lint::is_issuable, lint_document, placeholder_bindings, starter_document};
use cert_editor::EditorConfig;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "cert-cli", version, about = "Certificate template designer tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Editor settings file (JSON). Only the keys it sets are changed.
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Write the built-in starter template.
    Starter {
        /// Portrait A4 instead of landscape.
        #[arg(long)]
        portrait: bool,

        /// Output file (stdout when omitted).
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Lint a document and report what loading it would repair.
    Check {
        file: PathBuf,

        /// Overwrite the file with the repaired document.
        #[arg(long)]
        write: bool,
    },

    /// Render a PNG thumbnail.
    Thumbnail {
        file: PathBuf,

        /// Scale factor (defaults to the configured thumbnail scale).
        #[arg(long)]
        scale: Option<f64>,

        #[arg(short, long, value_name = "PNG")]
        output: PathBuf,
    },

    /// Show which element the issuance renderer substitutes for each role.
    Bindings {
        file: PathBuf,

        /// Learner values (JSON) to show next to each binding.
        #[arg(long, value_name = "PATH")]
        values: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let code = match run(cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error:#}");
            2
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> Result<i32> {
    let config = match &cli.config {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };

    match cli.command {
        Command::Starter { portrait, output } => {
            let orientation = if portrait {
                Orientation::Portrait
            } else {
                Orientation::Landscape
            };
            let json = codec::to_json_string_pretty(&starter_document(orientation))?;
            match output {
                Some(path) => write(&path, json.as_bytes())?,
                None => println!("{json}"),
            }
            Ok(0)
        }
        Command::Check { file, write: fix } => check(&file, fix),
        Command::Thumbnail { file, scale, output } => {
            let decoded = codec::load_document(&read(&file)?)?;
            let scale = scale.unwrap_or(config.thumbnail_scale);
            let png = cert_render::render_thumbnail(&decoded.document, scale)
                .with_context(|| format!("rendering {}", file.display()))?;
            write(&output, &png)?;
            log::info!("wrote {} ({} bytes)", output.display(), png.len());
            Ok(0)
        }
        Command::Bindings { file, values } => {
            let decoded = codec::load_document(&read(&file)?)?;
            let values: Option<PlaceholderValues> = match values {
                Some(path) => Some(
                    serde_json::from_str(&read(&path)?)
                        .with_context(|| format!("parsing {}", path.display()))?,
                ),
                None => None,
            };
            for (role, id) in placeholder_bindings(&decoded.document) {
                let (role_name, id) = (role.as_str(), id.as_str());
                match &values {
                    Some(v) => println!("{role_name:<18} {id:<16} {}", v.get(role)),
                    None => println!("{role_name:<18} {id}"),
                }
            }
            Ok(0)
        }
    }
}

/// Exit code 1 when the document as stored is not issuable.
fn check(file: &Path, fix: bool) -> Result<i32> {
    let json = read(file)?;
    let raw = codec::from_json_str(&json).with_context(|| format!("decoding {}", file.display()))?;
    let diags = lint_document(&raw.document);
    for diag in &diags {
        println!("{}", diagnostics::format_lint(diag));
    }

    let repaired = codec::load_document(&json)?;
    for warning in &repaired.warnings {
        println!("{}", diagnostics::format_warning(warning));
    }

    let (errors, warnings) = diagnostics::tally(&diags);
    println!(
        "{}: {errors} error(s), {warnings} warning(s), {} repair(s)",
        file.display(),
        repaired.warnings.len()
    );

    if fix && !repaired.warnings.is_empty() {
        let fixed = codec::to_json_string_pretty(&repaired.document)?;
        write(file, fixed.as_bytes())?;
        println!("rewrote {}", file.display());
        let remaining = lint_document(&repaired.document);
        return Ok(if is_issuable(&remaining) { 0 } else { 1 });
    }
    Ok(if is_issuable(&diags) { 0 } else { 1 })
}

fn read(path: &Path) -> Result<String> {
    if !path.exists() {
        bail!("{} does not exist", path.display());
    }
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn write(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}
