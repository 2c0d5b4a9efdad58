use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use terraria_source_getter::commands::{
    acquire_command, decompile_file_command, init_logging, RunOptions,
};

/// Identify a dedicated server build and decompile it into a buildable project.
///
/// Without arguments an interactive menu picks a published build, downloads and
/// extracts it, and decompiles the chosen platforms. With a single image path that
/// image is classified and decompiled directly. Any other argument count does nothing.
#[derive(Parser, Debug)]
#[command(
    name = "terraria-source-getter",
    version,
    about = "Identify and decompile dedicated server builds",
    long_about = None
)]
struct Cli {
    /// Image to classify and decompile.
    paths: Vec<PathBuf>,

    /// Acquisition config (YAML or JSON). Falls back to `TSG_CONFIG`, then the built-in
    /// version catalog.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to `ilspycmd`. Defaults to `ILSPYCMD_BIN`, then `ilspycmd` on `PATH`.
    #[arg(long)]
    decompiler: Option<PathBuf>,

    /// Continue when a referenced assembly cannot be found (single image mode only).
    #[arg(long, default_value_t = false)]
    ignore_resolution_errors: bool,

    /// Overwrite a non-empty output directory without asking (single image mode only).
    #[arg(short = 'y', long, default_value_t = false)]
    yes: bool,

    /// Debug-level logging.
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let options = RunOptions {
        config: cli.config,
        decompiler: cli.decompiler,
        ignore_resolution_errors: cli.ignore_resolution_errors,
        assume_yes: cli.yes,
    };
    match cli.paths.as_slice() {
        [] => acquire_command(&options),
        [path] => decompile_file_command(path, &options),
        _ => Ok(()),
    }
}
