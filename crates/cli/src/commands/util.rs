use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use tsg_core::config::AcquireConfig;
use tsg_core::image::{default_reader, ImageReader};
use tsg_core::model::ImageIdentity;
use tsg_core::services::backends::IlspyBackend;
use tsg_core::services::decompile::DecompileOutcome;

/// Environment variable naming an alternative acquisition config.
pub const CONFIG_ENV: &str = "TSG_CONFIG";

/// Flags shared by both modes.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config: Option<PathBuf>,
    pub decompiler: Option<PathBuf>,
    pub ignore_resolution_errors: bool,
    pub assume_yes: bool,
}

/// Initialize stderr logging: `info` for this workspace, `debug` with `verbose`.
/// `RUST_LOG` overrides both.
pub fn init_logging(verbose: bool) {
    let level = if verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info };
    let _ = env_logger::Builder::new()
        .filter_module("tsg_core", level)
        .filter_module("terraria_source_getter", level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .try_init();
}

/// Acquisition config from `--config`, then `TSG_CONFIG`, else the built-in catalog.
pub fn load_config(explicit: Option<&Path>) -> Result<AcquireConfig> {
    let path =
        explicit.map(Path::to_path_buf).or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from));
    match path {
        Some(path) => AcquireConfig::load(&path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(AcquireConfig::default()),
    }
}

/// The metadata reader compiled into this build.
pub fn image_reader() -> Result<Box<dyn ImageReader>> {
    let reader = default_reader().ok_or_else(|| {
        anyhow!(
            "No image metadata reader is compiled in; rebuild with `--features dotscope-reader`"
        )
    })?;
    log::debug!("using image reader {}", reader.name());
    Ok(reader)
}

/// `ilspycmd` at `--decompiler` when given, else from `ILSPYCMD_BIN` or `PATH`.
pub fn decompile_backend(decompiler: Option<&Path>) -> IlspyBackend {
    let backend = decompiler.map_or_else(IlspyBackend::from_env, IlspyBackend::with_path);
    log::debug!("using decompiler {}", backend.path().display());
    backend
}

pub fn print_identity(identity: &ImageIdentity) {
    println!("Assembly: {}", identity.assembly_name());
    println!("Side:     {}", identity.side());
    println!("Platform: {}", identity.platform());
    println!("Version:  {}", identity.version());
    println!("Release:  {}", identity.release());
    println!("SHA-256:  {}", identity.sha256_hex());
}

pub fn print_outcome(outcome: &DecompileOutcome) {
    match outcome {
        DecompileOutcome::Completed(report) => {
            println!();
            println!("Output:     {}", report.output_dir.display());
            println!("Project:    {}", report.project_file.display());
            println!("References: {}", report.references.len());
            println!("Complete. Took {}s", report.elapsed.as_secs_f64());
        }
        DecompileOutcome::Declined => log::info!("decompile skipped"),
    }
}
