use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use tsg_core::progress::ConsoleProgress;
use tsg_core::prompt::StdinConfirm;
use tsg_core::services::classify::classify;
use tsg_core::services::decompile::{DecompileOptions, Decompiler};

use super::util::{
    decompile_backend, image_reader, print_identity, print_outcome, RunOptions,
};
use crate::containing_dir;

/// Classify one image and decompile it next to the current directory.
///
/// The image's own directory joins the resolver search path. A path that is not a file
/// prints `Invalid path: <path>` and returns normally.
pub fn decompile_file_command(path: &Path, options: &RunOptions) -> Result<()> {
    if !path.is_file() {
        println!("Invalid path: {}", path.display());
        return Ok(());
    }
    println!("{}", path.display());

    let reader = image_reader()?;
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read image {}", path.display()))?;
    let identity = classify(&bytes, reader.as_ref())
        .with_context(|| format!("Failed to classify {}", path.display()))?;
    print_identity(&identity);

    let decompile_options = DecompileOptions {
        output_dir: None,
        ignore_resolution_errors: options.ignore_resolution_errors,
        extra_search_dirs: vec![containing_dir(path)?],
        assume_yes: options.assume_yes,
    };
    let backend = decompile_backend(options.decompiler.as_deref());
    let decompiler =
        Decompiler { reader: reader.as_ref(), backend: &backend, confirm: &StdinConfirm };
    let mut progress = ConsoleProgress::new();
    println!();
    println!("Start decompiling...");
    let outcome = decompiler
        .run(&identity, &decompile_options, &mut progress)
        .with_context(|| format!("Failed to decompile {}", path.display()))?;
    print_outcome(&outcome);
    Ok(())
}
