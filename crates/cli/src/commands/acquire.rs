use std::env;

use anyhow::{Context, Result};

use tsg_core::acquire::download::HttpDownloader;
use tsg_core::acquire::AcquisitionPipeline;
use tsg_core::progress::{ConsoleProgress, ProgressSink};
use tsg_core::prompt::StdinConfirm;

use super::util::{decompile_backend, image_reader, load_config, print_outcome, RunOptions};

/// Interactive mode: choose a published build, fetch it, and decompile the chosen
/// platforms into the current directory.
pub fn acquire_command(options: &RunOptions) -> Result<()> {
    let config = load_config(options.config.as_deref())?;
    let reader = image_reader()?;
    let work_dir = env::current_dir().context("Failed to get current directory")?;
    let downloader = HttpDownloader::new();
    let backend = decompile_backend(options.decompiler.as_deref());
    let progress = || Box::new(ConsoleProgress::new()) as Box<dyn ProgressSink>;

    let pipeline = AcquisitionPipeline {
        config: &config,
        work_dir,
        downloader: &downloader,
        reader: reader.as_ref(),
        backend: &backend,
        confirm: &StdinConfirm,
        progress: &progress,
    };
    let Some(run) = pipeline.run().context("Acquisition failed")? else {
        return Ok(());
    };
    for platform in &run.platforms {
        println!();
        println!("{} ({})", platform.platform, platform.image.display());
        print_outcome(&platform.outcome);
    }
    Ok(())
}
