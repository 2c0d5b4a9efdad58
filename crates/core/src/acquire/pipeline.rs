use std::fs;
use std::path::{Path, PathBuf};

use super::download::Download;
use super::extract::extract_zip;
use super::{io_err, layout, AcquireError};
use crate::config::AcquireConfig;
use crate::image::ImageReader;
use crate::model::{BuildId, ImageIdentity, Platform};
use crate::progress::ProgressSink;
use crate::prompt::Confirm;
use crate::services::classify::classify;
use crate::services::decompile::{
    DecompileBackend, DecompileOptions, DecompileOutcome, Decompiler,
};

const PLATFORM_PROMPT: &str =
    "Choose the platform you want to decompile: [W(Windows)/l(Linux)/m(Mac)/a(All)]";

/// Map the platform menu answer to the platforms to process, in processing order.
///
/// Only the first typed character counts. Anything unrecognised, including no input,
/// selects Windows.
pub fn parse_platform_choice(answer: &str) -> Vec<Platform> {
    match answer.trim_start().chars().next().map(|c| c.to_ascii_lowercase()) {
        Some('l') => vec![Platform::Linux],
        Some('m') => vec![Platform::Mac],
        Some('a') => Platform::all().to_vec(),
        _ => vec![Platform::Windows],
    }
}

/// Outcome of decompiling one platform's server image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformRun {
    pub platform: Platform,
    pub image: PathBuf,
    pub identity: ImageIdentity,
    pub outcome: DecompileOutcome,
}

/// Everything one acquisition run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRun {
    pub build: BuildId,
    pub archive: PathBuf,
    pub extracted: PathBuf,
    pub platforms: Vec<PlatformRun>,
}

/// Interactive acquisition: catalog menu, download, extraction and per-platform decompile.
///
/// All artifacts land under `work_dir`: `<stem>.zip`, the extracted `<stem>/` tree and one
/// output directory per decompiled image.
pub struct AcquisitionPipeline<'a> {
    pub config: &'a AcquireConfig,
    pub work_dir: PathBuf,
    pub downloader: &'a dyn Download,
    pub reader: &'a dyn ImageReader,
    pub backend: &'a dyn DecompileBackend,
    pub confirm: &'a dyn Confirm,
    /// Builds a fresh progress sink for each decompile run.
    pub progress: &'a dyn Fn() -> Box<dyn ProgressSink>,
}

impl<'a> AcquisitionPipeline<'a> {
    /// Run the whole pipeline. `Ok(None)` when input ended before a build was chosen.
    pub fn run(&self) -> Result<Option<BuildRun>, AcquireError> {
        let Some(build) = self.select_build() else {
            log::info!("no build selected");
            return Ok(None);
        };
        log::info!("selected build {} (key {})", build.version, build.index);

        let archive = self.ensure_archive(build)?;
        let extracted = self.ensure_extracted(build, &archive)?;

        let answer = self.confirm.read_line(PLATFORM_PROMPT).unwrap_or_default();
        let mut platforms = Vec::new();
        for platform in parse_platform_choice(&answer) {
            platforms.push(self.decompile_platform(&extracted, build, platform)?);
        }

        Ok(Some(BuildRun { build, archive, extracted, platforms }))
    }

    /// Menu text listing every catalog entry as `key.    version`.
    pub fn menu(&self) -> String {
        let mut text = String::from("Available versions:\n");
        for build in &self.config.catalog {
            text.push_str(&format!("{:>3}.    {:>6}\n", build.index, build.version));
        }
        text.push_str("Input the No. of the version you want to decompile:");
        text
    }

    /// Prompt until a valid catalog key is entered. `None` on end of input.
    pub fn select_build(&self) -> Option<BuildId> {
        let menu = self.menu();
        loop {
            let answer = self.confirm.read_line(&menu)?;
            match answer.trim().parse::<u32>().ok().and_then(|key| self.config.select(key)) {
                Some(build) => return Some(build),
                None => log::warn!("{:?} is not a listed version", answer.trim()),
            }
        }
    }

    /// Local archive for `build`, downloading it unless a kept copy already exists.
    pub fn ensure_archive(&self, build: BuildId) -> Result<PathBuf, AcquireError> {
        let archive = self.work_dir.join(format!("{}.zip", self.config.file_stem_for(build)));
        if archive.is_file() {
            if !self.confirm.confirm("File existed, do you want to download it again?") {
                log::info!("using existing archive {}", archive.display());
                return Ok(archive);
            }
            fs::remove_file(&archive).map_err(io_err(&archive))?;
        }
        fs::create_dir_all(&self.work_dir).map_err(io_err(&self.work_dir))?;
        self.downloader.download(&self.config.url_for(build), &archive)?;
        Ok(archive)
    }

    /// Extracted tree for `build`, unpacking `archive` unless a kept tree already exists.
    pub fn ensure_extracted(
        &self,
        build: BuildId,
        archive: &Path,
    ) -> Result<PathBuf, AcquireError> {
        let root = self.work_dir.join(self.config.file_stem_for(build));
        if root.is_dir() {
            let question = "There are extracted files, do you want to extract them again?";
            if !self.confirm.confirm(question) {
                log::info!("using existing extracted tree {}", root.display());
                return Ok(root);
            }
            fs::remove_dir_all(&root).map_err(io_err(&root))?;
        }
        extract_zip(archive, &root)?;
        Ok(root)
    }

    /// Classify and decompile the server image of one platform.
    ///
    /// The interactive path always resolves dependencies strictly.
    pub fn decompile_platform(
        &self,
        root: &Path,
        build: BuildId,
        platform: Platform,
    ) -> Result<PlatformRun, AcquireError> {
        log::info!("decompiling {platform} server assembly");
        let image = layout::image_path(root, build.version, platform);
        if !image.is_file() {
            return Err(AcquireError::MissingImage(image));
        }
        let bytes = fs::read(&image).map_err(io_err(&image))?;
        let identity = classify(&bytes, self.reader)
            .map_err(|source| AcquireError::Classify { path: image.clone(), source })?;

        let options = DecompileOptions {
            output_dir: Some(self.work_dir.join(identity.output_dir_name())),
            ignore_resolution_errors: false,
            extra_search_dirs: layout::extra_search_dirs(root, build.version, platform),
            assume_yes: false,
        };
        let decompiler =
            Decompiler { reader: self.reader, backend: self.backend, confirm: self.confirm };
        let mut progress = (self.progress)();
        let outcome = decompiler.run(&identity, &options, progress.as_mut())?;

        Ok(PlatformRun { platform, image, identity, outcome })
    }
}
