use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::image::ImageReader;
use crate::model::ImageIdentity;
use crate::progress::ProgressSink;
use crate::prompt::Confirm;
use crate::services::project_file;
use crate::services::references::{
    extract_references, ReferenceError, ReferenceSet, REFERENCES_DIR,
};
use crate::services::resolver::{AssemblyResolver, Resolution, Unresolved};

#[derive(Debug, Error)]
pub enum DecompileError {
    #[error("Decompiler backend not found: {0}")]
    MissingBackend(String),
    #[error("Could not resolve dependency {name} (searched: {})", display_dirs(.searched))]
    DependencyResolution { name: String, searched: Vec<PathBuf> },
    #[error("Decompiler backend error: {0}")]
    Backend(String),
    #[error("Failed to prepare references: {0}")]
    References(#[from] ReferenceError),
    #[error("Decompiler did not produce a project file at {}", .0.display())]
    ProjectFileMissing(PathBuf),
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<Unresolved> for DecompileError {
    fn from(err: Unresolved) -> Self {
        DecompileError::DependencyResolution { name: err.name, searched: err.searched }
    }
}

fn display_dirs(dirs: &[PathBuf]) -> String {
    dirs.iter().map(|d| d.display().to_string()).collect::<Vec<_>>().join(", ")
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> DecompileError + '_ {
    move |source| DecompileError::Io { path: path.to_path_buf(), source }
}

/// What a backend needs to turn one image into a project.
#[derive(Debug)]
pub struct DecompileRequest<'a> {
    /// Name of the generated project (the image's assembly name).
    pub project_name: &'a str,
    pub output_dir: &'a Path,
    pub resolver: &'a AssemblyResolver,
    /// Assembly names the image references.
    pub references: &'a [String],
    /// Expected number of generated units, used as the progress total.
    pub expected_units: usize,
}

/// Whole-project decompile capability.
pub trait DecompileBackend: Send + Sync {
    /// Decompile the image read from `image` into `request.output_dir`, reporting one
    /// progress event per generated unit.
    fn decompile_project(
        &self,
        image: &mut dyn Read,
        request: &DecompileRequest<'_>,
        progress: &mut dyn ProgressSink,
    ) -> Result<(), DecompileError>;

    fn name(&self) -> &'static str;
}

/// Resolve every reference through `resolver`, returning the on-disk hits.
///
/// Strict resolvers turn the first miss into [`DecompileError::DependencyResolution`].
pub fn resolve_references(
    resolver: &AssemblyResolver,
    names: &[String],
) -> Result<Vec<PathBuf>, DecompileError> {
    let mut found = Vec::new();
    for name in names {
        if let Resolution::Found(path) = resolver.resolve(name)? {
            found.push(path);
        }
    }
    Ok(found)
}

/// Per-invocation options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecompileOptions {
    /// Explicit output directory; derived from the identity when `None`.
    pub output_dir: Option<PathBuf>,
    /// Tolerate dependencies the resolver cannot find.
    pub ignore_resolution_errors: bool,
    /// Extra resolver search directories, consulted after the references directory.
    pub extra_search_dirs: Vec<PathBuf>,
    /// Skip the non-empty output directory confirmation.
    pub assume_yes: bool,
}

/// Result of a completed decompile run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompileReport {
    pub output_dir: PathBuf,
    pub project_file: PathBuf,
    pub references: ReferenceSet,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecompileOutcome {
    Completed(DecompileReport),
    /// The operator refused to write into a non-empty output directory.
    Declined,
}

/// Ties the metadata reader, decompile backend and confirmation prompt together to
/// turn one classified image into a source tree.
pub struct Decompiler<'a> {
    pub reader: &'a dyn ImageReader,
    pub backend: &'a dyn DecompileBackend,
    pub confirm: &'a dyn Confirm,
}

impl<'a> Decompiler<'a> {
    pub fn run(
        &self,
        identity: &ImageIdentity,
        options: &DecompileOptions,
        progress: &mut dyn ProgressSink,
    ) -> Result<DecompileOutcome, DecompileError> {
        let output_dir = options
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(identity.output_dir_name()));
        log::info!("output directory: {}", output_dir.display());

        if output_dir.is_dir() {
            if has_files(&output_dir)? && !options.assume_yes {
                let question =
                    format!("{} is not empty! Continue?", absolute(&output_dir).display());
                if !self.confirm.confirm(&question) {
                    log::info!("declined to overwrite {}", output_dir.display());
                    return Ok(DecompileOutcome::Declined);
                }
            }
        } else {
            fs::create_dir_all(&output_dir).map_err(io_err(&output_dir))?;
        }

        let references_dir = output_dir.join(REFERENCES_DIR);
        fs::create_dir_all(&references_dir).map_err(io_err(&references_dir))?;
        let references = extract_references(identity, self.reader, &references_dir)?;
        log::info!("extracted {} embedded reference(s)", references.len());

        let resolver = self.build_resolver(&references_dir, options);
        log::debug!("resolver search path: {}", display_dirs(resolver.search_dirs()));

        let image = self.reader.open(identity.raw_bytes()).map_err(ReferenceError::from)?;
        let declared_refs = image.assembly_references();
        let request = DecompileRequest {
            project_name: identity.assembly_name(),
            output_dir: &output_dir,
            resolver: &resolver,
            references: &declared_refs,
            expected_units: image.type_names().len(),
        };

        log::info!("decompiling {} with {}", identity.assembly_name(), self.backend.name());
        let mut stream = identity.open_stream();
        let started = Instant::now();
        let result = self.backend.decompile_project(&mut stream, &request, progress);
        let elapsed = started.elapsed();
        progress.finish();
        result?;

        let project_file = output_dir.join(format!("{}.csproj", identity.assembly_name()));
        if !project_file.is_file() {
            return Err(DecompileError::ProjectFileMissing(project_file));
        }
        project_file::post_process_file(&project_file).map_err(io_err(&project_file))?;
        log::info!("decompiled {} in {:.2}s", identity.assembly_name(), elapsed.as_secs_f64());

        Ok(DecompileOutcome::Completed(DecompileReport {
            output_dir,
            project_file,
            references,
            elapsed,
        }))
    }

    fn build_resolver(
        &self,
        references_dir: &Path,
        options: &DecompileOptions,
    ) -> AssemblyResolver {
        let mut resolver = AssemblyResolver::new(!options.ignore_resolution_errors);
        resolver.add_search_dir(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        resolver.add_search_dir(absolute(references_dir));
        for dir in &options.extra_search_dirs {
            resolver.add_search_dir(dir.clone());
        }
        resolver
    }
}

fn has_files(dir: &Path) -> Result<bool, DecompileError> {
    for entry in fs::read_dir(dir).map_err(io_err(dir))? {
        let entry = entry.map_err(io_err(dir))?;
        if entry.file_type().map_err(io_err(dir))?.is_file() {
            return Ok(true);
        }
    }
    Ok(false)
}

fn absolute(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
