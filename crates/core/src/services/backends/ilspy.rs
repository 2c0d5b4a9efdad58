use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use crate::progress::ProgressSink;
use crate::services::decompile::{
    resolve_references, DecompileBackend, DecompileError, DecompileRequest,
};

/// Whole-project decompiler that shells out to `ilspycmd`.
///
/// The image is staged in a scratch directory under the project name so the generated
/// descriptor is named `<project>.csproj`. Every line the tool prints is treated as one
/// generated unit for progress purposes.
#[derive(Debug, Clone)]
pub struct IlspyBackend {
    path: PathBuf,
}

impl IlspyBackend {
    /// Use `ILSPYCMD_BIN` when set, otherwise `ilspycmd` from `PATH`.
    pub fn from_env() -> Self {
        Self { path: resolve_ilspy_path() }
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// First line of `ilspycmd --version`.
    pub fn version(&self) -> Result<String, DecompileError> {
        let output = Command::new(&self.path)
            .arg("--version")
            .output()
            .map_err(|e| spawn_error(&self.path, e))?;
        if !output.status.success() {
            return Err(DecompileError::Backend(format!(
                "ilspycmd --version exited with {}",
                output.status
            )));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let first = stdout.lines().next().unwrap_or("").trim();
        if first.is_empty() {
            Err(DecompileError::Backend("ilspycmd returned empty version string".to_string()))
        } else {
            Ok(first.to_string())
        }
    }
}

impl DecompileBackend for IlspyBackend {
    fn decompile_project(
        &self,
        image: &mut dyn Read,
        request: &DecompileRequest<'_>,
        progress: &mut dyn ProgressSink,
    ) -> Result<(), DecompileError> {
        // Unresolvable dependencies fail before the tool is started.
        let resolved = resolve_references(request.resolver, request.references)?;
        log::debug!("resolved {} reference(s) on disk", resolved.len());

        let version = self.version()?;
        log::info!("using ilspycmd {version} at {}", self.path.display());

        let scratch = tempfile::tempdir()
            .map_err(|e| DecompileError::Backend(format!("failed to create scratch dir: {e}")))?;
        let staged = scratch.path().join(format!("{}.exe", request.project_name));
        let mut file = File::create(&staged)
            .map_err(|source| DecompileError::Io { path: staged.clone(), source })?;
        io::copy(image, &mut file)
            .map_err(|source| DecompileError::Io { path: staged.clone(), source })?;
        drop(file);

        let mut command = Command::new(&self.path);
        command.arg(&staged).arg("-p").arg("-o").arg(request.output_dir);
        for dir in request.resolver.search_dirs() {
            command.arg("-r").arg(dir);
        }
        log::debug!("running {:?}", command);

        let mut child = command
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_error(&self.path, e))?;

        let stderr = child.stderr.take().map(|mut err| {
            thread::spawn(move || {
                let mut buf = String::new();
                let _ = err.read_to_string(&mut buf);
                buf
            })
        });

        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).lines() {
                let line = line.map_err(|e| {
                    DecompileError::Backend(format!("failed to read ilspycmd output: {e}"))
                })?;
                let label = line.trim();
                if !label.is_empty() {
                    progress.report(request.expected_units, label);
                }
            }
        }

        let status = child
            .wait()
            .map_err(|e| DecompileError::Backend(format!("failed to wait for ilspycmd: {e}")))?;
        let stderr = stderr.and_then(|h| h.join().ok()).unwrap_or_default();
        if !status.success() {
            let detail = stderr.lines().last().unwrap_or("").trim();
            return Err(DecompileError::Backend(format!(
                "ilspycmd exited with {status}: {detail}"
            )));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ilspy"
    }
}

fn resolve_ilspy_path() -> PathBuf {
    std::env::var_os("ILSPYCMD_BIN")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("ilspycmd"))
}

fn spawn_error(path: &Path, err: io::Error) -> DecompileError {
    if err.kind() == io::ErrorKind::NotFound {
        DecompileError::MissingBackend(path.display().to_string())
    } else {
        DecompileError::Backend(format!("failed to spawn {}: {err}", path.display()))
    }
}
