//! Acquisition pipeline: pick a published build, fetch and unpack it, then decompile the
//! server image for each selected platform.

pub mod download;
pub mod extract;
pub mod layout;
pub mod pipeline;

use std::path::PathBuf;

use thiserror::Error;

use crate::services::classify::ClassifyError;
use crate::services::decompile::DecompileError;

pub use pipeline::{parse_platform_choice, AcquisitionPipeline, BuildRun, PlatformRun};

#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("Download of {url} failed: {message}")]
    Download { url: String, message: String },
    #[error("Download of {url} returned HTTP {status}")]
    Http { url: String, status: u16 },
    #[error("Failed to extract {}: {message}", .archive.display())]
    Extract { archive: PathBuf, message: String },
    #[error("Expected server image not found at {}", .0.display())]
    MissingImage(PathBuf),
    #[error("Failed to classify {}: {source}", .path.display())]
    Classify {
        path: PathBuf,
        #[source]
        source: ClassifyError,
    },
    #[error(transparent)]
    Decompile(#[from] DecompileError),
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) fn io_err(path: &std::path::Path) -> impl FnOnce(std::io::Error) -> AcquireError + '_ {
    move |source| AcquireError::Io { path: path.to_path_buf(), source }
}
