use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::image::{ImageError, ImageReader};
use crate::model::{ImageIdentity, Platform};

/// Name of the references directory created inside every output directory.
pub const REFERENCES_DIR: &str = "references";

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("Failed to open image for reference extraction: {0}")]
    Image(#[from] ImageError),
    #[error("Embedded resource {resource} is not a readable image: {source}")]
    EmbeddedImage {
        resource: String,
        #[source]
        source: ImageError,
    },
    #[error("Failed to write reference {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Dependencies written to a references directory, keyed by the written file name
/// (`<declared name>.<ext>`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceSet {
    pub entries: BTreeMap<String, PathBuf>,
}

impl ReferenceSet {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resource name suffixes treated as embedded dependencies for a platform.
///
/// Managed `.dll` assemblies are embedded the same way on every platform; the
/// platform's native library suffix is accepted as well.
pub fn dependency_suffixes(platform: Platform) -> &'static [&'static str] {
    match platform {
        Platform::Windows | Platform::Unknown => &[".dll"],
        Platform::Linux => &[".dll", ".so"],
        Platform::Mac => &[".dll", ".dylib"],
    }
}

/// Write every embedded dependency of `identity` into `target_dir`.
///
/// Each dependency is saved as `<declared name>.<ext>`, where the declared name comes
/// from re-reading the embedded bytes as an image. Running twice overwrites the same
/// files with the same bytes.
pub fn extract_references(
    identity: &ImageIdentity,
    reader: &dyn ImageReader,
    target_dir: &Path,
) -> Result<ReferenceSet, ReferenceError> {
    let image = reader.open(identity.raw_bytes())?;
    let suffixes = dependency_suffixes(identity.platform());
    let mut set = ReferenceSet::default();

    for resource in image.resources() {
        let Some(suffix) = suffixes.iter().find(|s| resource.name.ends_with(*s)) else {
            continue;
        };
        let Some(data) = resource.as_embedded() else {
            log::debug!("skipping non-embedded resource {}", resource.name);
            continue;
        };

        let declared = reader
            .open(data)
            .map_err(|source| ReferenceError::EmbeddedImage {
                resource: resource.name.clone(),
                source,
            })?
            .assembly_name()
            .to_string();

        let file_name = format!("{declared}{suffix}");
        let path = target_dir.join(&file_name);
        fs::write(&path, data).map_err(|source| ReferenceError::Io { path: path.clone(), source })?;
        log::debug!("extracted {} -> {}", resource.name, path.display());
        set.entries.insert(file_name, path);
    }

    Ok(set)
}
