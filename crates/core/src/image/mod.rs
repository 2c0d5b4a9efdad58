//! Executable image metadata capability.
//!
//! The classifier and the reference extractor never parse executable formats themselves.
//! They go through [`ImageReader`], which opens a byte buffer into an [`ImageMetadata`]
//! view exposing just the facts this crate needs. Concrete readers wrap an existing
//! metadata library; tests plug in synthetic readers.

#[cfg(feature = "dotscope-reader")]
pub mod dotscope;

use thiserror::Error;

use crate::model::AssemblyVersion;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Malformed image: {0}")]
    Malformed(String),
    #[error("Image declares no entry point")]
    MissingEntryPoint,
    #[error("I/O error while reading image: {0}")]
    Io(#[from] std::io::Error),
}

/// Kind of a manifest resource entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Bytes stored inside the image itself.
    Embedded,
    /// Resource living in another file or assembly.
    Linked,
}

/// A manifest resource as enumerated from an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    pub name: String,
    pub kind: ResourceKind,
    /// Present only for [`ResourceKind::Embedded`] entries whose data could be read.
    pub data: Option<Vec<u8>>,
}

impl ResourceEntry {
    /// Cast to the embedded-binary view; `None` for linked or unreadable entries.
    pub fn as_embedded(&self) -> Option<&[u8]> {
        match self.kind {
            ResourceKind::Embedded => self.data.as_deref(),
            ResourceKind::Linked => None,
        }
    }
}

/// Read-only view over one opened image.
pub trait ImageMetadata {
    /// Declared assembly/module short name.
    fn assembly_name(&self) -> &str;

    /// Full name of the type declaring the program entry point.
    ///
    /// Fails with [`ImageError::MissingEntryPoint`] when the image has none.
    fn entry_point_type(&self) -> Result<String, ImageError>;

    fn version(&self) -> AssemblyVersion;

    /// Full names (`Namespace.Name`) of every type defined in the image, in table order.
    fn type_names(&self) -> Vec<String>;

    /// Compile-time constant of `field` on the first type whose full name is `type_name`.
    fn field_constant(&self, type_name: &str, field: &str) -> FieldConstant;

    fn resources(&self) -> Vec<ResourceEntry>;

    /// Names of assemblies this image references.
    fn assembly_references(&self) -> Vec<String>;
}

/// Result of a constant lookup. Missing members and non-integral values are kept
/// apart so callers can report which one it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldConstant {
    Int(i64),
    TypeMissing,
    FieldMissing,
    NotInteger,
}

/// Opens raw bytes into metadata. Implementations must not retain or mutate the
/// caller's buffer beyond the returned view.
pub trait ImageReader: Send + Sync {
    fn open(&self, bytes: &[u8]) -> Result<Box<dyn ImageMetadata>, ImageError>;

    fn name(&self) -> &'static str;
}

/// Reader compiled into this build, if any.
pub fn default_reader() -> Option<Box<dyn ImageReader>> {
    #[cfg(feature = "dotscope-reader")]
    {
        return Some(Box::new(dotscope::DotscopeReader));
    }
    #[allow(unreachable_code)]
    None
}
