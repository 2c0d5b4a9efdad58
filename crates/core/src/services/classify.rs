use thiserror::Error;

use crate::image::{FieldConstant, ImageError, ImageMetadata, ImageReader};
use crate::model::{ImageIdentity, Platform, Side};

/// Type holding the internal release counter.
pub const RELEASE_TYPE: &str = "Terraria.Main";
/// Constant field on [`RELEASE_TYPE`] carrying the release counter.
pub const RELEASE_FIELD: &str = "curRelease";

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("Malformed image: {0}")]
    MalformedImage(String),
    #[error("Image declares no entry point")]
    MissingEntryPoint,
    #[error("Release counter {type_name}::{field_name} not found in image")]
    ReleaseFieldNotFound { type_name: String, field_name: String },
    #[error("Release counter {type_name}::{field_name} is not a 32-bit integer constant")]
    ReleaseFieldNotInteger { type_name: String, field_name: String },
}

impl From<ImageError> for ClassifyError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::MissingEntryPoint => ClassifyError::MissingEntryPoint,
            ImageError::Malformed(msg) => ClassifyError::MalformedImage(msg),
            ImageError::Io(e) => ClassifyError::MalformedImage(e.to_string()),
        }
    }
}

/// Classify an executable image from its raw bytes.
///
/// The bytes are copied into the returned identity; the caller's buffer is untouched.
pub fn classify(bytes: &[u8], reader: &dyn ImageReader) -> Result<ImageIdentity, ClassifyError> {
    let image = reader.open(bytes)?;
    classify_opened(bytes, image.as_ref())
}

/// Classify an already-opened image. `bytes` must be the buffer `image` was opened from.
pub fn classify_opened(
    bytes: &[u8],
    image: &dyn ImageMetadata,
) -> Result<ImageIdentity, ClassifyError> {
    let assembly_name = image.assembly_name().to_string();
    let side = Side::from_assembly_name(&assembly_name);
    let platform = Platform::from_launch_type(&image.entry_point_type()?);
    let version = image.version();
    let release = release_number(image)?;

    log::debug!(
        "classified {assembly_name}: side={side} platform={platform} \
         version={version} release={release}"
    );
    Ok(ImageIdentity::new(bytes.to_vec(), assembly_name, side, platform, version, release))
}

fn release_number(image: &dyn ImageMetadata) -> Result<i32, ClassifyError> {
    let not_found = || ClassifyError::ReleaseFieldNotFound {
        type_name: RELEASE_TYPE.to_string(),
        field_name: RELEASE_FIELD.to_string(),
    };
    match image.field_constant(RELEASE_TYPE, RELEASE_FIELD) {
        FieldConstant::Int(value) => i32::try_from(value).map_err(|_| {
            ClassifyError::ReleaseFieldNotInteger {
                type_name: RELEASE_TYPE.to_string(),
                field_name: RELEASE_FIELD.to_string(),
            }
        }),
        FieldConstant::TypeMissing | FieldConstant::FieldMissing => Err(not_found()),
        FieldConstant::NotInteger => Err(ClassifyError::ReleaseFieldNotInteger {
            type_name: RELEASE_TYPE.to_string(),
            field_name: RELEASE_FIELD.to_string(),
        }),
    }
}
