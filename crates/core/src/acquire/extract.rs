use std::fs::{self, File};
use std::io;
use std::path::Path;

use super::{io_err, AcquireError};

/// Unpack a zip archive into `dest`, returning the number of files written.
///
/// Entries whose names would escape `dest` (absolute paths, `..` components) are skipped.
pub fn extract_zip(archive: &Path, dest: &Path) -> Result<usize, AcquireError> {
    let failed =
        |message: String| AcquireError::Extract { archive: archive.to_path_buf(), message };

    let file = File::open(archive).map_err(io_err(archive))?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| failed(format!("invalid zip: {e}")))?;
    fs::create_dir_all(dest).map_err(io_err(dest))?;

    let mut count = 0;
    for i in 0..zip.len() {
        let mut entry =
            zip.by_index(i).map_err(|e| failed(format!("failed to read entry {i}: {e}")))?;
        let Some(relative) = entry.enclosed_name() else {
            log::warn!("skipping unsafe archive entry {}", entry.name());
            continue;
        };
        let out = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out).map_err(io_err(&out))?;
            continue;
        }
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent).map_err(io_err(parent))?;
        }
        let mut target = File::create(&out).map_err(io_err(&out))?;
        io::copy(&mut entry, &mut target).map_err(io_err(&out))?;
        count += 1;
    }

    log::info!("extracted {count} file(s) into {}", dest.display());
    Ok(count)
}
