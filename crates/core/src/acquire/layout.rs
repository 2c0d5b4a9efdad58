use std::path::{Path, PathBuf};

use crate::model::Platform;

/// File name of the dedicated server image inside every platform directory.
pub const SERVER_IMAGE: &str = "TerrariaServer.exe";

/// Bundle path the Mac build nests its binaries under.
const MAC_BUNDLE: [&str; 3] = ["Terraria Server.app", "Contents", "MacOS"];

/// Directory that holds the server image for `platform` inside an extracted tree.
///
/// `root` is the extracted archive directory; builds keep each platform under
/// `<root>/<version>/<Platform>`, and the Mac build nests one bundle deeper.
pub fn image_dir(root: &Path, version: u32, platform: Platform) -> PathBuf {
    let dir = root.join(version.to_string()).join(platform.as_str());
    match platform {
        Platform::Mac => MAC_BUNDLE.iter().fold(dir, |acc, part| acc.join(part)),
        _ => dir,
    }
}

pub fn image_path(root: &Path, version: u32, platform: Platform) -> PathBuf {
    image_dir(root, version, platform).join(SERVER_IMAGE)
}

/// Extra resolver directories for a platform's image.
///
/// Linux and Mac ship native libraries next to the image; Windows needs nothing extra.
pub fn extra_search_dirs(root: &Path, version: u32, platform: Platform) -> Vec<PathBuf> {
    match platform {
        Platform::Linux | Platform::Mac => vec![image_dir(root, version, platform)],
        Platform::Windows | Platform::Unknown => Vec::new(),
    }
}
