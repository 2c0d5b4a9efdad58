use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::{io_err, AcquireError};

/// Fetches a remote archive to a local file.
pub trait Download {
    /// Download `url` into `dest`, returning the number of bytes written.
    fn download(&self, url: &str, dest: &Path) -> Result<u64, AcquireError>;
}

/// Blocking HTTP downloader with a byte progress bar on stderr.
#[derive(Debug, Clone, Default)]
pub struct HttpDownloader {
    /// Hide the progress bar (non-interactive runs).
    pub quiet: bool,
}

impl HttpDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    fn progress_bar(&self, len: Option<u64>) -> ProgressBar {
        let target =
            if self.quiet { ProgressDrawTarget::hidden() } else { ProgressDrawTarget::stderr() };
        let bar = ProgressBar::with_draw_target(len, target);
        bar.set_style(
            ProgressStyle::with_template(
                "[{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
        );
        bar
    }
}

impl Download for HttpDownloader {
    fn download(&self, url: &str, dest: &Path) -> Result<u64, AcquireError> {
        let failed = |e: reqwest::Error| AcquireError::Download {
            url: url.to_string(),
            message: e.to_string(),
        };
        // No whole-request timeout; downloads run to completion or fail.
        let client = reqwest::blocking::Client::builder()
            .timeout(None::<Duration>)
            .build()
            .map_err(failed)?;

        log::info!("downloading {url}");
        let response = client.get(url).send().map_err(failed)?;
        if !response.status().is_success() {
            return Err(AcquireError::Http {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let partial = partial_path(dest);
        let mut file = File::create(&partial).map_err(io_err(&partial))?;
        let bar = self.progress_bar(response.content_length());
        let written = io::copy(&mut bar.wrap_read(response), &mut file).map_err(|e| {
            AcquireError::Download { url: url.to_string(), message: e.to_string() }
        })?;
        bar.finish();
        drop(file);

        fs::rename(&partial, dest).map_err(io_err(dest))?;
        log::info!("downloaded {written} bytes to {}", dest.display());
        Ok(written)
    }
}

/// Sibling path written while a download is in flight; renamed into place on success.
fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}
