//! Acquisition configuration: the version catalog and the download naming templates.
//!
//! The vendor's hosting convention has changed shape over time, so the URL and local
//! file-name templates are data rather than code. Configs load from YAML or JSON.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::BuildId;

/// Placeholder substituted with the public build identifier.
pub const VERSION_PLACEHOLDER: &str = "{version}";

pub const DEFAULT_URL_TEMPLATE: &str =
    "https://terraria.org/api/download/pc-dedicated-server/terraria-server-{version}.zip";
pub const DEFAULT_FILE_STEM_TEMPLATE: &str = "terraria-server-{version}";

/// Dedicated-server builds published by the vendor, oldest first.
const DEFAULT_VERSIONS: [u32; 19] = [
    1423, 143, 1431, 1432, 1433, 1434, 1435, 1436, 144, 1441, 1442, 1443, 1444, 1445, 1446,
    1447, 1448, 14481, 1449,
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
    #[error("Duplicate catalog key {0}")]
    DuplicateKey(u32),
    #[error("Version catalog is empty")]
    EmptyCatalog,
    #[error("Template {0:?} does not contain {{version}}")]
    BadTemplate(String),
}

/// Everything the acquisition pipeline needs to turn a menu choice into files on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquireConfig {
    #[serde(default = "default_url_template")]
    pub url_template: String,
    #[serde(default = "default_file_stem_template")]
    pub file_stem_template: String,
    #[serde(default = "default_catalog")]
    pub catalog: Vec<BuildId>,
}

fn default_url_template() -> String {
    DEFAULT_URL_TEMPLATE.to_string()
}

fn default_file_stem_template() -> String {
    DEFAULT_FILE_STEM_TEMPLATE.to_string()
}

fn default_catalog() -> Vec<BuildId> {
    DEFAULT_VERSIONS
        .iter()
        .enumerate()
        .map(|(index, &version)| BuildId { index: index as u32, version })
        .collect()
}

impl Default for AcquireConfig {
    fn default() -> Self {
        Self {
            url_template: default_url_template(),
            file_stem_template: default_file_stem_template(),
            catalog: default_catalog(),
        }
    }
}

impl AcquireConfig {
    /// Load and validate a config file. `.json` parses as JSON, anything else as YAML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let body = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
        let parsed: Self = if is_json {
            serde_json::from_str(&body).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        } else {
            serde_yaml::from_str(&body).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        };
        parsed.validate()?;
        log::debug!("loaded {} catalog entries from {}", parsed.catalog.len(), path.display());
        Ok(parsed)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.catalog.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }
        let mut seen = HashSet::new();
        for build in &self.catalog {
            if !seen.insert(build.index) {
                return Err(ConfigError::DuplicateKey(build.index));
            }
        }
        for template in [&self.url_template, &self.file_stem_template] {
            if !template.contains(VERSION_PLACEHOLDER) {
                return Err(ConfigError::BadTemplate(template.clone()));
            }
        }
        Ok(())
    }

    /// Catalog entry for a menu key.
    pub fn select(&self, index: u32) -> Option<BuildId> {
        self.catalog.iter().copied().find(|b| b.index == index)
    }

    pub fn url_for(&self, build: BuildId) -> String {
        self.url_template.replace(VERSION_PLACEHOLDER, &build.version.to_string())
    }

    /// Local stem shared by the archive (`<stem>.zip`) and its extracted tree (`<stem>/`).
    pub fn file_stem_for(&self, build: BuildId) -> String {
        self.file_stem_template.replace(VERSION_PLACEHOLDER, &build.version.to_string())
    }
}
