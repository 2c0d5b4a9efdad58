//! Core data model for classified images.
//!
//! An [`ImageIdentity`] is the immutable result of inspecting one executable image:
//! which side (client/server) and platform it was built for, its declared assembly
//! version, and the internal release counter. The raw bytes are kept alongside so
//! later pipeline stages can reopen the image without touching the filesystem again.

use std::fmt;
use std::io::Cursor;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Which half of the game an image belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Client,
    Server,
    Unknown,
}

impl Side {
    /// Map a declared assembly name to a side. Exact, case-sensitive match only.
    pub fn from_assembly_name(name: &str) -> Self {
        match name {
            "Terraria" => Side::Client,
            "TerrariaServer" => Side::Server,
            _ => Side::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Client => "Client",
            Side::Server => "Server",
            Side::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target operating system of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Windows,
    Linux,
    Mac,
    Unknown,
}

impl Platform {
    /// Map the full name of the type declaring the entry point to a platform.
    pub fn from_launch_type(full_name: &str) -> Self {
        match full_name {
            "Terraria.WindowsLaunch" => Platform::Windows,
            "Terraria.LinuxLaunch" => Platform::Linux,
            "Terraria.MacLaunch" => Platform::Mac,
            _ => Platform::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Windows => "Windows",
            Platform::Linux => "Linux",
            Platform::Mac => "Mac",
            Platform::Unknown => "Unknown",
        }
    }

    /// The three concrete platforms, in the order the acquisition menu processes them.
    pub fn all() -> [Platform; 3] {
        [Platform::Windows, Platform::Linux, Platform::Mac]
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Four-part assembly version (`major.minor.build.revision`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssemblyVersion {
    pub major: u32,
    pub minor: u32,
    pub build: u32,
    pub revision: u32,
}

impl AssemblyVersion {
    pub fn new(major: u32, minor: u32, build: u32, revision: u32) -> Self {
        Self { major, minor, build, revision }
    }
}

impl fmt::Display for AssemblyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}.{}", self.major, self.minor, self.build, self.revision)
    }
}

/// Identity facts derived from one executable image.
///
/// Constructed once by [`crate::services::classify::classify`] and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageIdentity {
    raw_bytes: Vec<u8>,
    assembly_name: String,
    side: Side,
    platform: Platform,
    version: AssemblyVersion,
    release: i32,
}

impl ImageIdentity {
    pub fn new(
        raw_bytes: Vec<u8>,
        assembly_name: impl Into<String>,
        side: Side,
        platform: Platform,
        version: AssemblyVersion,
        release: i32,
    ) -> Self {
        Self { raw_bytes, assembly_name: assembly_name.into(), side, platform, version, release }
    }

    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw_bytes
    }

    /// Declared assembly short name (also the generated project's name).
    pub fn assembly_name(&self) -> &str {
        &self.assembly_name
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn version(&self) -> AssemblyVersion {
        self.version
    }

    /// Internal release counter, distinct from the public version.
    pub fn release(&self) -> i32 {
        self.release
    }

    /// A fresh read cursor over the image bytes. Every call starts at offset zero.
    pub fn open_stream(&self) -> Cursor<&[u8]> {
        Cursor::new(&self.raw_bytes)
    }

    /// Lowercase hex SHA-256 of the image bytes.
    pub fn sha256_hex(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.raw_bytes);
        format!("{:x}", hasher.finalize())
    }

    /// Default output directory name: `{version}-{release}-{platform}-{side}`.
    ///
    /// Other tooling keys off this shape; keep it stable.
    pub fn output_dir_name(&self) -> String {
        format!("{}-{}-{}-{}", self.version, self.release, self.platform, self.side)
    }
}

/// One entry of the version catalog: the selection key shown in the menu and the
/// public build identifier used to build download URLs and local names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildId {
    pub index: u32,
    pub version: u32,
}
