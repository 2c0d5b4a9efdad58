//! tsg-core
//!
//! Core library for identifying game server images and turning them back into
//! buildable source trees.
//!
//! An image is classified from its own metadata (side, platform, version, release
//! counter), its embedded dependencies are written next to the output, and an external
//! whole-project decompiler is driven through the [`services::decompile::DecompileBackend`]
//! capability. The [`acquire`] pipeline wraps this with download, extraction and a
//! version menu.
//!
//! All console interaction goes through [`prompt::Confirm`] and [`progress::ProgressSink`]
//! so every stage is testable without a terminal.

pub mod acquire;
pub mod config;
pub mod image;
pub mod model;
pub mod progress;
pub mod prompt;
pub mod services;

/// Returns the library version as encoded at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
