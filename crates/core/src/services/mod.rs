//! Pipeline services: classification, reference extraction, dependency resolution
//! and whole-project decompilation.

pub mod backends;
pub mod classify;
pub mod decompile;
pub mod project_file;
pub mod references;
pub mod resolver;
