//! Textual fix-ups applied to the generated project descriptor.
//!
//! The decompiler emits a descriptor targeting the client profile of an old framework
//! version, and misses the XML library the game code needs. These are plain text
//! substitutions applied in a fixed order, not an XML rewrite.

use std::fs;
use std::path::Path;

const CLIENT_PROFILE: &str = "<TargetFrameworkProfile>Client</TargetFrameworkProfile>";
const LEGACY_FRAMEWORK: &str = "<TargetFrameworkVersion>v4.0</TargetFrameworkVersion>";
const SUPPORTED_FRAMEWORK: &str = "<TargetFrameworkVersion>v4.5</TargetFrameworkVersion>";
const ANCHOR_REFERENCE: &str = "<Reference Include=\"System.Core\">";
const XML_REFERENCE: &str = "<Reference Include=\"System.Xml\" />";

/// Apply the descriptor fix-ups. Idempotent: a second pass changes nothing.
pub fn post_process(project: &str) -> String {
    let mut out =
        project.replace(CLIENT_PROFILE, "").replace(LEGACY_FRAMEWORK, SUPPORTED_FRAMEWORK);
    // The XML reference is only injected once, ahead of the System.Core entry.
    if !out.contains(XML_REFERENCE) {
        out = out.replace(ANCHOR_REFERENCE, &format!("{XML_REFERENCE}\n    {ANCHOR_REFERENCE}"));
    }
    out
}

/// Rewrite the descriptor at `path` in place.
pub fn post_process_file(path: &Path) -> std::io::Result<()> {
    let body = fs::read_to_string(path)?;
    let processed = post_process(&body);
    if processed != body {
        fs::write(path, processed)?;
    }
    Ok(())
}
