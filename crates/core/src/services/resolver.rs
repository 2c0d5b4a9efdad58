use std::path::{Path, PathBuf};

/// File extensions tried when looking up a dependency by name.
const LOOKUP_EXTENSIONS: [&str; 2] = ["dll", "exe"];

/// How a dependency name was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Found on disk in one of the search directories.
    Found(PathBuf),
    /// Base class library assembly; the decompiler resolves these from its own runtime.
    Framework,
    /// Not found; only returned by lenient resolvers.
    Unresolved,
}

/// A dependency that a strict resolver could not find.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolved {
    pub name: String,
    pub searched: Vec<PathBuf>,
}

/// Search-path-aware dependency resolver handed to decompile backends.
///
/// Directories are consulted in insertion order; the first hit wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyResolver {
    search_dirs: Vec<PathBuf>,
    strict: bool,
}

impl AssemblyResolver {
    /// A resolver with no search directories. `strict` makes unresolved names an error.
    pub fn new(strict: bool) -> Self {
        Self { search_dirs: Vec::new(), strict }
    }

    pub fn add_search_dir(&mut self, dir: impl Into<PathBuf>) -> &mut Self {
        let dir = dir.into();
        if !self.search_dirs.contains(&dir) {
            self.search_dirs.push(dir);
        }
        self
    }

    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Resolve a dependency by assembly name.
    pub fn resolve(&self, name: &str) -> Result<Resolution, Unresolved> {
        if is_framework_assembly(name) {
            return Ok(Resolution::Framework);
        }
        if let Some(path) = self.find(name) {
            return Ok(Resolution::Found(path));
        }
        if self.strict {
            Err(Unresolved { name: name.to_string(), searched: self.search_dirs.clone() })
        } else {
            log::warn!("could not resolve dependency {name}; continuing without it");
            Ok(Resolution::Unresolved)
        }
    }

    fn find(&self, name: &str) -> Option<PathBuf> {
        self.search_dirs.iter().find_map(|dir| find_in_dir(dir, name))
    }
}

fn find_in_dir(dir: &Path, name: &str) -> Option<PathBuf> {
    LOOKUP_EXTENSIONS.iter().map(|ext| dir.join(format!("{name}.{ext}"))).find(|p| p.is_file())
}

/// Assemblies shipped with the .NET/Mono runtime itself.
pub fn is_framework_assembly(name: &str) -> bool {
    matches!(name, "mscorlib" | "netstandard" | "System" | "WindowsBase")
        || name.starts_with("System.")
        || name.starts_with("Microsoft.")
        || name.starts_with("Mono.")
}
