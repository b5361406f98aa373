//! Source discovery and module path derivation.

use std::collections::BTreeMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use regex::Regex;
use tracing::{debug, warn};

use crate::config::{BuildConfig, IMPLICIT_IGNORED_DIRS};
use crate::errors::{CartographerError, CartographerResult};

const SOURCE_EXTENSION: &str = "py";
const PACKAGE_INITIALIZER: &str = "__init__.py";

static IDENTIFIER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[^\W\d]\w*$").unwrap());

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

/// Yields the eligible source files beneath a project root.
pub trait SourceProvider: Send + Sync {
    /// Root-relative paths of every eligible source file, sorted.
    fn discover(&self, root: &Path) -> CartographerResult<Vec<PathBuf>>;

    /// Text of one discovered file.
    fn read(&self, root: &Path, relative: &Path) -> io::Result<String>;
}

/// Walks a directory tree on disk.
#[derive(Clone, Debug, Default)]
pub struct FileSystemSource {
    config: BuildConfig,
}

impl FileSystemSource {
    pub fn new(config: BuildConfig) -> Self {
        Self { config }
    }

    fn walker(&self, root: &Path) -> WalkBuilder {
        let respect = self.config.respect_gitignore;
        let mut builder = WalkBuilder::new(root);
        builder
            .hidden(!self.config.include_hidden)
            .git_ignore(respect)
            .git_global(respect)
            .git_exclude(respect)
            .parents(respect)
            .sort_by_file_name(|a, b| a.cmp(b));
        builder.filter_entry(|entry| {
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            let name = entry.file_name().to_string_lossy();
            !(is_dir && IMPLICIT_IGNORED_DIRS.contains(&name.as_ref()))
        });

        if !self.config.exclude_patterns.is_empty() {
            let mut overrides = OverrideBuilder::new(root);
            for pattern in &self.config.exclude_patterns {
                if let Err(e) = overrides.add(&format!("!{pattern}")) {
                    warn!("Ignoring invalid exclude pattern {pattern:?}: {e}");
                }
            }
            match overrides.build() {
                Ok(built) => {
                    builder.overrides(built);
                }
                Err(e) => warn!("Ignoring exclude patterns: {e}"),
            }
        }
        builder
    }
}

impl SourceProvider for FileSystemSource {
    fn discover(&self, root: &Path) -> CartographerResult<Vec<PathBuf>> {
        if !root.is_dir() {
            return Err(CartographerError::SourceNotFound(root.to_path_buf()));
        }

        let mut files = Vec::new();
        for result in self.walker(root).build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Failed to read entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SOURCE_EXTENSION) {
                continue;
            }
            match path.strip_prefix(root) {
                Ok(relative) => files.push(relative.to_path_buf()),
                Err(_) => debug!("Skipping {} outside of {}", path.display(), root.display()),
            }
        }
        files.sort();
        Ok(files)
    }

    fn read(&self, root: &Path, relative: &Path) -> io::Result<String> {
        std::fs::read_to_string(root.join(relative))
    }
}

/// Serves sources from memory; the root path is not consulted.
#[derive(Clone, Debug, Default)]
pub struct InMemorySource {
    files: BTreeMap<PathBuf, String>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, relative: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        self.files.insert(relative.into(), text.into());
        self
    }
}

impl SourceProvider for InMemorySource {
    fn discover(&self, _root: &Path) -> CartographerResult<Vec<PathBuf>> {
        Ok(self
            .files
            .keys()
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(SOURCE_EXTENSION))
            .cloned()
            .collect())
    }

    fn read(&self, _root: &Path, relative: &Path) -> io::Result<String> {
        self.files.get(relative).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, relative.display().to_string())
        })
    }
}

// ---------------------------------------------------------------------------
// Module paths
// ---------------------------------------------------------------------------

/// Root-relative dotted location of a source file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModulePath {
    /// Directory segments followed by the module name; a package initializer
    /// contributes only its directory segments.
    pub segments: Vec<String>,
    pub is_package_init: bool,
}

impl ModulePath {
    /// Derive the module path of `relative`, e.g. `app/services/user.py`
    /// becomes `app.services.user` and `app/__init__.py` becomes `app`.
    pub fn from_relative(relative: &Path) -> Result<Self, String> {
        let mut parts = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(os) => match os.to_str() {
                    Some(s) => parts.push(s.to_string()),
                    None => return Err(format!("non UTF-8 path segment in {}", relative.display())),
                },
                Component::CurDir => {}
                _ => return Err(format!("unsupported path {}", relative.display())),
            }
        }
        let Some(file_name) = parts.pop() else {
            return Err("empty path".to_string());
        };

        let is_package_init = file_name == PACKAGE_INITIALIZER;
        if !is_package_init {
            let stem = file_name
                .strip_suffix(".py")
                .ok_or_else(|| format!("{file_name} is not a Python source file"))?;
            parts.push(stem.to_string());
        }

        if let Some(bad) = parts.iter().find(|p| !IDENTIFIER_RE.is_match(p)) {
            return Err(format!("{bad:?} is not an importable name"));
        }

        Ok(Self {
            segments: parts,
            is_package_init,
        })
    }

    /// Segments of the package a relative import of depth one refers to.
    pub fn package_segments(&self) -> &[String] {
        if self.is_package_init {
            &self.segments
        } else {
            &self.segments[..self.segments.len().saturating_sub(1)]
        }
    }

    pub fn dotted(&self) -> String {
        self.segments.join(".")
    }
}
