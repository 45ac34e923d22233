//! Static file resolution module
//!
//! Turns a request path into a file under a root directory. Paths are canonicalized
//! (`.`/`..` and symlinks resolved) before the ancestor check, so nothing outside
//! the root is ever reachable.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Document served for directory requests
pub const DEFAULT_INDEX_FILE: &str = "index.html";

/// File bodies are written to the sink in chunks of this size
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Why a request path did not resolve to a servable file
///
/// Every variant is answered with the same 404; the distinction exists for logging only.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("static root '{}' is unavailable: {source}", .root.display())]
    RootUnavailable {
        root: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no such file: {}", .0.display())]
    NotFound(PathBuf),

    #[error("path escapes static root: {} -> {}", .requested.display(), .resolved.display())]
    OutsideRoot { requested: PathBuf, resolved: PathBuf },

    #[error("not a regular file: {}", .0.display())]
    NotAFile(PathBuf),
}

/// Outcome of a successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Canonical path of a regular file inside the root
    File(PathBuf),
    /// A directory was requested without its trailing slash
    Redirect,
}

/// A directory tree served as static content
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
    index_file: String,
    not_found_page: Option<String>,
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            index_file: DEFAULT_INDEX_FILE.to_string(),
            not_found_page: None,
        }
    }

    #[must_use]
    pub fn with_index_file(mut self, index_file: impl Into<String>) -> Self {
        self.index_file = index_file.into();
        self
    }

    /// Serve this file (relative to the root) with status 404 for unresolvable paths
    #[must_use]
    pub fn with_not_found_page(mut self, page: impl Into<String>) -> Self {
        self.not_found_page = Some(page.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index_file(&self) -> &str {
        &self.index_file
    }

    /// Resolve a decoded request path against the root
    pub fn resolve(&self, request_path: &str) -> Result<Resolved, ResolveError> {
        let root = self.canonical_root()?;
        let target = contain(&root, &root.join(request_path.trim_start_matches('/')))?;

        if target.is_dir() {
            // Relative links inside the index only work with the slash present
            if !request_path.ends_with('/') {
                return Ok(Resolved::Redirect);
            }
            let index = contain(&root, &target.join(&self.index_file))?;
            return regular_file(index).map(Resolved::File);
        }

        regular_file(target).map(Resolved::File)
    }

    /// Canonical path of the configured 404 page, if one is set and present
    pub fn not_found_page(&self) -> Option<PathBuf> {
        let page = self.not_found_page.as_deref()?;
        let root = self.canonical_root().ok()?;
        let path = contain(&root, &root.join(page.trim_start_matches('/'))).ok()?;
        regular_file(path).ok()
    }

    fn canonical_root(&self) -> Result<PathBuf, ResolveError> {
        self.root
            .canonicalize()
            .map_err(|source| ResolveError::RootUnavailable {
                root: self.root.clone(),
                source,
            })
    }
}

/// Canonicalize `candidate` and require it to stay under `root`
fn contain(root: &Path, candidate: &Path) -> Result<PathBuf, ResolveError> {
    let resolved = candidate
        .canonicalize()
        .map_err(|_| ResolveError::NotFound(candidate.to_path_buf()))?;

    if resolved.starts_with(root) {
        Ok(resolved)
    } else {
        Err(ResolveError::OutsideRoot {
            requested: candidate.to_path_buf(),
            resolved,
        })
    }
}

fn regular_file(path: PathBuf) -> Result<PathBuf, ResolveError> {
    match path.metadata() {
        Ok(meta) if meta.is_file() => Ok(path),
        Ok(_) => Err(ResolveError::NotAFile(path)),
        Err(_) => Err(ResolveError::NotFound(path)),
    }
}
