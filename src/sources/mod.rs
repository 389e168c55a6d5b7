//! Source providers.
//!
//! A provider makes the upstream source tree available under a work
//! directory and returns its root. The build never looks past this seam, so
//! a local checkout and a downloaded archive are interchangeable.

pub mod tarball;

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

pub use tarball::{extract_tarball, TarballSource};

/// Something that can produce the upstream source tree.
pub trait SourceProvider {
    /// Name for display.
    fn name(&self) -> &str;

    /// Make the source tree available below `work_dir`; return its root.
    fn fetch(&self, work_dir: &Path) -> Result<PathBuf>;
}

/// A source tree that already exists on disk.
#[derive(Debug, Clone)]
pub struct LocalSource {
    root: PathBuf,
}

impl LocalSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalSource { root: root.into() }
    }
}

impl SourceProvider for LocalSource {
    fn name(&self) -> &str {
        "local"
    }

    fn fetch(&self, _work_dir: &Path) -> Result<PathBuf> {
        if !self.root.is_dir() {
            bail!("source directory not found: {}", self.root.display());
        }
        Ok(self.root.clone())
    }
}
