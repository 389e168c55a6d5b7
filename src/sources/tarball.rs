//! Source archives.
//!
//! Downloads the upstream `.tar.gz`, unpacks it and moves its top-level
//! directory to the canonical source folder name.

use std::fs;
use std::io::Cursor;
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use tar::Archive;
use url::Url;

use crate::core::recipe::Recipe;
use crate::sources::SourceProvider;
use crate::util::fs::remove_dir_all_if_exists;
use crate::util::hash::sha256_bytes;

/// A `.tar.gz` source archive.
#[derive(Debug, Clone)]
pub struct TarballSource {
    url: Url,
    /// Top-level directory inside the archive.
    archive_root: String,
    /// Directory name the tree is moved to.
    source_subfolder: String,
    offline: bool,
}

impl TarballSource {
    pub fn new(url: Url, archive_root: impl Into<String>, source_subfolder: impl Into<String>) -> Self {
        TarballSource {
            url,
            archive_root: archive_root.into(),
            source_subfolder: source_subfolder.into(),
            offline: false,
        }
    }

    /// The archive named by `recipe`.
    pub fn from_recipe(recipe: &Recipe) -> Result<Self> {
        Ok(TarballSource::new(
            recipe.source_url()?,
            recipe.archive_root(),
            recipe.package.source_subfolder.clone(),
        ))
    }

    /// Refuse to download; only an existing tree is accepted.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn download(&self) -> Result<Vec<u8>> {
        if self.url.scheme() == "file" {
            let path = self
                .url
                .to_file_path()
                .map_err(|_| anyhow::anyhow!("invalid file URL: {}", self.url))?;
            return fs::read(&path)
                .with_context(|| format!("failed to read archive: {}", path.display()));
        }

        tracing::info!("Downloading {}", self.url);
        let response = reqwest::blocking::get(self.url.clone())
            .with_context(|| format!("failed to download {}", self.url))?;

        if !response.status().is_success() {
            bail!("failed to download {}: HTTP {}", self.url, response.status());
        }

        let bytes = response
            .bytes()
            .context("failed to read archive response body")?;
        Ok(bytes.to_vec())
    }
}

impl SourceProvider for TarballSource {
    fn name(&self) -> &str {
        "tarball"
    }

    fn fetch(&self, work_dir: &Path) -> Result<PathBuf> {
        let root = work_dir.join(&self.source_subfolder);
        if root.is_dir() {
            tracing::info!("Using existing source tree {}", root.display());
            return Ok(root);
        }

        if self.offline {
            bail!(
                "source tree {} is missing and downloads are disabled (offline)",
                root.display()
            );
        }

        let data = self.download()?;
        tracing::debug!("Archive sha256 {}", sha256_bytes(&data));

        // Unpack next to the final location, then rename into place.
        let partial = work_dir.join(format!(".{}.partial", self.source_subfolder));
        remove_dir_all_if_exists(&partial)?;
        if let Err(e) = extract_tarball(&data, &partial, Some(&self.archive_root)) {
            remove_dir_all_if_exists(&partial)?;
            return Err(e.context(format!("failed to extract {}", self.url)));
        }

        fs::rename(&partial, &root).with_context(|| {
            format!("failed to move {} to {}", partial.display(), root.display())
        })?;

        tracing::info!("Extracted source to {}", root.display());
        Ok(root)
    }
}

/// Extract a `.tar.gz` into `dest`, dropping `strip_prefix` from entry paths.
pub fn extract_tarball(data: &[u8], dest: &Path, strip_prefix: Option<&str>) -> Result<()> {
    let mut archive = Archive::new(GzDecoder::new(Cursor::new(data)));

    fs::create_dir_all(dest)
        .with_context(|| format!("failed to create destination directory: {}", dest.display()))?;

    for entry in archive.entries().context("failed to read tarball entries")? {
        let mut entry = entry.context("failed to read tarball entry")?;
        let entry_path = entry.path().context("failed to get entry path")?.into_owned();

        if entry_path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            bail!(
                "tarball entry escapes destination directory: {}",
                entry_path.display()
            );
        }

        let relative = match strip_prefix {
            Some(prefix) => match entry_path.strip_prefix(prefix.trim_end_matches('/')) {
                Ok(rest) => rest.to_path_buf(),
                Err(_) => entry_path.clone(),
            },
            None => entry_path.clone(),
        };
        if relative.as_os_str().is_empty() {
            continue;
        }
        let output_path = dest.join(&relative);

        match entry.header().entry_type() {
            tar::EntryType::Directory => {
                fs::create_dir_all(&output_path).with_context(|| {
                    format!("failed to create directory: {}", output_path.display())
                })?;
            }
            tar::EntryType::Regular | tar::EntryType::Continuous => {
                if let Some(parent) = output_path.parent() {
                    fs::create_dir_all(parent).with_context(|| {
                        format!("failed to create directory: {}", parent.display())
                    })?;
                }
                entry.unpack(&output_path).with_context(|| {
                    format!("failed to extract file: {}", output_path.display())
                })?;
            }
            other => {
                tracing::debug!("Skipping {:?} entry {}", other, entry_path.display());
            }
        }
    }

    Ok(())
}
