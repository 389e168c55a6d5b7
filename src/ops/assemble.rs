//! Package assembly.
//!
//! Copies the toolchain output, and the rendered pkg-config descriptors, into
//! the canonical package layout. Everything goes to a staging directory
//! beside the package root first. Only the managed `include/`, `lib/`,
//! `bin/` and `licenses/` directories are swapped in, and only once every
//! copy has succeeded, so a failed assembly never leaves a partial tree and
//! nothing else under the root is touched.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::errors::RecipeError;
use crate::core::layout::PackageLayout;
use crate::core::platform::ArchMap;
use crate::ops::descriptors::ModuleDescriptor;
use crate::resolver::ResolvedConfiguration;
use crate::util::fs::{
    copy_dir_all, ensure_dir, remove_dir_all_if_exists, replace_dirs, write_string,
};
use crate::util::hash::tree_digest;

/// Which part of the layout a copy step fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Headers,
    Libraries,
    Binaries,
    Licenses,
}

/// One directory copy from the toolchain output into the package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyStep {
    pub kind: ArtifactKind,
    pub from: PathBuf,
    pub to: PathBuf,
}

/// Outcome of a successful assembly.
#[derive(Debug, Clone, Serialize)]
pub struct AssembleReport {
    pub root: PathBuf,
    /// Toolchain platform token the libraries were taken from.
    pub platform: String,
    pub steps: Vec<CopyStep>,
    /// Number of files installed, descriptors included.
    pub files: usize,
    /// Digest of the managed directories.
    pub digest: String,
}

/// Plan the copy steps for `resolved` into `layout`.
///
/// Fails on an unmapped architecture without touching the filesystem.
pub fn plan_copies(
    resolved: &ResolvedConfiguration,
    layout: &PackageLayout,
    arch_map: &ArchMap,
    build_output: &Path,
) -> Result<(String, Vec<CopyStep>), RecipeError> {
    let platform = arch_map
        .platform_token(&resolved.settings().arch)?
        .to_string();

    let mut steps = vec![CopyStep {
        kind: ArtifactKind::Headers,
        from: build_output.join("include"),
        to: layout.include_dir.clone(),
    }];

    if resolved.link_mode().is_shared() {
        steps.push(CopyStep {
            kind: ArtifactKind::Libraries,
            from: build_output.join("lib").join(&platform),
            to: layout.lib_dir.clone(),
        });
        steps.push(CopyStep {
            kind: ArtifactKind::Binaries,
            from: build_output.join("bin").join(&platform),
            to: layout.bin_dir.clone(),
        });
    }

    steps.push(CopyStep {
        kind: ArtifactKind::Licenses,
        from: build_output.join("licenses"),
        to: layout.license_dir.clone(),
    });

    Ok((platform, steps))
}

/// Refuse `path` if assembling into `layout` would replace it.
pub fn check_outside_managed(layout: &PackageLayout, path: &Path) -> Result<(), RecipeError> {
    match layout.owning_dir(path) {
        Some(managed) => Err(RecipeError::OverlappingOutput {
            path: path.to_path_buf(),
            managed: managed.to_path_buf(),
        }),
        None => Ok(()),
    }
}

/// Assemble the package at `layout` from the toolchain's `build_output`,
/// installing `descriptors` into its pkgconfig directory in the same swap.
pub fn assemble(
    resolved: &ResolvedConfiguration,
    layout: &PackageLayout,
    arch_map: &ArchMap,
    build_output: &Path,
    descriptors: &[ModuleDescriptor],
) -> Result<AssembleReport, RecipeError> {
    let (platform, steps) = plan_copies(resolved, layout, arch_map, build_output)?;
    check_outside_managed(layout, build_output)?;

    if !resolved.link_mode().is_shared() {
        tracing::warn!("Static packaging copies headers and licenses only");
    }

    let root = layout.root();
    let staging = sibling(root, "staging")?;
    remove_dir_all_if_exists(&staging).map_err(|e| plumbing(&staging, e))?;

    let staged = stage(&steps, layout, descriptors, &staging).and_then(|files| {
        let digest = tree_digest(&staging).map_err(|e| plumbing(&staging, e))?;
        Ok((files, digest))
    });
    let (files, digest) = match staged {
        Ok(staged) => staged,
        Err(err) => {
            if let Err(e) = remove_dir_all_if_exists(&staging) {
                tracing::warn!("failed to clean up {}: {:#}", staging.display(), e);
            }
            return Err(err);
        }
    };

    let names: Vec<PathBuf> = layout
        .managed_dirs()
        .iter()
        .map(|dir| relative(dir, root))
        .collect();
    let backup = sibling(root, "previous")?;
    let swapped = replace_dirs(&staging, root, &backup, &names);
    if let Err(e) = remove_dir_all_if_exists(&staging) {
        tracing::warn!("failed to clean up {}: {:#}", staging.display(), e);
    }
    swapped.map_err(|e| plumbing(root, e))?;

    tracing::info!("Assembled {} files into {}", files, root.display());

    Ok(AssembleReport {
        root: root.to_path_buf(),
        platform,
        steps,
        files,
        digest,
    })
}

fn stage(
    steps: &[CopyStep],
    layout: &PackageLayout,
    descriptors: &[ModuleDescriptor],
    staging: &Path,
) -> Result<usize, RecipeError> {
    let root = layout.root();
    ensure_dir(staging).map_err(|e| plumbing(staging, e))?;

    let mut files = 0;
    for step in steps {
        if !step.from.exists() {
            tracing::warn!("Build output has no {}", step.from.display());
            continue;
        }

        let dest = staging.join(relative(&step.to, root));
        tracing::debug!("Copying {} -> {}", step.from.display(), dest.display());
        files += copy_dir_all(&step.from, &dest).map_err(|e| plumbing(&step.from, e))?;
    }

    for descriptor in descriptors {
        let path = staging.join(relative(&layout.descriptor_path(&descriptor.module_name), root));
        write_string(&path, &descriptor.contents).map_err(|e| plumbing(&path, e))?;
        tracing::debug!("Staged {}", path.display());
        files += 1;
    }
    Ok(files)
}

fn relative(path: &Path, root: &Path) -> PathBuf {
    path.strip_prefix(root).unwrap_or(path).to_path_buf()
}

/// `.<name>.<suffix>` next to `root`.
pub(crate) fn sibling(root: &Path, suffix: &str) -> Result<PathBuf, RecipeError> {
    let name = root.file_name().ok_or_else(|| {
        RecipeError::io(
            format!("package root {} has no directory name", root.display()),
            io::Error::from(io::ErrorKind::InvalidInput),
        )
    })?;
    let parent = root.parent().unwrap_or_else(|| Path::new("."));
    Ok(parent.join(format!(".{}.{}", name.to_string_lossy(), suffix)))
}

pub(crate) fn plumbing(path: &Path, err: anyhow::Error) -> RecipeError {
    RecipeError::io(
        format!("failed to assemble {}", path.display()),
        io::Error::other(err),
    )
}
