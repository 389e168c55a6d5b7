//! Filesystem utilities.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;

/// Recursively copy a directory, returning the number of files copied.
pub fn copy_dir_all(src: &Path, dst: &Path) -> Result<usize> {
    fs::create_dir_all(dst)
        .with_context(|| format!("failed to create directory: {}", dst.display()))?;

    let mut copied = 0;
    for entry in fs::read_dir(src)
        .with_context(|| format!("failed to read directory: {}", src.display()))?
    {
        let entry = entry?;
        let ty = entry.file_type()?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if ty.is_dir() {
            copied += copy_dir_all(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path).with_context(|| {
                format!(
                    "failed to copy {} to {}",
                    src_path.display(),
                    dst_path.display()
                )
            })?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Remove a directory and all its contents, if it exists.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents)
        .with_context(|| format!("failed to write file: {}", path.display()))
}

/// Replace the `names` directories under `root` with the ones in `staging`.
///
/// The current directories are moved to `backup` until every staged one is
/// in place. A name missing from `staging` is removed from `root`. Entries of
/// `root` not listed in `names` are left alone. If any move fails, everything
/// already moved is put back.
pub fn replace_dirs(staging: &Path, root: &Path, backup: &Path, names: &[PathBuf]) -> Result<()> {
    remove_dir_all_if_exists(backup)?;
    let created_root = !root.exists();
    ensure_dir(root)?;

    let mut moved = Vec::new();
    let mut installed = Vec::new();
    let result = move_dirs(root, backup, names, &mut moved)
        .and_then(|()| move_dirs(staging, root, names, &mut installed));

    if let Err(err) = result {
        for name in &installed {
            if let Err(e) = remove_dir_all_if_exists(&root.join(name)) {
                tracing::warn!("{:#}", e);
            }
        }
        let mut restored = true;
        for name in &moved {
            if let Err(e) = fs::rename(backup.join(name), root.join(name)) {
                tracing::warn!("failed to restore {}: {}", root.join(name).display(), e);
                restored = false;
            }
        }
        if restored {
            if let Err(e) = remove_dir_all_if_exists(backup) {
                tracing::warn!("{:#}", e);
            }
        }
        if created_root {
            let _ = fs::remove_dir(root);
        }
        return Err(err);
    }

    remove_dir_all_if_exists(backup)
}

fn move_dirs(from: &Path, to: &Path, names: &[PathBuf], done: &mut Vec<PathBuf>) -> Result<()> {
    for name in names {
        let src = from.join(name);
        if !src.exists() {
            continue;
        }
        let dst = to.join(name);
        if let Some(parent) = dst.parent() {
            ensure_dir(parent)?;
        }
        fs::rename(&src, &dst)
            .with_context(|| format!("failed to move {} to {}", src.display(), dst.display()))?;
        done.push(name.clone());
    }
    Ok(())
}

/// Find files matching glob patterns relative to a base directory.
pub fn glob_files(base: &Path, patterns: &[&str]) -> Result<Vec<PathBuf>> {
    let mut results = Vec::new();

    for pattern in patterns {
        let full_pattern = base.join(pattern);
        let pattern_str = full_pattern.to_string_lossy();

        for entry in glob(&pattern_str)
            .with_context(|| format!("invalid glob pattern: {}", pattern))?
        {
            match entry {
                Ok(path) => {
                    if path.is_file() {
                        results.push(path);
                    }
                }
                Err(e) => {
                    tracing::warn!("glob error: {}", e);
                }
            }
        }
    }

    results.sort();
    results.dedup();
    Ok(results)
}
