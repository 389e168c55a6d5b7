//! Canonical package layout.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Directories of an installed package, all below one root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageLayout {
    root: PathBuf,
    pub include_dir: PathBuf,
    pub lib_dir: PathBuf,
    pub bin_dir: PathBuf,
    pub license_dir: PathBuf,
    pub pkgconfig_dir: PathBuf,
}

impl PackageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        PackageLayout {
            include_dir: root.join("include"),
            lib_dir: root.join("lib"),
            bin_dir: root.join("bin"),
            license_dir: root.join("licenses"),
            pkgconfig_dir: root.join("lib").join("pkgconfig"),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directories the assembler replaces on every run.
    pub fn managed_dirs(&self) -> [&Path; 4] {
        [
            &self.include_dir,
            &self.lib_dir,
            &self.bin_dir,
            &self.license_dir,
        ]
    }

    /// The managed directory that contains `path`, if any.
    pub fn owning_dir(&self, path: &Path) -> Option<&Path> {
        let root = normalize(&self.root);
        let path = normalize(path);
        self.managed_dirs().into_iter().find(|dir| {
            let rel = dir.strip_prefix(&self.root).unwrap_or(*dir);
            path.starts_with(root.join(rel))
        })
    }

    /// Path of the descriptor for `module`.
    pub fn descriptor_path(&self, module: &str) -> PathBuf {
        self.pkgconfig_dir.join(format!("lib{}.pc", module))
    }
}

fn normalize(path: &Path) -> PathBuf {
    fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let layout = PackageLayout::new("/pkg");

        assert_eq!(layout.include_dir, Path::new("/pkg/include"));
        assert_eq!(layout.license_dir, Path::new("/pkg/licenses"));
        assert_eq!(layout.pkgconfig_dir, Path::new("/pkg/lib/pkgconfig"));
        assert_eq!(
            layout.descriptor_path("avcodec"),
            Path::new("/pkg/lib/pkgconfig/libavcodec.pc")
        );
    }

    #[test]
    fn test_owning_dir() {
        let layout = PackageLayout::new("/pkg");

        assert_eq!(
            layout.owning_dir(Path::new("/pkg/lib/x64/msvc")),
            Some(Path::new("/pkg/lib"))
        );
        assert_eq!(
            layout.owning_dir(Path::new("/pkg/licenses")),
            Some(Path::new("/pkg/licenses"))
        );
        assert_eq!(layout.owning_dir(Path::new("/pkg/msvc")), None);
        assert_eq!(layout.owning_dir(Path::new("/pkg/library")), None);
        assert_eq!(layout.owning_dir(Path::new("/pkg")), None);
    }
}
