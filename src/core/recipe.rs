//! The declarative recipe table.
//!
//! A recipe holds every piece of package-specific data: dependency pins,
//! per-module product versions, source patches, the architecture table and
//! the header subdirectories injected into the toolchain environment. The
//! built-in FFmpeg recipe is compiled into the binary; `Recipe::load` reads
//! an alternative from disk.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::builder::patch::Patch;
use crate::core::errors::RecipeError;
use crate::core::platform::ArchMap;
use crate::core::requirement::{Requirement, RequirementSet};
use crate::core::settings::Os;

const EMBEDDED_RECIPE: &str = include_str!("../../recipe/ffmpeg.toml");

/// A complete recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub package: PackageInfo,
    pub build: BuildSection,
    #[serde(default)]
    pub arch: BTreeMap<String, String>,
    #[serde(default)]
    pub patch: Option<PatchSection>,
    #[serde(default)]
    pub requires: Vec<RequirementEntry>,
    #[serde(default)]
    pub modules: Vec<ModuleSpec>,
}

/// `[package]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    /// Archive URL; `{version}` is replaced with the package version.
    pub source_url: String,
    #[serde(default = "default_source_subfolder")]
    pub source_subfolder: String,
}

fn default_source_subfolder() -> String {
    "source_subfolder".to_string()
}

/// `[build]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSection {
    /// Operating systems with a native build step.
    #[serde(default)]
    pub platforms: Vec<Os>,
    /// Directory holding the toolchain project files, relative to the source root.
    pub project_dir: PathBuf,
    /// Solution file inside `project_dir`.
    pub solution: String,
    #[serde(default)]
    pub upgrade_project: bool,
    /// Toolchain output root, relative to the parent of the source root.
    pub output_dir: PathBuf,
    /// Environment variable holding the compiler's header search path.
    #[serde(default = "default_include_env")]
    pub include_env: String,
    #[serde(default)]
    pub header_dirs: Vec<HeaderDir>,
}

fn default_include_env() -> String {
    "INCLUDE".to_string()
}

/// A dependency whose headers live below a non-default subdirectory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderDir {
    pub dependency: String,
    pub subdir: PathBuf,
}

/// `[patch]`: every replacement is applied to every file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchSection {
    pub files: Vec<PathBuf>,
    #[serde(default = "default_true")]
    pub ignore_if_absent: bool,
    pub replacements: Vec<(String, String)>,
}

fn default_true() -> bool {
    true
}

/// `[[requires]]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementEntry {
    pub name: String,
    pub version: String,
    pub origin: String,
}

/// `[[modules]]`: one output library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSpec {
    pub name: String,
    /// Product version; optional here so a missing pin is reported at
    /// descriptor generation rather than as a parse error.
    #[serde(default)]
    pub version: Option<String>,
    /// Other modules this one links against.
    #[serde(default)]
    pub requires: Vec<String>,
}

impl Recipe {
    /// The built-in FFmpeg recipe.
    pub fn embedded() -> Result<Self, RecipeError> {
        Self::parse(EMBEDDED_RECIPE)
    }

    /// Load a recipe from a TOML file.
    pub fn load(path: &Path) -> Result<Self, RecipeError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            RecipeError::io(format!("failed to read recipe: {}", path.display()), e)
        })?;
        Self::parse(&contents)
    }

    /// Parse and validate a recipe.
    pub fn parse(contents: &str) -> Result<Self, RecipeError> {
        let recipe: Recipe =
            toml::from_str(contents).map_err(|e| RecipeError::InvalidRecipe(e.to_string()))?;
        recipe.validate()?;
        Ok(recipe)
    }

    fn validate(&self) -> Result<(), RecipeError> {
        let mut seen = HashSet::new();
        for module in &self.modules {
            if !seen.insert(module.name.as_str()) {
                return Err(RecipeError::InvalidRecipe(format!(
                    "module `{}` is declared more than once",
                    module.name
                )));
            }
        }
        for module in &self.modules {
            if let Some(dep) = module.requires.iter().find(|d| !seen.contains(d.as_str())) {
                return Err(RecipeError::InvalidRecipe(format!(
                    "module `{}` requires unknown module `{}`",
                    module.name, dep
                )));
            }
        }
        self.requirements()?;
        self.patches()?;
        self.source_url()?;
        Ok(())
    }

    /// The declared requirements, in declaration order.
    pub fn requirements(&self) -> Result<RequirementSet, RecipeError> {
        let entries = self
            .requires
            .iter()
            .map(|r| Requirement::new(&r.name, &r.version, &r.origin))
            .collect::<Result<Vec<_>, _>>()?;
        RequirementSet::new(entries)
    }

    /// Output modules, in declaration order.
    pub fn modules(&self) -> &[ModuleSpec] {
        &self.modules
    }

    /// Module name to pinned version, for every module that has one.
    pub fn module_versions(&self) -> BTreeMap<String, String> {
        self.modules
            .iter()
            .filter_map(|m| m.version.clone().map(|v| (m.name.clone(), v)))
            .collect()
    }

    /// Expand the `[patch]` section into one patch per (file, replacement).
    pub fn patches(&self) -> Result<Vec<Patch>, RecipeError> {
        let Some(section) = &self.patch else {
            return Ok(Vec::new());
        };

        let mut patches = Vec::new();
        for file in &section.files {
            for (find, replace) in &section.replacements {
                patches.push(Patch::new(
                    file.clone(),
                    find.clone(),
                    replace.clone(),
                    section.ignore_if_absent,
                )?);
            }
        }
        Ok(patches)
    }

    /// Architecture to toolchain-platform table.
    pub fn arch_map(&self) -> ArchMap {
        ArchMap::new(self.arch.clone())
    }

    /// Whether `os` has a native build step.
    pub fn builds_on(&self, os: Os) -> bool {
        self.build.platforms.contains(&os)
    }

    /// The source archive URL for this package version.
    pub fn source_url(&self) -> Result<Url, RecipeError> {
        let raw = self
            .package
            .source_url
            .replace("{version}", &self.package.version);
        Url::parse(&raw)
            .map_err(|e| RecipeError::InvalidRecipe(format!("invalid source_url `{}`: {}", raw, e)))
    }

    /// Top-level directory name inside the source archive.
    pub fn archive_root(&self) -> String {
        format!("{}-{}", self.package.name, self.package.version)
    }
}
