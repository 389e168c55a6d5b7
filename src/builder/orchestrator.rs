//! Conditional build orchestration.
//!
//! A build attempt walks `Unpatched -> Patched -> Built`. Any failure moves
//! it to `Failed`, which is terminal: a marker file is left in the source
//! tree and later attempts against that tree are refused until the source is
//! fetched again.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::builder::env::EnvOverride;
use crate::builder::patch::{apply_patches, Patch, PatchReport};
use crate::builder::toolchain::{BuildDescriptor, Toolchain};
use crate::core::errors::RecipeError;
use crate::core::platform::ArchMap;
use crate::core::recipe::{HeaderDir, Recipe};
use crate::core::settings::Os;
use crate::resolver::ResolvedConfiguration;

/// Marker left in a source tree whose build failed.
pub const FAILED_MARKER: &str = ".ffpack-build-failed";

/// Progress of one build attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BuildState {
    Unpatched,
    Patched,
    Built,
    Failed,
}

/// What a successful build produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildOutput {
    /// Toolchain output root (headers, per-platform libs and bins, licenses).
    pub output_dir: PathBuf,
    /// The toolchain invocation, if the platform has a native build step.
    pub descriptor: Option<BuildDescriptor>,
    #[serde(skip)]
    pub patches: PatchReport,
}

/// Drives patching and the native toolchain for one source tree.
#[derive(Debug, Clone)]
pub struct BuildOrchestrator {
    state: BuildState,
    platforms: Vec<Os>,
    patches: Vec<Patch>,
    header_dirs: Vec<HeaderDir>,
    project_dir: PathBuf,
    solution: String,
    upgrade_project: bool,
    output_dir: PathBuf,
    include_env: String,
    arch_map: ArchMap,
}

impl BuildOrchestrator {
    pub fn from_recipe(recipe: &Recipe) -> Result<Self, RecipeError> {
        Ok(BuildOrchestrator {
            state: BuildState::Unpatched,
            platforms: recipe.build.platforms.clone(),
            patches: recipe.patches()?,
            header_dirs: recipe.build.header_dirs.clone(),
            project_dir: recipe.build.project_dir.clone(),
            solution: recipe.build.solution.clone(),
            upgrade_project: recipe.build.upgrade_project,
            output_dir: recipe.build.output_dir.clone(),
            include_env: recipe.build.include_env.clone(),
            arch_map: recipe.arch_map(),
        })
    }

    /// Use a different header search variable than the recipe's.
    pub fn with_include_env(mut self, key: impl Into<String>) -> Self {
        self.include_env = key.into();
        self
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    /// Where the toolchain writes its output for `source_root`.
    pub fn output_dir(&self, source_root: &Path) -> PathBuf {
        source_root
            .parent()
            .unwrap_or(source_root)
            .join(&self.output_dir)
    }

    /// Patch and build `source_root` for `resolved`.
    pub fn build(
        &mut self,
        resolved: &ResolvedConfiguration,
        source_root: &Path,
        toolchain: &dyn Toolchain,
    ) -> Result<BuildOutput, RecipeError> {
        let marker = source_root.join(FAILED_MARKER);
        if self.state == BuildState::Failed || marker.exists() {
            return Err(RecipeError::TaintedSource {
                path: source_root.to_path_buf(),
            });
        }

        self.state = BuildState::Unpatched;
        match self.run(resolved, source_root, toolchain) {
            Ok(output) => Ok(output),
            Err(err) => {
                self.state = BuildState::Failed;
                if let Err(e) = fs::write(&marker, err.to_string()) {
                    tracing::warn!("failed to mark {} as failed: {}", source_root.display(), e);
                }
                Err(err)
            }
        }
    }

    fn run(
        &mut self,
        resolved: &ResolvedConfiguration,
        source_root: &Path,
        toolchain: &dyn Toolchain,
    ) -> Result<BuildOutput, RecipeError> {
        let settings = resolved.settings();
        let output_dir = self.output_dir(source_root);

        if !self.platforms.contains(&settings.os) {
            tracing::info!("No native build step for {}", settings.os);
            self.state = BuildState::Built;
            return Ok(BuildOutput {
                output_dir,
                descriptor: None,
                patches: PatchReport::default(),
            });
        }

        // Checked before touching the tree.
        let platform = self.arch_map.platform_token(&settings.arch)?.to_string();
        let include_paths = self.header_search_paths(resolved)?;

        tracing::info!("Patching {} project files", self.patches.len());
        let patches = apply_patches(source_root, &self.patches)?;
        self.state = BuildState::Patched;

        let descriptor = BuildDescriptor {
            solution: source_root.join(&self.project_dir).join(&self.solution),
            configuration: resolved.build_type_label().to_string(),
            platform,
            upgrade_project: self.upgrade_project,
        };

        {
            let _include = EnvOverride::prepend_paths(&self.include_env, &include_paths)?;
            tracing::info!(
                "Invoking {} for {}|{}",
                toolchain.name(),
                descriptor.configuration,
                descriptor.platform
            );
            toolchain.invoke(&descriptor)?;
        }

        self.state = BuildState::Built;
        Ok(BuildOutput {
            output_dir,
            descriptor: Some(descriptor),
            patches,
        })
    }

    fn header_search_paths(
        &self,
        resolved: &ResolvedConfiguration,
    ) -> Result<Vec<PathBuf>, RecipeError> {
        let mut paths = Vec::new();
        let mut missing = Vec::new();

        for dir in &self.header_dirs {
            match resolved.dependency_root(&dir.dependency) {
                Some(root) => paths.push(root.join(&dir.subdir)),
                None => missing.push(dir.dependency.clone()),
            }
        }

        if !missing.is_empty() {
            return Err(RecipeError::UnresolvedDependency { missing });
        }
        Ok(paths)
    }
}
