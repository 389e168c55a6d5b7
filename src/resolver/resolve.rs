//! Configuration resolution.
//!
//! Turns settings, options and the externally resolved dependency graph into
//! a [`ResolvedConfiguration`]: the single immutable value read by the build
//! orchestrator, the package assembler and the metadata generator.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::errors::RecipeError;
use crate::core::options::{BuildOptions, LinkMode};
use crate::core::recipe::ModuleSpec;
use crate::core::requirement::RequirementSet;
use crate::core::settings::PlatformSettings;
use crate::resolver::graph::DependencyGraph;
use crate::util::hash::Fingerprint;

/// Suffix the MSBuild solution uses for shared-library configurations.
const SHARED_CONFIG_SUFFIX: &str = "DLL";

/// Fully computed build parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedConfiguration {
    settings: PlatformSettings,
    link_mode: LinkMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    fpic: Option<bool>,
    build_type_label: String,
    active_include_paths: Vec<PathBuf>,
    active_library_paths: Vec<PathBuf>,
    /// Requirement name to installed root.
    dependency_roots: BTreeMap<String, PathBuf>,
    modules: Vec<ModuleSpec>,
    module_versions: BTreeMap<String, String>,
}

impl ResolvedConfiguration {
    pub fn settings(&self) -> &PlatformSettings {
        &self.settings
    }

    pub fn link_mode(&self) -> LinkMode {
        self.link_mode
    }

    pub fn fpic(&self) -> Option<bool> {
        self.fpic
    }

    /// Configuration name handed to the toolchain (`Release`, `DebugDLL`, ...).
    pub fn build_type_label(&self) -> &str {
        &self.build_type_label
    }

    pub fn active_include_paths(&self) -> &[PathBuf] {
        &self.active_include_paths
    }

    pub fn active_library_paths(&self) -> &[PathBuf] {
        &self.active_library_paths
    }

    /// Installed root of a resolved requirement.
    pub fn dependency_root(&self, name: &str) -> Option<&Path> {
        self.dependency_roots.get(name).map(PathBuf::as_path)
    }

    /// Output modules, in recipe order.
    pub fn modules(&self) -> &[ModuleSpec] {
        &self.modules
    }

    pub fn module_versions(&self) -> &BTreeMap<String, String> {
        &self.module_versions
    }

    pub fn module_version(&self, module: &str) -> Option<&str> {
        self.module_versions.get(module).map(String::as_str)
    }

    /// Stable digest of the whole configuration.
    pub fn fingerprint(&self) -> String {
        let mut fp = Fingerprint::new();
        fp.update_str(&self.settings.os.to_string())
            .update_str(&self.settings.compiler.to_string())
            .update_opt(self.settings.compiler.runtime.as_deref())
            .update_str(self.settings.arch.as_str())
            .update_str(&self.build_type_label)
            .update_str(&self.link_mode.to_string());
        match self.fpic {
            Some(fpic) => fp.update_opt(Some(if fpic { "fPIC" } else { "no-fPIC" })),
            None => fp.update_opt(None),
        };
        for path in self.active_include_paths.iter().chain(&self.active_library_paths) {
            fp.update_str(&path.to_string_lossy());
        }
        for (name, root) in &self.dependency_roots {
            fp.update_str(name).update_str(&root.to_string_lossy());
        }
        for (module, version) in &self.module_versions {
            fp.update_str(module).update_str(version);
        }
        fp.finish_short()
    }

    #[cfg(test)]
    pub(crate) fn module_versions_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.module_versions
    }
}

/// Compute the toolchain configuration name.
///
/// The `DLL` suffix is an MSBuild solution convention, so it only applies
/// to shared builds on Windows.
pub fn build_type_label(settings: &PlatformSettings, link_mode: LinkMode) -> String {
    let base = settings.build_type.as_str();
    if link_mode.is_shared() && settings.os.is_windows() {
        format!("{}{}", base, SHARED_CONFIG_SUFFIX)
    } else {
        base.to_string()
    }
}

/// Resolve the build configuration.
///
/// Fails with [`RecipeError::UnresolvedDependency`] listing every
/// requirement that the graph does not hold at exactly the pinned version.
pub fn resolve(
    settings: &PlatformSettings,
    options: &BuildOptions,
    requirements: &RequirementSet,
    modules: &[ModuleSpec],
    graph: &dyn DependencyGraph,
) -> Result<ResolvedConfiguration, RecipeError> {
    let mut missing = Vec::new();
    let mut dependency_roots = BTreeMap::new();
    let mut active_include_paths = Vec::new();
    let mut active_library_paths = Vec::new();

    for req in requirements {
        let Some(installed) = graph.installed(req) else {
            missing.push(req.to_string());
            continue;
        };

        if installed.version != req.version {
            missing.push(format!("{} (found {})", req, installed.version));
            continue;
        }

        let include = installed.root.join("include");
        if include.is_dir() {
            active_include_paths.push(include);
        } else {
            tracing::warn!("`{}` has no include directory, skipping", req.name);
        }

        let lib = installed.root.join("lib");
        if lib.is_dir() {
            active_library_paths.push(lib);
        }

        dependency_roots.insert(req.name.clone(), installed.root);
    }

    if !missing.is_empty() {
        return Err(RecipeError::UnresolvedDependency { missing });
    }

    let mut module_versions = BTreeMap::new();
    for module in modules {
        let Some(version) = &module.version else {
            continue;
        };
        semver::Version::parse(version).map_err(|e| {
            RecipeError::InvalidRecipe(format!(
                "module `{}` has invalid version `{}`: {}",
                module.name, version, e
            ))
        })?;
        module_versions.insert(module.name.clone(), version.clone());
    }

    let link_mode = options.link_mode();
    let resolved = ResolvedConfiguration {
        build_type_label: build_type_label(settings, link_mode),
        settings: settings.clone(),
        link_mode,
        fpic: options.fpic_if_present(),
        active_include_paths,
        active_library_paths,
        dependency_roots,
        modules: modules.to_vec(),
        module_versions,
    };

    tracing::info!(
        "Resolved {} {} ({}, {} include paths)",
        resolved.settings.os,
        resolved.build_type_label,
        resolved.link_mode,
        resolved.active_include_paths.len()
    );

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::options::derive_options;
    use crate::core::recipe::Recipe;
    use crate::core::settings::{Arch, BuildType, CompilerSettings, Os};
    use crate::resolver::graph::StaticGraph;
    use crate::test_support::installed_graph;
    use tempfile::TempDir;

    fn settings(os: Os, build_type: BuildType) -> PlatformSettings {
        PlatformSettings::new(os, CompilerSettings::default_for(os), Arch::X86_64, build_type)
    }

    #[test]
    fn test_linux_release_shared_has_no_suffix() {
        let recipe = Recipe::embedded().unwrap();
        let reqs = recipe.requirements().unwrap();
        let tmp = TempDir::new().unwrap();
        let graph = installed_graph(tmp.path(), &reqs);

        let resolved = resolve(
            &settings(Os::Linux, BuildType::Release),
            &derive_options(Os::Linux).with_shared(true),
            &reqs,
            recipe.modules(),
            &graph,
        )
        .unwrap();

        assert_eq!(resolved.build_type_label(), "Release");
        assert_eq!(resolved.link_mode(), LinkMode::Shared);
        assert_eq!(resolved.fpic(), Some(true));
    }

    #[test]
    fn test_windows_debug_shared_label() {
        let s = settings(Os::Windows, BuildType::Debug);
        assert_eq!(build_type_label(&s, LinkMode::Shared), "DebugDLL");
        assert_eq!(build_type_label(&s, LinkMode::Static), "Debug");
    }

    #[test]
    fn test_missing_include_dirs_are_skipped() {
        let recipe = Recipe::embedded().unwrap();
        let reqs = recipe.requirements().unwrap();
        let tmp = TempDir::new().unwrap();
        let graph = installed_graph(tmp.path(), &reqs);
        std::fs::remove_dir_all(tmp.path().join("OpenGL").join("include")).unwrap();

        let resolved = resolve(
            &settings(Os::Windows, BuildType::Release),
            &derive_options(Os::Windows),
            &reqs,
            recipe.modules(),
            &graph,
        )
        .unwrap();

        assert_eq!(resolved.active_include_paths().len(), reqs.len() - 1);
        assert!(!resolved
            .active_include_paths()
            .contains(&tmp.path().join("OpenGL").join("include")));
        // Declaration order is preserved.
        assert_eq!(
            resolved.active_include_paths()[0],
            tmp.path().join("nv-codec-headers").join("include")
        );
        assert_eq!(resolved.fpic(), None);
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let recipe = Recipe::embedded().unwrap();
        let reqs = recipe.requirements().unwrap();
        let tmp = TempDir::new().unwrap();
        let graph = installed_graph(tmp.path(), &reqs);
        let s = settings(Os::Windows, BuildType::Debug);
        let opts = derive_options(Os::Windows);

        let a = resolve(&s, &opts, &reqs, recipe.modules(), &graph).unwrap();
        let b = resolve(&s, &opts, &reqs, recipe.modules(), &graph).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn test_missing_zlib_is_unresolved() {
        let recipe = Recipe::embedded().unwrap();
        let reqs = recipe.requirements().unwrap();
        let tmp = TempDir::new().unwrap();
        let mut graph = installed_graph(tmp.path(), &reqs);
        graph.remove("zlib");

        let err = resolve(
            &settings(Os::Windows, BuildType::Release),
            &derive_options(Os::Windows),
            &reqs,
            recipe.modules(),
            &graph,
        )
        .unwrap_err();

        match err {
            RecipeError::UnresolvedDependency { missing } => {
                assert_eq!(missing, vec!["zlib/1.2.11@conanos/stable".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_version_mismatch_is_unresolved() {
        let reqs = RequirementSet::new(vec!["zlib/1.2.11@conanos/stable".parse().unwrap()]).unwrap();
        let mut graph = StaticGraph::new();
        graph.insert("zlib", "1.2.12", "/nonexistent/zlib");

        let err = resolve(
            &settings(Os::Linux, BuildType::Release),
            &derive_options(Os::Linux),
            &reqs,
            &[],
            &graph,
        )
        .unwrap_err();

        assert!(err.to_string().contains("found 1.2.12"));
    }

    #[test]
    fn test_module_versions_are_platform_independent() {
        let recipe = Recipe::embedded().unwrap();
        let reqs = recipe.requirements().unwrap();
        let tmp = TempDir::new().unwrap();
        let graph = installed_graph(tmp.path(), &reqs);

        let win = resolve(
            &settings(Os::Windows, BuildType::Debug),
            &derive_options(Os::Windows),
            &reqs,
            recipe.modules(),
            &graph,
        )
        .unwrap();
        let linux = resolve(
            &settings(Os::Linux, BuildType::Release),
            &derive_options(Os::Linux).with_shared(false),
            &reqs,
            recipe.modules(),
            &graph,
        )
        .unwrap();

        assert_eq!(win.module_versions(), linux.module_versions());
        assert_eq!(win.module_version("avcodec"), Some("57.108.100"));
        assert_ne!(win.fingerprint(), linux.fingerprint());
    }
}
