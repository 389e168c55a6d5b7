//! The resolve, build and package pipeline.
//!
//! Stages run strictly in order and the first failure aborts the run. The
//! error names the stage that failed; no fallback configuration is tried.
//! Descriptors are rendered before assembly and installed in the same swap,
//! so a metadata failure leaves the package directory as it was.

use std::fmt;
use std::path::{Path, PathBuf};

use miette::Diagnostic as MietteDiagnostic;
use serde::Serialize;
use thiserror::Error;

use crate::builder::orchestrator::{BuildOrchestrator, BuildOutput};
use crate::builder::toolchain::Toolchain;
use crate::core::errors::RecipeError;
use crate::core::layout::PackageLayout;
use crate::core::options::BuildOptions;
use crate::core::recipe::Recipe;
use crate::core::settings::PlatformSettings;
use crate::ops::assemble::{assemble, check_outside_managed, AssembleReport};
use crate::ops::descriptors::{render_descriptors, ModuleDescriptor, TemplateSet};
use crate::resolver::{resolve, DependencyGraph, ResolvedConfiguration};
use crate::sources::SourceProvider;
use crate::util::fs::glob_files;

/// Pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Resolve,
    Source,
    Patch,
    Build,
    Assemble,
    GenerateMetadata,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Resolve => "resolve",
            Stage::Source => "source",
            Stage::Patch => "patch",
            Stage::Build => "build",
            Stage::Assemble => "assemble",
            Stage::GenerateMetadata => "generate-metadata",
        };
        f.write_str(s)
    }
}

/// A pipeline failure and the stage it happened in.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("{stage} stage failed: {source}")]
#[diagnostic(code(ffpack::pipeline))]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: RecipeError,
}

impl PipelineError {
    fn at(stage: Stage) -> impl FnOnce(RecipeError) -> PipelineError {
        move |source| PipelineError { stage, source }
    }
}

/// Inputs of a pipeline run.
#[derive(Debug, Clone)]
pub struct PackageOptions {
    pub settings: PlatformSettings,
    pub options: BuildOptions,
    /// Directory the source provider populates.
    pub work_dir: PathBuf,
    /// Root of the assembled package.
    pub package_dir: PathBuf,
    pub templates: TemplateSet,
    /// Header search variable; the recipe's when unset.
    pub include_env: Option<String>,
}

impl PackageOptions {
    pub fn new(
        settings: PlatformSettings,
        options: BuildOptions,
        work_dir: impl Into<PathBuf>,
        package_dir: impl Into<PathBuf>,
    ) -> Self {
        PackageOptions {
            settings,
            options,
            work_dir: work_dir.into(),
            package_dir: package_dir.into(),
            templates: TemplateSet::embedded(),
            include_env: None,
        }
    }

    pub fn with_templates(mut self, templates: TemplateSet) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_include_env(mut self, key: impl Into<String>) -> Self {
        self.include_env = Some(key.into());
        self
    }
}

/// Result of the build half of the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub resolved: ResolvedConfiguration,
    pub source_root: PathBuf,
    pub output: BuildOutput,
}

/// Result of a full pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PackageReport {
    pub build: BuildReport,
    pub assembly: AssembleReport,
    pub descriptors: Vec<ModuleDescriptor>,
    /// Library names consumers link against.
    pub libs: Vec<String>,
}

/// Resolve, fetch, patch and build.
pub fn build(
    recipe: &Recipe,
    opts: &PackageOptions,
    graph: &dyn DependencyGraph,
    source: &dyn SourceProvider,
    toolchain: &dyn Toolchain,
) -> Result<BuildReport, PipelineError> {
    tracing::info!("Resolving configuration");
    let requirements = recipe.requirements().map_err(PipelineError::at(Stage::Resolve))?;
    let resolved = resolve(
        &opts.settings,
        &opts.options,
        &requirements,
        recipe.modules(),
        graph,
    )
    .map_err(PipelineError::at(Stage::Resolve))?;

    tracing::info!("Fetching source ({})", source.name());
    let source_root = source
        .fetch(&opts.work_dir)
        .map_err(|e| RecipeError::Source(format!("{:#}", e)))
        .map_err(PipelineError::at(Stage::Source))?;

    let mut orchestrator =
        BuildOrchestrator::from_recipe(recipe).map_err(PipelineError::at(Stage::Patch))?;
    if let Some(ref key) = opts.include_env {
        orchestrator = orchestrator.with_include_env(key.clone());
    }

    let output = orchestrator
        .build(&resolved, &source_root, toolchain)
        .map_err(|e| {
            let stage = match e {
                RecipeError::Patch { .. } => Stage::Patch,
                _ => Stage::Build,
            };
            PipelineError { stage, source: e }
        })?;

    Ok(BuildReport {
        resolved,
        source_root,
        output,
    })
}

/// Run every stage and produce the installable package.
pub fn package(
    recipe: &Recipe,
    opts: &PackageOptions,
    graph: &dyn DependencyGraph,
    source: &dyn SourceProvider,
    toolchain: &dyn Toolchain,
) -> Result<PackageReport, PipelineError> {
    let build = build(recipe, opts, graph, source, toolchain)?;
    let resolved = &build.resolved;
    let layout = PackageLayout::new(&opts.package_dir);

    let descriptors = render_descriptors(&layout, resolved, resolved.link_mode(), &opts.templates)
        .map_err(PipelineError::at(Stage::GenerateMetadata))?;

    tracing::info!("Assembling package in {}", layout.root().display());
    check_outside_managed(&layout, &build.source_root)
        .map_err(PipelineError::at(Stage::Assemble))?;
    let assembly = assemble(
        resolved,
        &layout,
        &recipe.arch_map(),
        &build.output.output_dir,
        &descriptors,
    )
    .map_err(PipelineError::at(Stage::Assemble))?;

    let libs = collect_libs(&layout.lib_dir).map_err(PipelineError::at(Stage::GenerateMetadata))?;

    Ok(PackageReport {
        build,
        assembly,
        descriptors,
        libs,
    })
}

/// Library names found in `lib_dir`, as passed to the linker.
pub fn collect_libs(lib_dir: &Path) -> Result<Vec<String>, RecipeError> {
    if !lib_dir.is_dir() {
        return Ok(Vec::new());
    }

    let files = glob_files(lib_dir, &["*.lib", "*.a", "*.so", "*.dylib"]).map_err(|e| {
        RecipeError::io(
            format!("failed to list libraries in {}", lib_dir.display()),
            std::io::Error::other(e),
        )
    })?;

    let mut libs: Vec<String> = files
        .iter()
        .filter_map(|path| {
            let stem = path.file_stem()?.to_str()?;
            let is_msvc = path.extension().is_some_and(|ext| ext == "lib");
            let name = if is_msvc {
                stem
            } else {
                stem.strip_prefix("lib").unwrap_or(stem)
            };
            Some(name.to_string())
        })
        .collect();
    libs.sort();
    libs.dedup();
    Ok(libs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::toolchain::ToolchainError;
    use crate::core::options::derive_options;
    use crate::core::settings::{Arch, BuildType, CompilerSettings, Os};
    use crate::sources::LocalSource;
    use crate::test_support::{installed_graph, write_smp_tree, RecordingToolchain, MODULES};
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        tmp: TempDir,
        recipe: Recipe,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            write_smp_tree(&tmp.path().join("work/source_subfolder"));
            Fixture {
                tmp,
                recipe: Recipe::embedded().unwrap(),
            }
        }

        fn work(&self) -> PathBuf {
            self.tmp.path().join("work")
        }

        fn source(&self) -> LocalSource {
            LocalSource::new(self.work().join("source_subfolder"))
        }

        fn package_dir(&self) -> PathBuf {
            self.tmp.path().join("package")
        }

        fn opts(&self, os: Os, build_type: BuildType, include_env: &str) -> PackageOptions {
            let settings = PlatformSettings::new(
                os,
                CompilerSettings::default_for(os),
                Arch::X86_64,
                build_type,
            );
            PackageOptions::new(settings, derive_options(os), self.work(), self.package_dir())
                .with_include_env(include_env)
        }
    }

    #[test]
    fn test_windows_package_end_to_end() {
        let fx = Fixture::new();
        let reqs = fx.recipe.requirements().unwrap();
        let graph = installed_graph(&fx.tmp.path().join("deps"), &reqs);
        let toolchain =
            RecordingToolchain::new("FFPACK_TEST_INCLUDE_PKG").producing(fx.work().join("msvc"));
        let opts = fx.opts(Os::Windows, BuildType::Debug, "FFPACK_TEST_INCLUDE_PKG");

        let report = package(&fx.recipe, &opts, &graph, &fx.source(), &toolchain).unwrap();

        assert_eq!(report.build.resolved.build_type_label(), "DebugDLL");
        assert_eq!(toolchain.calls().len(), 1);
        assert_eq!(report.assembly.platform, "x64");
        assert_eq!(report.descriptors.len(), 7);
        assert_eq!(report.libs, MODULES.to_vec());

        let layout = PackageLayout::new(fx.package_dir());
        for module in MODULES {
            assert!(layout.descriptor_path(module).is_file());
        }
        let avformat = fs::read_to_string(layout.descriptor_path("avformat")).unwrap();
        assert!(avformat.contains("-lavformatd"));
        assert!(avformat.contains("Version: 57.84.100"));
    }

    #[test]
    fn test_missing_dependency_stops_before_build() {
        let fx = Fixture::new();
        let reqs = fx.recipe.requirements().unwrap();
        let mut graph = installed_graph(&fx.tmp.path().join("deps"), &reqs);
        graph.remove("zlib");
        let toolchain = RecordingToolchain::new("FFPACK_TEST_INCLUDE_ZLIB");
        let opts = fx.opts(Os::Windows, BuildType::Release, "FFPACK_TEST_INCLUDE_ZLIB");
        let before =
            fs::read_to_string(fx.work().join("source_subfolder/SMP/libavcodec.vcxproj")).unwrap();

        let err = package(&fx.recipe, &opts, &graph, &fx.source(), &toolchain).unwrap_err();

        assert_eq!(err.stage, Stage::Resolve);
        assert!(matches!(err.source, RecipeError::UnresolvedDependency { ref missing }
            if missing == &["zlib/1.2.11@conanos/stable".to_string()]));
        assert!(toolchain.calls().is_empty());
        let after =
            fs::read_to_string(fx.work().join("source_subfolder/SMP/libavcodec.vcxproj")).unwrap();
        assert_eq!(before, after);
        assert!(!fx.package_dir().exists());
    }

    #[test]
    fn test_missing_project_file_is_patch_stage() {
        let fx = Fixture::new();
        fs::remove_file(fx.work().join("source_subfolder/SMP/libavfilter.vcxproj")).unwrap();
        let reqs = fx.recipe.requirements().unwrap();
        let graph = installed_graph(&fx.tmp.path().join("deps"), &reqs);
        let toolchain = RecordingToolchain::new("FFPACK_TEST_INCLUDE_PATCH");
        let opts = fx.opts(Os::Windows, BuildType::Release, "FFPACK_TEST_INCLUDE_PATCH");

        let err = package(&fx.recipe, &opts, &graph, &fx.source(), &toolchain).unwrap_err();

        assert_eq!(err.stage, Stage::Patch);
        assert!(err.to_string().starts_with("patch stage failed: "));
        assert!(toolchain.calls().is_empty());
    }

    #[test]
    fn test_toolchain_failure_is_build_stage() {
        let fx = Fixture::new();
        let reqs = fx.recipe.requirements().unwrap();
        let graph = installed_graph(&fx.tmp.path().join("deps"), &reqs);
        let toolchain = RecordingToolchain::failing(
            "FFPACK_TEST_INCLUDE_TOOL",
            ToolchainError::NotFound {
                program: "msbuild".to_string(),
            },
        );
        let opts = fx.opts(Os::Windows, BuildType::Release, "FFPACK_TEST_INCLUDE_TOOL");

        let err = package(&fx.recipe, &opts, &graph, &fx.source(), &toolchain).unwrap_err();

        assert_eq!(err.stage, Stage::Build);
        assert!(matches!(err.source, RecipeError::Toolchain(_)));
        assert!(!fx.package_dir().exists());
    }

    #[test]
    fn test_missing_source_is_source_stage() {
        let fx = Fixture::new();
        let reqs = fx.recipe.requirements().unwrap();
        let graph = installed_graph(&fx.tmp.path().join("deps"), &reqs);
        let toolchain = RecordingToolchain::new("FFPACK_TEST_INCLUDE_SRC");
        let opts = fx.opts(Os::Windows, BuildType::Release, "FFPACK_TEST_INCLUDE_SRC");
        let source = LocalSource::new(fx.tmp.path().join("nowhere"));

        let err = package(&fx.recipe, &opts, &graph, &source, &toolchain).unwrap_err();
        assert_eq!(err.stage, Stage::Source);
    }

    #[test]
    fn test_collect_libs() {
        let tmp = TempDir::new().unwrap();
        for file in ["avcodec.lib", "libavutil.a", "libswscale.so", "README"] {
            fs::write(tmp.path().join(file), "").unwrap();
        }

        let libs = collect_libs(tmp.path()).unwrap();
        assert_eq!(libs, vec!["avcodec", "avutil", "swscale"]);
        assert!(collect_libs(&tmp.path().join("missing")).unwrap().is_empty());
    }

    #[test]
    fn test_metadata_failure_leaves_no_package() {
        let fx = Fixture::new();
        let reqs = fx.recipe.requirements().unwrap();
        let graph = installed_graph(&fx.tmp.path().join("deps"), &reqs);
        let toolchain =
            RecordingToolchain::new("FFPACK_TEST_INCLUDE_META").producing(fx.work().join("msvc"));
        // Only one of the seven templates is available.
        let mut partial = TemplateSet::default();
        partial.insert("avcodec", "Version: @version@\n");
        let opts = fx
            .opts(Os::Windows, BuildType::Release, "FFPACK_TEST_INCLUDE_META")
            .with_templates(partial);

        let err = package(&fx.recipe, &opts, &graph, &fx.source(), &toolchain).unwrap_err();

        assert_eq!(err.stage, Stage::GenerateMetadata);
        assert_eq!(toolchain.calls().len(), 1);
        assert!(!fx.package_dir().exists());
        assert!(!fx.tmp.path().join(".package.staging").exists());
    }

    #[test]
    fn test_source_inside_package_dir_is_refused() {
        let tmp = TempDir::new().unwrap();
        let package_dir = tmp.path().join("package");
        let work = package_dir.join("include");
        write_smp_tree(&work.join("source_subfolder"));
        fs::write(package_dir.join("user-notes.txt"), "keep me").unwrap();
        let recipe = Recipe::embedded().unwrap();
        let reqs = recipe.requirements().unwrap();
        let graph = installed_graph(&tmp.path().join("deps"), &reqs);
        let toolchain = RecordingToolchain::new("FFPACK_TEST_INCLUDE_OVERLAP");
        let settings = PlatformSettings::new(
            Os::Linux,
            CompilerSettings::default_for(Os::Linux),
            Arch::X86_64,
            BuildType::Release,
        );
        let opts = PackageOptions::new(settings, derive_options(Os::Linux), &work, &package_dir)
            .with_include_env("FFPACK_TEST_INCLUDE_OVERLAP");
        let source = LocalSource::new(work.join("source_subfolder"));

        let err = package(&recipe, &opts, &graph, &source, &toolchain).unwrap_err();

        assert_eq!(err.stage, Stage::Assemble);
        assert!(matches!(err.source, RecipeError::OverlappingOutput { .. }));
        assert!(work.join("source_subfolder/SMP/ffmpeg.sln").is_file());
        assert_eq!(
            fs::read_to_string(package_dir.join("user-notes.txt")).unwrap(),
            "keep me"
        );
    }
}
