//! Command implementations

pub mod build;
pub mod descriptors;
pub mod package;
pub mod requirements;
pub mod resolve;

use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::SettingsArgs;
use ffpack::core::options::FPIC;
use ffpack::core::settings::{Arch, BuildType, CompilerSettings, Os};
use ffpack::ops::{PipelineError, Stage};
use ffpack::resolver::StaticGraph;
use ffpack::util::config::{global_config_path, load_config, project_config_path};
use ffpack::util::Config;
use ffpack::{derive_options, BuildOptions, PlatformSettings, Recipe, ResolvedConfiguration};

/// The recipe at `path`, or the built-in one.
pub fn load_recipe(path: Option<&Path>) -> Result<Recipe> {
    let recipe = match path {
        Some(path) => Recipe::load(path)?,
        None => Recipe::embedded()?,
    };
    Ok(recipe)
}

/// Global and project configuration for the current directory.
pub fn load_cli_config() -> Result<Config> {
    let cwd = std::env::current_dir().context("failed to get current directory")?;
    Ok(load_config(
        global_config_path().as_deref(),
        &project_config_path(&cwd),
    ))
}

/// Platform settings and options from flags, then config, then the host.
pub fn platform(args: &SettingsArgs, config: &Config) -> Result<(PlatformSettings, BuildOptions)> {
    let defaults = &config.settings;

    let os = match args.os.as_ref().or(defaults.os.as_ref()) {
        Some(os) => os.parse::<Os>()?,
        None => Os::host(),
    };

    let mut compiler = match args.compiler.as_ref().or(defaults.compiler.as_ref()) {
        Some(name) => CompilerSettings::new(name.clone()),
        None => CompilerSettings::default_for(os),
    };
    if let Some(version) = args
        .compiler_version
        .as_ref()
        .or(defaults.compiler_version.as_ref())
    {
        compiler = compiler.with_version(version.clone());
    }
    if let Some(ref libcxx) = args.libcxx {
        compiler = compiler.with_libcxx(libcxx.clone());
    }

    let arch = match args.arch.as_ref().or(defaults.arch.as_ref()) {
        Some(arch) => Arch::from(arch.as_str()),
        None => Arch::host(),
    };

    let build_type = match args.build_type.as_ref().or(defaults.build_type.as_ref()) {
        Some(build_type) => build_type.parse::<BuildType>()?,
        None => BuildType::Release,
    };

    let settings = PlatformSettings::new(os, compiler, arch, build_type);

    let mut options = derive_options(os);
    let shared = if args.shared {
        Some(true)
    } else if args.static_libs {
        Some(false)
    } else {
        config.options.shared
    };
    if let Some(shared) = shared {
        options = options.with_shared(shared);
    }

    if let Some(fpic) = args.fpic {
        options = options.with_fpic(fpic)?;
    } else if let Some(fpic) = config.options.fpic {
        if options.has_option(FPIC) {
            options = options.with_fpic(fpic)?;
        } else {
            tracing::debug!("ignoring configured fPIC on {}", os);
        }
    }

    Ok((settings, options))
}

/// Resolve against the graph in `deps`, reporting failures as the resolve stage.
pub fn resolve_configuration(
    recipe: &Recipe,
    settings: &PlatformSettings,
    options: &BuildOptions,
    deps: &Path,
) -> Result<ResolvedConfiguration> {
    let graph = StaticGraph::load(deps)?;
    let requirements = recipe.requirements()?;

    let resolved = ffpack::resolve(settings, options, &requirements, recipe.modules(), &graph)
        .map_err(|source| PipelineError {
            stage: Stage::Resolve,
            source,
        })?;
    Ok(resolved)
}
