//! `ffpack build` command

use std::path::Path;

use anyhow::Result;

use crate::cli::BuildArgs;
use crate::commands::{load_cli_config, load_recipe, platform};
use ffpack::builder::MsBuild;
use ffpack::ops::{self, PackageOptions, PipelineError, Stage};
use ffpack::resolver::StaticGraph;
use ffpack::sources::{LocalSource, SourceProvider, TarballSource};
use ffpack::util::Config;
use ffpack::{PlatformSettings, Recipe, RecipeError};

pub fn execute(args: BuildArgs, recipe: Option<&Path>) -> Result<()> {
    let recipe = load_recipe(recipe)?;
    let config = load_cli_config()?;
    let (settings, options) = platform(&args.settings, &config)?;

    let graph = StaticGraph::load(&args.deps)?;
    let source = source_provider(&args, &recipe, &config)?;
    let toolchain = toolchain(&args, &recipe, &settings, &config)?;
    let opts = PackageOptions::new(settings, options, &args.work_dir, args.work_dir.join("package"));

    let report = ops::build(&recipe, &opts, &graph, source.as_ref(), &toolchain)?;

    eprintln!(
        "    Finished `{}` -> {}",
        report.resolved.build_type_label(),
        report.output.output_dir.display()
    );
    Ok(())
}

/// The source tree to build: `--source-dir`, or the recipe's archive.
pub fn source_provider(
    args: &BuildArgs,
    recipe: &Recipe,
    config: &Config,
) -> Result<Box<dyn SourceProvider>> {
    if let Some(ref dir) = args.source_dir {
        return Ok(Box::new(LocalSource::new(dir)));
    }

    let offline = args.offline || config.net.offline;
    Ok(Box::new(TarballSource::from_recipe(recipe)?.offline(offline)))
}

/// MSBuild, looked up only where the recipe has a native build step.
pub fn toolchain(
    args: &BuildArgs,
    recipe: &Recipe,
    settings: &PlatformSettings,
    config: &Config,
) -> Result<MsBuild> {
    let mut toolchain_settings = config.toolchain.clone();
    if args.jobs.is_some() {
        toolchain_settings.jobs = args.jobs;
    }

    if !recipe.builds_on(settings.os) {
        return Ok(MsBuild::new("msbuild"));
    }

    let toolchain = MsBuild::detect(&toolchain_settings).map_err(|e| PipelineError {
        stage: Stage::Build,
        source: RecipeError::Toolchain(e),
    })?;
    Ok(toolchain)
}
