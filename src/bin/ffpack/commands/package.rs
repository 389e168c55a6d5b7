//! `ffpack package` command

use std::path::Path;

use anyhow::Result;

use crate::cli::PackageArgs;
use crate::commands::build::{source_provider, toolchain};
use crate::commands::{load_cli_config, load_recipe, platform};
use ffpack::ops::{self, PackageOptions, TemplateSet};
use ffpack::resolver::StaticGraph;
use ffpack::util::Diagnostic;
use ffpack::util::diagnostic::emit;

pub fn execute(args: PackageArgs, recipe: Option<&Path>) -> Result<()> {
    let recipe = load_recipe(recipe)?;
    let config = load_cli_config()?;
    let (settings, options) = platform(&args.build.settings, &config)?;

    if !options.shared() {
        emit(
            &Diagnostic::warning("static packaging copies headers and licenses only")
                .with_context("no libraries or binaries are installed in static mode"),
            false,
        );
    }

    let templates = match args.templates {
        Some(ref dir) => TemplateSet::from_dir(dir)?,
        None => TemplateSet::embedded(),
    };

    let graph = StaticGraph::load(&args.build.deps)?;
    let source = source_provider(&args.build, &recipe, &config)?;
    let toolchain = toolchain(&args.build, &recipe, &settings, &config)?;
    let opts = PackageOptions::new(settings, options, &args.build.work_dir, &args.package_dir)
        .with_templates(templates);

    let report = ops::package(&recipe, &opts, &graph, source.as_ref(), &toolchain)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    eprintln!(
        "    Packaged {} files into {}",
        report.assembly.files,
        report.assembly.root.display()
    );
    eprintln!("    Descriptors: {}", report.descriptors.len());
    eprintln!("    Libraries: {}", report.libs.join(", "));
    eprintln!("    Digest: {}", report.assembly.digest);
    Ok(())
}
