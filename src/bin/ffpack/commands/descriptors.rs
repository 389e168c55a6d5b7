//! `ffpack descriptors` command

use std::path::Path;

use anyhow::Result;

use crate::cli::DescriptorsArgs;
use crate::commands::{load_cli_config, load_recipe, platform, resolve_configuration};
use ffpack::ops::{generate_descriptors, PipelineError, Stage, TemplateSet};
use ffpack::PackageLayout;

pub fn execute(args: DescriptorsArgs, recipe: Option<&Path>) -> Result<()> {
    let recipe = load_recipe(recipe)?;
    let config = load_cli_config()?;
    let (settings, options) = platform(&args.settings, &config)?;

    let resolved = resolve_configuration(&recipe, &settings, &options, &args.deps)?;

    let templates = match args.templates {
        Some(ref dir) => TemplateSet::from_dir(dir)?,
        None => TemplateSet::embedded(),
    };

    let layout = PackageLayout::new(&args.package_dir);
    let descriptors = generate_descriptors(&layout, &resolved, resolved.link_mode(), &templates)
        .map_err(|source| PipelineError {
            stage: Stage::GenerateMetadata,
            source,
        })?;

    for descriptor in &descriptors {
        eprintln!(
            "    Generated {} ({} -l{})",
            layout.descriptor_path(&descriptor.module_name).display(),
            descriptor.version,
            descriptor.link_name
        );
    }
    Ok(())
}
