//! `ffpack resolve` command

use std::path::Path;

use anyhow::Result;

use crate::cli::ResolveArgs;
use crate::commands::{load_cli_config, load_recipe, platform, resolve_configuration};

pub fn execute(args: ResolveArgs, recipe: Option<&Path>) -> Result<()> {
    let recipe = load_recipe(recipe)?;
    let config = load_cli_config()?;
    let (settings, options) = platform(&args.settings, &config)?;

    let resolved = resolve_configuration(&recipe, &settings, &options, &args.deps)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&resolved)?);
        return Ok(());
    }

    let settings = resolved.settings();
    println!("os:            {}", settings.os);
    println!("compiler:      {}", settings.compiler);
    println!("arch:          {}", settings.arch);
    println!("build_type:    {}", settings.build_type);
    println!("link_mode:     {}", resolved.link_mode());
    if let Some(fpic) = resolved.fpic() {
        println!("fPIC:          {}", fpic);
    }
    println!("configuration: {}", resolved.build_type_label());
    println!("fingerprint:   {}", resolved.fingerprint());

    println!("include paths:");
    for path in resolved.active_include_paths() {
        println!("  {}", path.display());
    }
    println!("library paths:");
    for path in resolved.active_library_paths() {
        println!("  {}", path.display());
    }
    println!("modules:");
    for (module, version) in resolved.module_versions() {
        println!("  lib{} {}", module, version);
    }
    Ok(())
}
