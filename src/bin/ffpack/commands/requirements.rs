//! `ffpack requirements` command

use std::path::Path;

use anyhow::Result;

use crate::cli::RequirementsArgs;
use crate::commands::load_recipe;

pub fn execute(args: RequirementsArgs, recipe: Option<&Path>) -> Result<()> {
    let recipe = load_recipe(recipe)?;
    let requirements = recipe.requirements()?;

    if args.json {
        let entries: Vec<_> = requirements.iter().collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for req in &requirements {
        println!("{}", req);
    }
    Ok(())
}
