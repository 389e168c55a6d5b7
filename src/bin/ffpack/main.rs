//! ffpack CLI - build and package the FFmpeg libraries

use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use ffpack::ops::PipelineError;
use ffpack::util::diagnostic::emit;
use ffpack::RecipeError;

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color && std::io::stderr().is_terminal();

    if let Err(e) = run(cli) {
        report(&e, color);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("ffpack=debug")
    } else {
        EnvFilter::new("ffpack=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let recipe = cli.recipe.as_deref();

    match cli.command {
        Commands::Requirements(args) => commands::requirements::execute(args, recipe),
        Commands::Resolve(args) => commands::resolve::execute(args, recipe),
        Commands::Descriptors(args) => commands::descriptors::execute(args, recipe),
        Commands::Build(args) => commands::build::execute(args, recipe),
        Commands::Package(args) => commands::package::execute(args, recipe),
    }
}

fn report(err: &anyhow::Error, color: bool) {
    if let Some(failure) = err.downcast_ref::<PipelineError>() {
        let mut diag = failure.source.to_diagnostic();
        diag.message = format!("{} stage failed: {}", failure.stage, diag.message);
        emit(&diag, color);
    } else if let Some(recipe_err) = err.downcast_ref::<RecipeError>() {
        emit(&recipe_err.to_diagnostic(), color);
    } else {
        eprintln!("error: {:#}", err);
    }
}
