//! riap - an in-application flash programming loader
//!
//! Drives the riap-core operations - page programming with verification,
//! boot-configuration updates, and the execution handoff - against a target
//! backend. The only backend today is the in-memory dummy MCU, which makes
//! this binary a faithful host-side simulator of the loader flow: the same
//! core code would run on the part itself behind real port implementations.

mod cli;
mod commands;
mod targets;

use clap::Parser;
use cli::{Cli, Commands};
use riap_core::layout::Layout;
use std::path::Path;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let layout = load_layout(cli.layout.as_deref())?;

    // Commands that don't need an opened target
    match &cli.command {
        Commands::ListTargets => {
            commands::list_targets();
            return Ok(());
        }
        Commands::Regions => {
            commands::regions(&layout);
            return Ok(());
        }
        _ => {}
    }

    let mut handle = targets::open_target(&cli.target)?;

    let result = match cli.command {
        Commands::Program { region, image } => {
            commands::program::run(&mut handle.target, &layout, &region, &image)
        }
        Commands::Verify { region, image } => {
            commands::verify::run(&mut handle.target, &layout, &region, &image)
        }
        Commands::Info => commands::info::run(&mut handle.target, &layout),
        Commands::BootConfig => commands::bootcfg::run(&mut handle.target),
        Commands::Branch {
            region,
            entry,
            drain_attempts,
        } => commands::branch::run(&mut handle.target, &layout, &region, entry, drain_attempts),
        Commands::Run {
            loader_image,
            app_image,
            app_region,
        } => commands::run::run(
            &mut handle.target,
            &layout,
            loader_image.as_deref(),
            app_image.as_deref(),
            &app_region,
        ),
        Commands::Regions | Commands::ListTargets => unreachable!(),
    };

    // Persist whatever the operation left behind, even a failed one - the
    // real part would be in that state too.
    handle.save()?;

    result
}

/// Load the layout file, or fall back to the built-in map
fn load_layout(path: Option<&Path>) -> Result<Layout, Box<dyn std::error::Error>> {
    let layout = match path {
        Some(path) => Layout::from_toml_file(path)?,
        None => Layout::builtin_default(),
    };
    layout.validate()?;
    log::debug!(
        "layout '{}' with {} regions",
        layout.name.as_deref().unwrap_or("unnamed"),
        layout.regions.len()
    );
    Ok(layout)
}
