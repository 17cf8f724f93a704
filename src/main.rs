//! Stamp - asset build pipeline with content-hash revisioning.

#![allow(dead_code)]

mod cli;
mod config;
mod core;
mod logger;
mod rev;
mod serve;
mod stage;
mod task;
mod utils;
mod watch;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::PipelineConfig;
use core::BuildMode;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    // `build` is production unless --dev; everything else keeps source maps
    let mode = match cli.command {
        Commands::Build { dev: false } => BuildMode::Production,
        _ => BuildMode::Development,
    };

    let mut config = PipelineConfig::load(&cli.config, mode)?;
    config.set_asset_url_prefix(cli.prefix.clone());

    match &cli.command {
        Commands::Build { .. } => cli::run_build(&config),
        Commands::Dev => cli::run_dev(&config),
        Commands::Clean { staging, dist } => cli::run_clean(&config, *staging, *dist),
        Commands::Run { tasks } => cli::run_named(&config, tasks),
        Commands::Tasks => {
            cli::list_tasks();
            Ok(())
        }
    }
}
