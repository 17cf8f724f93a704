//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Stamp asset pipeline CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: stamp.toml, searched upward from cwd)
    #[arg(short = 'C', long, default_value = "stamp.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Override the asset URL prefix applied to revisioned references
    #[arg(short = 'p', long, global = true, value_name = "URL")]
    pub prefix: Option<String>,

    /// Enable verbose output for debugging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Compile, copy statics and revision into the distribution tree
    #[command(visible_alias = "b")]
    Build {
        /// Keep source maps and expanded styles (development mode)
        #[arg(long)]
        dev: bool,
    },

    /// Watch sources, rebuild on change, supervise the server and
    /// live-reload browsers
    #[command(visible_alias = "d")]
    Dev,

    /// Remove build output
    #[command(visible_alias = "c")]
    Clean {
        /// Remove only the staging tree
        #[arg(long)]
        staging: bool,

        /// Remove only the distribution tree
        #[arg(long)]
        dist: bool,
    },

    /// Run named pipeline tasks (see `stamp tasks`)
    #[command(visible_alias = "r")]
    Run {
        /// Task names, e.g. `dist` or `style:watch`
        #[arg(required = true, value_name = "TASK")]
        tasks: Vec<String>,
    },

    /// List the available task names
    #[command(visible_alias = "t")]
    Tasks,
}

#[allow(unused)]
impl Cli {
    pub const fn is_build(&self) -> bool {
        matches!(self.command, Commands::Build { .. })
    }
    pub const fn is_dev(&self) -> bool {
        matches!(self.command, Commands::Dev)
    }
    pub const fn is_clean(&self) -> bool {
        matches!(self.command, Commands::Clean { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_flags() {
        let cli = Cli::parse_from(["stamp", "build", "--dev"]);
        assert!(matches!(cli.command, Commands::Build { dev: true }));
    }

    #[test]
    fn test_run_requires_task() {
        assert!(Cli::try_parse_from(["stamp", "run"]).is_err());
    }

    #[test]
    fn test_aliases() {
        assert!(Cli::parse_from(["stamp", "b"]).is_build());
        assert!(Cli::parse_from(["stamp", "d"]).is_dev());
    }

    #[test]
    fn test_global_prefix() {
        let cli = Cli::parse_from(["stamp", "build", "--prefix", "https://cdn.example.com/"]);
        assert_eq!(cli.prefix.as_deref(), Some("https://cdn.example.com/"));
    }
}
