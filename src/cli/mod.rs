//! Command-line interface.

pub mod commands;
pub mod context;
pub mod output;

use clap::{Parser, Subcommand};

use crate::cli::commands::shell_flags::ShellFlags;

/// nixforge manages Nix shell environments on your behalf.
#[derive(Parser, Debug)]
#[command(name = "nixforge", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub shell: ShellFlags,

    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print shell activation script (default)
    Env,
    /// Spawn an interactive shell with the environment loaded
    Activate,
    /// Realize the shell and link its profile
    Build,
    /// Display the Nix expression to be evaluated
    Show,
}
