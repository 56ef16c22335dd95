//! Flags describing the requested shell, shared by every subcommand.

use clap::Args;
use std::path::PathBuf;

use crate::domain::models::ShellSpec;

#[derive(Args, Debug, Clone)]
pub struct ShellFlags {
    /// nixpkgs package to include (repeatable)
    #[arg(short, long = "package", global = true)]
    pub packages: Vec<String>,

    /// Package whose libraries join LD_LIBRARY_PATH, in order (repeatable)
    #[arg(long = "library-path", global = true)]
    pub library_paths: Vec<String>,

    /// Extra bash run when the shell initializes
    #[arg(long, global = true)]
    pub hook: Option<String>,

    /// Build from a flake reference instead of a generated expression
    #[arg(long, global = true, conflicts_with = "nix_file")]
    pub flake: Option<String>,

    /// Lock file pinning the flake reference
    #[arg(long, global = true, requires = "flake")]
    pub lock_file: Option<PathBuf>,

    /// Build from a shell.nix-style file
    #[arg(short = 'f', long, global = true)]
    pub nix_file: Option<PathBuf>,

    /// Allow impure evaluation (disables caching for this shell)
    #[arg(long, global = true)]
    pub impure: bool,

    /// Evaluator-input override as key=value (repeatable)
    #[arg(short = 'I', long = "include", global = true, value_parser = parse_override)]
    pub overrides: Vec<(String, String)>,
}

fn parse_override(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))
}

impl ShellFlags {
    /// Translate the flags into an immutable spec.
    pub fn to_spec(&self) -> ShellSpec {
        let mut spec = if let Some(flake) = &self.flake {
            let mut spec = ShellSpec::from_flake(flake);
            if let Some(lock) = &self.lock_file {
                spec = spec.with_lock_file(lock);
            }
            spec
        } else if let Some(file) = &self.nix_file {
            ShellSpec::from_file(file)
        } else {
            ShellSpec::default()
        };
        spec.packages = self.packages.clone();
        spec.library_paths = self.library_paths.clone();
        spec.shell_hook = self.hook.clone();
        spec.impure = self.impure;
        for (key, value) in &self.overrides {
            spec = spec.with_override(key, value);
        }
        spec
    }
}
