//! Implementation of the `nixforge activate` command: spawn an
//! interactive shell with the realized environment applied.

use std::os::unix::process::CommandExt;
use std::process::Command;

use anyhow::{Context, Result};
use console::style;

use crate::cli::context::ShellContext;

pub async fn execute(ctx: &ShellContext) -> Result<()> {
    let env = ctx.realize().await?;
    let shell = std::env::var("SHELL").unwrap_or_else(|_| "/bin/bash".to_string());

    eprintln!(
        "{} entering {} (stage {}, {})",
        style("nixforge:").cyan().bold(),
        shell,
        env.stage,
        env.fingerprint.short(),
    );

    // Merge over the ambient environment: list-like variables prepend,
    // everything else overwrites.
    let merged = env.merged_vars(|key| std::env::var(key).ok());
    let mut command = Command::new(&shell);
    command.envs(merged);

    // exec replaces this process; returning at all means it failed.
    let err = command.exec();
    Err(err).with_context(|| format!("failed to exec {shell}"))
}
