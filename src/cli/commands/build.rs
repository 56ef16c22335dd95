//! Implementation of the `nixforge build` command: realize the shell,
//! link its profile under the cache root, and print the store path.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;

use crate::cli::context::ShellContext;
use crate::cli::output::create_spinner;
use crate::domain::models::RealizedEnv;
use crate::domain::ProfilePersistence;

pub async fn execute(ctx: &ShellContext) -> Result<()> {
    let env = ctx.realize().await?;

    let out_link =
        PathBuf::from(&ctx.config.cache.root).join(format!("{}-profile", env.fingerprint.digest()));
    if let Some(parent) = out_link.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let spinner = create_spinner("linking shell profile");
    let timeout = Duration::from_secs(ctx.config.realizer.timeout_secs);
    let result = ctx.realizer.build_profile(&ctx.spec, &out_link, timeout).await;
    spinner.finish_and_clear();
    let store_path = result.context("failed to build shell profile")?;

    // Record where the profile link lives so later reactivations carry
    // the hint.
    let persisted = RealizedEnv {
        profile: Some(out_link.clone()),
        ..(*env).clone()
    };
    ctx.profiles.store(&persisted).await;

    eprintln!(
        "{} {}",
        style("profile:").green().bold(),
        out_link.display()
    );
    println!("{}", store_path.display());
    Ok(())
}
