//! Realizer backed by the `nix` command-line tool.
//!
//! The only place the system talks to the external evaluator. Each
//! realization is a single `nix print-dev-env --json` invocation under a
//! timeout; the manager supplies all concurrency.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::domain::errors::{RealizeError, RealizeResult};
use crate::domain::models::config::RealizerSettings;
use crate::domain::models::{RealizedEnv, ShellSpec, SourceRef};
use crate::domain::ports::Realizer;
use crate::infrastructure::nix::decode::decode_dev_env;
use crate::infrastructure::nix::expr::mk_shell_expr;
use crate::services::fingerprint::fingerprint;

/// Realizer that shells out to `nix`.
#[derive(Debug, Clone)]
pub struct NixCli {
    settings: RealizerSettings,
}

impl NixCli {
    pub fn new(settings: RealizerSettings) -> Self {
        Self { settings }
    }

    /// Render the Nix expression a generated spec evaluates to.
    pub fn render_expr(&self, spec: &ShellSpec) -> String {
        mk_shell_expr(spec, &self.settings.nixpkgs_ref)
    }

    /// Build the shell derivation and link its profile at `out_link`.
    pub async fn build_profile(
        &self,
        spec: &ShellSpec,
        out_link: &Path,
        timeout: Duration,
    ) -> RealizeResult<PathBuf> {
        let mut args = vec!["build".to_string()];
        args.extend(self.installable_args(spec));
        args.push("--out-link".to_string());
        args.push(out_link.to_string_lossy().into_owned());
        args.push("--print-out-paths".to_string());
        let stdout = self.run(&args, timeout).await?;
        let store_path = stdout
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        debug!(%store_path, out_link = %out_link.display(), "built shell profile");
        Ok(PathBuf::from(store_path))
    }

    /// Installable/evaluation arguments shared by every `nix` subcommand.
    fn installable_args(&self, spec: &ShellSpec) -> Vec<String> {
        let mut args = Vec::new();
        match &spec.source {
            SourceRef::Flake { url, lock } => {
                args.push(url.clone());
                if let Some(lock) = lock {
                    args.push("--reference-lock-file".to_string());
                    args.push(lock.to_string_lossy().into_owned());
                }
            }
            SourceRef::NixFile { path } => {
                args.push("-f".to_string());
                args.push(path.to_string_lossy().into_owned());
            }
            SourceRef::Generated => {
                args.push("--expr".to_string());
                args.push(self.render_expr(spec));
            }
        }
        if spec.impure {
            args.push("--impure".to_string());
        }
        for (key, value) in &spec.overrides {
            args.push("-I".to_string());
            args.push(format!("{key}={value}"));
        }
        args
    }

    /// Run `nix` with the given arguments, enforcing the timeout by
    /// killing the child on expiry.
    async fn run(&self, args: &[String], timeout: Duration) -> RealizeResult<String> {
        debug!(binary = %self.settings.nix_binary, ?args, "invoking nix");
        let child = Command::new(&self.settings.nix_binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| {
                if err.kind() == ErrorKind::NotFound {
                    RealizeError::ToolMissing(err.to_string())
                } else {
                    RealizeError::Evaluation(format!("failed to spawn nix: {err}"))
                }
            })?;

        // kill_on_drop reaps the child when the timeout drops the
        // in-flight wait_with_output future.
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                return Err(RealizeError::Evaluation(format!(
                    "failed to run nix: {err}"
                )));
            }
            Err(_) => {
                warn!(?timeout, "nix invocation timed out, killing it");
                return Err(RealizeError::Timeout(timeout));
            }
        };

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let diagnostic = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(RealizeError::Evaluation(if diagnostic.is_empty() {
                format!("nix exited with {}", output.status)
            } else {
                diagnostic
            }))
        }
    }
}

#[async_trait]
impl Realizer for NixCli {
    async fn realize(&self, spec: &ShellSpec, timeout: Duration) -> RealizeResult<RealizedEnv> {
        let mut args = vec!["print-dev-env".to_string()];
        args.extend(self.installable_args(spec));
        args.push("--json".to_string());

        let raw = self.run(&args, timeout).await?;
        let dev_env = decode_dev_env(&raw)?;

        let library_paths = dev_env
            .vars
            .get("LD_LIBRARY_PATH")
            .map(|value| value.split(':').map(PathBuf::from).collect())
            .unwrap_or_default();

        Ok(RealizedEnv {
            vars: dev_env.vars,
            library_paths,
            profile: None,
            built_at: Utc::now(),
            fingerprint: fingerprint(spec),
            // Re-tagged by the manager for the stage that requested it.
            stage: 0,
        })
    }
}
