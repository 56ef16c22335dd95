//! Shared wiring between CLI commands and the shell manager.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::domain::models::{BuildArgs, Config, RealizedEnv, ShellSpec};
use crate::infrastructure::{NixCli, ProfileStore};
use crate::services::manager::{ManagerOptions, ShellManager};

use super::commands::shell_flags::ShellFlags;
use super::output::create_spinner;

/// Everything a command needs to realize the requested shell.
pub struct ShellContext {
    pub config: Config,
    pub realizer: Arc<NixCli>,
    pub spec: ShellSpec,
    pub profiles: Arc<ProfileStore>,
    manager: ShellManager,
}

impl ShellContext {
    pub fn new(config: Config, flags: &ShellFlags) -> Self {
        let spec = flags.to_spec();
        let realizer = Arc::new(NixCli::new(config.realizer.clone()));
        let profiles = Arc::new(ProfileStore::new(&config.cache.root));

        let mut options = ManagerOptions::from(&config.manager);
        options.realize_timeout = Duration::from_secs(config.realizer.timeout_secs);
        // A CLI invocation asks for one concrete shell; staged build
        // functions are a library-level feature.
        let build_spec = spec.clone();
        let build_fn = move |_stage: usize, _args: &BuildArgs| build_spec.clone();

        let manager = ShellManager::new(Arc::new(build_fn), realizer.clone(), options)
            .with_persistence(profiles.clone());

        Self {
            config,
            realizer,
            spec,
            profiles,
            manager,
        }
    }

    /// Realize the requested shell, with a spinner on stderr.
    pub async fn realize(&self) -> Result<Arc<RealizedEnv>> {
        let spinner = create_spinner("building shell environment");
        let result = self.manager.build(&BuildArgs::new()).await;
        spinner.finish_and_clear();
        let handle = result.context("failed to build shell environment")?;
        Ok(handle.env)
    }
}
