//! Nixforge - staged Nix shell builder with environment caching
//!
//! Nixforge provisions reproducible command-execution environments
//! described declaratively (package lists, library paths, shell hooks,
//! flake references) and executes commands or interactive sessions
//! inside them. Environment construction is expensive, so the core of
//! the crate is a build & cache manager: deterministic fingerprinting,
//! staged foreground/background realization, a bounded LRU history of
//! previously built environments, and a last-request-wins handoff from
//! stale to fresh environments.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): specs, realized environments,
//!   fingerprints, error taxonomy, and the realizer/build-function ports
//! - **Service Layer** (`services`): fingerprinting, history store,
//!   stage planner, and the shell manager state machine
//! - **Infrastructure Layer** (`infrastructure`): the `nix` CLI
//!   realizer, expression rendering, output decoding, on-disk
//!   persistence, config, and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use nixforge::domain::models::{BuildArgs, ShellSpec};
//! use nixforge::infrastructure::NixCli;
//! use nixforge::services::manager::{ManagerOptions, ShellManager};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let build_fn = |stage: usize, _args: &BuildArgs| match stage {
//!         1 => ShellSpec::mk_shell(["python3"]),
//!         _ => ShellSpec::mk_shell(["python3", "ruff", "pyright"]),
//!     };
//!     let realizer = Arc::new(NixCli::new(Default::default()));
//!     let manager = ShellManager::new(
//!         Arc::new(build_fn),
//!         realizer,
//!         ManagerOptions { num_stages: 2, block_on_rebuild: false, ..Default::default() },
//!     );
//!     let handle = manager.build(&BuildArgs::new()).await?;
//!     println!("stage {} ready", handle.env.stage);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    BuildArgs, Config, Fingerprint, ManagerSettings, RealizedEnv, ShellSpec, SourceRef,
};
pub use domain::{BuildFn, DecodeError, ProfilePersistence, RealizeError, Realizer};
pub use infrastructure::{ConfigError, ConfigLoader, NixCli, ProfileStore};
pub use services::manager::{BuildHandle, ManagerOptions, ShellManager, ShellStatus, SlotState};
pub use services::{fingerprint, HistoryStore, StagePlanner};
