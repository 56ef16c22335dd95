//! Infrastructure layer: external integrations and adapters.

pub mod config;
pub mod logging;
pub mod nix;
pub mod persist;

pub use config::{ConfigError, ConfigLoader};
pub use nix::NixCli;
pub use persist::ProfileStore;
