//! Domain models.

pub mod config;
pub mod environment;
pub mod fingerprint;
pub mod spec;

pub use config::{CacheSettings, Config, LoggingSettings, ManagerSettings, RealizerSettings};
pub use environment::{RealizedEnv, LIST_LIKE_VARS};
pub use fingerprint::Fingerprint;
pub use spec::{BuildArgs, ShellSpec, SourceRef};
