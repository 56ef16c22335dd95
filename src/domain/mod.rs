//! Domain layer: pure data model, error taxonomy, and ports.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DecodeError, RealizeError, RealizeResult};
pub use models::{BuildArgs, Fingerprint, RealizedEnv, ShellSpec, SourceRef};
pub use ports::{BuildFn, ProfilePersistence, Realizer};
