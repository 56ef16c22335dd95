//! CLI command implementations.

pub mod activate;
pub mod build;
pub mod env;
pub mod shell_flags;
pub mod show;
