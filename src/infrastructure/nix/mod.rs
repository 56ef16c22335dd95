//! Integration with the external `nix` evaluator.

pub mod cli;
pub mod decode;
pub mod expr;

pub use cli::NixCli;
pub use decode::{decode_dev_env, DevEnv};
pub use expr::{mk_shell_expr, NixValue};
