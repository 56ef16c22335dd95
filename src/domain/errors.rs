//! Error taxonomy for environment realization.

use std::time::Duration;

use thiserror::Error;

/// Failure decoding the evaluator's structured output.
///
/// Always fatal for the attempt that produced it; a malformed payload is
/// never coerced into a partial environment.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("evaluator output is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("evaluator output is missing the `{0}` field")]
    MissingField(&'static str),

    #[error("variable `{name}` has unsupported type `{kind}`")]
    UnsupportedVariable { name: String, kind: String },
}

/// Failure modes of a single realization attempt.
#[derive(Debug, Error)]
pub enum RealizeError {
    #[error(
        "nix is not installed or not on PATH ({0}); \
         follow https://nixos.org/download/ to install it, \
         or run your command directly without an isolated environment"
    )]
    ToolMissing(String),

    #[error("nix evaluation failed: {0}")]
    Evaluation(String),

    #[error("realization did not complete within {0:?}")]
    Timeout(Duration),

    #[error("realization was cancelled by a newer build request")]
    Cancelled,

    #[error("could not decode evaluator output: {0}")]
    Decode(#[from] DecodeError),
}

impl RealizeError {
    /// True for failures that may succeed on a plain retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Cancelled)
    }
}

pub type RealizeResult<T> = Result<T, RealizeError>;
