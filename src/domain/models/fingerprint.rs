//! Fingerprint: deterministic cache key for a shell specification.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A digest identifying a [`super::ShellSpec`]'s cacheable attributes.
///
/// Fingerprints derived from impure specifications are marked unstable:
/// the digest is still computed (useful for logging and supersession
/// checks) but it must never be used as a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    digest: String,
    stable: bool,
}

impl Fingerprint {
    pub fn new(digest: String, stable: bool) -> Self {
        Self { digest, stable }
    }

    /// Hex digest of the canonical serialization.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Whether this fingerprint may be used as a cache key.
    ///
    /// False for impure specifications, which can observe ambient state
    /// and therefore forfeit caching guarantees.
    pub fn is_cacheable(&self) -> bool {
        self.stable
    }

    /// Short prefix for log output.
    pub fn short(&self) -> &str {
        &self.digest[..self.digest.len().min(12)]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.stable {
            write!(f, "{}", self.digest)
        } else {
            write!(f, "{} (unstable)", self.digest)
        }
    }
}
