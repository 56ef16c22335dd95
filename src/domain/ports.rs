//! Ports: seams between the core and its collaborators.

use std::time::Duration;

use async_trait::async_trait;

use super::errors::RealizeResult;
use super::models::{BuildArgs, Fingerprint, RealizedEnv, ShellSpec};

/// The narrow contract for turning a specification into a concrete
/// environment by invoking the external evaluator.
///
/// One synchronous attempt per call; concurrency is supplied by the
/// manager, never by the realizer. Implementations must not mutate
/// shared state on failure.
#[async_trait]
pub trait Realizer: Send + Sync {
    async fn realize(&self, spec: &ShellSpec, timeout: Duration) -> RealizeResult<RealizedEnv>;
}

/// Caller-supplied function producing the spec for each build stage.
///
/// Must be referentially transparent over `(stage, args)`: the manager
/// may invoke it several times and assumes that identical arguments
/// yield specs with identical fingerprints. Debug builds verify this
/// (see [`crate::services::StagePlanner`]). Stage specs are expected to
/// grow more complete with the stage index, but nesting is not
/// enforced.
pub trait BuildFn: Send + Sync {
    fn spec(&self, stage: usize, args: &BuildArgs) -> ShellSpec;
}

impl<F> BuildFn for F
where
    F: Fn(usize, &BuildArgs) -> ShellSpec + Send + Sync,
{
    fn spec(&self, stage: usize, args: &BuildArgs) -> ShellSpec {
        self(stage, args)
    }
}

/// Fingerprint-addressed persistence for realized environments.
///
/// A pure optimization over re-realizing: the manager consults it after
/// an in-memory history miss and writes through on successful
/// realizations. Implementations log their own failures and degrade to
/// a miss; correctness never depends on this port.
#[async_trait]
pub trait ProfilePersistence: Send + Sync {
    /// Load a persisted environment, verifying the stored fingerprint
    /// matches the requested one (a mismatch is a miss, not an error).
    async fn load(&self, fingerprint: &Fingerprint) -> Option<RealizedEnv>;

    /// Persist an environment under its fingerprint.
    async fn store(&self, env: &RealizedEnv);
}
