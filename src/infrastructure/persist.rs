//! Fingerprint-addressed on-disk store for realized environments.
//!
//! Enables fast reactivation when the in-memory history is gone (a new
//! process) but the artifacts are still on disk. Strictly an
//! optimization: every failure path degrades to a miss, and a stored
//! environment is only reused after its fingerprint is verified against
//! the requested one.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::models::{Fingerprint, RealizedEnv};
use crate::domain::ports::ProfilePersistence;

/// JSON-file persistence rooted at a cache directory.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    root: PathBuf,
}

impl ProfileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.root.join(format!("{}.json", fingerprint.digest()))
    }
}

#[async_trait]
impl ProfilePersistence for ProfileStore {
    async fn load(&self, fingerprint: &Fingerprint) -> Option<RealizedEnv> {
        let path = self.path_for(fingerprint);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "could not read persisted environment");
                return None;
            }
        };
        let env: RealizedEnv = match serde_json::from_slice(&bytes) {
            Ok(env) => env,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "persisted environment is corrupt");
                return None;
            }
        };
        // A stored fingerprint that does not match the requested one is
        // a miss, not an error.
        if &env.fingerprint != fingerprint {
            warn!(
                path = %path.display(),
                stored = %env.fingerprint.short(),
                requested = %fingerprint.short(),
                "persisted fingerprint mismatch, treating as miss"
            );
            return None;
        }
        debug!(fingerprint = %fingerprint.short(), "loaded persisted environment");
        Some(env)
    }

    async fn store(&self, env: &RealizedEnv) {
        if !env.fingerprint.is_cacheable() {
            return;
        }
        if let Err(err) = tokio::fs::create_dir_all(&self.root).await {
            warn!(root = %self.root.display(), error = %err, "could not create cache directory");
            return;
        }
        let path = self.path_for(&env.fingerprint);
        let json = match serde_json::to_vec_pretty(env) {
            Ok(json) => json,
            Err(err) => {
                warn!(error = %err, "could not serialize environment");
                return;
            }
        };
        if let Err(err) = tokio::fs::write(&path, json).await {
            warn!(path = %path.display(), error = %err, "could not persist environment");
            return;
        }
        debug!(fingerprint = %env.fingerprint.short(), path = %path.display(), "persisted environment");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn sample_env(digest: &str, cacheable: bool) -> RealizedEnv {
        RealizedEnv {
            vars: BTreeMap::from([("PATH".to_string(), "/nix/store/x/bin".to_string())]),
            library_paths: vec![PathBuf::from("/nix/store/z/lib")],
            profile: None,
            built_at: Utc::now(),
            fingerprint: Fingerprint::new(digest.to_string(), cacheable),
            stage: 2,
        }
    }

    #[tokio::test]
    async fn store_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path());
        let env = sample_env("abc123", true);

        store.store(&env).await;
        let loaded = store.load(&env.fingerprint).await.unwrap();
        assert_eq!(loaded, env);
    }

    #[tokio::test]
    async fn profile_hint_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path());
        let env = RealizedEnv {
            profile: Some(PathBuf::from(".nixforge/cache/abc123-profile")),
            ..sample_env("abc123", true)
        };

        store.store(&env).await;
        let loaded = store.load(&env.fingerprint).await.unwrap();
        assert_eq!(loaded.profile, env.profile);
    }

    #[tokio::test]
    async fn missing_file_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path());
        let fp = Fingerprint::new("nothere".to_string(), true);
        assert!(store.load(&fp).await.is_none());
    }

    #[tokio::test]
    async fn impure_environments_are_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path());
        let env = sample_env("impure1", false);

        store.store(&env).await;
        assert!(store.load(&env.fingerprint).await.is_none());
    }

    #[tokio::test]
    async fn fingerprint_mismatch_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path());
        let env = sample_env("real", true);
        store.store(&env).await;

        // Write a doctored file under a different digest's path.
        let other = Fingerprint::new("other".to_string(), true);
        tokio::fs::write(
            dir.path().join("other.json"),
            serde_json::to_vec(&env).unwrap(),
        )
        .await
        .unwrap();
        assert!(store.load(&other).await.is_none());
    }

    #[tokio::test]
    async fn corrupt_file_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path());
        let fp = Fingerprint::new("broken".to_string(), true);
        tokio::fs::write(dir.path().join("broken.json"), b"{ not json")
            .await
            .unwrap();
        assert!(store.load(&fp).await.is_none());
    }
}
