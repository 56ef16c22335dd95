//! Deterministic fingerprinting of shell specifications.
//!
//! The fingerprint is the cache key for everything downstream: the
//! in-memory history, the on-disk profile store, and supersession
//! checks in the manager. Canonicalization rules:
//!
//! - package names are sorted (package sets are order-independent);
//! - library-path entries keep caller order (order changes the
//!   resulting `LD_LIBRARY_PATH`, so it is significant);
//! - hook text is hashed verbatim;
//! - evaluator-input overrides are sorted by key;
//! - the purity flag participates, so a pure and an impure spec can
//!   never collide.

use sha2::{Digest, Sha256};

use crate::domain::models::{Fingerprint, ShellSpec, SourceRef};

/// Compute the fingerprint of a specification.
///
/// Total and deterministic; impure specs still get a digest but the
/// result is flagged non-cacheable.
pub fn fingerprint(spec: &ShellSpec) -> Fingerprint {
    let mut hasher = Sha256::new();

    feed(&mut hasher, if spec.impure { b"impure" } else { b"pure" });

    let mut packages: Vec<&str> = spec.packages.iter().map(String::as_str).collect();
    packages.sort_unstable();
    feed_list(&mut hasher, b"packages", packages.iter().map(|p| p.as_bytes()));

    feed_list(
        &mut hasher,
        b"library-paths",
        spec.library_paths.iter().map(|p| p.as_bytes()),
    );

    match &spec.shell_hook {
        Some(hook) => feed_tagged(&mut hasher, b"hook", hook.as_bytes()),
        None => feed(&mut hasher, b"no-hook"),
    }

    match &spec.source {
        SourceRef::Generated => feed(&mut hasher, b"source:generated"),
        SourceRef::NixFile { path } => {
            feed_tagged(&mut hasher, b"source:file", path.to_string_lossy().as_bytes());
        }
        SourceRef::Flake { url, lock } => {
            feed_tagged(&mut hasher, b"source:flake", url.as_bytes());
            match lock {
                Some(lock) => {
                    feed_tagged(&mut hasher, b"lock", lock.to_string_lossy().as_bytes());
                }
                None => feed(&mut hasher, b"no-lock"),
            }
        }
    }

    // BTreeMap iteration is already key-sorted.
    for (key, value) in &spec.overrides {
        feed_tagged(&mut hasher, b"override", key.as_bytes());
        feed(&mut hasher, value.as_bytes());
    }

    let digest = hasher.finalize();
    Fingerprint::new(format!("{digest:x}"), !spec.impure)
}

/// Length-prefix every chunk so adjacent fields can never alias
/// (e.g. `["ab"]` vs `["a", "b"]`).
fn feed(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update(u64::try_from(bytes.len()).unwrap_or(u64::MAX).to_le_bytes());
    hasher.update(bytes);
}

fn feed_tagged(hasher: &mut Sha256, tag: &[u8], bytes: &[u8]) {
    feed(hasher, tag);
    feed(hasher, bytes);
}

fn feed_list<'a>(hasher: &mut Sha256, tag: &[u8], items: impl Iterator<Item = &'a [u8]>) {
    feed(hasher, tag);
    let mut count: u64 = 0;
    for item in items {
        feed(hasher, item);
        count += 1;
    }
    hasher.update(count.to_le_bytes());
}
