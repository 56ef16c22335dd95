//! Shell specification: the immutable description of a desired environment.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where the Nix expression for a shell comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceRef {
    /// Expression generated from the spec's package list and hooks.
    #[default]
    Generated,
    /// A `shell.nix`-style file on disk.
    NixFile { path: PathBuf },
    /// A flake reference, optionally pinned by a lock file.
    Flake { url: String, lock: Option<PathBuf> },
}

/// Immutable description of a desired shell environment.
///
/// Two attribute-wise equal specs fingerprint identically. Package order
/// is canonicalized away at fingerprint time (package sets are
/// order-independent), while library-path order is semantically
/// significant and preserved. Impure specs are permitted but forfeit
/// caching: their fingerprints are marked unstable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShellSpec {
    /// Requested nixpkgs package names.
    pub packages: Vec<String>,
    /// Packages whose library outputs join `LD_LIBRARY_PATH`, in order.
    pub library_paths: Vec<String>,
    /// Extra bash run on shell initialization.
    pub shell_hook: Option<String>,
    /// Where the shell expression comes from.
    #[serde(default)]
    pub source: SourceRef,
    /// Whether evaluation may observe ambient state (`--impure`).
    #[serde(default)]
    pub impure: bool,
    /// Named evaluator-input overrides (`-I key=value`).
    #[serde(default)]
    pub overrides: BTreeMap<String, String>,
}

impl ShellSpec {
    /// A generated `mkShell` spec over the given packages.
    pub fn mk_shell<I, S>(packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            packages: packages.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// A spec backed by a `shell.nix`-style file.
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: SourceRef::NixFile { path: path.into() },
            ..Self::default()
        }
    }

    /// A spec backed by a flake reference.
    pub fn from_flake(url: impl Into<String>) -> Self {
        Self {
            source: SourceRef::Flake {
                url: url.into(),
                lock: None,
            },
            ..Self::default()
        }
    }

    /// Pin a flake-sourced spec to a lock file. No effect on other
    /// source kinds.
    pub fn with_lock_file(mut self, path: impl Into<PathBuf>) -> Self {
        if let SourceRef::Flake { lock, .. } = &mut self.source {
            *lock = Some(path.into());
        }
        self
    }

    /// Add packages whose libraries should land on `LD_LIBRARY_PATH`.
    /// Order is preserved and affects the resulting variable.
    pub fn with_library_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.library_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Set the shell initialization hook (verbatim, whitespace-sensitive).
    pub fn with_shell_hook(mut self, hook: impl Into<String>) -> Self {
        self.shell_hook = Some(hook.into());
        self
    }

    /// Add a named evaluator-input override.
    pub fn with_override(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(key.into(), value.into());
        self
    }

    /// Allow the evaluation to observe ambient state. Disables caching
    /// for this spec.
    pub fn impure(mut self) -> Self {
        self.impure = true;
        self
    }
}

/// Free-form request arguments forwarded to a build function.
///
/// The build function must be referentially transparent over
/// `(stage, args)`; see [`crate::domain::ports::BuildFn`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildArgs(BTreeMap<String, serde_json::Value>);

impl BuildArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mk_shell_collects_packages() {
        let spec = ShellSpec::mk_shell(["curl", "jq"]);
        assert_eq!(spec.packages, vec!["curl", "jq"]);
        assert_eq!(spec.source, SourceRef::Generated);
        assert!(!spec.impure);
    }

    #[test]
    fn builders_compose() {
        let spec = ShellSpec::mk_shell(["python3"])
            .with_library_paths(["zlib", "openssl"])
            .with_shell_hook("echo ready")
            .with_override("nixpkgs", "/nix/store/abc")
            .impure();
        assert_eq!(spec.library_paths, vec!["zlib", "openssl"]);
        assert_eq!(spec.shell_hook.as_deref(), Some("echo ready"));
        assert!(spec.impure);
        assert_eq!(spec.overrides.len(), 1);
    }

    #[test]
    fn flake_source_roundtrips_through_serde() {
        let spec = ShellSpec::from_flake("github:NixOS/nixpkgs");
        let json = serde_json::to_string(&spec).unwrap();
        let back: ShellSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(spec, back);
    }

    #[test]
    fn lock_file_attaches_to_flake_sources_only() {
        let locked = ShellSpec::from_flake("github:NixOS/nixpkgs").with_lock_file("flake.lock");
        assert_eq!(
            locked.source,
            SourceRef::Flake {
                url: "github:NixOS/nixpkgs".to_string(),
                lock: Some(PathBuf::from("flake.lock")),
            }
        );

        let generated = ShellSpec::mk_shell(["curl"]).with_lock_file("flake.lock");
        assert_eq!(generated.source, SourceRef::Generated);
    }
}
