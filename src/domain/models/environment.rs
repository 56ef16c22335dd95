//! Realized environments: the concrete output of evaluating a spec.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::fingerprint::Fingerprint;

/// Variables that hold `:`-joined search paths. When a realized
/// environment is applied over an ambient one, these are prepended
/// rather than overwritten.
pub const LIST_LIKE_VARS: &[&str] = &[
    "PATH",
    "LD_LIBRARY_PATH",
    "PYTHONPATH",
    "CLASSPATH",
    "PKG_CONFIG_PATH",
    "MANPATH",
    "INFOPATH",
    "XDG_DATA_DIRS",
    "XDG_CONFIG_DIRS",
    "CDPATH",
    "FPATH",
    "MAILPATH",
];

/// A concrete environment produced by realizing a [`super::ShellSpec`].
///
/// Created only by a realizer; immutable afterwards and shared as
/// `Arc<RealizedEnv>` between the history store and the manager's
/// current-environment slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealizedEnv {
    /// Environment variables exported by the shell.
    pub vars: BTreeMap<String, String>,
    /// Resolved store paths contributing to `LD_LIBRARY_PATH`.
    pub library_paths: Vec<PathBuf>,
    /// On-disk profile link, when the realizer produced one.
    pub profile: Option<PathBuf>,
    /// When the realization completed.
    pub built_at: DateTime<Utc>,
    /// Fingerprint of the spec this environment was realized from.
    pub fingerprint: Fingerprint,
    /// Which stage of the build plan produced this environment.
    pub stage: usize,
}

impl RealizedEnv {
    /// Merge this environment over an ambient variable lookup.
    ///
    /// List-like variables already present in the ambient environment are
    /// prepended with a `:` separator; everything else overwrites.
    pub fn merged_vars<F>(&self, ambient: F) -> BTreeMap<String, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut merged = BTreeMap::new();
        for (key, value) in &self.vars {
            let merged_value = match ambient(key) {
                Some(existing) if LIST_LIKE_VARS.contains(&key.as_str()) => {
                    format!("{value}:{existing}")
                }
                _ => value.clone(),
            };
            merged.insert(key.clone(), merged_value);
        }
        merged
    }

    /// Render `export` statements suitable for `eval`-ing in a POSIX shell.
    pub fn to_export_script(&self) -> String {
        let mut script = String::new();
        for (key, value) in &self.vars {
            script.push_str("export ");
            script.push_str(key);
            script.push_str("='");
            script.push_str(&value.replace('\'', "'\\''"));
            script.push_str("'\n");
        }
        script
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_with(vars: &[(&str, &str)]) -> RealizedEnv {
        RealizedEnv {
            vars: vars
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            library_paths: vec![],
            profile: None,
            built_at: Utc::now(),
            fingerprint: Fingerprint::new("deadbeef".into(), true),
            stage: 1,
        }
    }

    #[test]
    fn list_like_vars_prepend_over_ambient() {
        let env = env_with(&[("PATH", "/nix/store/x/bin"), ("FOO", "bar")]);
        let merged = env.merged_vars(|key| match key {
            "PATH" => Some("/usr/bin".to_string()),
            "FOO" => Some("ambient".to_string()),
            _ => None,
        });
        assert_eq!(merged["PATH"], "/nix/store/x/bin:/usr/bin");
        // Non-list variables overwrite.
        assert_eq!(merged["FOO"], "bar");
    }

    #[test]
    fn list_like_vars_stand_alone_without_ambient() {
        let env = env_with(&[("PATH", "/nix/store/x/bin")]);
        let merged = env.merged_vars(|_| None);
        assert_eq!(merged["PATH"], "/nix/store/x/bin");
    }

    #[test]
    fn export_script_quotes_values() {
        let env = env_with(&[("GREETING", "it's here")]);
        let script = env.to_export_script();
        assert_eq!(script, "export GREETING='it'\\''s here'\n");
    }
}
