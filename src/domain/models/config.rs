use serde::{Deserialize, Serialize};

/// Main configuration structure for nixforge
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Shell manager configuration
    #[serde(default)]
    pub manager: ManagerSettings,

    /// Realizer (nix invocation) configuration
    #[serde(default)]
    pub realizer: RealizerSettings,

    /// Environment cache configuration
    #[serde(default)]
    pub cache: CacheSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Shell manager configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ManagerSettings {
    /// Number of build stages per request (>= 1). Stage 1 is always
    /// realized synchronously; later stages may upgrade in the background.
    #[serde(default = "default_num_stages")]
    pub num_stages: usize,

    /// Whether later stages block the caller instead of upgrading in the
    /// background.
    #[serde(default = "default_block_on_rebuild")]
    pub block_on_rebuild: bool,

    /// Number of realized environments kept in history (>= 1).
    #[serde(default = "default_history")]
    pub history: usize,
}

const fn default_num_stages() -> usize {
    1
}

const fn default_block_on_rebuild() -> bool {
    true
}

const fn default_history() -> usize {
    10
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            num_stages: default_num_stages(),
            block_on_rebuild: default_block_on_rebuild(),
            history: default_history(),
        }
    }
}

/// Realizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RealizerSettings {
    /// Name or path of the nix binary
    #[serde(default = "default_nix_binary")]
    pub nix_binary: String,

    /// Flake reference used for nixpkgs in generated expressions
    #[serde(default = "default_nixpkgs_ref")]
    pub nixpkgs_ref: String,

    /// Per-realization timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_nix_binary() -> String {
    "nix".to_string()
}

fn default_nixpkgs_ref() -> String {
    "github:NixOS/nixpkgs/nixos-unstable".to_string()
}

const fn default_timeout_secs() -> u64 {
    600
}

impl Default for RealizerSettings {
    fn default() -> Self {
        Self {
            nix_binary: default_nix_binary(),
            nixpkgs_ref: default_nixpkgs_ref(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Environment cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CacheSettings {
    /// Root directory for persisted environments
    #[serde(default = "default_cache_root")]
    pub root: String,
}

fn default_cache_root() -> String {
    ".nixforge/cache".to_string()
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            root: default_cache_root(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
