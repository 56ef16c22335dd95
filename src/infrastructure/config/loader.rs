use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid num_stages: {0}. Must be at least 1")]
    InvalidNumStages(usize),

    #[error("Invalid history: {0}. Must be at least 1")]
    InvalidHistory(usize),

    #[error("Invalid timeout_secs: {0}. Must be positive")]
    InvalidTimeout(u64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Nix binary name cannot be empty")]
    EmptyNixBinary,

    #[error("Cache root cannot be empty")]
    EmptyCacheRoot,
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .nixforge/config.yaml (project config)
    /// 3. Environment variables (`NIXFORGE_*` prefix, highest priority)
    ///
    /// Configuration is project-local (pwd/.nixforge/) so different
    /// projects can carry different shells and cache settings.
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".nixforge/config.yaml"))
            .merge(Env::prefixed("NIXFORGE_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.manager.num_stages == 0 {
            return Err(ConfigError::InvalidNumStages(config.manager.num_stages));
        }
        if config.manager.history == 0 {
            return Err(ConfigError::InvalidHistory(config.manager.history));
        }
        if config.realizer.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout(config.realizer.timeout_secs));
        }
        if config.realizer.nix_binary.is_empty() {
            return Err(ConfigError::EmptyNixBinary);
        }
        if config.cache.root.is_empty() {
            return Err(ConfigError::EmptyCacheRoot);
        }
        match config.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => return Err(ConfigError::InvalidLogLevel(other.to_string())),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = Config::default();
        assert!(ConfigLoader::validate(&config).is_ok());
        assert_eq!(config.manager.num_stages, 1);
        assert!(config.manager.block_on_rebuild);
        assert_eq!(config.manager.history, 10);
    }

    #[test]
    fn zero_stages_is_rejected() {
        let config = Config {
            manager: crate::domain::models::config::ManagerSettings {
                num_stages: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidNumStages(0))
        ));
    }

    #[test]
    fn bad_log_level_is_rejected() {
        let config = Config {
            logging: crate::domain::models::config::LoggingSettings {
                level: "loud".to_string(),
            },
            ..Default::default()
        };
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogLevel(_))
        ));
    }

    #[test]
    fn yaml_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "manager:\n  num_stages: 3\n  block_on_rebuild: false\n",
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.manager.num_stages, 3);
        assert!(!config.manager.block_on_rebuild);
        // Untouched sections keep their defaults.
        assert_eq!(config.manager.history, 10);
    }
}
