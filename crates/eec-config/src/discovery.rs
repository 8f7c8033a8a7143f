use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use eec_utils::error::ConfigError;

use crate::model::{
    CliOverrides, Config, InfrastructureConfig, InfrastructureSection, LifecycleConfig,
    LifecycleSection, NODE_SPEC_ENV_VAR, StoreConfig, StoreSection,
};

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    lifecycle: Option<LifecycleSection>,
    store: Option<StoreSection>,
    infrastructure: Option<InfrastructureSection>,
}

impl Config {
    /// Discover and load configuration with precedence: CLI > file > defaults
    ///
    /// Uses the current working directory for config file discovery when no
    /// explicit path is provided in `cli`.
    pub fn discover(cli: &CliOverrides) -> Result<Self, ConfigError> {
        let start_dir = std::env::current_dir().map_err(|e| ConfigError::DiscoveryFailed {
            reason: format!("cannot read current directory: {e}"),
        })?;
        Self::discover_from(&start_dir, cli)
    }

    /// Path-driven variant of [`Config::discover`] used by tests.
    pub fn discover_from(start_dir: &Path, cli: &CliOverrides) -> Result<Self, ConfigError> {
        let config_path = match &cli.config_path {
            Some(explicit) => {
                if !explicit.exists() {
                    return Err(ConfigError::NotFound {
                        path: explicit.display().to_string(),
                    });
                }
                Some(explicit.clone())
            }
            None => Self::discover_config_file_from(start_dir),
        };

        let file_config = match &config_path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading configuration file");
                Self::load_config_file(path)?
            }
            None => TomlConfig::default(),
        };

        let mut config = Self::from_file_config(file_config);
        config.source = config_path;

        // Environment beats the file for the node spec path only.
        if let Ok(spec) = std::env::var(NODE_SPEC_ENV_VAR)
            && !spec.trim().is_empty()
        {
            config.infrastructure.default_node_spec = spec.into();
        }

        // CLI overrides beat everything else.
        if let Some(secs) = cli.poll_interval_secs {
            config.lifecycle.poll_interval = Duration::from_secs(secs);
        }
        if let Some(backend) = cli.store_backend {
            config.store.backend = backend;
        }
        if let Some(path) = &cli.store_path {
            config.store.path = path.clone();
        }

        config.validate()?;
        Ok(config)
    }

    /// Walk upward from `start_dir` looking for `.eec/config.toml`, stopping at
    /// a repository root. Falls back to `$EEC_HOME/config.toml`.
    #[must_use]
    pub fn discover_config_file_from(start_dir: &Path) -> Option<PathBuf> {
        let mut current_dir = Some(start_dir);

        while let Some(dir) = current_dir {
            let candidate = dir.join(".eec").join("config.toml");
            if candidate.is_file() {
                return Some(candidate);
            }
            if dir.join(".git").exists() {
                break;
            }
            current_dir = dir.parent();
        }

        let home_config = eec_utils::paths::home_config_file();
        home_config
            .is_file()
            .then(|| home_config.into_std_path_buf())
    }

    fn load_config_file(path: &Path) -> Result<TomlConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::InvalidFile(format!("cannot read {}: {e}", path.display()))
        })?;
        toml::from_str(&content)
            .map_err(|e| ConfigError::InvalidFile(format!("{}: {e}", path.display())))
    }

    fn from_file_config(file: TomlConfig) -> Self {
        let mut lifecycle = LifecycleConfig::default();
        if let Some(section) = file.lifecycle {
            if let Some(secs) = section.poll_interval_secs {
                lifecycle.poll_interval = Duration::from_secs(secs);
            }
            if let Some(secs) = section.failed_record_ttl_secs {
                lifecycle.failed_record_ttl = Duration::from_secs(secs);
            }
            if let Some(secs) = section.stopped_retention_secs {
                lifecycle.stopped_retention = Duration::from_secs(secs);
            }
        }

        let mut store = StoreConfig::default();
        if let Some(section) = file.store {
            if let Some(backend) = section.backend {
                store.backend = backend;
            }
            if let Some(path) = section.path {
                store.path = path;
            }
        }

        let mut infrastructure = InfrastructureConfig::default();
        if let Some(section) = file.infrastructure {
            if let Some(template) = section.master_node_template {
                infrastructure.master_node_template = template;
            }
            if let Some(spec) = section.default_node_spec {
                infrastructure.default_node_spec = spec;
            }
        }

        Self {
            lifecycle,
            store,
            infrastructure,
            source: None,
        }
    }
}
