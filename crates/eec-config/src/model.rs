use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default interval between abort polls in seconds
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Default retention of records that failed before or during provisioning
pub const DEFAULT_FAILED_RECORD_TTL_SECS: u64 = 90;

/// Default time a STOPPED record stays queryable before removal
pub const DEFAULT_STOPPED_RETENTION_SECS: u64 = 30;

/// Node template whose properties describe the infrastructure to provision
pub const DEFAULT_MASTER_NODE_TEMPLATE: &str = "micado-master";

/// Node spec used when the topology does not declare the master node template
pub const DEFAULT_NODE_SPEC_PATH: &str = "/etc/eec/master_spec.yaml";

/// Environment variable overriding the default node spec path
pub const NODE_SPEC_ENV_VAR: &str = "EEC_MASTER_SPEC";

/// Durable record store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// One directory per record, one file per field (default)
    #[default]
    File,
    /// Process-local; records do not survive a restart
    Memory,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// `[lifecycle]` section as written in config.toml
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LifecycleSection {
    pub poll_interval_secs: Option<u64>,
    pub failed_record_ttl_secs: Option<u64>,
    pub stopped_retention_secs: Option<u64>,
}

/// `[store]` section as written in config.toml
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    pub backend: Option<StoreBackend>,
    pub path: Option<Utf8PathBuf>,
}

/// `[infrastructure]` section as written in config.toml
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct InfrastructureSection {
    pub master_node_template: Option<String>,
    pub default_node_spec: Option<Utf8PathBuf>,
}

/// Timing of the lifecycle worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleConfig {
    pub poll_interval: Duration,
    pub failed_record_ttl: Duration,
    pub stopped_retention: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            failed_record_ttl: Duration::from_secs(DEFAULT_FAILED_RECORD_TTL_SECS),
            stopped_retention: Duration::from_secs(DEFAULT_STOPPED_RETENTION_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub path: Utf8PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: eec_utils::paths::records_dir(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfrastructureConfig {
    pub master_node_template: String,
    pub default_node_spec: Utf8PathBuf,
}

impl Default for InfrastructureConfig {
    fn default() -> Self {
        Self {
            master_node_template: DEFAULT_MASTER_NODE_TEMPLATE.to_string(),
            default_node_spec: Utf8PathBuf::from(DEFAULT_NODE_SPEC_PATH),
        }
    }
}

/// Overrides supplied on the command line. These win over the config file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub poll_interval_secs: Option<u64>,
    pub store_backend: Option<StoreBackend>,
    pub store_path: Option<Utf8PathBuf>,
}

/// Configuration for eec operations.
///
/// Precedence: CLI overrides > config file > built-in defaults. The node spec
/// path additionally honours `EEC_MASTER_SPEC` over the file value.
///
/// ```rust,no_run
/// use eec_config::{CliOverrides, Config};
///
/// let config = Config::discover(&CliOverrides::default())?;
/// println!("poll every {:?}", config.lifecycle.poll_interval);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub lifecycle: LifecycleConfig,
    pub store: StoreConfig,
    pub infrastructure: InfrastructureConfig,
    /// Config file the values were loaded from, if any
    pub source: Option<PathBuf>,
}
