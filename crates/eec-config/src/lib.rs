//! Configuration for eec.
//!
//! Values come from, in decreasing precedence: command-line overrides, a TOML
//! file (`.eec/config.toml` found upward from the working directory, else
//! `$EEC_HOME/config.toml`, or an explicit `--config`), and built-in defaults.
//!
//! ```toml
//! [lifecycle]
//! poll_interval_secs = 30
//! failed_record_ttl_secs = 90
//! stopped_retention_secs = 30
//!
//! [store]
//! backend = "file"
//!
//! [infrastructure]
//! master_node_template = "micado-master"
//! default_node_spec = "/etc/eec/master_spec.yaml"
//! ```

mod discovery;
mod model;
mod validation;

pub use model::{
    CliOverrides, Config, DEFAULT_FAILED_RECORD_TTL_SECS, DEFAULT_MASTER_NODE_TEMPLATE,
    DEFAULT_NODE_SPEC_PATH, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_STOPPED_RETENTION_SECS,
    InfrastructureConfig, LifecycleConfig, NODE_SPEC_ENV_VAR, StoreBackend, StoreConfig,
};

#[cfg(test)]
mod tests {
    use super::*;
    use eec_utils::error::ConfigError;
    use serial_test::serial;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, body: &str) -> std::path::PathBuf {
        let eec_dir = dir.path().join(".eec");
        fs::create_dir_all(&eec_dir).unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        let path = eec_dir.join("config.toml");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    #[serial]
    fn test_defaults_without_file() {
        let _home = eec_utils::paths::with_isolated_home();
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join(".git")).unwrap();

        let config = Config::discover_from(temp.path(), &CliOverrides::default()).unwrap();
        assert_eq!(config.lifecycle.poll_interval, Duration::from_secs(30));
        assert_eq!(config.lifecycle.failed_record_ttl, Duration::from_secs(90));
        assert_eq!(config.store.backend, StoreBackend::File);
        assert_eq!(config.infrastructure.master_node_template, "micado-master");
        assert!(config.source.is_none());
    }

    #[test]
    #[serial]
    fn test_file_values_are_applied() {
        let _home = eec_utils::paths::with_isolated_home();
        let temp = TempDir::new().unwrap();
        let path = write_config(
            &temp,
            r#"
[lifecycle]
poll_interval_secs = 5
stopped_retention_secs = 0

[store]
backend = "memory"

[infrastructure]
master_node_template = "edge-master"
"#,
        );

        let config = Config::discover_from(temp.path(), &CliOverrides::default()).unwrap();
        assert_eq!(config.lifecycle.poll_interval, Duration::from_secs(5));
        assert!(config.lifecycle.stopped_retention.is_zero());
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.infrastructure.master_node_template, "edge-master");
        assert_eq!(config.source.as_deref(), Some(path.as_path()));
    }

    #[test]
    #[serial]
    fn test_cli_overrides_win_over_file() {
        let _home = eec_utils::paths::with_isolated_home();
        let temp = TempDir::new().unwrap();
        write_config(&temp, "[lifecycle]\npoll_interval_secs = 5\n");

        let cli = CliOverrides {
            poll_interval_secs: Some(7),
            store_backend: Some(StoreBackend::Memory),
            ..CliOverrides::default()
        };
        let config = Config::discover_from(temp.path(), &cli).unwrap();
        assert_eq!(config.lifecycle.poll_interval, Duration::from_secs(7));
        assert_eq!(config.store.backend, StoreBackend::Memory);
    }

    #[test]
    #[serial]
    fn test_out_of_range_poll_interval_rejected() {
        let _home = eec_utils::paths::with_isolated_home();
        let temp = TempDir::new().unwrap();
        write_config(&temp, "[lifecycle]\npoll_interval_secs = 0\n");

        let err = Config::discover_from(temp.path(), &CliOverrides::default()).unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "poll_interval_secs")
        );
    }

    #[test]
    #[serial]
    fn test_unknown_backend_rejected() {
        let _home = eec_utils::paths::with_isolated_home();
        let temp = TempDir::new().unwrap();
        write_config(&temp, "[store]\nbackend = \"redis\"\n");

        let err = Config::discover_from(temp.path(), &CliOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFile(_)));
    }

    #[test]
    #[serial]
    fn test_unknown_section_rejected() {
        let _home = eec_utils::paths::with_isolated_home();
        let temp = TempDir::new().unwrap();
        write_config(&temp, "[runner]\nmode = \"auto\"\n");

        let err = Config::discover_from(temp.path(), &CliOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFile(_)));
    }

    #[test]
    #[serial]
    fn test_explicit_missing_config_is_not_found() {
        let temp = TempDir::new().unwrap();
        let cli = CliOverrides {
            config_path: Some(temp.path().join("absent.toml")),
            ..CliOverrides::default()
        };
        let err = Config::discover_from(temp.path(), &cli).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    #[serial]
    fn test_home_config_used_as_fallback() {
        let home = eec_utils::paths::with_isolated_home();
        fs::write(
            home.path().join("config.toml"),
            "[lifecycle]\nfailed_record_ttl_secs = 120\n",
        )
        .unwrap();
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join(".git")).unwrap();

        let config = Config::discover_from(temp.path(), &CliOverrides::default()).unwrap();
        assert_eq!(config.lifecycle.failed_record_ttl, Duration::from_secs(120));
        assert_eq!(config.store.path, home.utf8_path().join("records"));
    }

    #[test]
    #[serial]
    fn test_node_spec_env_overrides_file() {
        let _home = eec_utils::paths::with_isolated_home();
        let temp = TempDir::new().unwrap();
        write_config(
            &temp,
            "[infrastructure]\ndefault_node_spec = \"/from/file.yaml\"\n",
        );

        // SAFETY: serialized test; no other thread reads the environment.
        unsafe { std::env::set_var(NODE_SPEC_ENV_VAR, "/from/env.yaml") };
        let result = Config::discover_from(temp.path(), &CliOverrides::default());
        unsafe { std::env::remove_var(NODE_SPEC_ENV_VAR) };

        let config = result.unwrap();
        assert_eq!(config.infrastructure.default_node_spec, "/from/env.yaml");
    }
}
