use std::time::Duration;

use eec_utils::error::ConfigError;

use crate::model::Config;

const MAX_POLL_INTERVAL: Duration = Duration::from_secs(3600);

impl Config {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let poll = self.lifecycle.poll_interval;
        if poll.is_zero() || poll > MAX_POLL_INTERVAL {
            return Err(ConfigError::InvalidValue {
                key: "poll_interval_secs".to_string(),
                value: format!("{} (must be between 1 and 3600)", poll.as_secs()),
            });
        }

        if self.lifecycle.failed_record_ttl.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "failed_record_ttl_secs".to_string(),
                value: "0 (must be greater than 0)".to_string(),
            });
        }

        if self.infrastructure.master_node_template.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "master_node_template".to_string(),
                value: "empty (must name a node template)".to_string(),
            });
        }

        if self.store.path.as_str().trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "path".to_string(),
                value: "empty (must be a directory)".to_string(),
            });
        }

        Ok(())
    }
}
