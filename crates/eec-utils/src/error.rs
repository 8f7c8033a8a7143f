use std::fmt;
use thiserror::Error;

/// Library-level error type with rich context and user-friendly reporting.
///
/// `EecError` is the primary error type returned by eec library operations.
/// It provides:
/// - Detailed error information for programmatic handling
/// - User-friendly messages with context and suggestions
/// - Mapping to CLI exit codes and to the request layer's 400/404 classes
///
/// # Error Categories
///
/// | Category | Description |
/// |----------|-------------|
/// | `Config` | Configuration file or CLI argument errors |
/// | `Artefact` | Malformed submission input (user-caused, no side effects) |
/// | `Orchestration` | Provisioning, deployment, attach or teardown failures |
/// | `Store` | Durable record store failures |
/// | `SubmissionNotFound` | Unknown submission ID |
/// | `WorkerActive` | A worker already drives the submission |
/// | `ServeLockHeld` | Another supervisor process serves the same store |
///
/// # Exit Code Mapping
///
/// Use [`to_exit_code()`](Self::to_exit_code) to map errors to CLI exit codes:
///
/// | Exit Code | Error Type |
/// |-----------|------------|
/// | 2 | Configuration/CLI argument errors |
/// | 3 | Malformed artefact or inputs |
/// | 4 | Submission not found |
/// | 9 | Serve lock held / worker already active |
/// | 70 | Orchestration failure |
/// | 75 | Teardown failure (resource may be leaked) |
/// | 1 | Other errors |
#[derive(Error, Debug)]
pub enum EecError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Malformed artefact: {0}")]
    Artefact(#[from] ArtefactError),

    #[error("Orchestration error: {0}")]
    Orchestration(#[from] OrchestrationError),

    #[error("Record store error: {0}")]
    Store(#[from] StoreError),

    #[error("Submission {id} not found")]
    SubmissionNotFound { id: String },

    #[error("Submission {id} is already driven by an active worker")]
    WorkerActive { id: String },

    #[error("Record store at {path} is already served by process {pid}")]
    ServeLockHeld { pid: u32, path: String },

    #[error("Reconciliation already ran for this supervisor")]
    AlreadyReconciled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Provisioning,
    Deployment,
    Teardown,
    Storage,
    Concurrency,
    NotFound,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::Input => write!(f, "Input"),
            Self::Provisioning => write!(f, "Provisioning"),
            Self::Deployment => write!(f, "Deployment"),
            Self::Teardown => write!(f, "Teardown"),
            Self::Storage => write!(f, "Storage"),
            Self::Concurrency => write!(f, "Concurrency"),
            Self::NotFound => write!(f, "Not Found"),
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },

    #[error("Configuration discovery failed: {reason}")]
    DiscoveryFailed { reason: String },
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(reason) => {
                format!("Configuration file has invalid format: {reason}")
            }
            Self::InvalidValue { key, value } => {
                format!("Configuration '{key}' has invalid value: {value}")
            }
            Self::NotFound { path } => format!("Configuration file not found: {path}"),
            Self::DiscoveryFailed { reason } => {
                format!("Failed to discover configuration: {reason}")
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::InvalidFile(_) => Some(
                "Configuration files must be valid TOML with [lifecycle], [store] and [infrastructure] sections."
                    .to_string(),
            ),
            Self::InvalidValue { key, .. } => Some(format!(
                "The '{key}' configuration option has specific range requirements."
            )),
            Self::NotFound { .. } | Self::DiscoveryFailed { .. } => Some(
                "eec searches for .eec/config.toml upward from the current directory, then $EEC_HOME/config.toml."
                    .to_string(),
            ),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => vec![
                "Check the TOML syntax of the configuration file".to_string(),
                "Remove unknown sections or keys".to_string(),
            ],
            Self::InvalidValue { key, .. } => match key.as_str() {
                "poll_interval_secs" => {
                    vec!["Use a value between 1 and 3600 seconds".to_string()]
                }
                "failed_record_ttl_secs" => {
                    vec!["Use a positive number of seconds (default 90)".to_string()]
                }
                "backend" => vec!["Use 'file' or 'memory' as the store backend".to_string()],
                _ => vec![
                    "Remove the option to use the built-in default".to_string(),
                ],
            },
            Self::NotFound { .. } => vec![
                "Pass --config with an existing file".to_string(),
                "Omit --config to use discovery and built-in defaults".to_string(),
            ],
            Self::DiscoveryFailed { .. } => vec![
                "Check read permissions on the current directory and its parents".to_string(),
                "Use --config <path> to specify the configuration file explicitly".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

/// Malformed submission input. Raised before any infrastructure exists, so it
/// never has side effects to clean up.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArtefactError {
    #[error("missing required field '{field}'")]
    MissingField { field: String },

    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error("cannot decode artefact content: {reason}")]
    Decode { reason: String },

    #[error("node provisioning spec unavailable at {path}: {reason}")]
    NodeSpecUnavailable { path: String, reason: String },
}

impl ArtefactError {
    /// Dotted path of the offending field, when the error names one.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MissingField { field } | Self::InvalidField { field, .. } => Some(field),
            Self::Decode { .. } | Self::NodeSpecUnavailable { .. } => None,
        }
    }
}

impl UserFriendlyError for ArtefactError {
    fn user_message(&self) -> String {
        match self {
            Self::MissingField { field } => {
                format!("The artefact is missing the required '{field}' section")
            }
            Self::InvalidField { field, reason } => {
                format!("The artefact field '{field}' is invalid: {reason}")
            }
            Self::Decode { reason } => format!("The artefact could not be decoded: {reason}"),
            Self::NodeSpecUnavailable { path, reason } => {
                format!("No node provisioning spec could be loaded from {path}: {reason}")
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Decode { .. } => Some(
                "Artefact content must be base64-encoded YAML, or a .csar bundle reference."
                    .to_string(),
            ),
            Self::NodeSpecUnavailable { .. } => Some(
                "When the topology declares no master node template, the default node spec file is used."
                    .to_string(),
            ),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::MissingField { field } => {
                vec![format!("Add the '{field}' section to the topology")]
            }
            Self::InvalidField { .. } => {
                vec!["Compare the topology with a known-good ADT".to_string()]
            }
            Self::Decode { .. } => vec![
                "Base64-encode the ADT YAML into 'downloadUrl_content'".to_string(),
            ],
            Self::NodeSpecUnavailable { .. } => vec![
                "Declare the master node template in the topology".to_string(),
                "Set [infrastructure] default_node_spec or EEC_MASTER_SPEC".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Input
    }
}

/// Failures reported by the orchestration client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrchestrationError {
    #[error("infrastructure creation failed: {0}")]
    Provisioning(String),

    #[error("application deployment failed: {0}")]
    Deployment(String),

    #[error("infrastructure teardown failed: {0}")]
    Teardown(String),

    #[error("infrastructure {infra_id} is unknown")]
    InfrastructureNotFound { infra_id: String },

    #[error("attach to infrastructure failed: {0}")]
    Attach(String),

    #[error("orchestrator transport failure: {0}")]
    Transport(String),
}

impl OrchestrationError {
    /// True when the client reports that an infrastructure identifier does not exist.
    #[must_use]
    pub fn is_unknown_infrastructure(&self) -> bool {
        matches!(self, Self::InfrastructureNotFound { .. })
    }
}

impl UserFriendlyError for OrchestrationError {
    fn user_message(&self) -> String {
        self.to_string()
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Teardown(_) => Some(
                "The infrastructure could not be destroyed and may still be consuming resources."
                    .to_string(),
            ),
            Self::InfrastructureNotFound { .. } => Some(
                "The infrastructure was removed outside of eec; its record cannot be trusted."
                    .to_string(),
            ),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Provisioning(_) => vec![
                "Check cloud quota and credentials for the node spec".to_string(),
            ],
            Self::Deployment(_) => vec![
                "Check the topology against the orchestrator's supported node types".to_string(),
            ],
            Self::Teardown(_) => vec![
                "Remove the infrastructure manually in the cloud console".to_string(),
                "Restart the supervisor to retry teardown of aborted submissions".to_string(),
            ],
            Self::InfrastructureNotFound { .. } => Vec::new(),
            Self::Attach(_) | Self::Transport(_) => vec![
                "Check that the orchestrator endpoint is reachable".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Provisioning(_) => ErrorCategory::Provisioning,
            Self::Deployment(_) | Self::Attach(_) | Self::Transport(_) => {
                ErrorCategory::Deployment
            }
            Self::Teardown(_) => ErrorCategory::Teardown,
            Self::InfrastructureNotFound { .. } => ErrorCategory::NotFound,
        }
    }
}

/// Durable record store failures.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Record {id} has a corrupt '{field}' field: {reason}")]
    Corrupt {
        id: String,
        field: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl UserFriendlyError for StoreError {
    fn user_message(&self) -> String {
        self.to_string()
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Corrupt { .. } => {
                Some("The record store contains data this version cannot read.".to_string())
            }
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Connection(_) => vec!["Check the [store] section of the configuration".to_string()],
            Self::Corrupt { id, .. } => vec![format!("Inspect or remove record {id}")],
            Self::Backend(_) | Self::Io(_) => {
                vec!["Check permissions and free space on the store path".to_string()]
            }
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Storage
    }
}

impl UserFriendlyError for EecError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(e) => e.user_message(),
            Self::Artefact(e) => e.user_message(),
            Self::Orchestration(e) => e.user_message(),
            Self::Store(e) => e.user_message(),
            Self::SubmissionNotFound { id } => format!("No submission with id '{id}' exists"),
            Self::WorkerActive { id } => {
                format!("Submission '{id}' is already being processed")
            }
            Self::ServeLockHeld { pid, path } => {
                format!("Another supervisor (PID {pid}) is serving {path}")
            }
            Self::AlreadyReconciled => {
                "Reconciliation may only run once, at supervisor startup".to_string()
            }
            Self::Io(e) => format!("File system operation failed: {e}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Config(e) => e.context(),
            Self::Artefact(e) => e.context(),
            Self::Orchestration(e) => e.context(),
            Self::Store(e) => e.context(),
            Self::SubmissionNotFound { .. } => Some(
                "Records are removed after teardown completes or when their retention expires."
                    .to_string(),
            ),
            Self::ServeLockHeld { .. } => Some(
                "Only one supervisor may reconcile and drive the records of a store.".to_string(),
            ),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(e) => e.suggestions(),
            Self::Artefact(e) => e.suggestions(),
            Self::Orchestration(e) => e.suggestions(),
            Self::Store(e) => e.suggestions(),
            Self::SubmissionNotFound { .. } => {
                vec!["List known submissions with 'eec list'".to_string()]
            }
            Self::WorkerActive { .. } => {
                vec!["Wait for the current worker to finish, or abort it".to_string()]
            }
            Self::ServeLockHeld { .. } => vec![
                "Stop the other supervisor first".to_string(),
                "Use --force if that process crashed and left a stale lock".to_string(),
            ],
            Self::AlreadyReconciled => Vec::new(),
            Self::Io(_) => vec!["Check permissions on the eec home directory".to_string()],
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::Configuration,
            Self::Artefact(_) => ErrorCategory::Input,
            Self::Orchestration(e) => e.category(),
            Self::Store(_) | Self::Io(_) => ErrorCategory::Storage,
            Self::SubmissionNotFound { .. } => ErrorCategory::NotFound,
            Self::WorkerActive { .. } | Self::ServeLockHeld { .. } | Self::AlreadyReconciled => {
                ErrorCategory::Concurrency
            }
        }
    }
}

impl EecError {
    /// Get a user-friendly error message with context and actionable suggestions.
    ///
    /// ```text
    /// Error: <user message>
    ///
    /// Context: <context if available>
    ///
    /// Suggestions:
    ///   • <suggestion 1>
    /// ```
    #[must_use]
    pub fn display_for_user(&self) -> String {
        let mut output = format!("Error: {}\n", self.user_message());

        if let Some(ctx) = self.context() {
            output.push_str(&format!("\nContext: {ctx}\n"));
        }

        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for suggestion in suggestions {
                output.push_str(&format!("  • {suggestion}\n"));
            }
        }

        output
    }

    /// The request layer answers these with a not-found (404-equivalent) response.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SubmissionNotFound { .. })
    }

    /// The request layer answers these with a bad-request (400-equivalent) response.
    #[must_use]
    pub fn is_malformed_input(&self) -> bool {
        matches!(self, Self::Artefact(_))
    }

    /// True for the one failure class that may leave cloud resources behind.
    #[must_use]
    pub fn is_teardown_failure(&self) -> bool {
        matches!(self, Self::Orchestration(OrchestrationError::Teardown(_)))
    }

    /// Map this error to the appropriate CLI exit code.
    #[must_use]
    pub fn to_exit_code(&self) -> crate::exit_codes::ExitCode {
        use crate::exit_codes::ExitCode;

        match self {
            Self::Config(_) => ExitCode::CLI_ARGS,
            Self::Artefact(_) => ExitCode::MALFORMED_INPUT,
            Self::SubmissionNotFound { .. } => ExitCode::NOT_FOUND,
            Self::WorkerActive { .. } | Self::ServeLockHeld { .. } => ExitCode::LOCK_HELD,
            Self::Orchestration(OrchestrationError::Teardown(_)) => ExitCode::TEARDOWN_FAILURE,
            Self::Orchestration(_) => ExitCode::ORCHESTRATION_FAILURE,
            Self::Store(_) | Self::Io(_) | Self::AlreadyReconciled => ExitCode::INTERNAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes::ExitCode;

    #[test]
    fn test_not_found_classification() {
        let err = EecError::SubmissionNotFound {
            id: "abc".to_string(),
        };
        assert!(err.is_not_found());
        assert!(!err.is_malformed_input());
        assert_eq!(err.to_exit_code(), ExitCode::NOT_FOUND);
        assert_eq!(err.category(), ErrorCategory::NotFound);
    }

    #[test]
    fn test_malformed_artefact_names_field() {
        let err = EecError::from(ArtefactError::MissingField {
            field: "topology_template".to_string(),
        });
        assert!(err.is_malformed_input());
        assert_eq!(err.to_exit_code(), ExitCode::MALFORMED_INPUT);
        assert!(err.to_string().contains("topology_template"));

        let message = err.display_for_user();
        assert!(message.contains("Suggestions:"));
        assert!(message.contains("topology_template"));
    }

    #[test]
    fn test_teardown_failure_has_distinct_exit_code() {
        let teardown = EecError::from(OrchestrationError::Teardown("quota api down".into()));
        let deploy = EecError::from(OrchestrationError::Deployment("bad image".into()));

        assert!(teardown.is_teardown_failure());
        assert!(!deploy.is_teardown_failure());
        assert_eq!(teardown.to_exit_code(), ExitCode::TEARDOWN_FAILURE);
        assert_eq!(deploy.to_exit_code(), ExitCode::ORCHESTRATION_FAILURE);
        assert_eq!(teardown.category(), ErrorCategory::Teardown);
    }

    #[test]
    fn test_unknown_infrastructure_detection() {
        let err = OrchestrationError::InfrastructureNotFound {
            infra_id: "infra-1".to_string(),
        };
        assert!(err.is_unknown_infrastructure());
        assert!(!OrchestrationError::Attach("timeout".into()).is_unknown_infrastructure());
    }

    #[test]
    fn test_artefact_error_field_accessor() {
        let missing = ArtefactError::MissingField {
            field: "imports".to_string(),
        };
        let decode = ArtefactError::Decode {
            reason: "not base64".to_string(),
        };
        assert_eq!(missing.field(), Some("imports"));
        assert_eq!(decode.field(), None);
    }
}
