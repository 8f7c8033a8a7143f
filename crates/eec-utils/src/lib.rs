//! Foundation utilities shared by the eec crates.
//!
//! - [`error`]: error taxonomy and user-facing reporting
//! - [`exit_codes`]: CLI exit code table
//! - [`logging`]: tracing initialisation and structured step logging
//! - [`paths`]: home directory resolution
//! - [`atomic_write`]: crash-safe file replacement

pub mod atomic_write;
pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod paths;

pub use error::{
    ArtefactError, ConfigError, EecError, ErrorCategory, OrchestrationError, StoreError,
    UserFriendlyError,
};
pub use exit_codes::ExitCode;
