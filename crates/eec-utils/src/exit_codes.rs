//! Exit code constants for the eec CLI.
//!
//! # Exit Code Table
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Operation completed successfully |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments or configuration |
//! | 3 | `MALFORMED_INPUT` | Artefact or inputs could not be resolved |
//! | 4 | `NOT_FOUND` | Unknown submission ID |
//! | 9 | `LOCK_HELD` | Store served by another process, or worker already active |
//! | 70 | `ORCHESTRATION_FAILURE` | Provisioning, deployment or attach failed |
//! | 75 | `TEARDOWN_FAILURE` | Infrastructure could not be destroyed |

/// Exit codes matching the documented exit code table.
///
/// ```rust
/// use eec_utils::exit_codes::ExitCode;
///
/// assert_eq!(ExitCode::NOT_FOUND.as_i32(), 4);
/// assert_eq!(ExitCode::from_i32(0), ExitCode::SUCCESS);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - operation completed successfully
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Internal error - general failure
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// CLI arguments error - invalid arguments or configuration
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// Malformed artefact or submission inputs
    pub const MALFORMED_INPUT: ExitCode = ExitCode(3);

    /// Submission not found
    pub const NOT_FOUND: ExitCode = ExitCode(4);

    /// Lock held - another supervisor or worker owns the resource
    pub const LOCK_HELD: ExitCode = ExitCode(9);

    /// Orchestration client reported a failure
    pub const ORCHESTRATION_FAILURE: ExitCode = ExitCode(70);

    /// Teardown failed; cloud resources may be leaked
    pub const TEARDOWN_FAILURE: ExitCode = ExitCode(75);

    /// Create an exit code from a raw integer value.
    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }

    /// Get the numeric value for `std::process::exit()`.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Short machine-readable name for JSON error output.
    #[must_use]
    pub const fn kind(self) -> &'static str {
        match self.0 {
            0 => "success",
            2 => "cli_args",
            3 => "malformed_input",
            4 => "not_found",
            9 => "lock_held",
            70 => "orchestration_failure",
            75 => "teardown_failure",
            _ => "internal",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values_are_stable() {
        assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
        assert_eq!(ExitCode::INTERNAL.as_i32(), 1);
        assert_eq!(ExitCode::CLI_ARGS.as_i32(), 2);
        assert_eq!(ExitCode::MALFORMED_INPUT.as_i32(), 3);
        assert_eq!(ExitCode::NOT_FOUND.as_i32(), 4);
        assert_eq!(ExitCode::LOCK_HELD.as_i32(), 9);
        assert_eq!(ExitCode::ORCHESTRATION_FAILURE.as_i32(), 70);
        assert_eq!(ExitCode::TEARDOWN_FAILURE.as_i32(), 75);
    }

    #[test]
    fn test_unknown_code_kind_is_internal() {
        assert_eq!(ExitCode::from_i32(42).kind(), "internal");
        assert_eq!(ExitCode::TEARDOWN_FAILURE.kind(), "teardown_failure");
    }
}
