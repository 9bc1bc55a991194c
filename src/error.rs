//! Structured error handling and exit codes.

use serde::Serialize;

use crate::monitor::{LockError, MonitorError};

/// Exit codes for the DupeGuard application.
///
/// - 0: Success
/// - 1: General error (unexpected failure)
/// - 2: Another monitor holds the single-instance lock
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: the command completed.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// Lock held: another monitor instance is running.
    LockHeld = 2,
    /// Interrupted: stopped by user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "DG000",
            Self::GeneralError => "DG001",
            Self::LockHeld => "DG002",
            Self::Interrupted => "DG130",
        }
    }

    /// Pick the exit code for an error that reached the process boundary.
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        let lock_held = err.chain().any(|cause| {
            matches!(
                cause.downcast_ref::<LockError>(),
                Some(LockError::Held { .. })
            ) || matches!(
                cause.downcast_ref::<MonitorError>(),
                Some(MonitorError::Lock(LockError::Held { .. }))
            )
        });
        if lock_held {
            Self::LockHeld
        } else {
            Self::GeneralError
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "DG001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
