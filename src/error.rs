//! Error types for the effilayouter library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`WizardError`] — the request was **refused** before anything was
//!   dispatched (incomplete inputs, a step already running, a locked step)
//!   or it names a step that does not exist. Returned as `Err` and leaves the
//!   pipeline state untouched.
//!
//! * [`OperationError`] — the step **ran** and the processing service (or the
//!   transport to it) failed. Never returned as `Err` from execution; it is
//!   recorded as the step's `error` and the step can simply be re-executed.

use crate::language::Language;
use crate::registry::StepId;
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned synchronously by wizard operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    // ── Programming errors ────────────────────────────────────────────────
    /// The id is not in the step catalog.
    #[error("Unknown step: {step}")]
    UnknownStep { step: StepId },

    // ── Precondition violations ───────────────────────────────────────────
    /// One or more resolved inputs have no usable value.
    #[error("Step {step} cannot run: missing input(s) {}", missing.join(", "))]
    IncompleteInputs {
        step: StepId,
        missing: Vec<&'static str>,
    },

    /// Another step of this session is still executing.
    #[error("Step {running} is still running; wait for it to finish")]
    AlreadyRunning { running: StepId },

    /// The step's prerequisite has not succeeded, or it is hidden for the
    /// active language.
    #[error("Step {step} is not available yet: complete the previous step first")]
    NotEnterable { step: StepId },

    /// The current step must succeed before moving forward.
    #[error("Step {step} must complete successfully before continuing")]
    CannotAdvance { step: StepId },

    /// A form edit was rejected by the input's constraints.
    #[error("Invalid value for '{input}' on step {step}: {reason}")]
    InvalidInput {
        step: StepId,
        input: String,
        reason: String,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WizardError {
    /// A caller-contract rejection: non-fatal, nothing was mutated.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            WizardError::IncompleteInputs { .. }
                | WizardError::AlreadyRunning { .. }
                | WizardError::NotEnterable { .. }
                | WizardError::CannotAdvance { .. }
                | WizardError::InvalidInput { .. }
        )
    }

    /// A bug in the caller; never reachable through normal navigation.
    pub fn is_programming_error(&self) -> bool {
        matches!(self, WizardError::UnknownStep { .. })
    }
}

/// An operational failure of one step execution.
///
/// Its `Display` text is what ends up in the execution record.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum OperationError {
    /// The service answered `ok: false` or a non-2xx status.
    #[error("{message}")]
    Rejected { message: String },

    /// The request never completed (connection, timeout, undecodable body).
    #[error("{message}")]
    Transport { message: String },

    /// A bound local file could not be read for upload.
    #[error("Cannot read '{path}': {reason}")]
    File { path: PathBuf, reason: String },

    /// The step has no operation for the active language.
    #[error("Step {step} has no operation for the {language} pipeline")]
    NotApplicable { step: StepId, language: Language },
}

impl OperationError {
    pub fn rejected(message: impl Into<String>) -> Self {
        OperationError::Rejected {
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        OperationError::Transport {
            message: message.into(),
        }
    }
}
