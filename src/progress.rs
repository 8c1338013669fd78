//! Observer trait for step-execution events.
//!
//! Inject an [`Arc<dyn ExecutionObserver>`] via
//! [`crate::config::WizardConfigBuilder::observer`] to be told about every
//! change the engine makes to an execution record, in the order it makes
//! them. Each call happens right after the store was updated, so a snapshot
//! taken inside a callback already contains the change.
//!
//! # Example
//!
//! ```rust
//! use effilayouter::{ExecutionObserver, WizardConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct LineCounter {
//!     lines: AtomicUsize,
//! }
//!
//! impl ExecutionObserver for LineCounter {
//!     fn on_log(&self, step: u32, line: &str) {
//!         self.lines.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("[step {step}] {line}");
//!     }
//! }
//!
//! let config = WizardConfig::builder()
//!     .observer(Arc::new(LineCounter { lines: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::registry::StepId;
use std::sync::Arc;

/// Called by the execution engine as a step runs.
///
/// All methods default to no-ops. Implementations must be `Send + Sync`
/// because the engine may run on any runtime worker.
pub trait ExecutionObserver: Send + Sync {
    /// A fresh `running` record was created for `step`.
    ///
    /// `first_line` is the record's initial log line; it is not repeated
    /// through [`ExecutionObserver::on_log`].
    fn on_execution_start(&self, step: StepId, first_line: &str) {
        let _ = (step, first_line);
    }

    /// A line was appended to `step`'s log.
    fn on_log(&self, step: StepId, line: &str) {
        let _ = (step, line);
    }

    /// `step` finished successfully with the service's `message`.
    fn on_execution_success(&self, step: StepId, message: &str) {
        let _ = (step, message);
    }

    /// `step` failed; `error` is the message stored in its record.
    fn on_execution_error(&self, step: StepId, error: &str) {
        let _ = (step, error);
    }
}

/// A no-op observer, used when none is configured.
pub struct NoopObserver;

impl ExecutionObserver for NoopObserver {}

/// Convenience alias matching the type stored in [`crate::config::WizardConfig`].
pub type SharedObserver = Arc<dyn ExecutionObserver>;
