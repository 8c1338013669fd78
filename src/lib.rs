//! # effilayouter
//!
//! Step orchestration for the EffiLayouter PDF translation wizard.
//!
//! ## Why this crate?
//!
//! Translating a laid-out PDF is a chain of slow remote operations (text
//! removal, extraction, translation, reconstruction) where each one consumes
//! the previous one's artifact, and some only exist for one language. This
//! crate owns the part that is easy to get subtly wrong: which step may run
//! when, which operation a step means for the chosen language, and what each
//! step's execution record looks like while a request is in flight. The PDF
//! work itself stays behind a [`ProcessingService`].
//!
//! ## Pipeline Overview
//!
//! ```text
//!  1 Upload PDF            upload
//!  2 Choose Language       (local)
//!  3 Remove Text           removeText
//!  4 Extract Data          extractCharacters (en) │ extractLines (ar)
//!  5 Translate             translateArabic  (ar only)
//!  6 Reconstruct PDF       reconstructEnglish (en, after 4) │ reconstructArabic (ar, after 5)
//!  7 Create Visualization  visualizeLines
//!  8 Side-by-Side          (local)
//! ```
//!
//! Every step waits on the success of the one before it; step 6 is the only
//! fork.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use effilayouter::{FileHandle, Language, Wizard, WizardConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let wizard = Wizard::new(WizardConfig::from_env())?;
//!     wizard.set_input(1, "file", FileHandle::open("contract.pdf")?)?;
//!     wizard.select_language(Language::Arabic);
//!
//!     for entry in wizard.stepper() {
//!         let outcome = wizard.execute(entry.step).await?;
//!         if !outcome.is_success() {
//!             eprintln!("step {} failed", outcome.step());
//!             break;
//!         }
//!     }
//!     println!("{}", wizard.download_url(&wizard.final_document()));
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `layouter` binary and its CLI dependencies |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! effilayouter = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod engine;
pub mod error;
pub mod gating;
pub mod language;
pub mod model;
pub mod progress;
pub mod registry;
pub mod service;
pub mod state;
pub mod stepper;
pub mod stream;
pub mod wizard;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{WizardConfig, WizardConfigBuilder};
pub use engine::{ExecutionEngine, ExecutionOutcome};
pub use error::{OperationError, WizardError};
pub use language::{Language, PerLanguage};
pub use model::{ExecutionRecord, ExecutionStatus, FileHandle, FormDataRecord, FormValue};
pub use progress::{ExecutionObserver, NoopObserver, SharedObserver};
pub use registry::{ActionId, StepDefinition, StepId};
pub use service::{FileInfo, HttpService, Operation, ProcessingService, ServiceResponse};
pub use state::{PipelineEvent, PipelineState, StateStore};
pub use stepper::{ProgressOverview, StepperEntry};
pub use stream::{EventStream, ExecutionEvent};
pub use wizard::Wizard;
