//! Execution Engine: run one step and drive its record through
//! `running → success | error`.
//!
//! ## Phases
//!
//! ```text
//! execute(step)
//!  ├─ 1. Guard    unknown id → Err(UnknownStep); another step running,
//!  │              locked step, incomplete inputs → Err(precondition)
//!  ├─ 2. Start    fresh record: ["Starting step execution..."]
//!  ├─ 3. Plan     resolve action for (step, language), gather parameters
//!  ├─ 4. Invoke   one call to the processing service (the only await)
//!  └─ 5. Finish   success: log message, store payload
//!                 failure: store error, log "Error: <message>"
//! ```
//!
//! The guard and the start record are applied under one store write, so two
//! concurrent `execute` calls on the same session cannot both start. Phases
//! 3–5 run on a spawned task, so a started attempt finishes even when the
//! caller stops waiting for it.

use crate::error::{OperationError, WizardError};
use crate::gating;
use crate::language::Language;
use crate::progress::SharedObserver;
use crate::registry::{
    self, ActionId, DefaultValue, StepDefinition, StepId, COMPARISON_STEP, LANGUAGE_STEP,
};
use crate::service::types::{
    ExtractCharactersRequest, ExtractLinesRequest, ReconstructArabicRequest,
    ReconstructEnglishRequest, RemoveTextRequest, TranslateArabicRequest, UploadRequest,
    VisualizeLinesRequest,
};
use crate::service::{Operation, ProcessingService, ServiceResponse};
use crate::state::{PipelineEvent, PipelineState, StateStore};
use crate::stream::{EventBus, ExecutionEvent};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// First log line of every attempt.
pub const START_LINE: &str = "Starting step execution...";

/// How an accepted execution ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Succeeded { step: StepId, message: String },
    Failed { step: StepId, error: OperationError },
}

impl ExecutionOutcome {
    pub fn step(&self) -> StepId {
        match self {
            ExecutionOutcome::Succeeded { step, .. } | ExecutionOutcome::Failed { step, .. } => {
                *step
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Succeeded { .. })
    }
}

/// Runs steps of one session against a [`ProcessingService`].
#[derive(Clone)]
pub struct ExecutionEngine {
    store: StateStore,
    service: Arc<dyn ProcessingService>,
    observer: Option<SharedObserver>,
    events: EventBus,
}

impl ExecutionEngine {
    pub fn new(store: StateStore, service: Arc<dyn ProcessingService>) -> Self {
        Self {
            store,
            service,
            observer: None,
            events: EventBus::new(256),
        }
    }

    pub fn with_observer(mut self, observer: Option<SharedObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub(crate) fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Execute `step` once.
    ///
    /// # Errors
    /// * [`WizardError::UnknownStep`] — `step` is not in the catalog.
    /// * [`WizardError::AlreadyRunning`] — another step of this session is running.
    /// * [`WizardError::NotEnterable`] — hidden for the active language or its
    ///   prerequisite has not succeeded.
    /// * [`WizardError::IncompleteInputs`] — a resolved input lacks a value.
    /// * [`WizardError::Internal`] — the attempt's task panicked; the record
    ///   is closed as failed.
    ///
    /// None of the precondition errors touch the state. Operational failures
    /// are not errors: they come back as [`ExecutionOutcome::Failed`] and are
    /// recorded.
    ///
    /// Once started, the attempt runs on its own task. Dropping the returned
    /// future does not abandon the record in `running`; the attempt still
    /// finishes and the session stays usable.
    pub async fn execute(&self, step: StepId) -> Result<ExecutionOutcome, WizardError> {
        let def = registry::find(step).ok_or(WizardError::UnknownStep { step })?;

        let snapshot = self.store.update(|state| {
            if let Some(running) = state.running_step() {
                return Err(WizardError::AlreadyRunning { running });
            }
            if !def.is_visible(state.language) || !gating::can_enter(step, state) {
                return Err(WizardError::NotEnterable { step });
            }
            let missing = gating::missing_inputs(step, state).unwrap_or_default();
            if !missing.is_empty() {
                return Err(WizardError::IncompleteInputs { step, missing });
            }
            state.apply_mut(&PipelineEvent::ExecutionStarted {
                step,
                first_line: START_LINE.to_string(),
            });
            Ok(state.clone())
        })?;

        info!("Step {} ({}) started [{}]", step, def.title, snapshot.language);
        if let Some(ref obs) = self.observer {
            obs.on_execution_start(step, START_LINE);
        }
        self.events.publish(ExecutionEvent::Started {
            step,
            first_line: START_LINE.to_string(),
        });

        let started = Instant::now();
        let engine = self.clone();
        let attempt =
            tokio::spawn(async move { engine.complete(def, snapshot, started).await });

        match attempt.await {
            Ok(outcome) => Ok(outcome),
            Err(join_error) => {
                let message = format!("Step execution aborted: {join_error}");
                self.fail(step, &message, started);
                Err(WizardError::Internal(message))
            }
        }
    }

    /// Phases 3–5, on the attempt's own task.
    async fn complete(
        &self,
        def: &'static StepDefinition,
        snapshot: PipelineState,
        started: Instant,
    ) -> ExecutionOutcome {
        let step = def.id;

        match self.run(def, &snapshot).await {
            Ok(response) => {
                let message = response.message.clone();
                self.log(step, message.clone());
                let result = match serde_json::to_value(&response) {
                    Ok(value) => value,
                    Err(e) => {
                        warn!("Step {} result could not be stored: {}", step, e);
                        serde_json::Value::Null
                    }
                };
                self.store
                    .dispatch(PipelineEvent::ExecutionSucceeded { step, result });
                info!(
                    "Step {} succeeded in {}ms: {}",
                    step,
                    started.elapsed().as_millis(),
                    message
                );
                if let Some(ref obs) = self.observer {
                    obs.on_execution_success(step, &message);
                }
                self.events.publish(ExecutionEvent::Succeeded {
                    step,
                    message: message.clone(),
                });
                ExecutionOutcome::Succeeded { step, message }
            }
            Err(error) => {
                self.fail(step, &error.to_string(), started);
                ExecutionOutcome::Failed { step, error }
            }
        }
    }

    /// Close `step`'s running record as failed with `message`.
    fn fail(&self, step: StepId, message: &str, started: Instant) {
        self.store.dispatch(PipelineEvent::ExecutionFailed {
            step,
            error: message.to_string(),
        });
        warn!(
            "Step {} failed after {}ms: {}",
            step,
            started.elapsed().as_millis(),
            message
        );
        if let Some(ref obs) = self.observer {
            obs.on_execution_error(step, message);
        }
        self.events.publish(ExecutionEvent::Failed {
            step,
            error: message.to_string(),
        });
    }

    /// Phases 3–4. Local steps answer without calling the service.
    async fn run(
        &self,
        def: &StepDefinition,
        state: &PipelineState,
    ) -> Result<ServiceResponse, OperationError> {
        let step = def.id;
        let language = state.language;

        match step {
            LANGUAGE_STEP => {
                self.log(step, format!("Language selected: {language}"));
                Ok(ServiceResponse::success(format!("Selected {language} pipeline")))
            }
            COMPARISON_STEP => {
                self.log(step, "Preparing side-by-side comparison...");
                let mut response = ServiceResponse::success("Comparison ready");
                if let Some(viewer) = &def.viewer {
                    response = response.with(
                        "viewer",
                        json!({ "left": viewer.left, "right": viewer.right_for(language) }),
                    );
                }
                Ok(response)
            }
            _ => {
                let (operation, phase_lines) = plan(def, state)?;
                for line in phase_lines {
                    self.log(step, line);
                }
                debug!("Step {} dispatching {:?}", step, operation);
                self.service.invoke(&operation).await?.into_result()
            }
        }
    }

    fn log(&self, step: StepId, line: impl Into<String>) {
        let line = line.into();
        self.store.dispatch(PipelineEvent::LogAppended {
            step,
            line: line.clone(),
        });
        if let Some(ref obs) = self.observer {
            obs.on_log(step, &line);
        }
        self.events.publish(ExecutionEvent::Log { step, line });
    }
}

// ── Operation planning ───────────────────────────────────────────────────

/// Pick the operation for `(step, language)` and fill in its parameters,
/// together with the progress lines logged before dispatch.
pub fn plan(
    def: &StepDefinition,
    state: &PipelineState,
) -> Result<(Operation, Vec<String>), OperationError> {
    let step = def.id;
    let language = state.language;
    let not_applicable = || OperationError::NotApplicable { step, language };

    if !def.is_visible(language) {
        return Err(not_applicable());
    }
    let action = registry::resolve(def, language)
        .and_then(|r| r.action)
        .ok_or_else(not_applicable)?;

    let planned = match action {
        ActionId::Upload => {
            let file = state
                .form(step)
                .and_then(|f| f.file("file"))
                .cloned()
                .ok_or_else(|| OperationError::rejected("No PDF file selected"))?;
            (
                Operation::Upload(UploadRequest {
                    file,
                    save_as: text(state, 1, "save_as"),
                }),
                vec!["Uploading PDF file...".to_string()],
            )
        }
        ActionId::RemoveText => (
            Operation::RemoveText(RemoveTextRequest {
                input_pdf: text(state, 3, "input_pdf"),
                output_pdf: text(state, 3, "output_pdf"),
            }),
            vec!["Removing text from PDF...".to_string()],
        ),
        ActionId::ExtractCharacters => (
            Operation::ExtractCharacters(ExtractCharactersRequest {
                input_pdf: uploaded_pdf(state),
                json_output: text(state, 4, "json_output"),
            }),
            vec!["Extracting character data for English...".to_string()],
        ),
        ActionId::ExtractLines => (
            Operation::ExtractLines(ExtractLinesRequest {
                input_pdf: uploaded_pdf(state),
                line_db_output: text(state, 4, "line_db_output"),
            }),
            vec!["Extracting line data for Arabic...".to_string()],
        ),
        ActionId::TranslateArabic => {
            let line_db_input = text(state, 4, "line_db_output");
            let max_workers = number(state, 5, "max_workers");
            let lines = vec![
                format!("Starting Arabic translation with {max_workers} workers..."),
                format!("Using {line_db_input} from Step 4..."),
            ];
            (
                Operation::TranslateArabic(TranslateArabicRequest {
                    line_db_input,
                    ar_line_db_output: text(state, 5, "ar_line_db_output"),
                    max_workers,
                    timeout_seconds: number(state, 5, "timeout_seconds"),
                }),
                lines,
            )
        }
        ActionId::ReconstructEnglish => (
            Operation::ReconstructEnglish(ReconstructEnglishRequest {
                json_input: text(state, 6, "json_input"),
                text_removed_pdf: text(state, 6, "text_removed_pdf"),
                output_pdf: text(state, 6, "output_pdf"),
            }),
            vec!["Reconstructing English PDF...".to_string()],
        ),
        ActionId::ReconstructArabic => (
            Operation::ReconstructArabic(ReconstructArabicRequest {
                ar_line_db_input: text(state, 6, "ar_line_db_input"),
                base_pdf: text(state, 6, "base_pdf"),
                output_pdf: text(state, 6, "arabic_output_pdf"),
            }),
            vec!["Reconstructing Arabic PDF...".to_string()],
        ),
        ActionId::VisualizeLines => {
            let line_db_input = match language {
                Language::English => text(state, 4, "json_output"),
                Language::Arabic => text(state, 4, "line_db_output"),
            };
            (
                Operation::VisualizeLines(VisualizeLinesRequest {
                    input_pdf: uploaded_pdf(state),
                    line_db_input,
                    visualized_pdf: text(state, 7, "visualized_pdf"),
                }),
                vec!["Creating line visualization...".to_string()],
            )
        }
    };

    Ok(planned)
}

/// Name the service stores the upload under: the `save_as` basename with a
/// `.pdf` suffix.
pub fn uploaded_pdf(state: &PipelineState) -> String {
    normalise_pdf_name(&text(state, 1, "save_as"))
}

pub fn normalise_pdf_name(name: &str) -> String {
    let base = name
        .trim()
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .to_string();
    let base = if base.is_empty() {
        "input.pdf".to_string()
    } else {
        base
    };
    if base.to_lowercase().ends_with(".pdf") {
        base
    } else {
        format!("{base}.pdf")
    }
}

/// Current text of `input`, falling back to its declared default.
fn text(state: &PipelineState, step: StepId, input: &str) -> String {
    state
        .form(step)
        .and_then(|f| f.text(input))
        .map(str::to_string)
        .or_else(|| match declared_default(step, input) {
            Some(DefaultValue::Text(s)) => Some(s.to_string()),
            _ => None,
        })
        .unwrap_or_default()
}

fn number(state: &PipelineState, step: StepId, input: &str) -> i64 {
    state
        .form(step)
        .and_then(|f| f.number(input))
        .or_else(|| match declared_default(step, input) {
            Some(DefaultValue::Number(n)) => Some(n),
            _ => None,
        })
        .unwrap_or_default()
}

fn declared_default(step: StepId, input: &str) -> Option<DefaultValue> {
    registry::find(step)?
        .all_inputs()
        .into_iter()
        .find(|i| i.id == input)
        .and_then(|i| i.default)
}
