//! The [`Wizard`] session facade.
//!
//! One `Wizard` is one pipeline session: a state store, an execution engine
//! bound to a processing service, and the navigation rules on top. It is a
//! cheap `Clone` (all handles are shared), so a UI thread can navigate while
//! a spawned task awaits [`Wizard::execute`].
//!
//! ```rust,no_run
//! use effilayouter::{FileHandle, Language, Wizard, WizardConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let wizard = Wizard::new(WizardConfig::from_env())?;
//! wizard.set_input(1, "file", FileHandle::open("contract.pdf")?)?;
//! wizard.execute(1).await?;
//! wizard.next()?;
//! wizard.select_language(Language::Arabic);
//! # Ok(())
//! # }
//! ```

use crate::config::WizardConfig;
use crate::engine::{ExecutionEngine, ExecutionOutcome};
use crate::error::{OperationError, WizardError};
use crate::gating;
use crate::language::Language;
use crate::model::{ExecutionStatus, FormValue};
use crate::registry::{self, InputKind, InputSpec, StepId, LANGUAGE_INPUT, LANGUAGE_STEP};
use crate::service::{FileInfo, HttpService, ProcessingService, ServiceResponse};
use crate::state::{PipelineEvent, PipelineState, StateStore};
use crate::stepper::{self, ProgressOverview, StepperEntry};
use crate::stream::{EventBus, EventStream};
use std::sync::Arc;
use tracing::{debug, info};

/// A pipeline session.
#[derive(Clone)]
pub struct Wizard {
    config: Arc<WizardConfig>,
    store: StateStore,
    engine: ExecutionEngine,
    service: Arc<dyn ProcessingService>,
    events: EventBus,
}

impl Wizard {
    /// A session talking to the HTTP service at `config.api_base`.
    pub fn new(config: WizardConfig) -> Result<Self, WizardError> {
        let service = HttpService::new(&config)
            .map_err(|e| WizardError::InvalidConfig(e.to_string()))?;
        Ok(Self::with_service(config, Arc::new(service)))
    }

    /// A session over any [`ProcessingService`].
    pub fn with_service(config: WizardConfig, service: Arc<dyn ProcessingService>) -> Self {
        let store = StateStore::new(PipelineState::new(config.initial_language));
        let events = EventBus::new(config.event_capacity);
        let engine = ExecutionEngine::new(store.clone(), Arc::clone(&service))
            .with_observer(config.observer.clone())
            .with_events(events.clone());
        debug!("Wizard session created: {:?}", config);
        Self {
            config: Arc::new(config),
            store,
            engine,
            service,
            events,
        }
    }

    pub fn config(&self) -> &WizardConfig {
        &self.config
    }

    pub fn service(&self) -> &Arc<dyn ProcessingService> {
        &self.service
    }

    pub fn snapshot(&self) -> PipelineState {
        self.store.snapshot()
    }

    pub fn current_step(&self) -> StepId {
        self.store.read(|s| s.current_step)
    }

    pub fn language(&self) -> Language {
        self.store.read(|s| s.language)
    }

    // ── Language & forms ─────────────────────────────────────────────────

    /// Switch the processing language. Execution records are kept.
    pub fn select_language(&self, language: Language) {
        info!("Language set to {}", language);
        self.store.dispatch(PipelineEvent::LanguageSelected(language));
    }

    /// Set one input of `step`. See [`Wizard::update_form`].
    pub fn set_input(
        &self,
        step: StepId,
        input: &str,
        value: impl Into<FormValue>,
    ) -> Result<(), WizardError> {
        self.update_form(step, vec![(input.to_string(), value.into())])
    }

    /// Apply user edits to `step`'s form.
    ///
    /// Every value is checked against its input's declaration first; if any
    /// is rejected nothing is applied. Editing step 2's `lang` switches the
    /// language.
    ///
    /// # Errors
    /// [`WizardError::UnknownStep`], or [`WizardError::InvalidInput`] for an
    /// undeclared input id or a value outside its constraints.
    pub fn update_form(
        &self,
        step: StepId,
        edits: Vec<(String, FormValue)>,
    ) -> Result<(), WizardError> {
        let def = registry::find(step).ok_or(WizardError::UnknownStep { step })?;
        let inputs = def.all_inputs();

        let values = edits
            .into_iter()
            .map(|(id, value)| {
                let spec = inputs.iter().find(|i| i.id == id).ok_or_else(|| {
                    WizardError::InvalidInput {
                        step,
                        input: id.clone(),
                        reason: "no such input".into(),
                    }
                })?;
                let value = validate(step, spec, value)?;
                Ok((id, value))
            })
            .collect::<Result<Vec<_>, WizardError>>()?;

        self.store.dispatch(PipelineEvent::FormUpdated { step, values });
        Ok(())
    }

    // ── Navigation ───────────────────────────────────────────────────────

    /// Make `step` current.
    ///
    /// Allowed when the step is visible and either enterable or already
    /// completed.
    pub fn navigate_to(&self, step: StepId) -> Result<StepId, WizardError> {
        let def = registry::find(step).ok_or(WizardError::UnknownStep { step })?;
        self.store.update(|state| {
            let reachable = gating::can_enter(step, state)
                || state.status(step) == ExecutionStatus::Success;
            if !def.is_visible(state.language) || !reachable {
                return Err(WizardError::NotEnterable { step });
            }
            state.apply_mut(&PipelineEvent::CurrentStepSet(step));
            Ok(step)
        })
    }

    /// Move to the next visible step. A no-op on the last one.
    pub fn next(&self) -> Result<StepId, WizardError> {
        self.store.update(|state| {
            let current = state.current_step;
            let Some(next) = gating::next_visible(current, state.language) else {
                return Ok(current);
            };
            if !gating::can_advance(current, state) || !gating::can_enter(next.id, state) {
                return Err(WizardError::CannotAdvance { step: current });
            }
            state.apply_mut(&PipelineEvent::CurrentStepSet(next.id));
            Ok(next.id)
        })
    }

    /// Move to the previous visible step. A no-op on the first one.
    pub fn back(&self) -> StepId {
        self.store.update(|state| {
            match gating::previous_visible(state.current_step, state.language) {
                Some(prev) => {
                    state.apply_mut(&PipelineEvent::CurrentStepSet(prev.id));
                    prev.id
                }
                None => state.current_step,
            }
        })
    }

    // ── Execution ────────────────────────────────────────────────────────

    pub async fn execute(&self, step: StepId) -> Result<ExecutionOutcome, WizardError> {
        self.engine.execute(step).await
    }

    pub async fn execute_current(&self) -> Result<ExecutionOutcome, WizardError> {
        self.execute(self.current_step()).await
    }

    /// Drop `step`'s record, returning it to idle.
    pub fn reset_execution(&self, step: StepId) -> Result<(), WizardError> {
        registry::find(step).ok_or(WizardError::UnknownStep { step })?;
        self.store.update(|state| {
            if state.status(step) == ExecutionStatus::Running {
                return Err(WizardError::AlreadyRunning { running: step });
            }
            state.apply_mut(&PipelineEvent::ExecutionReset(step));
            Ok(())
        })
    }

    // ── Observation ──────────────────────────────────────────────────────

    /// Execution events from now on.
    pub fn events(&self) -> EventStream {
        self.events.subscribe()
    }

    pub fn stepper(&self) -> Vec<StepperEntry> {
        self.store.read(stepper::entries)
    }

    pub fn progress(&self) -> ProgressOverview {
        self.store.read(stepper::overview)
    }

    /// Name of the reconstructed document for the active language.
    pub fn final_document(&self) -> String {
        self.store.read(|state| {
            let output = match state.language {
                Language::English => "output_pdf",
                Language::Arabic => "arabic_output_pdf",
            };
            state
                .form(6)
                .and_then(|f| f.text(output))
                .map(str::to_string)
                .or_else(|| {
                    registry::find(6)
                        .and_then(|d| registry::resolve(d, state.language))
                        .and_then(|r| r.result)
                        .map(str::to_string)
                })
                .unwrap_or_default()
        })
    }

    // ── Service pass-through ─────────────────────────────────────────────

    pub async fn health(&self) -> Result<ServiceResponse, OperationError> {
        self.service.health().await?.into_result()
    }

    pub async fn list_files(&self) -> Result<Vec<FileInfo>, OperationError> {
        self.service.list_files().await
    }

    pub fn download_url(&self, file: &str) -> String {
        self.service.download_url(file)
    }
}

/// Check `value` against `spec`, normalising radio choices.
fn validate(step: StepId, spec: &InputSpec, value: FormValue) -> Result<FormValue, WizardError> {
    let invalid = |reason: String| WizardError::InvalidInput {
        step,
        input: spec.id.to_string(),
        reason,
    };

    match (&spec.kind, value) {
        (InputKind::File { accept }, FormValue::File(file)) => match accept {
            Some(accept) if !file.matches_accept(accept) => {
                Err(invalid(format!("'{}' does not match {accept}", file.name())))
            }
            _ => Ok(FormValue::File(file)),
        },
        (InputKind::File { .. }, _) => Err(invalid("expected a file".into())),

        (InputKind::Text, FormValue::Text(s)) => Ok(FormValue::Text(s)),
        (InputKind::Text, _) => Err(invalid("expected text".into())),

        (InputKind::Number { min, max }, FormValue::Number(n)) => {
            if min.is_some_and(|m| n < m) || max.is_some_and(|m| n > m) {
                Err(invalid(format!(
                    "{n} is outside {}..={}",
                    min.map_or("-∞".to_string(), |m| m.to_string()),
                    max.map_or("∞".to_string(), |m| m.to_string())
                )))
            } else {
                Ok(FormValue::Number(n))
            }
        }
        (InputKind::Number { .. }, _) => Err(invalid("expected a number".into())),

        (InputKind::Radio { options }, FormValue::Text(s) | FormValue::Radio(s)) => {
            if step == LANGUAGE_STEP && spec.id == LANGUAGE_INPUT {
                let language: Language = s.parse().map_err(|e| invalid(format!("{e}")))?;
                return Ok(FormValue::Radio(language.as_str().to_string()));
            }
            if options.contains(&s.as_str()) {
                Ok(FormValue::Radio(s))
            } else {
                Err(invalid(format!("expected one of {}", options.join(", "))))
            }
        }
        (InputKind::Radio { .. }, _) => Err(invalid("expected an option".into())),
    }
}
