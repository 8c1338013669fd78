//! Execution State Store: the single mutable aggregate of a wizard session.
//!
//! [`PipelineState`] changes only through [`PipelineEvent`]s applied by
//! [`PipelineState::apply`], a pure `(state, event) → state` transition.
//! Guards (gating, input completeness, single-flight) are checked by the
//! callers before an event is produced, so `apply` itself is total.
//!
//! [`StateStore`] shares one `PipelineState` between the engine and any
//! number of readers. Readers take snapshots; a record may change between two
//! snapshots while an execution is in flight.

use crate::gating;
use crate::language::Language;
use crate::model::{ExecutionRecord, ExecutionStatus, FormDataRecord, FormValue};
use crate::registry::{self, StepId, LANGUAGE_INPUT, LANGUAGE_STEP};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

/// The whole mutable state of one pipeline session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineState {
    /// Always a step visible under `language`.
    pub current_step: StepId,
    pub language: Language,
    /// Absent entry ≡ idle.
    pub executions: BTreeMap<StepId, ExecutionRecord>,
    pub form_data: BTreeMap<StepId, FormDataRecord>,
}

/// A state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    CurrentStepSet(StepId),
    LanguageSelected(Language),
    FormUpdated {
        step: StepId,
        values: Vec<(String, FormValue)>,
    },
    /// Replaces any previous record of `step` with a fresh running one.
    ExecutionStarted {
        step: StepId,
        first_line: String,
    },
    LogAppended {
        step: StepId,
        line: String,
    },
    ExecutionSucceeded {
        step: StepId,
        result: serde_json::Value,
    },
    /// Records `error` and appends `"Error: <error>"` to the log.
    ExecutionFailed {
        step: StepId,
        error: String,
    },
    ExecutionReset(StepId),
}

impl PipelineState {
    /// Initial state: first step current, every form seeded with defaults.
    pub fn new(language: Language) -> Self {
        let form_data = registry::steps()
            .iter()
            .map(|s| (s.id, FormDataRecord::seeded(s)))
            .collect();
        let current_step = gating::visible_steps(language)
            .first()
            .map_or(1, |s| s.id);
        let mut state = Self {
            current_step,
            language: Language::default(),
            executions: BTreeMap::new(),
            form_data,
        };
        state.select_language(language);
        state
    }

    /// Status of `step`'s latest attempt; idle when it never ran.
    pub fn status(&self, step: StepId) -> ExecutionStatus {
        self.executions
            .get(&step)
            .map_or(ExecutionStatus::Idle, |r| r.status)
    }

    pub fn execution(&self, step: StepId) -> Option<&ExecutionRecord> {
        self.executions.get(&step)
    }

    pub fn form(&self, step: StepId) -> Option<&FormDataRecord> {
        self.form_data.get(&step)
    }

    /// The step currently executing, if any.
    pub fn running_step(&self) -> Option<StepId> {
        self.executions
            .values()
            .find(|r| r.status == ExecutionStatus::Running)
            .map(|r| r.step)
    }

    /// Consume the state and return it with `event` applied.
    pub fn apply(mut self, event: &PipelineEvent) -> Self {
        self.apply_mut(event);
        self
    }

    pub(crate) fn apply_mut(&mut self, event: &PipelineEvent) {
        match event {
            PipelineEvent::CurrentStepSet(step) => {
                self.current_step = gating::nearest_visible(*step, self.language)
            }
            PipelineEvent::LanguageSelected(language) => self.select_language(*language),
            PipelineEvent::FormUpdated { step, values } => {
                self.form_data
                    .entry(*step)
                    .or_default()
                    .merge(values.iter().cloned());
                if *step == LANGUAGE_STEP {
                    let chosen = values
                        .iter()
                        .rev()
                        .find(|(id, _)| id == LANGUAGE_INPUT)
                        .and_then(|(_, v)| v.as_str())
                        .and_then(|s| s.parse::<Language>().ok());
                    if let Some(language) = chosen {
                        self.select_language(language);
                    }
                }
            }
            PipelineEvent::ExecutionStarted { step, first_line } => {
                self.executions
                    .insert(*step, ExecutionRecord::started(*step, first_line.clone()));
            }
            PipelineEvent::LogAppended { step, line } => {
                if let Some(record) = self.executions.get_mut(step) {
                    record.logs.push(line.clone());
                }
            }
            PipelineEvent::ExecutionSucceeded { step, result } => {
                if let Some(record) = self.executions.get_mut(step) {
                    record.status = ExecutionStatus::Success;
                    record.result = Some(result.clone());
                    record.error = None;
                }
            }
            PipelineEvent::ExecutionFailed { step, error } => {
                if let Some(record) = self.executions.get_mut(step) {
                    record.status = ExecutionStatus::Error;
                    record.logs.push(format!("Error: {error}"));
                    record.error = Some(error.clone());
                }
            }
            PipelineEvent::ExecutionReset(step) => {
                self.executions.insert(
                    *step,
                    ExecutionRecord {
                        step: *step,
                        status: ExecutionStatus::Idle,
                        logs: Vec::new(),
                        result: None,
                        error: None,
                    },
                );
            }
        }
    }

    /// Set the language, mirror it into the language radio, and keep
    /// `current_step` visible. Execution records are left alone.
    fn select_language(&mut self, language: Language) {
        self.language = language;
        self.form_data
            .entry(LANGUAGE_STEP)
            .or_default()
            .set(LANGUAGE_INPUT, FormValue::Radio(language.to_string()));
        self.current_step = gating::nearest_visible(self.current_step, language);
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new(Language::default())
    }
}

/// Shared handle to a session's [`PipelineState`].
#[derive(Debug, Clone, Default)]
pub struct StateStore {
    inner: Arc<RwLock<PipelineState>>,
}

impl StateStore {
    pub fn new(state: PipelineState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    /// A consistent copy of the current state.
    pub fn snapshot(&self) -> PipelineState {
        self.read(Clone::clone)
    }

    pub fn read<R>(&self, f: impl FnOnce(&PipelineState) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    pub(crate) fn dispatch(&self, event: PipelineEvent) {
        self.update(|state| state.apply_mut(&event));
    }

    /// Run `f` under the write lock, so a check and the event it guards are
    /// applied atomically.
    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut PipelineState) -> R) -> R {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}
