//! Visibility & Gating Evaluator.
//!
//! Everything here is a pure function of the catalog and a
//! [`PipelineState`]. Navigation order is the order of
//! [`visible_steps`], never the raw id.
//!
//! The prerequisite chain is a small per-step table. It has a single fork:
//! reconstruction (6) waits on extraction (4) for English but on translation
//! (5) for Arabic, because translation only exists on the Arabic branch.

use crate::language::{Language, PerLanguage};
use crate::model::ExecutionStatus;
use crate::registry::{self, StepDefinition, StepId};
use crate::state::PipelineState;

/// What must have succeeded before a step may be entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prerequisite {
    /// Pipeline entry point; always enterable.
    Entry,
    /// The named step must have succeeded.
    Step(StepId),
    /// Never enterable under this language.
    Unreachable,
}

use Prerequisite::{Entry, Step, Unreachable};

const PREREQUISITES: [(StepId, PerLanguage<Prerequisite>); 8] = [
    (1, PerLanguage::new(Entry, Entry)),
    (2, PerLanguage::new(Step(1), Step(1))),
    (3, PerLanguage::new(Step(2), Step(2))),
    (4, PerLanguage::new(Step(3), Step(3))),
    (5, PerLanguage::new(Unreachable, Step(4))),
    (6, PerLanguage::new(Step(4), Step(5))),
    (7, PerLanguage::new(Step(6), Step(6))),
    (8, PerLanguage::new(Step(7), Step(7))),
];

/// The prerequisite of `step` under `language`. Unknown ids are unreachable.
pub fn prerequisite(step: StepId, language: Language) -> Prerequisite {
    PREREQUISITES
        .iter()
        .find(|(id, _)| *id == step)
        .map_or(Unreachable, |(_, p)| *p.get(language))
}

/// Steps shown for `language`, in catalog order.
pub fn visible_steps(language: Language) -> Vec<&'static StepDefinition> {
    registry::steps()
        .iter()
        .filter(|s| s.is_visible(language))
        .collect()
}

/// Whether `step` may be entered (navigated to or executed).
pub fn can_enter(step: StepId, state: &PipelineState) -> bool {
    match prerequisite(step, state.language) {
        Entry => true,
        Step(before) => state.status(before) == ExecutionStatus::Success,
        Unreachable => false,
    }
}

/// Whether forward navigation away from `current` is allowed.
///
/// Always true on the last visible step. Otherwise a step without an action
/// under the active language can be passed through, while an action-bearing
/// step must have succeeded.
pub fn can_advance(current: StepId, state: &PipelineState) -> bool {
    let Some(step) = registry::find(current) else {
        return false;
    };
    if next_visible(current, state.language).is_none() {
        return true;
    }
    match registry::resolve(step, state.language).and_then(|r| r.action) {
        None => true,
        Some(_) => state.status(current) == ExecutionStatus::Success,
    }
}

/// Input ids of `step` that still lack an acceptable value, or `None` when
/// `step` is not in the catalog.
pub fn missing_inputs(step: StepId, state: &PipelineState) -> Option<Vec<&'static str>> {
    let def = registry::find(step)?;
    let inputs = registry::resolve(def, state.language).map_or(&[][..], |r| r.inputs);
    Some(match state.form(step) {
        Some(form) => form.missing(inputs),
        None => inputs.iter().map(|i| i.id).collect(),
    })
}

/// Whether every resolved input of `step` has a value.
pub fn can_execute(step: StepId, state: &PipelineState) -> bool {
    missing_inputs(step, state).is_some_and(|m| m.is_empty())
}

/// The first visible step after `current`.
pub fn next_visible(current: StepId, language: Language) -> Option<&'static StepDefinition> {
    visible_steps(language).into_iter().find(|s| s.id > current)
}

/// The last visible step before `current`.
pub fn previous_visible(current: StepId, language: Language) -> Option<&'static StepDefinition> {
    visible_steps(language)
        .into_iter()
        .rev()
        .find(|s| s.id < current)
}

/// `step` itself if visible, else the closest visible step before it, else
/// the first visible step.
pub fn nearest_visible(step: StepId, language: Language) -> StepId {
    let visible = visible_steps(language);
    if visible.iter().any(|s| s.id == step) {
        return step;
    }
    visible
        .iter()
        .rev()
        .find(|s| s.id < step)
        .or_else(|| visible.first())
        .map_or(step, |s| s.id)
}
