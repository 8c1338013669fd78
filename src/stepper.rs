//! Derived progress view for observers (a stepper bar, a CLI status line).
//!
//! Nothing here is stored; every call recomputes from a [`PipelineState`]
//! snapshot, so an entry can be stale the moment an execution appends a log.

use crate::gating;
use crate::model::ExecutionStatus;
use crate::registry::StepId;
use crate::state::PipelineState;
use serde::Serialize;

/// One visible step as a stepper shows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepperEntry {
    pub step: StepId,
    /// 1-based position among the visible steps.
    pub position: usize,
    pub title: &'static str,
    pub status: ExecutionStatus,
    pub is_current: bool,
    pub can_enter: bool,
    /// Enterable, or already completed.
    pub clickable: bool,
}

/// Completed vs visible step count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressOverview {
    pub completed: usize,
    pub visible: usize,
}

impl ProgressOverview {
    pub fn is_complete(&self) -> bool {
        self.visible > 0 && self.completed == self.visible
    }

    /// Completion in percent, rounded down.
    pub fn percent(&self) -> u8 {
        if self.visible == 0 {
            return 0;
        }
        (self.completed * 100 / self.visible) as u8
    }
}

pub fn entries(state: &PipelineState) -> Vec<StepperEntry> {
    gating::visible_steps(state.language)
        .into_iter()
        .enumerate()
        .map(|(i, def)| {
            let status = state.status(def.id);
            let can_enter = gating::can_enter(def.id, state);
            StepperEntry {
                step: def.id,
                position: i + 1,
                title: def.title,
                status,
                is_current: def.id == state.current_step,
                can_enter,
                clickable: can_enter || status == ExecutionStatus::Success,
            }
        })
        .collect()
}

pub fn overview(state: &PipelineState) -> ProgressOverview {
    let visible = gating::visible_steps(state.language);
    ProgressOverview {
        completed: visible
            .iter()
            .filter(|d| state.status(d.id) == ExecutionStatus::Success)
            .count(),
        visible: visible.len(),
    }
}
