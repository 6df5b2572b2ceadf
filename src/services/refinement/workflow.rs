// Workflow step log
// Append-only record of phase transitions within one run. Every append is
// forwarded to the observer right away; entries are never edited, a status
// change is a new entry carrying the same step id.

use chrono::Utc;
use uuid::Uuid;

use crate::models::{StepStatus, WorkflowStep};
use crate::services::capabilities::StepObserver;

/// Identity of one phase across its status transitions.
#[derive(Debug, Clone)]
pub struct StepHandle {
    pub id: String,
    label: String,
    model: Option<String>,
}

pub struct StepLog<'a> {
    observer: &'a dyn StepObserver,
    steps: Vec<WorkflowStep>,
}

impl<'a> StepLog<'a> {
    pub fn new(observer: &'a dyn StepObserver) -> Self {
        Self {
            observer,
            steps: Vec::new(),
        }
    }

    fn append(&mut self, handle: &StepHandle, status: StepStatus, details: String) {
        let step = WorkflowStep {
            id: handle.id.clone(),
            label: handle.label.clone(),
            status,
            details,
            model: handle.model.clone(),
            timestamp: Utc::now(),
        };
        self.observer.on_step(&step);
        self.steps.push(step);
    }

    fn handle(label: &str, model: Option<String>) -> StepHandle {
        StepHandle {
            id: Uuid::new_v4().to_string(),
            label: label.to_string(),
            model,
        }
    }

    /// Queue a phase that has not started yet.
    pub fn pending(&mut self, label: &str, details: impl Into<String>) -> StepHandle {
        let handle = Self::handle(label, None);
        self.append(&handle, StepStatus::Pending, details.into());
        handle
    }

    /// Mark a phase as running, reusing a pending handle when given.
    pub fn start(&mut self, handle: StepHandle, model: Option<String>, details: impl Into<String>) -> StepHandle {
        let handle = StepHandle {
            model: model.or(handle.model),
            ..handle
        };
        self.append(&handle, StepStatus::Running, details.into());
        handle
    }

    pub fn begin(&mut self, label: &str, model: Option<String>, details: impl Into<String>) -> StepHandle {
        let handle = Self::handle(label, model);
        self.append(&handle, StepStatus::Running, details.into());
        handle
    }

    pub fn succeed(&mut self, handle: &StepHandle, details: impl Into<String>) {
        self.append(handle, StepStatus::Success, details.into());
    }

    pub fn warn(&mut self, handle: &StepHandle, details: impl Into<String>) {
        self.append(handle, StepStatus::Warning, details.into());
    }

    pub fn fail(&mut self, handle: &StepHandle, details: impl Into<String>) {
        self.append(handle, StepStatus::Error, details.into());
    }

    /// One-shot entry with its own id.
    pub fn note(&mut self, label: &str, status: StepStatus, model: Option<String>, details: impl Into<String>) {
        let handle = Self::handle(label, model);
        self.append(&handle, status, details.into());
    }

    pub fn steps(&self) -> &[WorkflowStep] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<WorkflowStep> {
        self.steps
    }
}
