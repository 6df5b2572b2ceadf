// Capability contracts consumed by the refinement controller
// Concrete providers live in providers.rs / detector.rs; tests plug in mocks.

use async_trait::async_trait;

use crate::models::{AnalysisResult, ExternalJudgeResult, ReferenceDocument, WorkflowStep};
use super::errors::HumanizeResult;

/// Text generation and rewriting (the same contract serves both roles).
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system: &str, user: &str, temperature: f64) -> HumanizeResult<String>;

    /// Model identifier surfaced on workflow steps.
    fn model_id(&self) -> Option<String> {
        None
    }
}

/// Internal analyzer returning a schema-validated analysis.
#[async_trait]
pub trait TextAnalyzer: Send + Sync {
    async fn analyze(&self, system: &str, user: &str) -> HumanizeResult<AnalysisResult>;

    fn model_id(&self) -> Option<String> {
        None
    }
}

/// What the external judge said about a text.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionOutcome {
    Judged(ExternalJudgeResult),
    /// The judge answered with an error payload.
    Rejected(String),
    /// Input too short or no credential configured. Not a failure.
    NotApplicable,
}

#[async_trait]
pub trait ExternalDetector: Send + Sync {
    async fn detect(&self, text: &str) -> HumanizeResult<DetectionOutcome>;

    fn source_id(&self) -> Option<String> {
        None
    }
}

/// Read-only source of reference texts for the composite target profile.
#[async_trait]
pub trait ReferenceLibrary: Send + Sync {
    async fn snapshot(&self) -> HumanizeResult<Vec<ReferenceDocument>>;
}

/// Log sink for workflow steps. Must return quickly.
pub trait StepObserver: Send + Sync {
    fn on_step(&self, step: &WorkflowStep);
}

impl<F> StepObserver for F
where
    F: Fn(&WorkflowStep) + Send + Sync,
{
    fn on_step(&self, step: &WorkflowStep) {
        self(step)
    }
}

/// Observer that only forwards steps to tracing.
pub struct TracingObserver;

impl StepObserver for TracingObserver {
    fn on_step(&self, step: &WorkflowStep) {
        tracing::info!(
            step_id = %step.id,
            status = ?step.status,
            model = step.model.as_deref().unwrap_or("-"),
            "[STEP] {} {}",
            step.label,
            step.details
        );
    }
}
