// Refinement Module
// The agentic rewrite loop and its supporting pieces:
// - controller: generate/analyze/fuse/decide/refine state machine
// - retry: bounded exponential backoff for generator calls
// - workflow: append-only WorkflowStep log
// - feedback: prompts and deviation-driven refinement feedback

pub mod controller;
pub mod feedback;
pub mod retry;
pub mod workflow;

pub use controller::{Capabilities, RefinementController};
pub use feedback::build_refinement_feedback;
pub use retry::{retry_with_backoff, RetryPolicy};
pub use workflow::StepLog;
