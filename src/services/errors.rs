// Error taxonomy shared by capabilities and the refinement controller

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HumanizeError {
    /// Missing or invalid capability configuration. Fatal, never retried.
    #[error("validation error: {0}")]
    Validation(String),
    /// Transport or HTTP failure from an external capability.
    #[error("provider error: {0}")]
    Provider(String),
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    /// Analyzer response is not valid JSON or violates the result schema.
    #[error("parse error: {0}")]
    Parse(String),
}

impl HumanizeError {
    /// Whether the generate/refine retry loop may try again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider(_) | Self::Timeout(_))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type HumanizeResult<T> = Result<T, HumanizeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(HumanizeError::Provider("503".into()).is_retryable());
        assert!(HumanizeError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!HumanizeError::Validation("no model".into()).is_retryable());
        assert!(!HumanizeError::Parse("bad json".into()).is_retryable());
        assert!(HumanizeError::Validation("no model".into()).is_fatal());
    }

    #[test]
    fn test_timeout_display() {
        let e = HumanizeError::Timeout(Duration::from_millis(1500));
        assert_eq!(e.to_string(), "timed out after 1500ms");
    }
}
