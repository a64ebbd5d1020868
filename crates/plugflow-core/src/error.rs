//! Core error types for the plugflow engine.
//!
//! `EngineError` covers the structural failures that abort a workflow run
//! (bad references, cycles, malformed composite steps) as well as registry
//! problems. Step-local failures never become an `EngineError`; they are
//! recorded in a `StepResult` instead.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Step not found: {0}")]
    StepNotFound(String),

    #[error("Workflow cycle detected at step: {0}")]
    CycleDetected(String),

    #[error("Entry point not found: {0}")]
    InvalidEntryPoint(String),

    #[error("Invalid agent key: {0}")]
    InvalidAgentKey(String),

    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Hook not found: {0}")]
    HookNotFound(String),

    #[error("Invalid step {step}: {reason}")]
    InvalidStep { step: String, reason: String },

    #[error("Duplicate step id: {0}")]
    DuplicateStep(String),
}

impl EngineError {
    pub fn invalid_step(step: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::InvalidStep {
            step: step.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            EngineError::CycleDetected("a".into()).to_string(),
            "Workflow cycle detected at step: a"
        );
        assert_eq!(
            EngineError::invalid_step("cond", "needs 2 or 3 children").to_string(),
            "Invalid step cond: needs 2 or 3 children"
        );
        assert_eq!(
            EngineError::HookNotFound("pre-push".into()).to_string(),
            "Hook not found: pre-push"
        );
    }
}
