//! Template and hook delegates used by TEMPLATE and HOOK steps.
//!
//! The engine does not install templates or hooks itself; it hands the
//! resolved inputs to these collaborators and records what they return.

use async_trait::async_trait;

use crate::models::{JsonMap, WorkflowContext};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DelegateError {
    /// The referenced template or hook does not exist; fails the run.
    #[error("{0}")]
    NotFound(String),

    /// Anything else; fails only the step.
    #[error("{0}")]
    Failed(String),
}

#[async_trait]
pub trait TemplateApplier: Send + Sync {
    async fn apply(
        &self,
        template: &str,
        inputs: &JsonMap,
        context: &WorkflowContext,
    ) -> Result<JsonMap, DelegateError>;
}

#[async_trait]
pub trait HookTrigger: Send + Sync {
    async fn trigger(
        &self,
        hook: &str,
        inputs: &JsonMap,
        context: &WorkflowContext,
    ) -> Result<JsonMap, DelegateError>;
}

/// Acknowledges every template with `{template, applied: true}`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcknowledgingTemplates;

#[async_trait]
impl TemplateApplier for AcknowledgingTemplates {
    async fn apply(
        &self,
        template: &str,
        _inputs: &JsonMap,
        _context: &WorkflowContext,
    ) -> Result<JsonMap, DelegateError> {
        let mut outputs = JsonMap::new();
        outputs.insert("template".into(), template.into());
        outputs.insert("applied".into(), true.into());
        Ok(outputs)
    }
}

/// Acknowledges every hook with `{hook, triggered: true}`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcknowledgingHooks;

#[async_trait]
impl HookTrigger for AcknowledgingHooks {
    async fn trigger(
        &self,
        hook: &str,
        _inputs: &JsonMap,
        _context: &WorkflowContext,
    ) -> Result<JsonMap, DelegateError> {
        let mut outputs = JsonMap::new();
        outputs.insert("hook".into(), hook.into());
        outputs.insert("triggered".into(), true.into());
        Ok(outputs)
    }
}
