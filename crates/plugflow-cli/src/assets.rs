//! Template and hook delegates backed by a plugin's `templates/` and
//! `hooks/` directories.

use std::collections::HashSet;

use async_trait::async_trait;
use plugflow_core::models::{JsonMap, WorkflowContext};
use plugflow_core::workflow::{DelegateError, HookTrigger, TemplateApplier};
use plugflow_core::EngineError;

/// Acknowledges templates and hooks that exist on disk; anything else is
/// reported as not found, which aborts the run.
#[derive(Debug, Clone, Default)]
pub struct PluginAssets {
    hooks: HashSet<String>,
    templates: HashSet<String>,
}

impl PluginAssets {
    pub fn new(hooks: HashSet<String>, templates: HashSet<String>) -> Self {
        Self { hooks, templates }
    }
}

#[async_trait]
impl TemplateApplier for PluginAssets {
    async fn apply(
        &self,
        template: &str,
        inputs: &JsonMap,
        _context: &WorkflowContext,
    ) -> Result<JsonMap, DelegateError> {
        if !self.templates.contains(template) {
            return Err(DelegateError::NotFound(
                EngineError::TemplateNotFound(template.to_string()).to_string(),
            ));
        }
        tracing::info!("[PluginAssets] Applying template {}", template);
        let mut outputs = JsonMap::new();
        outputs.insert("template".into(), template.into());
        outputs.insert("applied".into(), true.into());
        outputs.insert("inputs".into(), inputs.clone().into());
        Ok(outputs)
    }
}

#[async_trait]
impl HookTrigger for PluginAssets {
    async fn trigger(
        &self,
        hook: &str,
        inputs: &JsonMap,
        _context: &WorkflowContext,
    ) -> Result<JsonMap, DelegateError> {
        if !self.hooks.contains(hook) {
            return Err(DelegateError::NotFound(
                EngineError::HookNotFound(hook.to_string()).to_string(),
            ));
        }
        tracing::info!("[PluginAssets] Triggering hook {}", hook);
        let mut outputs = JsonMap::new();
        outputs.insert("hook".into(), hook.into());
        outputs.insert("triggered".into(), true.into());
        outputs.insert("inputs".into(), inputs.clone().into());
        Ok(outputs)
    }
}
