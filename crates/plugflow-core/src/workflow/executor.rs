//! WorkflowExecutor: drives one workflow run from its entry point.
//!
//! ```text
//!   entry_point ─► step ──COMPLETED/SKIPPED──► on_success ─► ...
//!                   │
//!                   └────────FAILED──────────► on_failure ─► ...
//! ```
//!
//! Each top-level step runs up to `retry_count + 1` times with exponential
//! backoff between attempts. Structural failures (bad references, cycles,
//! malformed composites) end the run immediately and are never retried.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use super::delegates::{HookTrigger, TemplateApplier};
use super::step_executor::StepExecutor;
use crate::agent::{AgentFunctionTable, AgentRegistry};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::models::{
    JsonMap, StepIndex, StepResult, WorkflowContext, WorkflowDefinition, WorkflowResult,
    WorkflowStatus,
};

pub struct WorkflowExecutor {
    workflow: Arc<WorkflowDefinition>,
    steps: StepExecutor,
    cancel: CancellationToken,
}

impl WorkflowExecutor {
    pub fn new(
        workflow: Arc<WorkflowDefinition>,
        plugin_name: impl Into<String>,
        plugin_path: impl Into<PathBuf>,
        agents: Arc<AgentRegistry>,
        config: EngineConfig,
    ) -> Self {
        let steps = StepExecutor::new(
            Arc::clone(&workflow),
            plugin_name,
            plugin_path,
            agents,
            config,
        );
        Self {
            workflow,
            steps,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_functions(mut self, functions: Arc<AgentFunctionTable>) -> Self {
        self.steps = self.steps.with_functions(functions);
        self
    }

    pub fn with_templates(mut self, templates: Arc<dyn TemplateApplier>) -> Self {
        self.steps = self.steps.with_templates(templates);
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn HookTrigger>) -> Self {
        self.steps = self.steps.with_hooks(hooks);
        self
    }

    /// Use an externally owned token, e.g. one cancelled on Ctrl-C.
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop the run: the current step's process is killed and no further
    /// step is dispatched. A cancelled executor cannot be reused.
    pub fn cancel(&self) {
        tracing::info!("[WorkflowExecutor] Workflow {} cancelled", self.workflow.name);
        self.cancel.cancel();
    }

    /// Run the workflow. `config` is layered over the workflow's
    /// `default_config`.
    pub async fn execute(
        &self,
        project_path: impl Into<String>,
        config: Option<JsonMap>,
        initial_variables: Option<JsonMap>,
    ) -> WorkflowResult {
        let workflow = &self.workflow;

        let mut context = WorkflowContext::new(&workflow.name, project_path);
        context.config = workflow.default_config.clone();
        if let Some(overrides) = config {
            context.config.extend(overrides);
        }
        context.variables = initial_variables.unwrap_or_default();
        context.started_at = Some(Utc::now());

        let mut result = WorkflowResult::new(&context, workflow.top_level_count());
        result.status = WorkflowStatus::Running;

        tracing::info!(
            "[WorkflowExecutor] Starting workflow {} (run {})",
            workflow.name,
            context.workflow_id
        );

        let structural = workflow.validate_structure();
        if !structural.is_empty() {
            for err in &structural {
                tracing::error!("[WorkflowExecutor] {}: {}", workflow.name, err);
            }
            result.errors.extend(structural.iter().map(ToString::to_string));
            result.status = WorkflowStatus::Failed;
            return finalize(result, context);
        }

        let mut visited: HashSet<String> = HashSet::new();
        let mut aborted = false;
        let mut current = Some(workflow.entry_point.clone());

        while let Some(step_id) = current.take() {
            if self.cancel.is_cancelled() {
                break;
            }
            if !visited.insert(step_id.clone()) {
                let err = EngineError::CycleDetected(step_id);
                tracing::error!("[WorkflowExecutor] {}", err);
                result.errors.push(err.to_string());
                aborted = true;
                break;
            }
            let Some((index, step)) = workflow
                .find_top_level(&step_id)
                .and_then(|idx| workflow.step(idx).map(|s| (idx, s)))
            else {
                result.errors.push(EngineError::StepNotFound(step_id).to_string());
                aborted = true;
                break;
            };

            context.current_step = Some(step.id.clone());
            result.path.push(step.id.clone());

            let step_result = self
                .run_with_retries(index, step.retry_count, &mut context)
                .await;

            match step_result.status {
                WorkflowStatus::Completed => {
                    result.completed_steps += 1;
                    context.completed_steps.push(step.id.clone());
                }
                WorkflowStatus::Failed => {
                    result.failed_steps += 1;
                    context.failed_steps.push(step.id.clone());
                    result.errors.push(
                        step_result
                            .error
                            .clone()
                            .unwrap_or_else(|| "Unknown error".to_string()),
                    );
                }
                WorkflowStatus::Skipped => result.skipped_steps += 1,
                _ => {}
            }

            if step_result.is_structural() {
                aborted = true;
            } else {
                current = match step_result.status {
                    WorkflowStatus::Completed => step.on_success.clone(),
                    WorkflowStatus::Failed => step.on_failure.clone(),
                    _ => None,
                };
            }
            result.step_results.insert(step.id.clone(), step_result);
        }

        result.status = if self.cancel.is_cancelled() {
            WorkflowStatus::Cancelled
        } else if aborted || result.failed_steps > 0 {
            WorkflowStatus::Failed
        } else {
            WorkflowStatus::Completed
        };

        // Later steps on the path overwrite earlier ones.
        for step_id in &result.path {
            if let Some(step_result) = result.step_results.get(step_id) {
                result.outputs.extend(step_result.outputs.clone());
                result.artifacts.extend(step_result.artifacts.clone());
            }
        }

        finalize(result, context)
    }

    async fn run_with_retries(
        &self,
        index: StepIndex,
        retry_count: u32,
        context: &mut WorkflowContext,
    ) -> StepResult {
        let mut attempt: u32 = 0;
        loop {
            let mut step_result = self.steps.execute_step(index, context, &self.cancel).await;
            step_result.attempts = attempt + 1;

            if step_result.status != WorkflowStatus::Failed
                || step_result.is_structural()
                || attempt >= retry_count
            {
                return step_result;
            }

            let delay = self.steps.config().backoff_delay(attempt);
            tracing::warn!(
                "[WorkflowExecutor] Step {} failed (attempt {}/{}), retrying in {:?}",
                step_result.step_id,
                attempt + 1,
                retry_count + 1,
                delay
            );
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.cancel.cancelled() => return step_result,
            }
            attempt += 1;
        }
    }
}

fn finalize(mut result: WorkflowResult, context: WorkflowContext) -> WorkflowResult {
    let now = Utc::now();
    result.completed_at = Some(now);
    result.duration = (now - result.started_at).to_std().ok();
    match result.status {
        WorkflowStatus::Completed => tracing::info!(
            "[WorkflowExecutor] Workflow {} completed ({} step(s))",
            result.workflow_name,
            result.completed_steps
        ),
        status => tracing::error!(
            "[WorkflowExecutor] Workflow {} finished with status {}: {}",
            result.workflow_name,
            status,
            result.errors.join("; ")
        ),
    }
    result.final_context = Some(context);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StepCondition, WorkflowBuilder, WorkflowStep};
    use crate::workflow::delegates::DelegateError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn executor(builder: WorkflowBuilder) -> WorkflowExecutor {
        WorkflowExecutor::new(
            Arc::new(builder.build()),
            "demo",
            "/plugins/demo",
            Arc::new(AgentRegistry::new()),
            EngineConfig::default().with_backoff_base(Duration::from_millis(5)),
        )
    }

    /// Fails every template whose name starts with `fail`, counting calls.
    #[derive(Default)]
    struct Flaky {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TemplateApplier for Flaky {
        async fn apply(
            &self,
            template: &str,
            _: &JsonMap,
            _: &WorkflowContext,
        ) -> Result<JsonMap, DelegateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if template.starts_with("fail") {
                Err(DelegateError::Failed(format!("{} broke", template)))
            } else {
                let mut out = JsonMap::new();
                out.insert("last".into(), json!(template));
                Ok(out)
            }
        }
    }

    #[tokio::test]
    async fn test_follows_on_success_and_merges_outputs() {
        let mut b = WorkflowBuilder::new("chain");
        b.step(WorkflowStep::template("a", "first").on_success("b"));
        b.step(WorkflowStep::template("b", "second"));
        b.step(WorkflowStep::template("unreached", "third"));
        let result = executor(b)
            .with_templates(Arc::new(Flaky::default()))
            .execute(".", None, None)
            .await;

        assert_eq!(result.status, WorkflowStatus::Completed);
        assert_eq!(result.path, vec!["a", "b"]);
        assert_eq!(result.completed_steps, 2);
        assert_eq!(result.total_steps, 3);
        assert_eq!(result.outputs["last"], "second");
        let ctx = result.final_context.unwrap();
        assert_eq!(ctx.completed_steps, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_failure_follows_on_failure() {
        let mut b = WorkflowBuilder::new("recover");
        b.step(WorkflowStep::template("a", "fail-a").on_failure("cleanup"));
        b.step(WorkflowStep::template("cleanup", "tidy"));
        let result = executor(b)
            .with_templates(Arc::new(Flaky::default()))
            .execute(".", None, None)
            .await;

        assert_eq!(result.status, WorkflowStatus::Failed);
        assert_eq!(result.path, vec!["a", "cleanup"]);
        assert_eq!(result.failed_steps, 1);
        assert_eq!(result.completed_steps, 1);
        assert_eq!(result.errors, vec!["fail-a broke".to_string()]);
    }

    #[tokio::test]
    async fn test_retries_until_exhausted() {
        let flaky = Arc::new(Flaky::default());
        let mut b = WorkflowBuilder::new("retry");
        b.step(WorkflowStep::template("a", "fail-always").with_retries(2));
        let result = executor(b)
            .with_templates(flaky.clone())
            .execute(".", None, None)
            .await;

        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.step_results["a"].attempts, 3);
        assert_eq!(result.status, WorkflowStatus::Failed);
    }

    #[tokio::test]
    async fn test_cycle_is_structural() {
        let mut b = WorkflowBuilder::new("loop");
        b.step(WorkflowStep::template("a", "x").on_success("b"));
        b.step(WorkflowStep::template("b", "y").on_success("a"));
        let result = executor(b).execute(".", None, None).await;

        assert_eq!(result.status, WorkflowStatus::Failed);
        assert_eq!(result.path, vec!["a", "b"]);
        assert!(result
            .errors
            .contains(&"Workflow cycle detected at step: a".to_string()));
    }

    #[tokio::test]
    async fn test_structural_failure_is_not_retried() {
        let mut b = WorkflowBuilder::new("bad-agent");
        b.step(
            WorkflowStep::agent("a", "no-such/agent")
                .with_retries(3)
                .on_failure("b"),
        );
        b.step(WorkflowStep::template("b", "never"));
        let result = executor(b).execute(".", None, None).await;

        assert_eq!(result.status, WorkflowStatus::Failed);
        assert_eq!(result.step_results["a"].attempts, 1);
        assert_eq!(result.path, vec!["a"]);
    }

    #[tokio::test]
    async fn test_invalid_structure_runs_nothing() {
        let mut b = WorkflowBuilder::new("broken");
        b.step(WorkflowStep::template("a", "x").on_success("ghost"));
        let result = executor(b).execute(".", None, None).await;

        assert_eq!(result.status, WorkflowStatus::Failed);
        assert!(result.path.is_empty());
        assert!(result.errors[0].contains("ghost"));
    }

    #[tokio::test]
    async fn test_skipped_step_ends_run() {
        let mut b = WorkflowBuilder::new("skip");
        b.step(
            WorkflowStep::template("a", "x")
                .with_condition(StepCondition::exists("variables.flag"))
                .on_success("b"),
        );
        b.step(WorkflowStep::template("b", "y"));
        let result = executor(b).execute(".", None, None).await;

        assert_eq!(result.status, WorkflowStatus::Completed);
        assert_eq!(result.path, vec!["a"]);
        assert_eq!(result.skipped_steps, 1);
        assert_eq!(result.completed_steps, 0);
        assert!(!result.step_results.contains_key("b"));
    }

    #[tokio::test]
    async fn test_config_layers_over_defaults() {
        let mut b = WorkflowBuilder::new("cfg");
        let mut defaults = JsonMap::new();
        defaults.insert("region".into(), json!("eu"));
        defaults.insert("tier".into(), json!("free"));
        b.default_config(defaults);
        b.step(WorkflowStep::template("a", "x"));

        let mut overrides = JsonMap::new();
        overrides.insert("tier".into(), json!("pro"));
        let mut vars = JsonMap::new();
        vars.insert("user".into(), json!("ada"));

        let result = executor(b).execute("/p", Some(overrides), Some(vars)).await;
        let ctx = result.final_context.unwrap();
        assert_eq!(ctx.config["region"], "eu");
        assert_eq!(ctx.config["tier"], "pro");
        assert_eq!(ctx.variables["user"], "ada");
        assert_eq!(ctx.project_path, "/p");
    }

    #[tokio::test]
    async fn test_pre_cancelled_run() {
        let mut b = WorkflowBuilder::new("cancel");
        b.step(WorkflowStep::template("a", "x"));
        let exec = executor(b);
        exec.cancel();
        let result = exec.execute(".", None, None).await;
        assert_eq!(result.status, WorkflowStatus::Cancelled);
        assert!(result.path.is_empty());
    }
}
