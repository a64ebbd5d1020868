//! StepExecutor: executes one step of a workflow per its [`StepKind`].
//!
//! Composite steps recurse into their children through the same entry point,
//! so cancellation and condition checks apply at every level. Failures never
//! escape as errors; they are recorded in the returned [`StepResult`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;
use tokio::process::Command;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::condition;
use super::delegates::{
    AcknowledgingHooks, AcknowledgingTemplates, DelegateError, HookTrigger, TemplateApplier,
};
use crate::agent::{AgentExecutor, AgentFunctionTable, AgentRegistry};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::models::{
    AgentContext, AgentStatus, FailureKind, JsonMap, LoopItems, StepIndex, StepKind, StepResult,
    WorkflowContext, WorkflowDefinition, WorkflowStatus, WorkflowStep,
};
use crate::process::{format_secs, run_with_deadline, ProcessError};

/// Why a step handler gave up.
#[derive(Debug)]
struct Failure {
    kind: FailureKind,
    message: String,
}

impl Failure {
    fn local(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::StepLocal,
            message: message.into(),
        }
    }

    fn structural(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Structural,
            message: message.into(),
        }
    }

    fn cancelled() -> Self {
        Self {
            kind: FailureKind::Cancelled,
            message: "Step cancelled".to_string(),
        }
    }

    /// Wrap a failed child result, keeping its failure kind.
    fn from_child(child: &StepResult, message: String) -> Self {
        Self {
            kind: child.failure_kind().unwrap_or(FailureKind::StepLocal),
            message,
        }
    }
}

impl From<EngineError> for Failure {
    fn from(err: EngineError) -> Self {
        Failure::structural(err.to_string())
    }
}

impl From<DelegateError> for Failure {
    fn from(err: DelegateError) -> Self {
        match err {
            DelegateError::NotFound(msg) => Failure::structural(msg),
            DelegateError::Failed(msg) => Failure::local(msg),
        }
    }
}

/// Executes the steps of one workflow on behalf of one plugin.
///
/// Cheap to clone; PARALLEL branches each get their own clone.
#[derive(Clone)]
pub struct StepExecutor {
    workflow: Arc<WorkflowDefinition>,
    plugin_name: String,
    plugin_path: PathBuf,
    agents: Arc<AgentRegistry>,
    functions: Arc<AgentFunctionTable>,
    templates: Arc<dyn TemplateApplier>,
    hooks: Arc<dyn HookTrigger>,
    config: EngineConfig,
}

impl StepExecutor {
    pub fn new(
        workflow: Arc<WorkflowDefinition>,
        plugin_name: impl Into<String>,
        plugin_path: impl Into<PathBuf>,
        agents: Arc<AgentRegistry>,
        config: EngineConfig,
    ) -> Self {
        Self {
            workflow,
            plugin_name: plugin_name.into(),
            plugin_path: plugin_path.into(),
            agents,
            functions: Arc::new(AgentFunctionTable::new()),
            templates: Arc::new(AcknowledgingTemplates),
            hooks: Arc::new(AcknowledgingHooks),
            config,
        }
    }

    pub fn with_functions(mut self, functions: Arc<AgentFunctionTable>) -> Self {
        self.functions = functions;
        self
    }

    pub fn with_templates(mut self, templates: Arc<dyn TemplateApplier>) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn HookTrigger>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn workflow(&self) -> &WorkflowDefinition {
        &self.workflow
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Execute the step at `index`, recursing into children of composite steps.
    pub fn execute_step<'a>(
        &'a self,
        index: StepIndex,
        context: &'a mut WorkflowContext,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, StepResult> {
        Box::pin(async move {
            let Some(step) = self.workflow.step(index) else {
                let mut result = StepResult::start(format!("#{}", index.index()));
                result.fail(
                    FailureKind::Structural,
                    EngineError::StepNotFound(format!("#{}", index.index())).to_string(),
                );
                result.finish();
                return result;
            };

            let mut result = StepResult::start(&step.id);

            if cancel.is_cancelled() {
                mark_cancelled(&mut result);
                result.finish();
                return result;
            }

            if let Some(cond) = &step.condition {
                if !condition::evaluate(cond, context) {
                    tracing::info!("[StepExecutor] Skipping step {} (condition not met)", step.id);
                    result.status = WorkflowStatus::Skipped;
                    result.logs.push("Step skipped due to condition".to_string());
                    result.finish();
                    return result;
                }
            }

            tracing::info!(
                "[StepExecutor] Executing step {} ({})",
                step.id,
                step.step_type().as_str()
            );
            context.current_step = Some(step.id.clone());

            let outcome = match &step.kind {
                StepKind::Template { template } => {
                    self.run_template(step, template, context, &mut result).await
                }
                StepKind::Hook { hook } => self.run_hook(step, hook, context, &mut result).await,
                StepKind::Agent { agent } => {
                    self.run_agent(step, agent, context, cancel, &mut result).await
                }
                StepKind::Command { command } => {
                    self.run_command(step, command, context, cancel, &mut result)
                        .await
                }
                StepKind::Conditional { children } => {
                    self.run_conditional(step, children, context, cancel, &mut result)
                        .await
                }
                StepKind::Loop {
                    children,
                    items,
                    variable,
                } => {
                    self.run_loop(
                        step,
                        children,
                        items.as_ref(),
                        variable.as_deref(),
                        context,
                        cancel,
                        &mut result,
                    )
                    .await
                }
                StepKind::Parallel { children } => {
                    self.run_parallel(step, children, context, cancel, &mut result)
                        .await
                }
                StepKind::Sequential { children } => {
                    self.run_sequential(step, children, context, cancel, &mut result)
                        .await
                }
            };

            match outcome {
                Ok(()) => {
                    result.status = WorkflowStatus::Completed;
                    for (key, target) in &step.outputs {
                        if let Some(value) = result.outputs.get(key) {
                            context.set_variable(target, value.clone());
                        }
                    }
                }
                Err(failure) if failure.kind == FailureKind::Cancelled => {
                    mark_cancelled(&mut result);
                }
                Err(failure) => {
                    tracing::error!("[StepExecutor] Step {} failed: {}", step.id, failure.message);
                    result.fail(failure.kind, failure.message);
                }
            }
            result.finish();
            result
        })
    }

    // ── Leaf steps ─────────────────────────────────────────────────────

    async fn run_template(
        &self,
        step: &WorkflowStep,
        template: &str,
        context: &mut WorkflowContext,
        result: &mut StepResult,
    ) -> Result<(), Failure> {
        let inputs = context.resolve_inputs(&step.inputs);
        let outputs = self.templates.apply(template, &inputs, context).await?;
        result.outputs.extend(outputs);
        result.logs.push(format!("Applied template: {}", template));
        Ok(())
    }

    async fn run_hook(
        &self,
        step: &WorkflowStep,
        hook: &str,
        context: &mut WorkflowContext,
        result: &mut StepResult,
    ) -> Result<(), Failure> {
        let inputs = context.resolve_inputs(&step.inputs);
        let outputs = self.hooks.trigger(hook, &inputs, context).await?;
        result.outputs.extend(outputs);
        result.logs.push(format!("Triggered hook: {}", hook));
        Ok(())
    }

    /// Directory of the plugin providing `plugin`'s agents. Other plugins are
    /// looked up as siblings of this workflow's plugin directory.
    fn agent_plugin_path(&self, plugin: &str) -> PathBuf {
        if plugin == self.plugin_name {
            return self.plugin_path.clone();
        }
        match self.plugin_path.parent() {
            Some(root) => root.join(plugin),
            None => Path::new(plugin).to_path_buf(),
        }
    }

    async fn run_agent(
        &self,
        step: &WorkflowStep,
        agent_key: &str,
        context: &mut WorkflowContext,
        cancel: &CancellationToken,
        result: &mut StepResult,
    ) -> Result<(), Failure> {
        let (plugin, name) = parse_agent_key(agent_key)?;
        let definition = self
            .agents
            .get_agent(plugin, name)
            .ok_or_else(|| EngineError::AgentNotFound(agent_key.to_string()))?;

        let agent_context = AgentContext::new(context.project_path.clone())
            .with_variables(context.resolve_inputs(&step.inputs));

        let executor = AgentExecutor::new(plugin, definition, self.agent_plugin_path(plugin))
            .with_functions(Arc::clone(&self.functions))
            .with_debug(self.config.debug)
            .with_stream(self.config.stream)
            .with_parent_token(cancel);

        let response = executor
            .execute(&agent_context, &step.config, step.timeout)
            .await;

        match response.status {
            AgentStatus::Completed => {
                result.outputs.extend(response.results);
                result.artifacts.extend(response.artifacts);
                for message in &response.messages {
                    result
                        .logs
                        .push(format!("Agent {}: {}", agent_key, message.content));
                }
                Ok(())
            }
            AgentStatus::Cancelled => Err(Failure::cancelled()),
            status => {
                let message = if response.errors.is_empty() {
                    format!("Agent {} finished with status {:?}", agent_key, status)
                } else {
                    response.errors.join("; ")
                };
                let kind = if response
                    .errors
                    .iter()
                    .any(|e| e.starts_with("Agent timed out"))
                {
                    FailureKind::Timeout
                } else {
                    FailureKind::StepLocal
                };
                Err(Failure { kind, message })
            }
        }
    }

    async fn run_command(
        &self,
        step: &WorkflowStep,
        command: &str,
        context: &mut WorkflowContext,
        cancel: &CancellationToken,
        result: &mut StepResult,
    ) -> Result<(), Failure> {
        let timeout = step.timeout.unwrap_or(self.config.default_command_timeout);

        let mut cmd = Command::new(&self.config.shell);
        cmd.arg("-c").arg(command).current_dir(&context.project_path);
        for (key, value) in context.resolve_inputs(&step.inputs) {
            let value = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            cmd.env(key, value);
        }

        tracing::debug!("[StepExecutor] Running command for {}: {}", step.id, command);
        result.logs.push(format!("Command: {}", command));

        let output = match run_with_deadline(cmd, None, timeout, cancel).await {
            Ok(output) => output,
            Err(ProcessError::TimedOut(_)) => {
                return Err(Failure {
                    kind: FailureKind::Timeout,
                    message: format!("Command timed out after {}s", format_secs(timeout)),
                });
            }
            Err(ProcessError::Cancelled) => return Err(Failure::cancelled()),
            Err(e) => return Err(Failure::local(format!("Failed to run command: {}", e))),
        };

        result
            .outputs
            .insert("stdout".into(), Value::String(output.stdout.clone()));
        result
            .outputs
            .insert("stderr".into(), Value::String(output.stderr.clone()));
        result
            .outputs
            .insert("returncode".into(), Value::from(output.exit_code));

        if output.success() {
            Ok(())
        } else {
            Err(Failure::local(format!(
                "Command failed with code {}: {}",
                output.exit_code,
                output.stderr.trim_end()
            )))
        }
    }

    // ── Composite steps ────────────────────────────────────────────────

    async fn run_conditional(
        &self,
        step: &WorkflowStep,
        children: &[StepIndex],
        context: &mut WorkflowContext,
        cancel: &CancellationToken,
        result: &mut StepResult,
    ) -> Result<(), Failure> {
        let (check, on_true, on_false) = match children {
            [check, on_true] => (*check, *on_true, None),
            [check, on_true, on_false] => (*check, *on_true, Some(*on_false)),
            _ => {
                return Err(EngineError::invalid_step(
                    &step.id,
                    format!(
                        "conditional step requires 2 or 3 child steps, found {}",
                        children.len()
                    ),
                )
                .into())
            }
        };

        let check_result = self.execute_step(check, context, cancel).await;
        match check_result.status {
            WorkflowStatus::Cancelled => return Err(Failure::cancelled()),
            WorkflowStatus::Failed if check_result.is_structural() => {
                return Err(Failure::from_child(
                    &check_result,
                    check_result.error.clone().unwrap_or_default(),
                ));
            }
            _ => {}
        }

        let condition_met = check_result.status == WorkflowStatus::Completed;
        result
            .outputs
            .insert("condition_met".into(), Value::Bool(condition_met));

        let branch = if condition_met { Some(on_true) } else { on_false };
        let Some(branch) = branch else {
            result
                .logs
                .push(format!("Condition {} not met; no else branch", check_result.step_id));
            return Ok(());
        };

        let branch_result = self.execute_step(branch, context, cancel).await;
        match branch_result.status {
            WorkflowStatus::Cancelled => Err(Failure::cancelled()),
            WorkflowStatus::Failed => Err(Failure::from_child(
                &branch_result,
                format!(
                    "Branch {} failed: {}",
                    branch_result.step_id,
                    branch_result.error.as_deref().unwrap_or("unknown error")
                ),
            )),
            _ => {
                result
                    .logs
                    .push(format!("Took branch {}", branch_result.step_id));
                result.outputs.extend(branch_result.outputs);
                result.artifacts.extend(branch_result.artifacts);
                Ok(())
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_loop(
        &self,
        step: &WorkflowStep,
        children: &[StepIndex],
        items: Option<&LoopItems>,
        variable: Option<&str>,
        context: &mut WorkflowContext,
        cancel: &CancellationToken,
        result: &mut StepResult,
    ) -> Result<(), Failure> {
        if children.is_empty() {
            return Err(EngineError::invalid_step(&step.id, "loop step missing child steps").into());
        }

        let items: Vec<Value> = match items {
            None => Vec::new(),
            Some(LoopItems::Literal(values)) => values.clone(),
            Some(LoopItems::ContextPath(path)) => match context.lookup(path) {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(values)) => values,
                Some(other) => {
                    return Err(Failure::local(format!(
                        "Loop items at {} is not an array: {}",
                        path, other
                    )))
                }
            },
        };

        let variable = variable.unwrap_or("item");
        let index_variable = format!("{}_index", variable);
        let mut iterations = Vec::with_capacity(items.len());

        for (i, item) in items.into_iter().enumerate() {
            context.set_variable(variable, item);
            context.set_variable(&index_variable, Value::from(i));

            let mut iteration_outputs = JsonMap::new();
            for child in children {
                let child_result = self.execute_step(*child, context, cancel).await;
                match child_result.status {
                    WorkflowStatus::Cancelled => return Err(Failure::cancelled()),
                    WorkflowStatus::Failed => {
                        result.outputs.insert("iterations".into(), Value::from(i));
                        return Err(Failure::from_child(
                            &child_result,
                            format!(
                                "Loop iteration {} failed: {}",
                                i,
                                child_result.error.as_deref().unwrap_or("unknown error")
                            ),
                        ));
                    }
                    _ => {
                        iteration_outputs.extend(child_result.outputs);
                        result.artifacts.extend(child_result.artifacts);
                    }
                }
            }
            iterations.push(Value::Object(iteration_outputs));
        }

        result
            .outputs
            .insert("iterations".into(), Value::from(iterations.len()));
        result.outputs.insert("results".into(), Value::Array(iterations));
        Ok(())
    }

    async fn run_parallel(
        &self,
        step: &WorkflowStep,
        children: &[StepIndex],
        context: &mut WorkflowContext,
        cancel: &CancellationToken,
        result: &mut StepResult,
    ) -> Result<(), Failure> {
        if children.is_empty() {
            return Err(
                EngineError::invalid_step(&step.id, "parallel step missing child steps").into(),
            );
        }

        let mut set = JoinSet::new();
        for (position, child) in children.iter().copied().enumerate() {
            let executor = self.clone();
            let mut branch_context = context.clone();
            let token = cancel.clone();
            set.spawn(async move {
                let child_result = executor
                    .execute_step(child, &mut branch_context, &token)
                    .await;
                (position, child_result)
            });
        }

        let mut slots: Vec<Option<StepResult>> = vec![None; children.len()];
        let mut failures = Vec::new();
        let mut failure_kind = FailureKind::StepLocal;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((position, child_result)) => slots[position] = Some(child_result),
                Err(join_err) => {
                    failure_kind = FailureKind::Panic;
                    failures.push(format!("branch task failed: {}", join_err));
                }
            }
        }

        let mut cancelled = false;
        let mut sources: HashMap<String, String> = HashMap::new();
        for child_result in slots.into_iter().flatten() {
            match child_result.status {
                WorkflowStatus::Failed => {
                    if child_result.is_structural() {
                        failure_kind = FailureKind::Structural;
                    }
                    failures.push(format!(
                        "{}: {}",
                        child_result.step_id,
                        child_result.error.as_deref().unwrap_or("unknown error")
                    ));
                }
                WorkflowStatus::Cancelled => cancelled = true,
                _ => {
                    for (key, value) in child_result.outputs {
                        if let Some(previous) = sources.insert(key.clone(), child_result.step_id.clone())
                        {
                            tracing::warn!(
                                "[StepExecutor] Parallel output {} from {} overrides {}",
                                key,
                                child_result.step_id,
                                previous
                            );
                        }
                        result.outputs.insert(key, value);
                    }
                    result.artifacts.extend(child_result.artifacts);
                }
            }
        }

        if !failures.is_empty() {
            return Err(Failure {
                kind: failure_kind,
                message: format!("Parallel execution failed: {}", failures.join(", ")),
            });
        }
        if cancelled {
            return Err(Failure::cancelled());
        }
        Ok(())
    }

    async fn run_sequential(
        &self,
        step: &WorkflowStep,
        children: &[StepIndex],
        context: &mut WorkflowContext,
        cancel: &CancellationToken,
        result: &mut StepResult,
    ) -> Result<(), Failure> {
        if children.is_empty() {
            return Err(
                EngineError::invalid_step(&step.id, "sequential step missing child steps").into(),
            );
        }

        for child in children {
            let child_result = self.execute_step(*child, context, cancel).await;
            match child_result.status {
                WorkflowStatus::Cancelled => return Err(Failure::cancelled()),
                WorkflowStatus::Failed => {
                    return Err(Failure::from_child(
                        &child_result,
                        format!(
                            "Step {} failed: {}",
                            child_result.step_id,
                            child_result.error.as_deref().unwrap_or("unknown error")
                        ),
                    ));
                }
                _ => {
                    result.outputs.extend(child_result.outputs);
                    result.artifacts.extend(child_result.artifacts);
                }
            }
        }
        Ok(())
    }
}

/// Split `plugin/name`; both halves must be non-empty.
fn parse_agent_key(key: &str) -> Result<(&str, &str), EngineError> {
    match key.split_once('/') {
        Some((plugin, name)) if !plugin.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((plugin, name))
        }
        _ => Err(EngineError::InvalidAgentKey(key.to_string())),
    }
}

fn mark_cancelled(result: &mut StepResult) {
    result.fail(FailureKind::Cancelled, "Step cancelled");
    result.status = WorkflowStatus::Cancelled;
}
