//! AgentExecutor: runs one agent and always returns an [`AgentResponse`].
//!
//! Script agents are spawned as child processes and exchange a single JSON
//! document over stdio:
//!
//! ```text
//! stdin  ─► {"context": AgentContext, "config": {...}, "agent": AgentDefinition}
//! stdout ◄─ AgentResponse
//! ```
//!
//! Callable agents are resolved through the [`AgentFunctionTable`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use super::functions::{AgentCallable, AgentFunctionTable, AgentInvocation};
use crate::models::agent::EntryPoint;
use crate::models::{AgentContext, AgentDefinition, AgentResponse, AgentStatus, JsonMap};
use crate::process::{format_secs, run_with_deadline, ProcessError};

pub struct AgentExecutor {
    plugin_name: String,
    definition: AgentDefinition,
    plugin_path: PathBuf,
    functions: Arc<AgentFunctionTable>,
    debug: bool,
    stream: bool,
    cancel: CancellationToken,
}

impl AgentExecutor {
    pub fn new(
        plugin_name: impl Into<String>,
        definition: AgentDefinition,
        plugin_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            definition,
            plugin_path: plugin_path.into(),
            functions: Arc::new(AgentFunctionTable::new()),
            debug: false,
            stream: false,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_functions(mut self, functions: Arc<AgentFunctionTable>) -> Self {
        self.functions = functions;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Tie this executor to a parent token; cancelling the parent cancels the agent.
    pub fn with_parent_token(mut self, parent: &CancellationToken) -> Self {
        self.cancel = parent.child_token();
        self
    }

    pub fn definition(&self) -> &AgentDefinition {
        &self.definition
    }

    /// Terminate the running process or task.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    fn key(&self) -> String {
        format!("{}/{}", self.plugin_name, self.definition.name)
    }

    /// Run the agent. `timeout` defaults to the definition's timeout.
    pub async fn execute(
        &self,
        context: &AgentContext,
        config: &JsonMap,
        timeout: Option<Duration>,
    ) -> AgentResponse {
        let started = Instant::now();
        let timeout = timeout.unwrap_or(self.definition.timeout);

        tracing::info!(
            "[AgentExecutor:{}] Running (timeout {}s)",
            self.key(),
            format_secs(timeout)
        );

        let mut response = match self.definition.entry_kind() {
            EntryPoint::Process(script) => {
                self.execute_script(script, context, config, timeout).await
            }
            EntryPoint::Callable(name) => {
                self.execute_callable(name, context, config, timeout).await
            }
        };

        response.duration = Some(started.elapsed());
        if response.is_completed() {
            tracing::info!("[AgentExecutor:{}] Completed", self.key());
        } else {
            tracing::error!(
                "[AgentExecutor:{}] Finished with status {:?}: {}",
                self.key(),
                response.status,
                response.errors.join("; ")
            );
        }
        response
    }

    // ── Script agents ──────────────────────────────────────────────────

    fn script_path(&self, script: &Path) -> PathBuf {
        if script.is_absolute() {
            script.to_path_buf()
        } else {
            self.plugin_path.join("agents").join(script)
        }
    }

    fn script_command(&self, path: &Path) -> Command {
        let interpreter = match path.extension().and_then(|e| e.to_str()) {
            Some("py") => Some("python3"),
            Some("sh") => Some("sh"),
            Some("js") => Some("node"),
            _ => None,
        };
        let mut cmd = match interpreter {
            Some(program) => {
                let mut cmd = Command::new(program);
                cmd.arg(path);
                cmd
            }
            None => Command::new(path),
        };
        if self.debug {
            cmd.arg("--debug");
        }
        cmd.current_dir(&self.plugin_path);
        cmd
    }

    async fn execute_script(
        &self,
        script: &Path,
        context: &AgentContext,
        config: &JsonMap,
        timeout: Duration,
    ) -> AgentResponse {
        let path = self.script_path(script);
        if !path.exists() {
            return AgentResponse::failed(format!("Agent script not found: {}", path.display()));
        }

        let input = serde_json::json!({
            "context": context,
            "config": config,
            "agent": &self.definition,
        });
        let stdin = match serde_json::to_vec(&input) {
            Ok(bytes) => bytes,
            Err(e) => return AgentResponse::failed(format!("Execution error: {}", e)),
        };

        tracing::debug!(
            "[AgentExecutor:{}] Spawning {} (cwd: {})",
            self.key(),
            path.display(),
            self.plugin_path.display()
        );

        let output = match run_with_deadline(
            self.script_command(&path),
            Some(stdin),
            timeout,
            &self.cancel,
        )
        .await
        {
            Ok(output) => output,
            Err(ProcessError::TimedOut(_)) => {
                return AgentResponse::failed(timeout_message(timeout));
            }
            Err(ProcessError::Cancelled) => return cancelled_response(),
            Err(ProcessError::Spawn(e)) => {
                return AgentResponse::failed(format!("Failed to start agent script: {}", e));
            }
            Err(e) => return AgentResponse::failed(format!("Execution error: {}", e)),
        };

        if !output.success() {
            return AgentResponse::failed(format!("Script failed: {}", output.stderr.trim_end()));
        }

        match serde_json::from_str::<AgentResponse>(output.stdout.trim()) {
            Ok(response) => response,
            Err(e) => {
                let mut response = AgentResponse::failed(format!("Invalid output: {}", e));
                if self.debug {
                    response.metadata.insert(
                        "raw_output".to_string(),
                        serde_json::Value::String(output.stdout),
                    );
                }
                response
            }
        }
    }

    // ── Callable agents ────────────────────────────────────────────────

    async fn execute_callable(
        &self,
        name: &str,
        context: &AgentContext,
        config: &JsonMap,
        timeout: Duration,
    ) -> AgentResponse {
        let Some(callable) = self.functions.get(&self.plugin_name, name) else {
            return AgentResponse::failed(format!(
                "Agent function not found: {}/{}",
                self.plugin_name, name
            ));
        };

        let invocation = AgentInvocation {
            context: context.clone(),
            config: config.clone(),
            stream: self.stream,
            debug: self.debug,
        };

        let mut handle = match callable {
            AgentCallable::Async(function) => {
                tokio::spawn(async move { function.call(invocation).await })
            }
            // Blocking tasks cannot be aborted; on timeout they run to completion detached.
            AgentCallable::Blocking(function) => {
                tokio::task::spawn_blocking(move || function(invocation))
            }
        };

        let joined = tokio::select! {
            joined = &mut handle => joined,
            _ = tokio::time::sleep(timeout) => {
                handle.abort();
                return AgentResponse::failed(timeout_message(timeout));
            }
            _ = self.cancel.cancelled() => {
                handle.abort();
                return cancelled_response();
            }
        };

        let output = match joined {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return AgentResponse::failed(format!("Agent function error: {}", e)),
            Err(join_err) if join_err.is_panic() => {
                let mut response = AgentResponse::failed("Agent function panicked");
                if self.debug {
                    response.errors.push(panic_message(join_err.into_panic()));
                }
                return response;
            }
            Err(join_err) => {
                return AgentResponse::failed(format!("Agent task failed: {}", join_err));
            }
        };

        output.into_response().unwrap_or_else(|e| {
            AgentResponse::failed(format!("Invalid output: {}", e))
        })
    }
}

fn timeout_message(timeout: Duration) -> String {
    format!("Agent timed out after {}s", format_secs(timeout))
}

fn cancelled_response() -> AgentResponse {
    let mut response = AgentResponse::new(AgentStatus::Cancelled);
    response.errors.push("Agent execution cancelled".to_string());
    response
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
