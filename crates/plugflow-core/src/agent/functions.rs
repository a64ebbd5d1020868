//! Table of in-process agent callables supplied by plugins.
//!
//! Agents whose entry point is a bare name (no path separator, no extension)
//! are resolved here by `(plugin, name)` instead of being spawned.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::models::{AgentContext, AgentResponse, AgentStatus, JsonMap};

/// Arguments handed to an in-process agent.
#[derive(Debug, Clone)]
pub struct AgentInvocation {
    pub context: AgentContext,
    pub config: JsonMap,
    pub stream: bool,
    pub debug: bool,
}

/// What an agent callable may return.
#[derive(Debug, Clone)]
pub enum AgentOutput {
    /// Kept as is.
    Response(AgentResponse),
    /// Must deserialize as an [`AgentResponse`].
    Json(serde_json::Value),
    /// Becomes a completed response with `results.output`.
    Text(String),
}

impl AgentOutput {
    pub fn into_response(self) -> Result<AgentResponse, String> {
        match self {
            AgentOutput::Response(response) => Ok(response),
            AgentOutput::Json(value) => serde_json::from_value(value).map_err(|e| e.to_string()),
            AgentOutput::Text(text) => {
                let mut response = AgentResponse::new(AgentStatus::Completed);
                response
                    .results
                    .insert("output".to_string(), serde_json::Value::String(text));
                Ok(response)
            }
        }
    }
}

/// An async agent implementation.
#[async_trait]
pub trait AgentFunction: Send + Sync {
    async fn call(&self, invocation: AgentInvocation) -> Result<AgentOutput, String>;
}

/// A synchronous agent implementation; runs on the blocking pool.
pub type BlockingAgentFn = dyn Fn(AgentInvocation) -> Result<AgentOutput, String> + Send + Sync;

#[derive(Clone)]
pub enum AgentCallable {
    Async(Arc<dyn AgentFunction>),
    Blocking(Arc<BlockingAgentFn>),
}

impl std::fmt::Debug for AgentCallable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentCallable::Async(_) => f.write_str("AgentCallable::Async"),
            AgentCallable::Blocking(_) => f.write_str("AgentCallable::Blocking"),
        }
    }
}

/// Callables keyed by `(plugin, entry point name)`.
#[derive(Default)]
pub struct AgentFunctionTable {
    functions: RwLock<HashMap<(String, String), AgentCallable>>,
}

impl AgentFunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, plugin: &str, name: &str, callable: AgentCallable) {
        let mut functions = self.functions.write().unwrap_or_else(|e| e.into_inner());
        if functions
            .insert((plugin.to_string(), name.to_string()), callable)
            .is_some()
        {
            tracing::warn!("[AgentFunctionTable] Overwriting function {}/{}", plugin, name);
        }
    }

    pub fn register_async(&self, plugin: &str, name: &str, function: impl AgentFunction + 'static) {
        self.register(plugin, name, AgentCallable::Async(Arc::new(function)));
    }

    pub fn register_blocking<F>(&self, plugin: &str, name: &str, function: F)
    where
        F: Fn(AgentInvocation) -> Result<AgentOutput, String> + Send + Sync + 'static,
    {
        self.register(plugin, name, AgentCallable::Blocking(Arc::new(function)));
    }

    pub fn get(&self, plugin: &str, name: &str) -> Option<AgentCallable> {
        self.functions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(plugin.to_string(), name.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.functions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_output_becomes_completed_response() {
        let response = AgentOutput::Text("done".into()).into_response().unwrap();
        assert!(response.is_completed());
        assert_eq!(response.results["output"], "done");
    }

    #[test]
    fn test_json_output_is_validated() {
        let ok = AgentOutput::Json(json!({"status": "failed", "errors": ["nope"]}))
            .into_response()
            .unwrap();
        assert_eq!(ok.status, AgentStatus::Failed);

        let bad = AgentOutput::Json(json!({"status": "exploded"})).into_response();
        assert!(bad.is_err());
    }

    #[test]
    fn test_table_lookup_is_scoped_by_plugin() {
        let table = AgentFunctionTable::new();
        table.register_blocking("docs", "summarize", |_| Ok(AgentOutput::Text("ok".into())));

        assert!(table.get("docs", "summarize").is_some());
        assert!(table.get("other", "summarize").is_none());
        assert_eq!(table.len(), 1);
    }
}
