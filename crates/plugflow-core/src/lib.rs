//! plugflow core: step-based execution engine for plugin workflows and agents.
//!
//! The crate runs in-memory [`WorkflowDefinition`](models::WorkflowDefinition)s
//! and [`AgentDefinition`](models::AgentDefinition)s. It has **no knowledge of
//! any declaration file format**; loading plugin directories is the job of
//! callers such as `plugflow-cli`.
//!
//! - [`workflow::WorkflowExecutor`] drives a run: traversal, retries, cycle detection
//! - [`workflow::StepExecutor`] executes one step per its kind
//! - [`agent::AgentExecutor`] runs a script or in-process agent
//! - [`agent::AgentRegistry`] / [`workflow::WorkflowRegistry`] hold definitions per plugin

pub mod agent;
pub mod config;
pub mod error;
pub mod models;
pub mod process;
pub mod workflow;

// Convenience re-exports
pub use agent::{AgentExecutor, AgentFunctionTable, AgentRegistry};
pub use config::EngineConfig;
pub use error::EngineError;
pub use workflow::{StepExecutor, WorkflowExecutor, WorkflowRegistry};
