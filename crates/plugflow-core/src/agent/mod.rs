//! Agent execution and lookup.
//!
//! - [`AgentExecutor`] runs a single agent, either as a script child process
//!   or as an in-process callable from an [`AgentFunctionTable`].
//! - [`AgentRegistry`] maps `(plugin, agent)` to its definition.

pub mod executor;
pub mod functions;
pub mod registry;

pub use executor::AgentExecutor;
pub use functions::{
    AgentCallable, AgentFunction, AgentFunctionTable, AgentInvocation, AgentOutput,
    BlockingAgentFn,
};
pub use registry::AgentRegistry;
