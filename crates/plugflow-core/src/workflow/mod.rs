//! Workflow execution.
//!
//! ```text
//! WorkflowDefinition ──► WorkflowExecutor ── traversal, retries, cycle check
//!                              │
//!                              ▼
//!                        StepExecutor ── one step per StepKind
//!                         │    │    │
//!        TemplateApplier ─┘    │    └─ process runner (COMMAND)
//!        HookTrigger           ▼
//!                        AgentExecutor (AGENT)
//! ```

pub mod condition;
pub mod delegates;
pub mod executor;
pub mod path;
pub mod registry;
pub mod step_executor;

pub use delegates::{
    AcknowledgingHooks, AcknowledgingTemplates, DelegateError, HookTrigger, TemplateApplier,
};
pub use executor::WorkflowExecutor;
pub use registry::WorkflowRegistry;
pub use step_executor::StepExecutor;
