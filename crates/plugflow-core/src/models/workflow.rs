//! Workflow definitions, runtime context and results.
//!
//! Steps live in a flat arena owned by [`WorkflowDefinition`] and are
//! addressed by [`StepIndex`]. Composite steps (conditional, loop, parallel,
//! sequential) hold the indices of their children rather than owning them, so
//! a definition is a plain `Vec` and structural checks never recurse through
//! owned trees.
//!
//! ```text
//! arena:  [0] lint(command)  [1] test(command)  [2] checks(parallel: 0, 1)  [3] publish(agent)
//! top:    [2, 3]                       entry_point = "checks"
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{duration_secs, JsonMap};
use crate::error::EngineError;
use crate::workflow::path;

// ─── Status & Kinds ─────────────────────────────────────────────────────

/// Status of a workflow run or of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
    Skipped,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The type tag of a step, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepType {
    Template,
    Hook,
    Agent,
    Command,
    Conditional,
    Loop,
    Parallel,
    Sequential,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::Hook => "hook",
            Self::Agent => "agent",
            Self::Command => "command",
            Self::Conditional => "conditional",
            Self::Loop => "loop",
            Self::Parallel => "parallel",
            Self::Sequential => "sequential",
        }
    }
}

/// Position of a step in its workflow's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepIndex(pub(crate) usize);

impl StepIndex {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Items a LOOP step iterates over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LoopItems {
    /// Literal values declared on the step.
    Literal(Vec<serde_json::Value>),
    /// Dot-path into the context that must resolve to an array.
    ContextPath(String),
}

/// Step payload, one variant per step type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StepKind {
    Template {
        template: String,
    },
    Hook {
        hook: String,
    },
    Agent {
        /// `plugin/name`
        agent: String,
    },
    Command {
        command: String,
    },
    /// `[condition, on_true, on_false?]`
    Conditional {
        children: Vec<StepIndex>,
    },
    Loop {
        children: Vec<StepIndex>,
        #[serde(default)]
        items: Option<LoopItems>,
        #[serde(default)]
        variable: Option<String>,
    },
    Parallel {
        children: Vec<StepIndex>,
    },
    Sequential {
        children: Vec<StepIndex>,
    },
}

impl StepKind {
    pub fn step_type(&self) -> StepType {
        match self {
            Self::Template { .. } => StepType::Template,
            Self::Hook { .. } => StepType::Hook,
            Self::Agent { .. } => StepType::Agent,
            Self::Command { .. } => StepType::Command,
            Self::Conditional { .. } => StepType::Conditional,
            Self::Loop { .. } => StepType::Loop,
            Self::Parallel { .. } => StepType::Parallel,
            Self::Sequential { .. } => StepType::Sequential,
        }
    }

    /// Child indices of a composite step; empty for leaf steps.
    pub fn children(&self) -> &[StepIndex] {
        match self {
            Self::Conditional { children }
            | Self::Loop { children, .. }
            | Self::Parallel { children }
            | Self::Sequential { children } => children,
            _ => &[],
        }
    }
}

// ─── Conditions ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    Equals,
    NotEquals,
    Contains,
    Exists,
    NotExists,
    GreaterThan,
    LessThan,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOperator {
    And,
    Or,
    Not,
}

/// Guard on a step, evaluated against the workflow context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepCondition {
    #[serde(rename = "type")]
    pub kind: ConditionKind,
    /// Dot-path into the serialized context, e.g. `variables.env`
    pub field: String,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default)]
    pub operator: Option<LogicalOperator>,
    #[serde(default)]
    pub conditions: Vec<StepCondition>,
}

impl StepCondition {
    pub fn new(kind: ConditionKind, field: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            kind,
            field: field.into(),
            value,
            operator: None,
            conditions: Vec::new(),
        }
    }

    pub fn equals(field: impl Into<String>, value: serde_json::Value) -> Self {
        Self::new(ConditionKind::Equals, field, value)
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Self::new(ConditionKind::Exists, field, serde_json::Value::Null)
    }

    pub fn greater_than(field: impl Into<String>, value: serde_json::Value) -> Self {
        Self::new(ConditionKind::GreaterThan, field, value)
    }

    pub fn combine(mut self, operator: LogicalOperator, conditions: Vec<StepCondition>) -> Self {
        self.operator = Some(operator);
        self.conditions = conditions;
        self
    }
}

// ─── Steps ──────────────────────────────────────────────────────────────

/// A single step of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// Unique within the workflow, children included
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(flatten)]
    pub kind: StepKind,
    /// Step-specific configuration (forwarded to agents)
    #[serde(default)]
    pub config: JsonMap,
    /// Input name → context dot-path
    #[serde(default)]
    pub inputs: BTreeMap<String, String>,
    /// Output key → context variable path
    #[serde(default)]
    pub outputs: BTreeMap<String, String>,
    #[serde(default)]
    pub condition: Option<StepCondition>,
    #[serde(default)]
    pub on_success: Option<String>,
    #[serde(default)]
    pub on_failure: Option<String>,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default, rename = "timeout_seconds", with = "duration_secs::option")]
    pub timeout: Option<Duration>,
}

impl WorkflowStep {
    pub fn new(id: impl Into<String>, kind: StepKind) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: None,
            kind,
            config: JsonMap::new(),
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
            condition: None,
            on_success: None,
            on_failure: None,
            retry_count: 0,
            timeout: None,
        }
    }

    pub fn command(id: impl Into<String>, command: impl Into<String>) -> Self {
        Self::new(id, StepKind::Command { command: command.into() })
    }

    pub fn template(id: impl Into<String>, template: impl Into<String>) -> Self {
        Self::new(id, StepKind::Template { template: template.into() })
    }

    pub fn hook(id: impl Into<String>, hook: impl Into<String>) -> Self {
        Self::new(id, StepKind::Hook { hook: hook.into() })
    }

    pub fn agent(id: impl Into<String>, agent: impl Into<String>) -> Self {
        Self::new(id, StepKind::Agent { agent: agent.into() })
    }

    pub fn conditional(id: impl Into<String>, children: Vec<StepIndex>) -> Self {
        Self::new(id, StepKind::Conditional { children })
    }

    pub fn sequential(id: impl Into<String>, children: Vec<StepIndex>) -> Self {
        Self::new(id, StepKind::Sequential { children })
    }

    pub fn parallel(id: impl Into<String>, children: Vec<StepIndex>) -> Self {
        Self::new(id, StepKind::Parallel { children })
    }

    pub fn loop_over(
        id: impl Into<String>,
        items: LoopItems,
        variable: Option<&str>,
        children: Vec<StepIndex>,
    ) -> Self {
        Self::new(
            id,
            StepKind::Loop {
                children,
                items: Some(items),
                variable: variable.map(str::to_string),
            },
        )
    }

    pub fn step_type(&self) -> StepType {
        self.kind.step_type()
    }

    pub fn on_success(mut self, next: impl Into<String>) -> Self {
        self.on_success = Some(next.into());
        self
    }

    pub fn on_failure(mut self, next: impl Into<String>) -> Self {
        self.on_failure = Some(next.into());
        self
    }

    pub fn with_retries(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_input(mut self, name: impl Into<String>, path: impl Into<String>) -> Self {
        self.inputs.insert(name.into(), path.into());
        self
    }

    pub fn with_output(mut self, key: impl Into<String>, path: impl Into<String>) -> Self {
        self.outputs.insert(key.into(), path.into());
        self
    }

    pub fn with_condition(mut self, condition: StepCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_config(mut self, config: JsonMap) -> Self {
        self.config = config;
        self
    }
}

// ─── Definition ─────────────────────────────────────────────────────────

/// A complete workflow declared by a plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Required agents in `plugin/agent` form
    #[serde(default)]
    pub requires_agents: Vec<String>,
    #[serde(default)]
    pub requires_hooks: Vec<String>,
    #[serde(default)]
    pub requires_templates: Vec<String>,
    #[serde(default = "default_entry_point")]
    pub entry_point: String,
    #[serde(default)]
    pub config_schema: Option<serde_json::Value>,
    #[serde(default)]
    pub default_config: JsonMap,
    /// Arena holding every step, children included
    steps: Vec<WorkflowStep>,
    /// Steps addressable by `entry_point`, `on_success` and `on_failure`
    top_level: Vec<StepIndex>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_entry_point() -> String {
    "main".to_string()
}

impl WorkflowDefinition {
    pub fn builder(name: impl Into<String>) -> WorkflowBuilder {
        WorkflowBuilder::new(name)
    }

    pub fn step(&self, index: StepIndex) -> Option<&WorkflowStep> {
        self.steps.get(index.0)
    }

    /// Every step in the arena, children included.
    pub fn all_steps(&self) -> &[WorkflowStep] {
        &self.steps
    }

    pub fn top_level(&self) -> impl Iterator<Item = (StepIndex, &WorkflowStep)> {
        self.top_level
            .iter()
            .filter_map(|idx| self.steps.get(idx.0).map(|s| (*idx, s)))
    }

    /// Number of top-level steps.
    pub fn top_level_count(&self) -> usize {
        self.top_level.len()
    }

    /// Find a top-level step by id.
    pub fn find_top_level(&self, id: &str) -> Option<StepIndex> {
        self.top_level
            .iter()
            .copied()
            .find(|idx| self.steps.get(idx.0).is_some_and(|s| s.id == id))
    }

    pub fn top_level_ids(&self) -> HashSet<&str> {
        self.top_level().map(|(_, s)| s.id.as_str()).collect()
    }

    /// Check the structural invariants of the definition.
    ///
    /// Children must precede their parent in the arena, which rules out
    /// nesting cycles without a graph walk.
    pub fn validate_structure(&self) -> Vec<EngineError> {
        let mut errors = Vec::new();

        let mut seen = HashSet::new();
        for step in &self.steps {
            if !seen.insert(step.id.as_str()) {
                errors.push(EngineError::DuplicateStep(step.id.clone()));
            }
        }

        let top_ids = self.top_level_ids();
        if !top_ids.contains(self.entry_point.as_str()) {
            errors.push(EngineError::InvalidEntryPoint(self.entry_point.clone()));
        }

        for (_, step) in self.top_level() {
            for target in [&step.on_success, &step.on_failure].into_iter().flatten() {
                if !top_ids.contains(target.as_str()) {
                    errors.push(EngineError::invalid_step(
                        &step.id,
                        format!("references unknown step: {}", target),
                    ));
                }
            }
        }

        for (position, step) in self.steps.iter().enumerate() {
            let children = step.kind.children();
            for child in children {
                if child.0 >= position {
                    errors.push(EngineError::invalid_step(
                        &step.id,
                        format!("child index {} must precede its parent", child.0),
                    ));
                }
            }
            match &step.kind {
                StepKind::Conditional { children } if !(2..=3).contains(&children.len()) => {
                    errors.push(EngineError::invalid_step(
                        &step.id,
                        format!(
                            "conditional step requires 2 or 3 child steps, found {}",
                            children.len()
                        ),
                    ));
                }
                StepKind::Loop { children, .. }
                | StepKind::Parallel { children }
                | StepKind::Sequential { children }
                    if children.is_empty() =>
                {
                    errors.push(EngineError::invalid_step(
                        &step.id,
                        format!("{} step missing child steps", step.step_type().as_str()),
                    ));
                }
                _ => {}
            }
        }

        errors
    }
}

/// Builds a [`WorkflowDefinition`] arena.
///
/// Children are added first with [`child`](Self::child); the composite
/// parent then references the returned indices.
#[derive(Debug)]
pub struct WorkflowBuilder {
    definition: WorkflowDefinition,
    entry_point_set: bool,
}

impl WorkflowBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            definition: WorkflowDefinition {
                display_name: name.clone(),
                name,
                description: String::new(),
                version: default_version(),
                author: None,
                tags: Vec::new(),
                requires_agents: Vec::new(),
                requires_hooks: Vec::new(),
                requires_templates: Vec::new(),
                entry_point: default_entry_point(),
                config_schema: None,
                default_config: JsonMap::new(),
                steps: Vec::new(),
                top_level: Vec::new(),
            },
            entry_point_set: false,
        }
    }

    /// Add a top-level step. The first one becomes the entry point unless
    /// [`entry_point`](Self::entry_point) is called.
    pub fn step(&mut self, step: WorkflowStep) -> StepIndex {
        let idx = self.push(step);
        self.definition.top_level.push(idx);
        idx
    }

    /// Add a nested step, to be referenced by a composite parent.
    pub fn child(&mut self, step: WorkflowStep) -> StepIndex {
        self.push(step)
    }

    pub fn entry_point(&mut self, id: impl Into<String>) -> &mut Self {
        self.definition.entry_point = id.into();
        self.entry_point_set = true;
        self
    }

    pub fn description(&mut self, description: impl Into<String>) -> &mut Self {
        self.definition.description = description.into();
        self
    }

    pub fn display_name(&mut self, display_name: impl Into<String>) -> &mut Self {
        self.definition.display_name = display_name.into();
        self
    }

    pub fn version(&mut self, version: impl Into<String>) -> &mut Self {
        self.definition.version = version.into();
        self
    }

    pub fn author(&mut self, author: impl Into<String>) -> &mut Self {
        self.definition.author = Some(author.into());
        self
    }

    pub fn tag(&mut self, tag: impl Into<String>) -> &mut Self {
        self.definition.tags.push(tag.into());
        self
    }

    pub fn requires_agent(&mut self, key: impl Into<String>) -> &mut Self {
        self.definition.requires_agents.push(key.into());
        self
    }

    pub fn requires_hook(&mut self, hook: impl Into<String>) -> &mut Self {
        self.definition.requires_hooks.push(hook.into());
        self
    }

    pub fn requires_template(&mut self, template: impl Into<String>) -> &mut Self {
        self.definition.requires_templates.push(template.into());
        self
    }

    pub fn default_config(&mut self, config: JsonMap) -> &mut Self {
        self.definition.default_config = config;
        self
    }

    pub fn config_schema(&mut self, schema: serde_json::Value) -> &mut Self {
        self.definition.config_schema = Some(schema);
        self
    }

    pub fn build(mut self) -> WorkflowDefinition {
        if !self.entry_point_set {
            let first = self
                .definition
                .top_level()
                .next()
                .map(|(_, step)| step.id.clone());
            if let Some(id) = first {
                self.definition.entry_point = id;
            }
        }
        self.definition
    }

    fn push(&mut self, step: WorkflowStep) -> StepIndex {
        let idx = StepIndex(self.definition.steps.len());
        self.definition.steps.push(step);
        idx
    }
}

// ─── Runtime Context ────────────────────────────────────────────────────

/// Mutable state threaded through one workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowContext {
    pub workflow_id: String,
    pub workflow_name: String,
    pub project_path: String,
    #[serde(default)]
    pub variables: JsonMap,
    #[serde(default)]
    pub config: JsonMap,
    #[serde(default)]
    pub current_step: Option<String>,
    #[serde(default)]
    pub completed_steps: Vec<String>,
    #[serde(default)]
    pub failed_steps: Vec<String>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: JsonMap,
}

impl WorkflowContext {
    pub fn new(workflow_name: impl Into<String>, project_path: impl Into<String>) -> Self {
        Self {
            workflow_id: uuid::Uuid::new_v4().to_string(),
            workflow_name: workflow_name.into(),
            project_path: project_path.into(),
            variables: JsonMap::new(),
            config: JsonMap::new(),
            current_step: None,
            completed_steps: Vec::new(),
            failed_steps: Vec::new(),
            started_at: None,
            metadata: JsonMap::new(),
        }
    }

    /// Look up a dot-path (`variables.user.name`, `config.region`,
    /// `completed_steps.0`) in the serialized context.
    pub fn lookup(&self, dot_path: &str) -> Option<serde_json::Value> {
        let snapshot = serde_json::to_value(self).ok()?;
        path::lookup(&snapshot, dot_path).cloned()
    }

    /// Resolve a step's input bindings; unresolved paths become `null`.
    pub fn resolve_inputs(&self, inputs: &BTreeMap<String, String>) -> JsonMap {
        if inputs.is_empty() {
            return JsonMap::new();
        }
        let snapshot = match serde_json::to_value(self) {
            Ok(v) => v,
            Err(_) => return JsonMap::new(),
        };
        inputs
            .iter()
            .map(|(name, dot_path)| {
                let value = path::lookup(&snapshot, dot_path)
                    .cloned()
                    .unwrap_or(serde_json::Value::Null);
                (name.clone(), value)
            })
            .collect()
    }

    /// Store a value under `variables`; a leading `variables.` is optional
    /// and nested segments create intermediate objects.
    pub fn set_variable(&mut self, dot_path: &str, value: serde_json::Value) {
        let relative = dot_path.strip_prefix("variables.").unwrap_or(dot_path);
        path::assign(&mut self.variables, relative, value);
    }
}

// ─── Results ────────────────────────────────────────────────────────────

/// Why a step failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Recoverable failure (non-zero exit, agent failure, delegate error)
    StepLocal,
    /// Bad reference or malformed step; aborts the run
    Structural,
    Timeout,
    Cancelled,
    /// A parallel branch panicked
    Panic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub kind: FailureKind,
    pub message: String,
}

/// Result of executing one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step_id: String,
    pub status: WorkflowStatus,
    #[serde(default)]
    pub outputs: JsonMap,
    #[serde(default)]
    pub artifacts: HashMap<String, String>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "duration_seconds", with = "duration_secs::option")]
    pub duration: Option<Duration>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_details: Option<ErrorDetails>,
    /// Number of attempts made (retries included)
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub logs: Vec<String>,
}

impl StepResult {
    pub fn start(step_id: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            status: WorkflowStatus::Running,
            outputs: JsonMap::new(),
            artifacts: HashMap::new(),
            started_at: Utc::now(),
            completed_at: None,
            duration: None,
            error: None,
            error_details: None,
            attempts: 1,
            logs: Vec::new(),
        }
    }

    pub fn fail(&mut self, kind: FailureKind, message: impl Into<String>) {
        let message = message.into();
        self.status = WorkflowStatus::Failed;
        self.error = Some(message.clone());
        self.error_details = Some(ErrorDetails { kind, message });
    }

    /// Stamp completion time and duration.
    pub fn finish(&mut self) {
        let now = Utc::now();
        self.completed_at = Some(now);
        self.duration = (now - self.started_at).to_std().ok();
    }

    pub fn is_failed(&self) -> bool {
        self.status == WorkflowStatus::Failed
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.error_details.as_ref().map(|d| d.kind)
    }

    pub fn is_structural(&self) -> bool {
        self.failure_kind() == Some(FailureKind::Structural)
    }
}

/// Result of a complete workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub workflow_id: String,
    pub workflow_name: String,
    pub status: WorkflowStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "duration_seconds", with = "duration_secs::option")]
    pub duration: Option<Duration>,
    #[serde(default)]
    pub step_results: HashMap<String, StepResult>,
    /// Top-level step ids in the order they ran
    #[serde(default)]
    pub path: Vec<String>,
    #[serde(default)]
    pub outputs: JsonMap,
    #[serde(default)]
    pub artifacts: HashMap<String, String>,
    pub total_steps: usize,
    #[serde(default)]
    pub completed_steps: usize,
    #[serde(default)]
    pub failed_steps: usize,
    #[serde(default)]
    pub skipped_steps: usize,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub final_context: Option<WorkflowContext>,
}

impl WorkflowResult {
    pub fn new(context: &WorkflowContext, total_steps: usize) -> Self {
        Self {
            workflow_id: context.workflow_id.clone(),
            workflow_name: context.workflow_name.clone(),
            status: WorkflowStatus::Pending,
            started_at: context.started_at.unwrap_or_else(Utc::now),
            completed_at: None,
            duration: None,
            step_results: HashMap::new(),
            path: Vec::new(),
            outputs: JsonMap::new(),
            artifacts: HashMap::new(),
            total_steps,
            completed_steps: 0,
            failed_steps: 0,
            skipped_steps: 0,
            errors: Vec::new(),
            final_context: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == WorkflowStatus::Completed
    }
}
