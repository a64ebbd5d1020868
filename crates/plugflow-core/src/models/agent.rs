//! Agent definitions, execution context and responses.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{duration_secs, JsonMap};

/// Capabilities an agent can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentCapability {
    CodeReview,
    CodeGeneration,
    Documentation,
    Testing,
    Refactoring,
    SecurityAnalysis,
    PerformanceAnalysis,
    DependencyAnalysis,
    ArchitectureReview,
    General,
}

impl AgentCapability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CodeReview => "code_review",
            Self::CodeGeneration => "code_generation",
            Self::Documentation => "documentation",
            Self::Testing => "testing",
            Self::Refactoring => "refactoring",
            Self::SecurityAnalysis => "security_analysis",
            Self::PerformanceAnalysis => "performance_analysis",
            Self::DependencyAnalysis => "dependency_analysis",
            Self::ArchitectureReview => "architecture_review",
            Self::General => "general",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "code_review" => Some(Self::CodeReview),
            "code_generation" => Some(Self::CodeGeneration),
            "documentation" => Some(Self::Documentation),
            "testing" => Some(Self::Testing),
            "refactoring" => Some(Self::Refactoring),
            "security_analysis" => Some(Self::SecurityAnalysis),
            "performance_analysis" => Some(Self::PerformanceAnalysis),
            "dependency_analysis" => Some(Self::DependencyAnalysis),
            "architecture_review" => Some(Self::ArchitectureReview),
            "general" => Some(Self::General),
            _ => None,
        }
    }
}

/// Agent execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Idle,
    Initializing,
    Ready,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

/// A message in an agent conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMessage {
    /// "user", "assistant" or "system"
    pub role: String,
    pub content: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: JsonMap,
}

impl AgentMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            timestamp: Utc::now(),
            metadata: JsonMap::new(),
        }
    }
}

/// Context handed to an agent for one execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentContext {
    pub project_path: String,
    #[serde(default)]
    pub current_file: Option<String>,
    #[serde(default)]
    pub selected_text: Option<String>,
    #[serde(default)]
    pub variables: JsonMap,
    #[serde(default)]
    pub history: Vec<AgentMessage>,
    #[serde(default)]
    pub tools_available: Vec<String>,
}

impl AgentContext {
    pub fn new(project_path: impl Into<String>) -> Self {
        Self {
            project_path: project_path.into(),
            ..Default::default()
        }
    }

    pub fn with_variables(mut self, variables: JsonMap) -> Self {
        self.variables = variables;
        self
    }
}

/// An agent declared by a plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    /// Unique name within the providing plugin
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub capabilities: Vec<AgentCapability>,
    /// Script path (external process) or callable name (function table)
    pub entry_point: String,
    #[serde(default)]
    pub config_schema: Option<serde_json::Value>,
    #[serde(default)]
    pub requires_tools: Vec<String>,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(
        rename = "timeout_seconds",
        with = "duration_secs",
        default = "default_agent_timeout"
    )]
    pub timeout: Duration,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub examples: Vec<HashMap<String, String>>,
}

fn default_max_iterations() -> u32 {
    10
}

fn default_agent_timeout() -> Duration {
    Duration::from_secs(300)
}

/// How an agent's entry point is executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryPoint<'a> {
    /// Spawn a child process from this script path.
    Process(&'a Path),
    /// Look the name up in the plugin's function table.
    Callable(&'a str),
}

impl AgentDefinition {
    pub fn new(name: impl Into<String>, entry_point: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            description: String::new(),
            capabilities: Vec::new(),
            entry_point: entry_point.into(),
            config_schema: None,
            requires_tools: Vec::new(),
            max_iterations: default_max_iterations(),
            timeout: default_agent_timeout(),
            system_prompt: None,
            examples: Vec::new(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: Vec<AgentCapability>) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Entry points containing a path separator or a file extension are
    /// scripts; anything else names an in-process callable.
    pub fn entry_kind(&self) -> EntryPoint<'_> {
        let ep = self.entry_point.as_str();
        let path = Path::new(ep);
        if ep.contains('/') || ep.contains('\\') || path.extension().is_some() {
            EntryPoint::Process(path)
        } else {
            EntryPoint::Callable(ep)
        }
    }

    pub fn has_capability(&self, capability: AgentCapability) -> bool {
        self.capabilities.contains(&capability)
    }
}

/// The structured result of one agent execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub status: AgentStatus,
    #[serde(default)]
    pub messages: Vec<AgentMessage>,
    #[serde(default)]
    pub results: JsonMap,
    #[serde(default)]
    pub artifacts: HashMap<String, String>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub metadata: JsonMap,
    #[serde(default, rename = "duration_seconds", with = "duration_secs::option")]
    pub duration: Option<Duration>,
}

impl AgentResponse {
    pub fn new(status: AgentStatus) -> Self {
        Self {
            status,
            messages: Vec::new(),
            results: JsonMap::new(),
            artifacts: HashMap::new(),
            errors: Vec::new(),
            metadata: JsonMap::new(),
            duration: None,
        }
    }

    pub fn completed(results: JsonMap) -> Self {
        let mut response = Self::new(AgentStatus::Completed);
        response.results = results;
        response
    }

    pub fn failed(error: impl Into<String>) -> Self {
        let mut response = Self::new(AgentStatus::Failed);
        response.errors.push(error.into());
        response
    }

    pub fn is_completed(&self) -> bool {
        self.status == AgentStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_kind() {
        let script = AgentDefinition::new("reviewer", "review.py");
        assert_eq!(script.entry_kind(), EntryPoint::Process(Path::new("review.py")));

        let nested = AgentDefinition::new("reviewer", "bin/review");
        assert!(matches!(nested.entry_kind(), EntryPoint::Process(_)));

        let callable = AgentDefinition::new("reviewer", "review");
        assert_eq!(callable.entry_kind(), EntryPoint::Callable("review"));
    }

    #[test]
    fn test_definition_defaults_from_json() {
        let def: AgentDefinition = serde_json::from_value(serde_json::json!({
            "name": "doc-writer",
            "entry_point": "write_docs",
            "capabilities": ["documentation", "general"]
        }))
        .unwrap();
        assert_eq!(def.max_iterations, 10);
        assert_eq!(def.timeout, Duration::from_secs(300));
        assert!(def.has_capability(AgentCapability::Documentation));
        assert!(!def.has_capability(AgentCapability::Testing));
    }

    #[test]
    fn test_response_parses_minimal_document() {
        let resp: AgentResponse = serde_json::from_str(
            r#"{"status": "completed", "results": {"score": 7}, "artifacts": {"report.md": "ok"}}"#,
        )
        .unwrap();
        assert!(resp.is_completed());
        assert_eq!(resp.results["score"], 7);
        assert_eq!(resp.artifacts["report.md"], "ok");
        assert!(resp.duration.is_none());
    }

    #[test]
    fn test_capability_round_trip_names() {
        assert_eq!(
            AgentCapability::from_str("security_analysis"),
            Some(AgentCapability::SecurityAnalysis)
        );
        assert_eq!(AgentCapability::SecurityAnalysis.as_str(), "security_analysis");
        assert_eq!(AgentCapability::from_str("juggling"), None);
    }
}
