//! Plugin directory loader: YAML declarations into engine registries.
//!
//! ```text
//! <plugins-dir>/
//!   <plugin>/
//!     agents/      agents.yaml (`agents: [...]`) or one agent per *.yaml
//!     workflows/   workflows.yaml (`workflows: [...]`) or one workflow per *.yaml
//!     hooks/       names available to HOOK steps
//!     templates/   names available to TEMPLATE steps
//! ```
//!
//! Workflow documents nest child steps under `steps:`; they are flattened
//! into the definition's step arena here. A file that fails to parse is
//! reported as a warning and skipped.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use plugflow_core::models::{
    AgentDefinition, JsonMap, LoopItems, StepCondition, StepIndex, StepKind, StepType,
    WorkflowBuilder, WorkflowDefinition, WorkflowStep,
};
use plugflow_core::{AgentRegistry, EngineError, WorkflowRegistry};
use serde::Deserialize;

// ─── Document schema ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AgentFile {
    Manifest { agents: Vec<AgentDefinition> },
    Single(AgentDefinition),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WorkflowFile {
    Manifest { workflows: Vec<WorkflowDoc> },
    Single(WorkflowDoc),
}

#[derive(Debug, Deserialize)]
struct WorkflowDoc {
    name: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    requires_agents: Vec<String>,
    #[serde(default)]
    requires_hooks: Vec<String>,
    #[serde(default)]
    requires_templates: Vec<String>,
    #[serde(default)]
    entry_point: Option<String>,
    #[serde(default)]
    config_schema: Option<serde_json::Value>,
    #[serde(default)]
    default_config: JsonMap,
    steps: Vec<StepDoc>,
}

#[derive(Debug, Deserialize)]
struct StepDoc {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "type")]
    step_type: StepType,
    #[serde(default)]
    template: Option<String>,
    #[serde(default)]
    hook: Option<String>,
    #[serde(default)]
    agent: Option<String>,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    steps: Vec<StepDoc>,
    #[serde(default)]
    loop_items: Option<LoopItems>,
    #[serde(default)]
    loop_variable: Option<String>,
    #[serde(default)]
    config: JsonMap,
    #[serde(default)]
    inputs: BTreeMap<String, String>,
    #[serde(default)]
    outputs: BTreeMap<String, String>,
    #[serde(default)]
    condition: Option<StepCondition>,
    #[serde(default)]
    on_success: Option<String>,
    #[serde(default)]
    on_failure: Option<String>,
    #[serde(default)]
    retry_count: u32,
    #[serde(default)]
    timeout_seconds: Option<f64>,
}

// ─── Conversion ─────────────────────────────────────────────────────────

/// Parse one YAML document holding a workflow or a `workflows:` manifest.
pub fn parse_workflows(yaml: &str) -> Result<Vec<WorkflowDefinition>, String> {
    let file: WorkflowFile =
        serde_yaml::from_str(yaml).map_err(|e| format!("Invalid workflow YAML: {}", e))?;
    let docs = match file {
        WorkflowFile::Manifest { workflows } => workflows,
        WorkflowFile::Single(doc) => vec![doc],
    };
    docs.into_iter().map(build_workflow).collect()
}

/// Parse one YAML document holding an agent or an `agents:` manifest.
pub fn parse_agents(yaml: &str) -> Result<Vec<AgentDefinition>, String> {
    let file: AgentFile =
        serde_yaml::from_str(yaml).map_err(|e| format!("Invalid agent YAML: {}", e))?;
    Ok(match file {
        AgentFile::Manifest { agents } => agents,
        AgentFile::Single(agent) => vec![agent],
    })
}

fn build_workflow(doc: WorkflowDoc) -> Result<WorkflowDefinition, String> {
    let mut builder = WorkflowBuilder::new(&doc.name);
    builder
        .description(doc.description)
        .display_name(doc.display_name.unwrap_or_else(|| doc.name.clone()))
        .default_config(doc.default_config);
    if let Some(version) = doc.version {
        builder.version(version);
    }
    if let Some(author) = doc.author {
        builder.author(author);
    }
    if let Some(schema) = doc.config_schema {
        builder.config_schema(schema);
    }
    for tag in doc.tags {
        builder.tag(tag);
    }
    for agent in doc.requires_agents {
        builder.requires_agent(agent);
    }
    for hook in doc.requires_hooks {
        builder.requires_hook(hook);
    }
    for template in doc.requires_templates {
        builder.requires_template(template);
    }
    if let Some(entry) = doc.entry_point {
        builder.entry_point(entry);
    }

    for step in doc.steps {
        let step = flatten_step(&mut builder, step)?;
        builder.step(step);
    }

    let workflow = builder.build();
    let duplicates: Vec<String> = workflow
        .validate_structure()
        .into_iter()
        .filter_map(|e| match e {
            EngineError::DuplicateStep(id) => Some(id),
            _ => None,
        })
        .collect();
    if !duplicates.is_empty() {
        return Err(format!(
            "Workflow {} has duplicate step ids: {}",
            workflow.name,
            duplicates.join(", ")
        ));
    }
    Ok(workflow)
}

/// Push `doc`'s children into the arena and return the step itself, ready
/// to be added as a child or a top-level step.
fn flatten_step(builder: &mut WorkflowBuilder, doc: StepDoc) -> Result<WorkflowStep, String> {
    let mut children: Vec<StepIndex> = Vec::with_capacity(doc.steps.len());
    for child in doc.steps {
        let child = flatten_step(builder, child)?;
        children.push(builder.child(child));
    }

    let require = |value: Option<String>, field: &str| {
        value.ok_or_else(|| {
            format!(
                "Step {} of type {} requires '{}'",
                doc.id,
                doc.step_type.as_str(),
                field
            )
        })
    };

    let kind = match doc.step_type {
        StepType::Template => StepKind::Template {
            template: require(doc.template, "template")?,
        },
        StepType::Hook => StepKind::Hook {
            hook: require(doc.hook, "hook")?,
        },
        StepType::Agent => StepKind::Agent {
            agent: require(doc.agent, "agent")?,
        },
        StepType::Command => StepKind::Command {
            command: require(doc.command, "command")?,
        },
        StepType::Conditional => StepKind::Conditional { children },
        StepType::Loop => StepKind::Loop {
            children,
            items: doc.loop_items,
            variable: doc.loop_variable,
        },
        StepType::Parallel => StepKind::Parallel { children },
        StepType::Sequential => StepKind::Sequential { children },
    };

    let mut step = WorkflowStep::new(doc.id, kind);
    if let Some(name) = doc.name {
        step.name = name;
    }
    step.description = doc.description;
    step.config = doc.config;
    step.inputs = doc.inputs;
    step.outputs = doc.outputs;
    step.condition = doc.condition;
    step.on_success = doc.on_success;
    step.on_failure = doc.on_failure;
    step.retry_count = doc.retry_count;
    step.timeout = match doc.timeout_seconds {
        Some(secs) => Some(
            Duration::try_from_secs_f64(secs)
                .map_err(|e| format!("Step {} has invalid timeout_seconds: {}", step.id, e))?,
        ),
        None => None,
    };
    Ok(step)
}

// ─── Plugin directories ─────────────────────────────────────────────────

/// Everything found under a plugins directory.
pub struct LoadedPlugins {
    pub agents: Arc<AgentRegistry>,
    pub workflows: Arc<WorkflowRegistry>,
    /// plugin name → plugin directory
    pub plugin_paths: HashMap<String, PathBuf>,
    /// plugin name → hook names under `hooks/`
    pub hooks: HashMap<String, HashSet<String>>,
    /// plugin name → template names under `templates/`
    pub templates: HashMap<String, HashSet<String>>,
    pub warnings: Vec<String>,
}

impl LoadedPlugins {
    pub fn plugin_path(&self, plugin: &str) -> Result<&Path, String> {
        self.plugin_paths
            .get(plugin)
            .map(PathBuf::as_path)
            .ok_or_else(|| format!("Plugin not found: {}", plugin))
    }

    pub fn all_hooks(&self) -> HashSet<String> {
        self.hooks.values().flatten().cloned().collect()
    }

    pub fn all_templates(&self) -> HashSet<String> {
        self.templates.values().flatten().cloned().collect()
    }
}

/// Load every plugin directory under `plugins_dir`.
pub fn load_plugins(plugins_dir: &Path) -> Result<LoadedPlugins, String> {
    let entries = std::fs::read_dir(plugins_dir).map_err(|e| {
        format!(
            "Failed to read plugins directory '{}': {}",
            plugins_dir.display(),
            e
        )
    })?;

    let mut plugin_dirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_dir())
        .collect();
    plugin_dirs.sort();

    let mut loaded = LoadedPlugins {
        agents: Arc::new(AgentRegistry::new()),
        workflows: Arc::new(WorkflowRegistry::new()),
        plugin_paths: HashMap::new(),
        hooks: HashMap::new(),
        templates: HashMap::new(),
        warnings: Vec::new(),
    };

    for dir in plugin_dirs {
        let Some(plugin) = dir.file_name().map(|n| n.to_string_lossy().to_string()) else {
            continue;
        };
        if plugin.starts_with('.') {
            continue;
        }

        for file in yaml_files(&dir.join("agents")) {
            match std::fs::read_to_string(&file)
                .map_err(|e| e.to_string())
                .and_then(|text| parse_agents(&text))
            {
                Ok(agents) => {
                    for agent in agents {
                        loaded.agents.register_agent(&plugin, agent);
                    }
                }
                Err(e) => warn(&mut loaded.warnings, &file, &e),
            }
        }

        for file in yaml_files(&dir.join("workflows")) {
            match std::fs::read_to_string(&file)
                .map_err(|e| e.to_string())
                .and_then(|text| parse_workflows(&text))
            {
                Ok(workflows) => {
                    for workflow in workflows {
                        loaded.workflows.register_workflow(&plugin, workflow);
                    }
                }
                Err(e) => warn(&mut loaded.warnings, &file, &e),
            }
        }

        loaded
            .hooks
            .insert(plugin.clone(), asset_names(&dir.join("hooks")));
        loaded
            .templates
            .insert(plugin.clone(), asset_names(&dir.join("templates")));
        loaded.plugin_paths.insert(plugin, dir);
    }

    Ok(loaded)
}

fn warn(warnings: &mut Vec<String>, file: &Path, error: &str) {
    tracing::warn!("[Loader] Skipping {}: {}", file.display(), error);
    warnings.push(format!("{}: {}", file.display(), error));
}

fn yaml_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && matches!(
                    path.extension().and_then(|e| e.to_str()),
                    Some("yaml") | Some("yml")
                )
        })
        .collect();
    files.sort();
    files
}

/// File stems and directory names directly under `dir`.
fn asset_names(dir: &Path) -> HashSet<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return HashSet::new();
    };
    entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter_map(|path| {
            let name = if path.is_dir() {
                path.file_name()
            } else {
                path.file_stem()
            };
            name.map(|n| n.to_string_lossy().to_string())
        })
        .filter(|name| !name.starts_with('.'))
        .collect()
}
