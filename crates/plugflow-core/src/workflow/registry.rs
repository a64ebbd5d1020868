//! WorkflowRegistry: thread-safe table of workflow definitions keyed by
//! `(plugin, workflow)`.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::models::WorkflowDefinition;

type Key = (String, String);

#[derive(Default)]
pub struct WorkflowRegistry {
    workflows: RwLock<HashMap<Key, Arc<WorkflowDefinition>>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_workflow(&self, plugin_name: &str, workflow: WorkflowDefinition) {
        let name = workflow.name.clone();
        let mut workflows = self.workflows.write().unwrap_or_else(|e| e.into_inner());
        if workflows
            .insert((plugin_name.to_string(), name.clone()), Arc::new(workflow))
            .is_some()
        {
            tracing::warn!("[WorkflowRegistry] Overwriting workflow {}/{}", plugin_name, name);
        } else {
            tracing::info!("[WorkflowRegistry] Registered workflow {}/{}", plugin_name, name);
        }
    }

    pub fn unregister_workflow(&self, plugin_name: &str, workflow_name: &str) -> bool {
        let removed = self
            .workflows
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&(plugin_name.to_string(), workflow_name.to_string()))
            .is_some();
        if removed {
            tracing::info!(
                "[WorkflowRegistry] Unregistered workflow {}/{}",
                plugin_name,
                workflow_name
            );
        }
        removed
    }

    /// Remove every workflow of `plugin_name`; returns how many were removed.
    pub fn unregister_plugin_workflows(&self, plugin_name: &str) -> usize {
        let mut workflows = self.workflows.write().unwrap_or_else(|e| e.into_inner());
        let before = workflows.len();
        workflows.retain(|(plugin, _), _| plugin != plugin_name);
        before - workflows.len()
    }

    pub fn get_workflow(
        &self,
        plugin_name: &str,
        workflow_name: &str,
    ) -> Option<Arc<WorkflowDefinition>> {
        self.workflows
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(plugin_name.to_string(), workflow_name.to_string()))
            .cloned()
    }

    /// Every workflow keyed by `plugin/workflow`.
    pub fn get_all_workflows(&self) -> HashMap<String, Arc<WorkflowDefinition>> {
        self.workflows
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|((plugin, name), wf)| (format!("{}/{}", plugin, name), Arc::clone(wf)))
            .collect()
    }

    /// Sorted `plugin/workflow` keys, or sorted local names when scoped.
    pub fn list_workflows(&self, plugin_name: Option<&str>) -> Vec<String> {
        let workflows = self.workflows.read().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = match plugin_name {
            Some(scope) => workflows
                .keys()
                .filter(|(plugin, _)| plugin == scope)
                .map(|(_, name)| name.clone())
                .collect(),
            None => workflows
                .keys()
                .map(|(plugin, name)| format!("{}/{}", plugin, name))
                .collect(),
        };
        names.sort();
        names
    }

    pub fn get_workflows_by_tag(&self, tag: &str) -> Vec<(String, Arc<WorkflowDefinition>)> {
        self.collect_sorted(|wf| wf.tags.iter().any(|t| t == tag))
    }

    /// Case-insensitive search over name, display name and description,
    /// optionally restricted to workflows carrying any of `tags`.
    pub fn search_workflows(
        &self,
        query: &str,
        tags: Option<&[String]>,
    ) -> Vec<(String, Arc<WorkflowDefinition>)> {
        let query = query.to_lowercase();
        self.collect_sorted(|wf| {
            let text_match = wf.name.to_lowercase().contains(&query)
                || wf.display_name.to_lowercase().contains(&query)
                || wf.description.to_lowercase().contains(&query);
            let tag_match = match tags {
                Some(tags) => tags.iter().any(|t| wf.tags.contains(t)),
                None => true,
            };
            text_match && tag_match
        })
    }

    /// Report unmet requirements and broken references of `workflow`.
    ///
    /// `available_agents` holds `plugin/agent` keys.
    pub fn validate_workflow_requirements(
        &self,
        workflow: &WorkflowDefinition,
        available_agents: &HashSet<String>,
        available_hooks: &HashSet<String>,
        available_templates: &HashSet<String>,
    ) -> Vec<String> {
        let mut errors = Vec::new();

        for agent in &workflow.requires_agents {
            if !available_agents.contains(agent) {
                errors.push(format!("Required agent not found: {}", agent));
            }
        }
        for hook in &workflow.requires_hooks {
            if !available_hooks.contains(hook) {
                errors.push(format!("Required hook not found: {}", hook));
            }
        }
        for template in &workflow.requires_templates {
            if !available_templates.contains(template) {
                errors.push(format!("Required template not found: {}", template));
            }
        }

        let step_ids = workflow.top_level_ids();
        for (_, step) in workflow.top_level() {
            if let Some(next) = &step.on_success {
                if !step_ids.contains(next.as_str()) {
                    errors.push(format!(
                        "Step {} references unknown on_success: {}",
                        step.id, next
                    ));
                }
            }
            if let Some(next) = &step.on_failure {
                if !step_ids.contains(next.as_str()) {
                    errors.push(format!(
                        "Step {} references unknown on_failure: {}",
                        step.id, next
                    ));
                }
            }
        }

        if !step_ids.contains(workflow.entry_point.as_str()) {
            errors.push(format!("Entry point not found: {}", workflow.entry_point));
        }

        errors
    }

    pub fn len(&self) -> usize {
        self.workflows.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn collect_sorted(
        &self,
        predicate: impl Fn(&WorkflowDefinition) -> bool,
    ) -> Vec<(String, Arc<WorkflowDefinition>)> {
        let workflows = self.workflows.read().unwrap_or_else(|e| e.into_inner());
        let mut matches: Vec<(String, Arc<WorkflowDefinition>)> = workflows
            .iter()
            .filter(|(_, wf)| predicate(wf))
            .map(|((plugin, name), wf)| (format!("{}/{}", plugin, name), Arc::clone(wf)))
            .collect();
        matches.sort_by(|a, b| a.0.cmp(&b.0));
        matches
    }
}
