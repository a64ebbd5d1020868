//! AgentRegistry: thread-safe table of agent definitions keyed by
//! `(plugin, agent)`.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::models::{AgentCapability, AgentDefinition};

type Key = (String, String);

#[derive(Default)]
pub struct AgentRegistry {
    agents: RwLock<HashMap<Key, AgentDefinition>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_agent(&self, plugin_name: &str, agent: AgentDefinition) {
        let name = agent.name.clone();
        let mut agents = self.agents.write().unwrap_or_else(|e| e.into_inner());
        if agents
            .insert((plugin_name.to_string(), name.clone()), agent)
            .is_some()
        {
            tracing::warn!("[AgentRegistry] Overwriting agent {}/{}", plugin_name, name);
        } else {
            tracing::info!("[AgentRegistry] Registered agent {}/{}", plugin_name, name);
        }
    }

    /// Returns `true` if the agent was registered.
    pub fn unregister_agent(&self, plugin_name: &str, agent_name: &str) -> bool {
        let removed = self
            .agents
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&(plugin_name.to_string(), agent_name.to_string()))
            .is_some();
        if removed {
            tracing::info!("[AgentRegistry] Unregistered agent {}/{}", plugin_name, agent_name);
        }
        removed
    }

    /// Remove every agent of `plugin_name`; returns how many were removed.
    pub fn unregister_plugin_agents(&self, plugin_name: &str) -> usize {
        let mut agents = self.agents.write().unwrap_or_else(|e| e.into_inner());
        let before = agents.len();
        agents.retain(|(plugin, _), _| plugin != plugin_name);
        let removed = before - agents.len();
        if removed > 0 {
            tracing::info!(
                "[AgentRegistry] Unregistered {} agent(s) of plugin {}",
                removed,
                plugin_name
            );
        }
        removed
    }

    pub fn get_agent(&self, plugin_name: &str, agent_name: &str) -> Option<AgentDefinition> {
        self.agents
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(plugin_name.to_string(), agent_name.to_string()))
            .cloned()
    }

    /// Every agent keyed by `plugin/agent`.
    pub fn get_all_agents(&self) -> HashMap<String, AgentDefinition> {
        self.agents
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|((plugin, name), def)| (format!("{}/{}", plugin, name), def.clone()))
            .collect()
    }

    /// Sorted `plugin/agent` keys, or sorted local names when scoped to a plugin.
    pub fn list_agents(&self, plugin_name: Option<&str>) -> Vec<String> {
        let agents = self.agents.read().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = match plugin_name {
            Some(scope) => agents
                .keys()
                .filter(|(plugin, _)| plugin == scope)
                .map(|(_, name)| name.clone())
                .collect(),
            None => agents
                .keys()
                .map(|(plugin, name)| format!("{}/{}", plugin, name))
                .collect(),
        };
        names.sort();
        names
    }

    /// `(plugin/agent, definition)` pairs declaring `capability`, sorted by key.
    pub fn get_agents_by_capability(
        &self,
        capability: AgentCapability,
    ) -> Vec<(String, AgentDefinition)> {
        self.collect_sorted(|def| def.has_capability(capability))
    }

    /// Case-insensitive substring search over name, display name and description.
    pub fn search_agents(&self, query: &str) -> Vec<(String, AgentDefinition)> {
        let query = query.to_lowercase();
        self.collect_sorted(|def| {
            def.name.to_lowercase().contains(&query)
                || def.display_name.to_lowercase().contains(&query)
                || def.description.to_lowercase().contains(&query)
        })
    }

    pub fn len(&self) -> usize {
        self.agents.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn collect_sorted(
        &self,
        predicate: impl Fn(&AgentDefinition) -> bool,
    ) -> Vec<(String, AgentDefinition)> {
        let agents = self.agents.read().unwrap_or_else(|e| e.into_inner());
        let mut matches: Vec<(String, AgentDefinition)> = agents
            .iter()
            .filter(|(_, def)| predicate(def))
            .map(|((plugin, name), def)| (format!("{}/{}", plugin, name), def.clone()))
            .collect();
        matches.sort_by(|a, b| a.0.cmp(&b.0));
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> AgentRegistry {
        let reg = AgentRegistry::new();
        reg.register_agent(
            "quality",
            AgentDefinition::new("reviewer", "review.py")
                .with_capabilities(vec![AgentCapability::CodeReview])
                .with_description("Reviews pull requests"),
        );
        reg.register_agent(
            "quality",
            AgentDefinition::new("linter", "lint.sh")
                .with_capabilities(vec![AgentCapability::CodeReview, AgentCapability::Testing]),
        );
        reg.register_agent(
            "docs",
            AgentDefinition::new("writer", "write")
                .with_capabilities(vec![AgentCapability::Documentation]),
        );
        reg
    }

    #[test]
    fn test_list_all_and_scoped() {
        let reg = registry();
        assert_eq!(
            reg.list_agents(None),
            vec!["docs/writer", "quality/linter", "quality/reviewer"]
        );
        assert_eq!(reg.list_agents(Some("quality")), vec!["linter", "reviewer"]);
        assert!(reg.list_agents(Some("missing")).is_empty());
    }

    #[test]
    fn test_overwrite_keeps_single_entry() {
        let reg = registry();
        reg.register_agent("docs", AgentDefinition::new("writer", "write_v2"));
        assert_eq!(reg.len(), 3);
        assert_eq!(reg.get_agent("docs", "writer").unwrap().entry_point, "write_v2");
    }

    #[test]
    fn test_unregister_plugin_returns_count() {
        let reg = registry();
        assert_eq!(reg.unregister_plugin_agents("quality"), 2);
        assert_eq!(reg.unregister_plugin_agents("quality"), 0);
        assert!(reg.unregister_agent("docs", "writer"));
        assert!(!reg.unregister_agent("docs", "writer"));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_capability_and_text_search() {
        let reg = registry();
        let reviewers: Vec<String> = reg
            .get_agents_by_capability(AgentCapability::CodeReview)
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(reviewers, vec!["quality/linter", "quality/reviewer"]);

        let hits = reg.search_agents("PULL");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, "quality/reviewer");
        assert!(reg.get_all_agents().contains_key("docs/writer"));
    }
}
