//! `plugflow agent`: list and run plugin agents.

use std::time::Duration;

use plugflow_core::models::{AgentCapability, AgentContext, AgentResponse, JsonMap};
use plugflow_core::{AgentExecutor, EngineConfig};
use tokio_util::sync::CancellationToken;

use super::{load, parse_key, parse_vars, print_json, read_json_object, truncate};
use crate::loader::LoadedPlugins;

/// List agents, optionally filtered by plugin, capability or a search query.
pub async fn list(
    plugins_dir: &str,
    plugin: Option<&str>,
    capability: Option<&str>,
    query: Option<&str>,
) -> Result<(), String> {
    let loaded = load(plugins_dir)?;

    let mut agents = match query {
        Some(query) => loaded.agents.search_agents(query),
        None => loaded.agents.get_all_agents().into_iter().collect(),
    };
    if let Some(capability) = capability {
        let capability = AgentCapability::from_str(capability)
            .ok_or_else(|| format!("Unknown capability: {}", capability))?;
        agents.retain(|(_, def)| def.has_capability(capability));
    }
    if let Some(plugin) = plugin {
        agents.retain(|(key, _)| key.split_once('/').is_some_and(|(owner, _)| owner == plugin));
    }
    agents.sort_by(|a, b| a.0.cmp(&b.0));

    if agents.is_empty() {
        println!("No agents found.");
        return Ok(());
    }

    println!("┌──────────────────────────────┬──────────────────────────┬──────────────────────────────┐");
    println!("│ Agent                        │ Capabilities             │ Description                  │");
    println!("├──────────────────────────────┼──────────────────────────┼──────────────────────────────┤");
    for (key, def) in &agents {
        let capabilities: Vec<&str> = def.capabilities.iter().map(|c| c.as_str()).collect();
        println!(
            "│ {:<28} │ {:<24} │ {:<28} │",
            truncate(key, 28),
            truncate(&capabilities.join(","), 24),
            truncate(&def.description, 28)
        );
    }
    println!("└──────────────────────────────┴──────────────────────────┴──────────────────────────────┘");
    Ok(())
}

/// Options of `plugflow agent run`.
#[derive(Debug, Clone, Default)]
pub struct AgentRunOptions {
    pub project: String,
    pub vars: Vec<String>,
    pub config_file: Option<String>,
    pub timeout_secs: Option<u64>,
    pub debug: bool,
}

/// Run a single agent and print its response as JSON.
pub async fn run(plugins_dir: &str, key: &str, options: AgentRunOptions) -> Result<(), String> {
    let loaded = load(plugins_dir)?;
    let variables = parse_vars(&options.vars)?;
    let config = match &options.config_file {
        Some(path) => read_json_object(path)?,
        None => JsonMap::new(),
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let response = execute(
        &loaded,
        key,
        AgentContext::new(&options.project).with_variables(variables),
        config,
        options.timeout_secs.map(Duration::from_secs),
        options.debug,
        &cancel,
    )
    .await?;

    let value = serde_json::to_value(&response).map_err(|e| e.to_string())?;
    print_json(&value);

    if response.is_completed() {
        Ok(())
    } else {
        Err(format!("Agent {} did not complete", key))
    }
}

/// Execute `plugin/agent` from already loaded plugins.
pub async fn execute(
    loaded: &LoadedPlugins,
    key: &str,
    context: AgentContext,
    config: JsonMap,
    timeout: Option<Duration>,
    debug: bool,
    cancel: &CancellationToken,
) -> Result<AgentResponse, String> {
    let (plugin, name) = parse_key(key)?;
    let definition = loaded
        .agents
        .get_agent(plugin, name)
        .ok_or_else(|| format!("Agent not found: {}", key))?;
    let plugin_path = loaded.plugin_path(plugin)?;
    let engine = EngineConfig::from_env();

    let executor = AgentExecutor::new(plugin, definition, plugin_path)
        .with_debug(debug || engine.debug)
        .with_stream(engine.stream)
        .with_parent_token(cancel);

    Ok(executor.execute(&context, &config, timeout).await)
}
