//! `plugflow workflow`: run, validate and list plugin workflows.

use std::collections::HashSet;
use std::sync::Arc;

use console::style;
use plugflow_core::models::{JsonMap, WorkflowResult, WorkflowStatus};
use plugflow_core::{EngineConfig, WorkflowExecutor};
use tokio_util::sync::CancellationToken;

use super::{load, parse_key, parse_vars, print_json, read_json_object, truncate};
use crate::assets::PluginAssets;
use crate::loader::LoadedPlugins;

/// Options of `plugflow workflow run`.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub project: String,
    pub vars: Vec<String>,
    pub config_file: Option<String>,
    pub debug: bool,
    pub json: bool,
}

/// Run a workflow and print its summary.
pub async fn run(plugins_dir: &str, key: &str, options: RunOptions) -> Result<(), String> {
    let loaded = load(plugins_dir)?;
    let variables = parse_vars(&options.vars)?;
    let config = match &options.config_file {
        Some(path) => Some(read_json_object(path)?),
        None => None,
    };

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n⏹️  Interrupted, cancelling workflow...");
            on_interrupt.cancel();
        }
    });

    if !options.json {
        println!("📄 Running workflow: {}", key);
        println!("   Project: {}", options.project);
        println!();
    }

    let result = execute(
        &loaded,
        key,
        &options.project,
        config,
        Some(variables),
        options.debug,
        cancel,
    )
    .await?;

    if options.json {
        let value = serde_json::to_value(&result).map_err(|e| e.to_string())?;
        print_json(&value);
    } else {
        print_summary(&result);
    }

    match result.status {
        WorkflowStatus::Completed => Ok(()),
        status => Err(format!("Workflow {} {}", key, status)),
    }
}

/// Execute `plugin/workflow` from already loaded plugins.
pub async fn execute(
    loaded: &LoadedPlugins,
    key: &str,
    project: &str,
    config: Option<JsonMap>,
    variables: Option<JsonMap>,
    debug: bool,
    cancel: CancellationToken,
) -> Result<WorkflowResult, String> {
    let (plugin, name) = parse_key(key)?;
    let workflow = loaded
        .workflows
        .get_workflow(plugin, name)
        .ok_or_else(|| format!("Workflow not found: {}", key))?;
    let plugin_path = loaded.plugin_path(plugin)?;

    let assets = Arc::new(PluginAssets::new(
        loaded.hooks.get(plugin).cloned().unwrap_or_default(),
        loaded.templates.get(plugin).cloned().unwrap_or_default(),
    ));
    let engine_config = EngineConfig::from_env().with_debug(debug);

    let executor = WorkflowExecutor::new(
        workflow,
        plugin,
        plugin_path,
        Arc::clone(&loaded.agents),
        engine_config,
    )
    .with_templates(assets.clone())
    .with_hooks(assets)
    .with_cancel_token(cancel);

    Ok(executor.execute(project, config, variables).await)
}

fn print_summary(result: &WorkflowResult) {
    let status = match result.status {
        WorkflowStatus::Completed => style(result.status.as_str()).green().bold(),
        WorkflowStatus::Cancelled => style(result.status.as_str()).yellow().bold(),
        _ => style(result.status.as_str()).red().bold(),
    };

    println!("┌──────────────────────┬────────────┬──────────┬──────────────────────────────┐");
    println!("│ Step                 │ Status     │ Attempts │ Error                        │");
    println!("├──────────────────────┼────────────┼──────────┼──────────────────────────────┤");
    for id in &result.path {
        if let Some(step) = result.step_results.get(id) {
            println!(
                "│ {:<20} │ {:<10} │ {:<8} │ {:<28} │",
                truncate(id, 20),
                step.status.as_str(),
                step.attempts,
                truncate(step.error.as_deref().unwrap_or(""), 28)
            );
        }
    }
    println!("└──────────────────────┴────────────┴──────────┴──────────────────────────────┘");
    println!();

    let secs = result.duration.map(|d| d.as_secs_f64()).unwrap_or_default();
    println!(
        "Workflow {}: {} ({} completed, {} failed, {} skipped, {:.2}s)",
        result.workflow_name,
        status,
        result.completed_steps,
        result.failed_steps,
        result.skipped_steps,
        secs
    );
    for error in &result.errors {
        println!("   ❌ {}", error);
    }
    if result.is_success() {
        println!("\n🎉 Workflow completed successfully!");
    }
}

/// Structural and requirement problems of one workflow.
pub fn problems(loaded: &LoadedPlugins, key: &str) -> Result<Vec<String>, String> {
    let (plugin, name) = parse_key(key)?;
    let workflow = loaded
        .workflows
        .get_workflow(plugin, name)
        .ok_or_else(|| format!("Workflow not found: {}", key))?;

    let agents: HashSet<String> = loaded.agents.list_agents(None).into_iter().collect();
    let mut problems: Vec<String> = workflow
        .validate_structure()
        .iter()
        .map(ToString::to_string)
        .collect();
    for problem in loaded.workflows.validate_workflow_requirements(
        &workflow,
        &agents,
        &loaded.all_hooks(),
        &loaded.all_templates(),
    ) {
        if !problems.contains(&problem) {
            problems.push(problem);
        }
    }
    Ok(problems)
}

/// Validate one workflow, or every loaded workflow when `key` is `None`.
pub async fn validate(plugins_dir: &str, key: Option<&str>) -> Result<(), String> {
    let loaded = load(plugins_dir)?;
    let keys = match key {
        Some(key) => vec![key.to_string()],
        None => loaded.workflows.list_workflows(None),
    };

    let mut invalid = 0;
    for key in &keys {
        let problems = problems(&loaded, key)?;
        if problems.is_empty() {
            println!("✅ {}", key);
        } else {
            invalid += 1;
            println!("❌ {}", key);
            for problem in problems {
                println!("   - {}", problem);
            }
        }
    }

    if invalid > 0 {
        Err(format!("{} of {} workflow(s) invalid", invalid, keys.len()))
    } else {
        println!("\n{} workflow(s) valid", keys.len());
        Ok(())
    }
}

/// List workflows, optionally filtered.
pub async fn list(
    plugins_dir: &str,
    plugin: Option<&str>,
    tag: Option<&str>,
    query: Option<&str>,
) -> Result<(), String> {
    let loaded = load(plugins_dir)?;
    let tags = tag.map(|t| vec![t.to_string()]);
    let matches = match (query, &tags) {
        (Some(query), tags) => loaded.workflows.search_workflows(query, tags.as_deref()),
        (None, Some(_)) => loaded.workflows.get_workflows_by_tag(tag.unwrap_or_default()),
        (None, None) => loaded.workflows.get_all_workflows().into_iter().collect(),
    };
    let mut matches: Vec<_> = matches
        .into_iter()
        .filter(|(key, _)| match plugin {
            Some(p) => key.split_once('/').is_some_and(|(owner, _)| owner == p),
            None => true,
        })
        .collect();
    matches.sort_by(|a, b| a.0.cmp(&b.0));

    if matches.is_empty() {
        println!("No workflows found.");
        return Ok(());
    }

    println!("┌──────────────────────────────┬───────┬────────────────────────────────────┐");
    println!("│ Workflow                     │ Steps │ Description                        │");
    println!("├──────────────────────────────┼───────┼────────────────────────────────────┤");
    for (key, workflow) in &matches {
        println!(
            "│ {:<28} │ {:<5} │ {:<34} │",
            truncate(key, 28),
            workflow.top_level_count(),
            truncate(&workflow.description, 34)
        );
    }
    println!("└──────────────────────────────┴───────┴────────────────────────────────────┘");
    Ok(())
}
