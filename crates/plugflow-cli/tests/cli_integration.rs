//! Integration tests for the plugflow-cli commands.
//!
//! Each test writes a plugin directory to a tempdir, loads it the way the
//! binary does and drives the command handlers directly.

#![cfg(unix)]

use std::path::Path;

use plugflow_cli::commands::{agent, workflow};
use plugflow_cli::loader::{load_plugins, LoadedPlugins};
use plugflow_core::models::{AgentContext, AgentStatus, JsonMap, WorkflowStatus};
use serde_json::json;
use tokio_util::sync::CancellationToken;

const AGENTS: &str = r#"
agents:
  - name: counter
    description: Counts files in the project
    entry_point: count.sh
    capabilities: [code_review]
    timeout_seconds: 10
"#;

const COUNT_SH: &str = r#"cat > /dev/null
printf '{"status":"completed","results":{"files":3},"messages":[{"role":"assistant","content":"counted"}]}'
"#;

const RELEASE: &str = r#"
name: release
description: Prepare and announce a release
tags: [ci, release]
requires_agents: [tools/counter]
requires_hooks: [announce]
steps:
  - id: prepare
    type: command
    command: printf "$TARGET" | tee target.txt
    inputs:
      TARGET: variables.target
    outputs:
      stdout: variables.prepared
    on_success: review
  - id: review
    type: agent
    agent: tools/counter
    on_success: notify
  - id: notify
    type: hook
    hook: announce
"#;

const BROKEN: &str = r#"
name: broken
steps:
  - id: start
    type: template
    template: missing-template
    on_success: nowhere
"#;

const UNKNOWN_ASSET: &str = r#"
name: unknown-asset
steps:
  - id: render
    type: template
    template: missing-template
    on_failure: cleanup
  - id: cleanup
    type: command
    command: touch cleaned
"#;

fn write(path: &Path, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

fn plugins() -> (tempfile::TempDir, LoadedPlugins) {
    let root = tempfile::tempdir().unwrap();
    let tools = root.path().join("tools");
    write(&tools.join("agents").join("agents.yaml"), AGENTS);
    write(&tools.join("agents").join("count.sh"), COUNT_SH);
    write(&tools.join("workflows").join("release.yaml"), RELEASE);
    write(&tools.join("workflows").join("broken.yaml"), BROKEN);
    write(&tools.join("workflows").join("unknown-asset.yaml"), UNKNOWN_ASSET);
    write(&tools.join("hooks").join("announce.sh"), "");

    let loaded = load_plugins(root.path()).unwrap();
    (root, loaded)
}

#[tokio::test]
async fn test_workflow_run_end_to_end() {
    let (_root, loaded) = plugins();
    let project = tempfile::tempdir().unwrap();

    let mut vars = JsonMap::new();
    vars.insert("target".into(), json!("v1.2.0"));

    let result = workflow::execute(
        &loaded,
        "tools/release",
        &project.path().to_string_lossy(),
        None,
        Some(vars),
        false,
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(result.status, WorkflowStatus::Completed, "{:?}", result.errors);
    assert_eq!(result.path, vec!["prepare", "review", "notify"]);
    assert_eq!(result.outputs["files"], 3);
    assert_eq!(result.outputs["triggered"], true);
    assert_eq!(
        std::fs::read_to_string(project.path().join("target.txt")).unwrap(),
        "v1.2.0"
    );
    let context = result.final_context.unwrap();
    assert_eq!(context.variables["prepared"], "v1.2.0");
}

#[tokio::test]
async fn test_unknown_template_aborts_run() {
    let (_root, loaded) = plugins();
    let project = tempfile::tempdir().unwrap();

    let result = workflow::execute(
        &loaded,
        "tools/unknown-asset",
        &project.path().to_string_lossy(),
        None,
        None,
        false,
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(result.status, WorkflowStatus::Failed);
    assert_eq!(
        result.step_results["render"].error.as_deref(),
        Some("Template not found: missing-template")
    );
    assert_eq!(result.path, vec!["render"]);
    assert!(!project.path().join("cleaned").exists());
}

#[tokio::test]
async fn test_unknown_workflow_key() {
    let (_root, loaded) = plugins();
    let err = workflow::execute(
        &loaded,
        "tools/nope",
        ".",
        None,
        None,
        false,
        CancellationToken::new(),
    )
    .await
    .unwrap_err();
    assert_eq!(err, "Workflow not found: tools/nope");
}

#[test]
fn test_validate_reports_problems() {
    let (_root, loaded) = plugins();

    assert!(workflow::problems(&loaded, "tools/release").unwrap().is_empty());

    let problems = workflow::problems(&loaded, "tools/broken").unwrap();
    assert!(problems
        .iter()
        .any(|p| p.contains("references unknown") && p.contains("nowhere")));
}

#[tokio::test]
async fn test_agent_run_direct() {
    let (_root, loaded) = plugins();
    let project = tempfile::tempdir().unwrap();

    let response = agent::execute(
        &loaded,
        "tools/counter",
        AgentContext::new(project.path().to_string_lossy()),
        JsonMap::new(),
        None,
        false,
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(response.status, AgentStatus::Completed);
    assert_eq!(response.results["files"], 3);
    assert!(response.duration.is_some());
}

#[test]
fn test_registry_queries_after_load() {
    let (_root, loaded) = plugins();

    assert_eq!(
        loaded.workflows.list_workflows(Some("tools")),
        vec!["tools/broken", "tools/release", "tools/unknown-asset"]
    );
    let tagged = loaded.workflows.get_workflows_by_tag("release");
    assert_eq!(tagged.len(), 1);
    assert_eq!(tagged[0].0, "tools/release");

    let found = loaded.agents.search_agents("counts files");
    assert_eq!(found.len(), 1);
    assert!(loaded.warnings.is_empty());
}
