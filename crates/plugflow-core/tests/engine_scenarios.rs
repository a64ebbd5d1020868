//! End-to-end workflow runs using real shell commands.
//!
//! Each test builds a workflow in memory, runs it against a temporary
//! project directory and checks the aggregated `WorkflowResult`.

#![cfg(unix)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use plugflow_core::models::{
    AgentDefinition, LoopItems, WorkflowBuilder, WorkflowResult, WorkflowStatus, WorkflowStep,
};
use plugflow_core::{AgentRegistry, EngineConfig, WorkflowExecutor};
use serde_json::json;

fn config() -> EngineConfig {
    EngineConfig::default().with_backoff_base(Duration::from_millis(50))
}

async fn run(builder: WorkflowBuilder, project: &std::path::Path) -> WorkflowResult {
    run_with_agents(builder, project, Arc::new(AgentRegistry::new()), project).await
}

async fn run_with_agents(
    builder: WorkflowBuilder,
    project: &std::path::Path,
    agents: Arc<AgentRegistry>,
    plugin_path: &std::path::Path,
) -> WorkflowResult {
    WorkflowExecutor::new(Arc::new(builder.build()), "demo", plugin_path, agents, config())
        .execute(project.to_string_lossy(), None, None)
        .await
}

#[tokio::test]
async fn test_success_then_failure() {
    let project = tempfile::tempdir().unwrap();
    let mut b = WorkflowBuilder::new("a-then-b");
    b.step(WorkflowStep::command("A", "echo built").on_success("B"));
    b.step(WorkflowStep::command("B", "echo broken >&2; exit 1"));

    let result = run(b, project.path()).await;

    assert_eq!(result.status, WorkflowStatus::Failed);
    assert_eq!(result.completed_steps, 1);
    assert_eq!(result.failed_steps, 1);
    assert!(result.step_results.contains_key("A"));
    assert!(result.step_results.contains_key("B"));
    assert_eq!(result.step_results["A"].outputs["stdout"], "built\n");
    assert_eq!(
        result.step_results["B"].error.as_deref(),
        Some("Command failed with code 1: broken")
    );
    assert_eq!(result.step_results["B"].outputs["returncode"], 1);
    assert_eq!(result.path, vec!["A", "B"]);
}

#[tokio::test]
async fn test_retry_count_runs_exactly_n_plus_one_times() {
    let project = tempfile::tempdir().unwrap();
    let mut b = WorkflowBuilder::new("retry");
    b.step(WorkflowStep::command("flaky", "echo attempt >> attempts.log; exit 1").with_retries(2));

    let started = Instant::now();
    let result = run(b, project.path()).await;
    let elapsed = started.elapsed();

    let log = std::fs::read_to_string(project.path().join("attempts.log")).unwrap();
    assert_eq!(log.lines().count(), 3);
    assert_eq!(result.step_results["flaky"].attempts, 3);
    assert_eq!(result.status, WorkflowStatus::Failed);
    // backoff of 50ms then 100ms
    assert!(elapsed >= Duration::from_millis(150), "elapsed {:?}", elapsed);
}

#[tokio::test]
async fn test_retry_succeeds_on_later_attempt() {
    let project = tempfile::tempdir().unwrap();
    let mut b = WorkflowBuilder::new("eventually");
    b.step(
        WorkflowStep::command(
            "second-time",
            "echo x >> tries; [ $(wc -l < tries) -ge 2 ]",
        )
        .with_retries(3),
    );

    let result = run(b, project.path()).await;
    assert_eq!(result.status, WorkflowStatus::Completed);
    assert_eq!(result.step_results["second-time"].attempts, 2);
}

#[tokio::test]
async fn test_cycle_detection() {
    let project = tempfile::tempdir().unwrap();
    let mut b = WorkflowBuilder::new("cycle");
    b.step(WorkflowStep::command("ping", "echo ping >> trace").on_success("pong"));
    b.step(WorkflowStep::command("pong", "echo pong >> trace").on_success("ping"));

    let result = run(b, project.path()).await;
    assert_eq!(result.status, WorkflowStatus::Failed);
    assert!(result
        .errors
        .iter()
        .any(|e| e == "Workflow cycle detected at step: ping"));
    let trace = std::fs::read_to_string(project.path().join("trace")).unwrap();
    assert_eq!(trace, "ping\npong\n");
}

#[tokio::test]
async fn test_conditional_branches() {
    let project = tempfile::tempdir().unwrap();
    let mut b = WorkflowBuilder::new("conditional");
    let check = b.child(WorkflowStep::command("check", "test -f marker"));
    let yes = b.child(WorkflowStep::command("yes", "echo present"));
    let no = b.child(WorkflowStep::command("no", "echo absent"));
    b.step(WorkflowStep::conditional("branch", vec![check, yes, no]));

    let result = run(b, project.path()).await;
    assert_eq!(result.status, WorkflowStatus::Completed);
    assert_eq!(result.outputs["stdout"], "absent\n");
    assert_eq!(result.outputs["condition_met"], false);
}

#[tokio::test]
async fn test_conditional_two_children_skips_branch_on_failure() {
    let project = tempfile::tempdir().unwrap();
    std::fs::write(project.path().join("ran"), "").unwrap();
    let mut b = WorkflowBuilder::new("conditional");
    let check = b.child(WorkflowStep::command("check", "exit 3"));
    let yes = b.child(WorkflowStep::command("yes", "rm ran"));
    b.step(WorkflowStep::conditional("branch", vec![check, yes]));

    let result = run(b, project.path()).await;
    assert_eq!(result.status, WorkflowStatus::Completed);
    assert!(project.path().join("ran").exists());
}

#[tokio::test]
async fn test_loop_over_literal_items_uses_env_inputs() {
    let project = tempfile::tempdir().unwrap();
    let mut b = WorkflowBuilder::new("loop");
    let body = b.child(
        WorkflowStep::command("touch", "touch \"$NAME-$IDX\"")
            .with_input("NAME", "variables.file")
            .with_input("IDX", "variables.file_index"),
    );
    b.step(WorkflowStep::loop_over(
        "files",
        LoopItems::Literal(vec![json!("alpha"), json!("beta")]),
        Some("file"),
        vec![body],
    ));

    let result = run(b, project.path()).await;
    assert_eq!(result.status, WorkflowStatus::Completed);
    assert_eq!(result.outputs["iterations"], 2);
    assert!(project.path().join("alpha-0").exists());
    assert!(project.path().join("beta-1").exists());
}

#[tokio::test]
async fn test_loop_over_empty_collection() {
    let project = tempfile::tempdir().unwrap();
    let mut b = WorkflowBuilder::new("loop");
    let body = b.child(WorkflowStep::command("never", "exit 1"));
    b.step(WorkflowStep::loop_over(
        "nothing",
        LoopItems::Literal(vec![]),
        None,
        vec![body],
    ));

    let result = run(b, project.path()).await;
    assert_eq!(result.status, WorkflowStatus::Completed);
    assert_eq!(result.outputs["iterations"], 0);
}

#[tokio::test]
async fn test_parallel_with_one_failure() {
    let project = tempfile::tempdir().unwrap();
    let mut b = WorkflowBuilder::new("fan-out");
    let ok1 = b.child(WorkflowStep::command("ok1", "sleep 0.1; touch ok1"));
    let bad = b.child(WorkflowStep::command("bad", "echo kaput >&2; exit 4"));
    let ok2 = b.child(WorkflowStep::command("ok2", "sleep 0.1; touch ok2"));
    b.step(WorkflowStep::parallel("all", vec![ok1, bad, ok2]));

    let result = run(b, project.path()).await;
    assert_eq!(result.status, WorkflowStatus::Failed);
    let error = result.step_results["all"].error.clone().unwrap();
    assert!(error.starts_with("Parallel execution failed"));
    assert!(error.contains("kaput"));
    // every branch ran to completion before the step returned
    assert!(project.path().join("ok1").exists());
    assert!(project.path().join("ok2").exists());
}

#[tokio::test]
async fn test_sequential_stops_at_first_failure() {
    let project = tempfile::tempdir().unwrap();
    let mut b = WorkflowBuilder::new("seq");
    let first = b.child(WorkflowStep::command("first", "touch first"));
    let second = b.child(WorkflowStep::command("second", "exit 9"));
    let third = b.child(WorkflowStep::command("third", "touch third"));
    b.step(WorkflowStep::sequential("steps", vec![first, second, third]));

    let result = run(b, project.path()).await;
    assert_eq!(result.status, WorkflowStatus::Failed);
    assert!(result.step_results["steps"]
        .error
        .as_deref()
        .unwrap()
        .starts_with("Step second failed"));
    assert!(project.path().join("first").exists());
    assert!(!project.path().join("third").exists());
}

#[tokio::test]
async fn test_command_timeout() {
    let project = tempfile::tempdir().unwrap();
    let mut b = WorkflowBuilder::new("slow");
    b.step(WorkflowStep::command("sleepy", "sleep 5").with_timeout(Duration::from_millis(300)));

    let started = Instant::now();
    let result = run(b, project.path()).await;
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(result.status, WorkflowStatus::Failed);
    assert_eq!(
        result.step_results["sleepy"].error.as_deref(),
        Some("Command timed out after 0.3s")
    );
}

#[tokio::test]
async fn test_command_timeout_with_background_child() {
    let project = tempfile::tempdir().unwrap();
    let mut b = WorkflowBuilder::new("detached");
    b.step(
        WorkflowStep::command("spawner", "sleep 4 & echo hi")
            .with_timeout(Duration::from_millis(500)),
    );

    let started = Instant::now();
    let result = run(b, project.path()).await;
    assert!(started.elapsed() < Duration::from_secs(2), "elapsed {:?}", started.elapsed());
    assert_eq!(result.status, WorkflowStatus::Failed);
    assert_eq!(
        result.step_results["spawner"].error.as_deref(),
        Some("Command timed out after 0.5s")
    );
}

#[tokio::test]
async fn test_output_binding_feeds_next_step() {
    let project = tempfile::tempdir().unwrap();
    let mut b = WorkflowBuilder::new("pipe");
    b.step(
        WorkflowStep::command("produce", "printf 42")
            .with_output("stdout", "variables.answer")
            .on_success("consume"),
    );
    b.step(
        WorkflowStep::command("consume", "printf \"$ANSWER\" > answer.txt")
            .with_input("ANSWER", "variables.answer"),
    );

    let result = run(b, project.path()).await;
    assert_eq!(result.status, WorkflowStatus::Completed);
    assert_eq!(
        std::fs::read_to_string(project.path().join("answer.txt")).unwrap(),
        "42"
    );
}

#[tokio::test]
async fn test_cancellation_stops_run() {
    let project = tempfile::tempdir().unwrap();
    let mut b = WorkflowBuilder::new("cancel");
    b.step(WorkflowStep::command("long", "sleep 5").on_success("after"));
    b.step(WorkflowStep::command("after", "touch after"));

    let executor = WorkflowExecutor::new(
        Arc::new(b.build()),
        "demo",
        project.path(),
        Arc::new(AgentRegistry::new()),
        config(),
    );
    let token = executor.cancel_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
    });

    let started = Instant::now();
    let result = executor.execute(project.path().to_string_lossy(), None, None).await;
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(result.status, WorkflowStatus::Cancelled);
    assert!(!project.path().join("after").exists());
}

#[tokio::test]
async fn test_script_agent_step() {
    let project = tempfile::tempdir().unwrap();
    let plugins = tempfile::tempdir().unwrap();
    let plugin_dir = plugins.path().join("quality");
    std::fs::create_dir_all(plugin_dir.join("agents")).unwrap();
    std::fs::write(
        plugin_dir.join("agents").join("review.sh"),
        "cat >/dev/null\nprintf '{\"status\":\"completed\",\"results\":{\"score\":9},\"messages\":[{\"role\":\"assistant\",\"content\":\"looks good\"}]}'\n",
    )
    .unwrap();

    let agents = Arc::new(AgentRegistry::new());
    agents.register_agent("quality", AgentDefinition::new("reviewer", "review.sh"));

    let mut b = WorkflowBuilder::new("review");
    b.step(WorkflowStep::agent("review", "quality/reviewer"));

    let result = run_with_agents(b, project.path(), agents, &plugin_dir).await;
    assert_eq!(result.status, WorkflowStatus::Completed, "{:?}", result.errors);
    assert_eq!(result.outputs["score"], 9);
    assert_eq!(
        result.step_results["review"].logs,
        vec!["Agent quality/reviewer: looks good".to_string()]
    );
}
