//! plugflow CLI: run plugin workflows and agents from a plugins directory.

use clap::{Parser, Subcommand};
use plugflow_cli::commands;
use plugflow_cli::commands::agent::AgentRunOptions;
use plugflow_cli::commands::workflow::RunOptions;

/// plugflow: step-based workflow and agent runner for plugins
#[derive(Parser)]
#[command(name = "plugflow", version, about = "plugflow: run plugin workflows and agents")]
pub struct Cli {
    /// Directory containing one sub-directory per plugin
    #[arg(long, env = "PLUGFLOW_PLUGINS_DIR", default_value = "plugins", global = true)]
    plugins_dir: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run, validate and list workflows
    Workflow {
        #[command(subcommand)]
        action: WorkflowAction,
    },

    /// List and run agents
    Agent {
        #[command(subcommand)]
        action: AgentAction,
    },
}

#[derive(Subcommand)]
enum WorkflowAction {
    /// Run a workflow against a project
    Run {
        /// Workflow key: <plugin>/<workflow>
        key: String,
        /// Project directory the steps run in
        #[arg(long, default_value = ".")]
        project: String,
        /// Initial variable, repeatable: --var key=value
        #[arg(long = "var")]
        vars: Vec<String>,
        /// JSON file with configuration layered over the workflow defaults
        #[arg(long)]
        config: Option<String>,
        /// Debug mode for agents
        #[arg(long)]
        debug: bool,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate one workflow, or all when no key is given
    Validate {
        /// Workflow key: <plugin>/<workflow>
        key: Option<String>,
    },

    /// List workflows
    List {
        /// Only workflows of this plugin
        #[arg(long)]
        plugin: Option<String>,
        /// Only workflows carrying this tag
        #[arg(long)]
        tag: Option<String>,
        /// Search name and description
        #[arg(long)]
        query: Option<String>,
    },
}

#[derive(Subcommand)]
enum AgentAction {
    /// List agents
    List {
        /// Only agents of this plugin
        #[arg(long)]
        plugin: Option<String>,
        /// Only agents with this capability (e.g. code_review)
        #[arg(long)]
        capability: Option<String>,
        /// Search name and description
        #[arg(long)]
        query: Option<String>,
    },

    /// Run a single agent and print its response
    Run {
        /// Agent key: <plugin>/<agent>
        key: String,
        /// Project directory passed to the agent
        #[arg(long, default_value = ".")]
        project: String,
        /// Context variable, repeatable: --var key=value
        #[arg(long = "var")]
        vars: Vec<String>,
        /// JSON file with agent configuration
        #[arg(long)]
        config: Option<String>,
        /// Override the agent's timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
        /// Debug mode
        #[arg(long)]
        debug: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plugflow_core=warn,plugflow_cli=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let plugins_dir = cli.plugins_dir.as_str();

    let result = match cli.command {
        Commands::Workflow { action } => match action {
            WorkflowAction::Run {
                key,
                project,
                vars,
                config,
                debug,
                json,
            } => {
                commands::workflow::run(
                    plugins_dir,
                    &key,
                    RunOptions {
                        project,
                        vars,
                        config_file: config,
                        debug,
                        json,
                    },
                )
                .await
            }
            WorkflowAction::Validate { key } => {
                commands::workflow::validate(plugins_dir, key.as_deref()).await
            }
            WorkflowAction::List { plugin, tag, query } => {
                commands::workflow::list(
                    plugins_dir,
                    plugin.as_deref(),
                    tag.as_deref(),
                    query.as_deref(),
                )
                .await
            }
        },
        Commands::Agent { action } => match action {
            AgentAction::List {
                plugin,
                capability,
                query,
            } => {
                commands::agent::list(
                    plugins_dir,
                    plugin.as_deref(),
                    capability.as_deref(),
                    query.as_deref(),
                )
                .await
            }
            AgentAction::Run {
                key,
                project,
                vars,
                config,
                timeout,
                debug,
            } => {
                commands::agent::run(
                    plugins_dir,
                    &key,
                    AgentRunOptions {
                        project,
                        vars,
                        config_file: config,
                        timeout_secs: timeout,
                        debug,
                    },
                )
                .await
            }
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
