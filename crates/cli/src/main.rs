//! `switchboard` command-line front end.
//!
//! Loads a coordinator config, registers the agents it declares and runs
//! detection, routing or a workflow, printing JSON to stdout.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use switchboard_common::Params;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_CONFIG_FILE: &str = "switchboard.toml";

#[derive(Debug, Parser)]
#[command(
    name = "switchboard",
    about = "Route requests to department agents and run business workflows",
    after_help = "Examples:\n  switchboard detect \"inventory is low, reorder bolts\"\n  switchboard route \"who is on leave today?\"\n  switchboard workflows run employee_onboarding --context '{\"firstName\":\"Ada\"}'"
)]
pub struct Cli {
    /// Config file (defaults to ./switchboard.toml when present)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Show which department would handle a message, without routing it")]
    Detect {
        message: String,
        #[arg(long, help = "Request context as a JSON object")]
        context: Option<String>,
    },
    #[command(about = "Route a message to its department agent")]
    Route {
        message: String,
        #[arg(long, help = "Session id (random when omitted)")]
        session: Option<String>,
        #[arg(long, help = "Request context as a JSON object")]
        context: Option<String>,
    },
    #[command(about = "List registered agents, their capabilities and router statistics")]
    Agents,
    #[command(subcommand, about = "Inspect and run workflows")]
    Workflows(WorkflowCommand),
}

#[derive(Debug, Subcommand)]
enum WorkflowCommand {
    #[command(about = "List registered workflows")]
    List,
    #[command(about = "Pick a workflow from free text by keyword")]
    Detect { message: String },
    #[command(about = "Check a context against a workflow's required fields")]
    Validate {
        id: String,
        #[arg(long, help = "Workflow context as a JSON object")]
        context: Option<String>,
    },
    #[command(about = "Run a workflow")]
    Run {
        id: String,
        #[arg(long, help = "Workflow context as a JSON object")]
        context: Option<String>,
        #[arg(long, help = "Session id (random when omitted)")]
        session: Option<String>,
        #[arg(long, help = "Keep going after a failed step")]
        continue_on_error: bool,
        #[arg(long, help = "Run the graph variant of employee onboarding")]
        graph: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,switchboard=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let app = commands::App::load(cli.config.as_deref(), DEFAULT_CONFIG_FILE)?;

    match cli.command {
        Command::Detect { message, context } => {
            app.detect(&message, parse_context(context.as_deref())?).await
        }
        Command::Route {
            message,
            session,
            context,
        } => {
            app.route(&message, session, parse_context(context.as_deref())?)
                .await
        }
        Command::Agents => app.agents(),
        Command::Workflows(WorkflowCommand::List) => app.list_workflows(),
        Command::Workflows(WorkflowCommand::Detect { message }) => app.detect_workflow(&message),
        Command::Workflows(WorkflowCommand::Validate { id, context }) => {
            app.validate_workflow(&id, &parse_context(context.as_deref())?)
        }
        Command::Workflows(WorkflowCommand::Run {
            id,
            context,
            session,
            continue_on_error,
            graph,
        }) => {
            let run = commands::RunRequest {
                id,
                context: parse_context(context.as_deref())?,
                session,
                continue_on_error,
                graph,
            };
            app.run_workflow(run).await
        }
    }
}

fn parse_context(raw: Option<&str>) -> anyhow::Result<Params> {
    match raw {
        Some(raw) => serde_json::from_str(raw).context("--context must be a JSON object"),
        None => Ok(Params::new()),
    }
}
