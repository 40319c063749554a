//! Command-line front end for the tool gateway.
//!
//! Usage:
//!
//! ```text
//! toolplex --config toolplex.toml tools <server>
//! toolplex --config toolplex.toml call <server> <tool> --args '{"text":"hi"}'
//! toolplex --config toolplex.toml health [server]
//! toolplex --config toolplex.toml overview
//! ```
//!
//! Results are printed to stdout as JSON; logs go to stderr and are filtered
//! with `TOOLPLEX_LOG`.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use mockable::DefaultClock;
use serde::Serialize;
use serde_json::{Value, json};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use toolplex::gateway::{GatewayStack, InMemoryToolGateway, ToolCallOutcome};
use toolplex::jobs::domain::Job;
use toolplex::session::adapters::TokioProcessLauncher;
use toolplex::settings::Settings;
use toolplex::telemetry::{DEFAULT_FILTER, init_tracing};
use toolplex::tool_registry::domain::{CallerId, ToolServerId};

const JOB_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Parser)]
#[command(name = "toolplex", version, about = "Discover and invoke tools on JSON-RPC tool servers")]
struct Cli {
    /// Settings file describing the tool servers.
    #[arg(short, long, env = "TOOLPLEX_CONFIG", default_value = "toolplex.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the tools a server exposes.
    Tools {
        /// Server identity.
        server: String,
    },
    /// Invoke a tool.
    Call {
        /// Server identity.
        server: String,
        /// Tool name.
        tool: String,
        /// Tool arguments as a JSON object.
        #[arg(long, default_value = "{}")]
        args: String,
        /// Caller identity used for rate limiting and job ownership.
        #[arg(long, env = "TOOLPLEX_CALLER", default_value = "cli")]
        caller: String,
        /// Wait for queued jobs to finish instead of printing the job id.
        #[arg(long)]
        wait: bool,
    },
    /// Check one server, or every server when none is given.
    Health {
        /// Server identity.
        server: Option<String>,
    },
    /// Print every server with its health and tools.
    Overview,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(DEFAULT_FILTER);

    let settings = Settings::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let stack = GatewayStack::assemble(
        &settings,
        Arc::new(TokioProcessLauncher::new()),
        Arc::new(DefaultClock),
    )?;
    let ctrl_c = stack.sessions().shutdown_on_ctrl_c();

    let outcome = run(stack.gateway(), cli.command).await;
    stack.shutdown().await;
    ctrl_c.abort();
    outcome
}

async fn run(gateway: &InMemoryToolGateway<DefaultClock>, command: Command) -> Result<()> {
    match command {
        Command::Tools { server } => {
            let tools = gateway.list_tools(&ToolServerId::new(server)?).await?;
            print_json(&tools)
        }
        Command::Call {
            server,
            tool,
            args,
            caller,
            wait,
        } => {
            let arguments: Value =
                serde_json::from_str(&args).context("--args must be a JSON value")?;
            let outcome = gateway
                .call_tool(
                    &CallerId::new(caller)?,
                    &ToolServerId::new(server)?,
                    &tool,
                    arguments,
                )
                .await?;
            match outcome {
                ToolCallOutcome::Completed(response) => print_json(&response.to_json()),
                ToolCallOutcome::Queued(job_id) if wait => {
                    let job = wait_for_job(gateway, job_id).await?;
                    print_json(&job)
                }
                ToolCallOutcome::Queued(job_id) => print_json(&json!({ "job_id": job_id })),
            }
        }
        Command::Health {
            server: Some(server),
        } => {
            let health = gateway.health(&ToolServerId::new(server)?).await?;
            print_json(&health)
        }
        Command::Health { server: None } => {
            let overview = gateway.tool_overview().await?;
            let health: Vec<Value> = overview
                .servers
                .iter()
                .map(|entry| json!({ "server_id": entry.server_id, "health": entry.health }))
                .collect();
            print_json(&health)
        }
        Command::Overview => print_json(&gateway.tool_overview().await?),
    }
}

async fn wait_for_job(
    gateway: &InMemoryToolGateway<DefaultClock>,
    job_id: toolplex::jobs::domain::JobId,
) -> Result<Job> {
    loop {
        let job = gateway.job_status(job_id).await?;
        if job.status().is_terminal() {
            return Ok(job);
        }
        tokio::time::sleep(JOB_POLL_INTERVAL).await;
    }
}

fn print_json(value: &impl Serialize) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    let mut stdout = std::io::stdout().lock();
    if writeln!(stdout, "{text}").is_err() {
        bail!("stdout closed");
    }
    Ok(())
}
