use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod cli;
mod command;
mod config;
mod domain;
mod engine;
mod error;
mod git;
mod mcp;
mod process;
mod project;
mod report;
mod runner;
mod symbols;
mod workspace;

use cli::{Cli, Commands};
use command::{CommandContext, RefactorKind};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the MCP channel.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let ctx = CommandContext::load(cli.workspace_root, cli.port)?;

    match cli.command {
        Commands::Mcp => command::run_mcp(ctx).await,
        Commands::Status => command::run_status(&ctx).await,
        Commands::Test => command::run_test(&ctx).await,
        Commands::Lint => command::run_lint(&ctx).await,
        Commands::Build => command::run_build(&ctx).await,
        Commands::Checkpoint { message } => command::run_checkpoint(&ctx, &message).await,
        Commands::Rollback => command::run_rollback(&ctx).await,
        Commands::Analyze { path, report } => command::run_analyze(&ctx, &path, report).await,
        Commands::Deduplicate { path, apply } => {
            command::run_refactor(&ctx, RefactorKind::Deduplicate, &path, apply).await
        }
        Commands::Idiomatize { path, apply } => {
            command::run_refactor(&ctx, RefactorKind::Idiomatize, &path, apply).await
        }
        Commands::Pattern { name, path, apply } => {
            command::run_refactor(&ctx, RefactorKind::Pattern(name), &path, apply).await
        }
        Commands::Engine { action } => command::run_engine(&ctx, action).await,
    }
}
