use clap::{Args, Parser, Subcommand};

/// Reducto - safety-checked refactoring with an MCP server
#[derive(Parser)]
#[command(name = "reducto")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Workspace root (auto-detects git root if absent)
    #[arg(short = 'w', long, global = true)]
    pub workspace_root: Option<String>,

    /// Port of the analysis engine on localhost
    #[arg(long, env = "REDUCTO_ENGINE_PORT", global = true)]
    pub port: Option<u16>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as MCP server over stdio
    Mcp,
    /// Show repository, project and engine status
    Status,
    /// Run the project's test suite
    Test,
    /// Run the project's linter
    Lint,
    /// Build the project
    Build,
    /// Commit all current changes as a checkpoint
    Checkpoint {
        /// Checkpoint message
        #[arg(short, long)]
        message: String,
    },
    /// Undo the latest checkpoint
    Rollback,
    /// Analyze the codebase for complexity hotspots and duplicates
    Analyze {
        /// Directory to analyze, relative to the workspace root
        #[arg(default_value = ".")]
        path: String,

        /// Write a baseline report under .reducto/
        #[arg(long)]
        report: bool,
    },
    /// Find duplicated code and consolidate it
    Deduplicate {
        #[arg(default_value = ".")]
        path: String,

        #[command(flatten)]
        apply: ApplyOptions,
    },
    /// Rewrite code into the language's idiomatic forms
    Idiomatize {
        #[arg(default_value = ".")]
        path: String,

        #[command(flatten)]
        apply: ApplyOptions,
    },
    /// Introduce a design pattern
    Pattern {
        /// Pattern name, e.g. strategy or factory
        name: String,

        #[arg(default_value = ".")]
        path: String,

        #[command(flatten)]
        apply: ApplyOptions,
    },
    /// Manage the analysis engine
    Engine {
        #[command(subcommand)]
        action: EngineAction,
    },
}

/// How a refactoring plan gets applied
#[derive(Args, Debug, Clone, Copy)]
pub struct ApplyOptions {
    /// Apply without asking for confirmation
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Keep the change without running the test suite
    #[arg(long)]
    pub no_tests: bool,

    /// Write a report under .reducto/
    #[arg(long)]
    pub report: bool,
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum EngineAction {
    /// Run the engine in the foreground until interrupted
    Start,
    /// Ask a running engine to shut down
    Stop,
    /// Check whether the engine answers
    Health,
}
