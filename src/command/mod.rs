mod checks;
mod engine;
mod history;
mod refactor;
mod serve;
mod status;

use anyhow::Result;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::cli::resolve_workspace_root;
use crate::config::Config;
use crate::workspace::Workspace;

pub use checks::{run_build, run_lint, run_test};
pub use engine::run_engine;
pub use history::{run_checkpoint, run_rollback};
pub use refactor::{run_analyze, run_refactor, RefactorKind};
pub use serve::run_mcp;
pub use status::run_status;

/// Repository root and effective configuration shared by every command.
pub struct CommandContext {
    pub root: PathBuf,
    pub config: Config,
}

impl CommandContext {
    pub fn load(workspace_root: Option<String>, port: Option<u16>) -> Result<Self> {
        let root = resolve_workspace_root(workspace_root)?;
        let mut config = Config::load(&root)?;
        if let Some(port) = port {
            config.engine.port = port;
        }
        Ok(Self { root, config })
    }

    pub fn workspace(&self) -> Workspace {
        Workspace::new(self.root.clone(), &self.config)
    }
}

/// Ask a yes/no question on the terminal; only an explicit yes counts.
fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N]: ", question);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();

    Ok(answer == "y" || answer == "yes")
}
