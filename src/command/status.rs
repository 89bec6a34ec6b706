use anyhow::Result;

use crate::engine::EngineClient;
use crate::error::ToolError;

use super::CommandContext;

pub async fn run_status(ctx: &CommandContext) -> Result<()> {
    let workspace = ctx.workspace();

    println!("Workspace: {}", ctx.root.display());
    println!("Project:   {}", workspace.runner().project_kind());

    match workspace.status().await {
        Ok(status) => {
            println!(
                "Branch:    {}",
                status.branch.as_deref().unwrap_or("(detached)")
            );
            match status.commit {
                Some(commit) => println!("Commit:    {}", &commit[..commit.len().min(8)]),
                None => println!("Commit:    (none yet)"),
            }
            if status.clean {
                println!("✅ Working tree clean");
            } else {
                println!("⚠️  {} uncommitted change(s):", status.changed_files.len());
                for file in &status.changed_files {
                    println!("   {}", file);
                }
            }
        }
        Err(ToolError::NotARepository(_)) => {
            println!("❌ Not a git repository");
            println!("   Checkpoints and safe edits need one: run 'git init'.");
        }
        Err(e) => return Err(e.into()),
    }

    let client = EngineClient::new(ctx.config.engine.port, ctx.config.engine.request_timeout())?;
    match client.health().await {
        Ok(()) => println!("✅ Engine ready at {}", client.base_url()),
        Err(_) => println!("❌ Engine not running on port {}", ctx.config.engine.port),
    }

    Ok(())
}
