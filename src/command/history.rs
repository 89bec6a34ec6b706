use anyhow::{Context, Result};

use super::CommandContext;

pub async fn run_checkpoint(ctx: &CommandContext, message: &str) -> Result<()> {
    let mut workspace = ctx.workspace();

    match workspace
        .checkpoint(message)
        .await
        .context("Failed to create checkpoint")?
    {
        Some(checkpoint) => println!(
            "✅ Created checkpoint {}: {}",
            checkpoint.short_id(),
            checkpoint.message
        ),
        None => println!("Nothing to commit, working tree clean."),
    }

    Ok(())
}

pub async fn run_rollback(ctx: &CommandContext) -> Result<()> {
    let mut workspace = ctx.workspace();

    let restored = workspace.rollback().await.context("Rollback failed")?;
    println!(
        "✅ Rolled back to {}: {}",
        restored.short_id(),
        restored.message
    );

    Ok(())
}
