use anyhow::{bail, Context, Result};
use tracing::info;

use crate::cli::EngineAction;
use crate::engine::{EngineClient, EngineSupervisor};

use super::CommandContext;

pub async fn run_engine(ctx: &CommandContext, action: EngineAction) -> Result<()> {
    match action {
        EngineAction::Start => start(ctx).await,
        EngineAction::Stop => stop(ctx).await,
        EngineAction::Health => health(ctx).await,
    }
}

/// Run the engine in the foreground; Ctrl-C stops it.
async fn start(ctx: &CommandContext) -> Result<()> {
    let mut supervisor = EngineSupervisor::new(ctx.config.engine.clone())?;
    supervisor
        .start()
        .await
        .context("Failed to start the analysis engine")?;

    let Some(pid) = supervisor.pid() else {
        println!(
            "✅ Engine already running at {}",
            supervisor.client().base_url()
        );
        return Ok(());
    };

    println!(
        "✅ Engine ready at {} (pid {}). Press Ctrl-C to stop.",
        supervisor.client().base_url(),
        pid
    );

    let exited = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            info!("Interrupted, stopping engine");
            None
        }
        status = supervisor.wait() => Some(status?),
    };
    supervisor.stop().await;

    match exited {
        None => Ok(()),
        Some(status) => bail!("Engine exited unexpectedly ({})", status),
    }
}

async fn stop(ctx: &CommandContext) -> Result<()> {
    let client = client(ctx)?;
    if client.health().await.is_err() {
        println!("Engine is not running on port {}.", ctx.config.engine.port);
        return Ok(());
    }

    client
        .shutdown()
        .await
        .context("Failed to send shutdown request")?;
    println!("✅ Shutdown requested");
    Ok(())
}

async fn health(ctx: &CommandContext) -> Result<()> {
    let client = client(ctx)?;
    match client.health().await {
        Ok(()) => {
            println!("✅ Engine healthy at {}", client.base_url());
            Ok(())
        }
        Err(e) => bail!("Engine unhealthy: {}", e),
    }
}

fn client(ctx: &CommandContext) -> Result<EngineClient> {
    Ok(EngineClient::new(
        ctx.config.engine.port,
        ctx.config.engine.request_timeout(),
    )?)
}
