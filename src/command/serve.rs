use anyhow::Result;
use tracing::info;

use crate::mcp::run_mcp_server;
use crate::workspace::create_shared_workspace;

use super::CommandContext;

pub async fn run_mcp(ctx: CommandContext) -> Result<()> {
    info!("Workspace root: {}", ctx.root.display());
    run_mcp_server(create_shared_workspace(ctx.workspace())).await
}
