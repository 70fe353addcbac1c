use anyhow::Context;

use devilbox_core::DevilboxConfig;
use devilbox_tools::{ToolContext, ToolServer};

/// Serve tool calls on stdin/stdout until stdin closes.
pub async fn tools(config: DevilboxConfig) -> anyhow::Result<()> {
    ToolServer::new(ToolContext::system(config))
        .serve_stdio()
        .await
        .context("tool server i/o failed")
}
