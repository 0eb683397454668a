use std::sync::Arc;

use cmdgate_core::{CommandHandler, CommandResult, CommandSpec, InvocationContext};
use tokio_util::sync::CancellationToken;
use tracing::info;

struct Shutdown {
    token: CancellationToken,
}

impl CommandHandler for Shutdown {
    fn process(&self, ctx: &InvocationContext) -> CommandResult<()> {
        info!("shutdown requested by user {}", ctx.author().user_id);
        ctx.reply("Shutting down.")?;
        self.token.cancel();
        Ok(())
    }
}

/// Admin-only; cancels the host's shutdown token.
pub fn descriptor(token: CancellationToken) -> CommandSpec {
    CommandSpec::new("shutdown", Arc::new(Shutdown { token }))
        .with_description("Saves all state and stops the bot")
        .admin_only()
}
