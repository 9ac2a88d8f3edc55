//! Command handler - parses incoming commands and dispatches them

use super::handlers::{self, HandlerContext};
use crate::executor::{ActionError, ActionHandler, CancelContext};
use async_trait::async_trait;
use remote_agent_shared::Command;
use tracing::{info, warn};

/// Runs raw push commands on the command executor
pub struct CommandHandler {
    ctx: HandlerContext,
}

impl CommandHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl ActionHandler for CommandHandler {
    type Action = String;

    async fn handle(&self, raw: &String, _cancel: &CancelContext) -> Result<(), ActionError> {
        // Unsupported commands are ignored rather than reported
        let command = match Command::parse(raw) {
            Ok(command) => command,
            Err(e) => {
                warn!("[COMMAND] Ignoring {:?}: {}", raw, e);
                return Ok(());
            }
        };

        info!("[COMMAND] Executing command: {}", command);

        match &command {
            Command::Ring => handlers::handle_ring(&self.ctx).await,
            Command::Vibrate => handlers::handle_vibrate(&self.ctx).await,
            Command::Say { text } => handlers::handle_say(&self.ctx, text).await,
        }
    }

    fn failure_message(&self, raw: &String, _error: &ActionError) -> String {
        format!("Command execution failed: {}", raw)
    }
}
