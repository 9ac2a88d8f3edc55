//! Ring command handler

use super::HandlerContext;
use crate::command::device::Playback;
use crate::executor::ActionError;
use std::ops::{Deref, DerefMut};
use tracing::debug;

/// Releases the player however the command ends
struct PlayerGuard(Box<dyn Playback>);

impl Deref for PlayerGuard {
    type Target = dyn Playback;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl DerefMut for PlayerGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.0.as_mut()
    }
}

impl Drop for PlayerGuard {
    fn drop(&mut self) {
        self.0.release();
    }
}

/// Handle `ring`: play the default ringtone once, to the end
pub async fn handle_ring(ctx: &HandlerContext) -> Result<(), ActionError> {
    let name = ctx.ringtone.name();

    let player = ctx.ringtone.open().await.map_err(|e| {
        ActionError::failed_with(format!("Failed to initialize player for {}", name), e)
    })?;
    let mut player = PlayerGuard(player);

    player.prepare().await.map_err(|e| {
        ActionError::failed_with(format!("Failed to prepare player for {}", name), e)
    })?;

    debug!("  [RING] Playing {}", name);
    player
        .play_to_end()
        .await
        .map_err(|e| ActionError::failed_with(format!("Playback of {} failed", name), e))
}
