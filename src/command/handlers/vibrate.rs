//! Vibrate command handler

use super::HandlerContext;
use crate::command::device::Vibrator;
use crate::executor::ActionError;
use remote_agent_shared::timing::{VIBRATE_PATTERN_MS, VIBRATE_REPEAT_INDEX};

struct VibrationGuard<'a>(&'a dyn Vibrator);

impl Drop for VibrationGuard<'_> {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// Handle `vibrate`: run the pattern for the configured duration
pub async fn handle_vibrate(ctx: &HandlerContext) -> Result<(), ActionError> {
    ctx.vibrator.vibrate(&VIBRATE_PATTERN_MS, VIBRATE_REPEAT_INDEX);
    let _vibration = VibrationGuard(ctx.vibrator.as_ref());

    tokio::time::sleep(ctx.vibrate_duration).await;
    Ok(())
}
