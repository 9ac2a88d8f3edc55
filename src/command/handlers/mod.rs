//! Command handlers for different command types

mod ring;
mod say;
mod vibrate;

pub use ring::handle_ring;
pub use say::{handle_say, FALLBACK_LOCALE};
pub use vibrate::handle_vibrate;

use super::device::{Ringtone, SpeechSynth, Vibrator};
use std::sync::Arc;
use std::time::Duration;

/// Context passed to command handlers
#[derive(Clone)]
pub struct HandlerContext {
    pub ringtone: Arc<dyn Ringtone>,
    pub vibrator: Arc<dyn Vibrator>,
    pub speech: Arc<dyn SpeechSynth>,
    /// Locale the device speaks in
    pub locale: String,
    pub vibrate_duration: Duration,
}
