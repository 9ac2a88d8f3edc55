//! Say command handler

use super::HandlerContext;
use crate::command::device::{LanguageSupport, SpeechSession};
use crate::executor::ActionError;
use std::ops::{Deref, DerefMut};
use tracing::debug;

/// Locale used when the device locale cannot be spoken
pub const FALLBACK_LOCALE: &str = "en";

struct SpeechGuard(Box<dyn SpeechSession>);

impl Deref for SpeechGuard {
    type Target = dyn SpeechSession;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl DerefMut for SpeechGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.0.as_mut()
    }
}

impl Drop for SpeechGuard {
    fn drop(&mut self) {
        self.0.shutdown();
    }
}

/// Handle `say <text>`: speak the text and wait for the utterance to end
pub async fn handle_say(ctx: &HandlerContext, text: &str) -> Result<(), ActionError> {
    debug!("  [SAY] Initializing speech engine");
    let session = ctx
        .speech
        .open()
        .await
        .map_err(|e| ActionError::failed_with("Failed to initialize text-to-speech", e))?;
    let mut session = SpeechGuard(session);

    let locale = match session.language_support(&ctx.locale) {
        LanguageSupport::Available => ctx.locale.as_str(),
        LanguageSupport::MissingData => {
            return Err(ActionError::failed(
                "Missing text-to-speech data: install a text-to-speech package",
            ));
        }
        LanguageSupport::NotSupported => FALLBACK_LOCALE,
    };
    debug!("  [SAY] Using {} for speech", locale);
    session.set_language(locale);

    session
        .speak(text)
        .await
        .map_err(|e| ActionError::failed_with("Speech synthesis failed", e))?;
    debug!("  [SAY] Speak done");
    Ok(())
}
