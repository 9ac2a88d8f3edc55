//! Device capabilities the commands drive

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("{0} unavailable")]
    Unavailable(String),
    #[error("device I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of the default ringtone
#[async_trait]
pub trait Ringtone: Send + Sync {
    /// Name of the ringtone, for error messages
    fn name(&self) -> String;

    /// Create a player bound to the ringtone
    async fn open(&self) -> Result<Box<dyn Playback>, DeviceError>;
}

/// One ringtone player
#[async_trait]
pub trait Playback: Send {
    async fn prepare(&mut self) -> Result<(), DeviceError>;

    /// Start playing and resolve once playback completes
    async fn play_to_end(&mut self) -> Result<(), DeviceError>;

    fn release(&mut self);
}

pub trait Vibrator: Send + Sync {
    /// Start vibrating with `pattern`, repeating from `repeat_from`
    fn vibrate(&self, pattern: &[u64], repeat_from: usize);

    fn cancel(&self);
}

/// Whether the speech engine can speak a locale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageSupport {
    Available,
    MissingData,
    NotSupported,
}

#[async_trait]
pub trait SpeechSynth: Send + Sync {
    /// Initialise a speech engine; resolves once it is ready
    async fn open(&self) -> Result<Box<dyn SpeechSession>, DeviceError>;
}

/// One initialised speech engine
#[async_trait]
pub trait SpeechSession: Send {
    fn language_support(&self, locale: &str) -> LanguageSupport;

    fn set_language(&mut self, locale: &str);

    /// Speak `text` and resolve once the utterance is complete
    async fn speak(&mut self, text: &str) -> Result<(), DeviceError>;

    fn shutdown(&mut self);
}
