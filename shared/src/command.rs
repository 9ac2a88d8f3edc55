//! Text commands delivered to the device by push message

use std::fmt;
use thiserror::Error;

const SAY_PREFIX: &str = "say ";

/// A command the device knows how to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Play the default ringtone until it ends
    Ring,
    /// Run the vibrator for a fixed duration
    Vibrate,
    /// Speak the given text
    Say { text: String },
}

/// Why a command string could not be turned into a [`Command`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,
    #[error("nothing to say")]
    NothingToSay,
    #[error("unsupported command: {0}")]
    Unsupported(String),
}

impl Command {
    /// Parse a raw push command
    ///
    /// Matching is exact and case-sensitive; only the text after `say ` is
    /// kept verbatim.
    pub fn parse(raw: &str) -> Result<Self, CommandParseError> {
        if raw.is_empty() {
            return Err(CommandParseError::Empty);
        }
        match raw {
            "ring" => Ok(Command::Ring),
            "vibrate" => Ok(Command::Vibrate),
            _ => match raw.strip_prefix(SAY_PREFIX) {
                Some("") => Err(CommandParseError::NothingToSay),
                Some(text) => Ok(Command::Say { text: text.into() }),
                None => Err(CommandParseError::Unsupported(raw.into())),
            },
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Ring => f.write_str("ring"),
            Command::Vibrate => f.write_str("vibrate"),
            Command::Say { text } => write!(f, "{}{}", SAY_PREFIX, text),
        }
    }
}
