//! Error taxonomy for submitting and running actions

use thiserror::Error;

/// Why a submission was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The bounded backlog is full; the caller decides what to tell the user
    #[error("action queue is full")]
    QueueFull,
    /// The executor stopped (idle timeout or shutdown); start a new one
    #[error("executor has stopped")]
    Stopped,
}

/// Failure signalled by an action body
#[derive(Debug, Error)]
pub enum ActionError {
    /// Structured failure the action knows how to describe
    #[error("{message}")]
    Failed {
        message: String,
        cause: Option<anyhow::Error>,
    },
    /// Anything the action did not classify
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl ActionError {
    /// Structured failure without an underlying cause
    pub fn failed(message: impl Into<String>) -> Self {
        ActionError::Failed {
            message: message.into(),
            cause: None,
        }
    }

    /// Structured failure wrapping the error that caused it
    pub fn failed_with(message: impl Into<String>, cause: impl Into<anyhow::Error>) -> Self {
        ActionError::Failed {
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    pub fn is_unexpected(&self) -> bool {
        matches!(self, ActionError::Unexpected(_))
    }

    /// Message plus the cause chain, for logs
    pub fn detail(&self) -> String {
        match self {
            ActionError::Failed {
                message,
                cause: Some(cause),
            } => format!("{}: {:#}", message, cause),
            ActionError::Failed { message, .. } => message.clone(),
            ActionError::Unexpected(err) => format!("{:#}", err),
        }
    }
}
