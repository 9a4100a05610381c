//! Replication Error Types
//!
//! No error here is retried. A failed remote operation is reported once,
//! as an `error` event, and recovery is left to the caller.

use std::fmt;

use thiserror::Error;

/// Remote operation an error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// `POST /callbacks`
    Register,
    /// `GET /forms/<digest>`
    RequestForm,
    /// `GET /forms`
    ListForms,
}

impl Action {
    /// Returns the action tag
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Register => "register",
            Action::RequestForm => "request form",
            Action::ListForms => "list forms",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Replication errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplicationError {
    /// Form server URL could not be resolved
    #[error("Invalid form server URL: {0}")]
    InvalidUrl(String),

    /// Remote server answered with a non-2xx status
    #[error("Form server rejected {action} with status {status}")]
    Rejected {
        /// Operation that was rejected
        action: Action,
        /// HTTP status code
        status: u16,
    },

    /// Connection-level failure
    #[error("Transport error during {action}: {message}")]
    Transport {
        /// Operation that failed
        action: Action,
        /// Underlying error message
        message: String,
    },

    /// `start` called while a session is active
    #[error("Replication already started")]
    AlreadyStarted,

    /// `stop` called without an active session
    #[error("Replication not started")]
    NotStarted,

    /// Illegal session state transition
    #[error("Illegal transition: {0}")]
    IllegalTransition(String),
}

impl ReplicationError {
    /// Create a transport error for an action.
    pub fn transport(action: Action, message: impl Into<String>) -> Self {
        Self::Transport {
            action,
            message: message.into(),
        }
    }

    /// Create a rejection for an action.
    pub fn rejected(action: Action, status: u16) -> Self {
        Self::Rejected { action, status }
    }

    /// Create an illegal transition error.
    pub fn illegal_transition(message: impl Into<String>) -> Self {
        Self::IllegalTransition(message.into())
    }

    /// The remote action this error belongs to, if any.
    pub fn action(&self) -> Option<Action> {
        match self {
            Self::Rejected { action, .. } | Self::Transport { action, .. } => Some(*action),
            _ => None,
        }
    }

    /// HTTP status code, if the server answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for replication operations
pub type ReplicationResult<T> = Result<T, ReplicationError>;
