//! Replication Session State Machine
//!
//! `Idle -> Registering -> Enumerating -> Active`, with any failure going
//! back to `Idle`. The listing request may only be issued from
//! `Enumerating`, which is reachable only after the callback registration
//! succeeded. That ordering is what keeps forms created during start-up
//! from falling between the listing snapshot and the first callback.

use std::fmt;

use super::errors::{ReplicationError, ReplicationResult};

/// State of a replication session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No session
    #[default]
    Idle,

    /// `POST /callbacks` in flight
    Registering,

    /// Callback registered, listing request being issued
    Enumerating,

    /// Callback registered and listing initiated.
    /// Fetches may run concurrently in this state.
    Active,
}

impl SessionState {
    /// Begin a session.
    ///
    /// Valid only from Idle.
    pub fn begin_registration(self) -> ReplicationResult<Self> {
        match self {
            Self::Idle => Ok(Self::Registering),
            _ => Err(ReplicationError::AlreadyStarted),
        }
    }

    /// Callback registration succeeded.
    pub fn registered(self) -> ReplicationResult<Self> {
        match self {
            Self::Registering => Ok(Self::Enumerating),
            other => Err(ReplicationError::illegal_transition(format!(
                "cannot begin enumeration from {}",
                other
            ))),
        }
    }

    /// Listing request issued.
    pub fn activate(self) -> ReplicationResult<Self> {
        match self {
            Self::Enumerating => Ok(Self::Active),
            other => Err(ReplicationError::illegal_transition(format!(
                "cannot activate from {}",
                other
            ))),
        }
    }

    /// Whether a session exists
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Whether the callback has been confirmed
    pub fn is_registered(&self) -> bool {
        matches!(self, Self::Enumerating | Self::Active)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Registering => write!(f, "registering"),
            Self::Enumerating => write!(f, "enumerating"),
            Self::Active => write!(f, "active"),
        }
    }
}
