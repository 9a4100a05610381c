//! # Replication Events
//!
//! Outcomes are published on a channel instead of being returned, so a
//! slow fetch never blocks discovery of the next digest. Events may arrive
//! in any order; the only causal link is that a form's `Digest` event is
//! sent before the terminal event of the fetch it triggers.

use std::fmt;

use bytes::Bytes;
use serde_json::Value;
use tokio::sync::mpsc;

use super::digest::Digest;
use super::errors::ReplicationError;

/// Event sender owned by the replicator
pub type EventSender = mpsc::UnboundedSender<ReplicationEvent>;

/// Event receiver handed to the consumer
pub type EventReceiver = mpsc::UnboundedReceiver<ReplicationEvent>;

/// Payload of an `Invalid` event
#[derive(Debug, Clone, PartialEq)]
pub enum InvalidPayload {
    /// Bytes that were not a digest or not parseable JSON
    Raw(Bytes),
    /// JSON that parsed but failed schema validation
    Parsed(Value),
}

impl InvalidPayload {
    /// Raw payload as UTF-8 text, if it is raw and valid UTF-8
    pub fn as_text(&self) -> Option<&str> {
        match self {
            InvalidPayload::Raw(bytes) => std::str::from_utf8(bytes).ok(),
            InvalidPayload::Parsed(_) => None,
        }
    }
}

/// Kind of a replication event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Informational message
    Info,
    /// Remote operation failed
    Error,
    /// Digest discovered
    Digest,
    /// Payload rejected
    Invalid,
    /// Form replicated
    Form,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Info => write!(f, "info"),
            EventKind::Error => write!(f, "error"),
            EventKind::Digest => write!(f, "digest"),
            EventKind::Invalid => write!(f, "invalid"),
            EventKind::Form => write!(f, "form"),
        }
    }
}

/// Event emitted to the consumer
#[derive(Debug, Clone, PartialEq)]
pub enum ReplicationEvent {
    /// Informational message
    Info(String),
    /// A remote operation failed
    Error(ReplicationError),
    /// A digest was discovered, by listing or by callback
    Digest(Digest),
    /// A callback body, listing line or fetched document was rejected
    Invalid(InvalidPayload),
    /// A form was fetched and validated
    Form {
        /// Digest the form was fetched by
        digest: Digest,
        /// The validated document
        form: Value,
    },
}

impl ReplicationEvent {
    /// Kind of this event
    pub fn kind(&self) -> EventKind {
        match self {
            ReplicationEvent::Info(_) => EventKind::Info,
            ReplicationEvent::Error(_) => EventKind::Error,
            ReplicationEvent::Digest(_) => EventKind::Digest,
            ReplicationEvent::Invalid(_) => EventKind::Invalid,
            ReplicationEvent::Form { .. } => EventKind::Form,
        }
    }
}
