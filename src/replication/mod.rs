//! Replication Subsystem
//!
//! Delivers every form stored on a remote form server, past and future,
//! to a local consumer:
//!
//! 1. Register an HTTP callback for new forms, and wait for it to succeed
//! 2. Stream the list of digests the server already holds
//! 3. For each digest from either source, fetch the form and validate it
//!
//! The server keeps no changelog, so there is nothing to resume from.
//! Restarting replication re-lists the full digest set.

mod client;
mod config;
mod digest;
mod errors;
mod event;
mod form;
mod replicator;
mod role;
mod splitter;

pub use client::{DigestListing, FetchOutcome, RemoteClient};
pub use config::{Credentials, FormServer, Transport};
pub use digest::{is_digest, Digest, DIGEST_LENGTH};
pub use errors::{Action, ReplicationError, ReplicationResult};
pub use event::{EventKind, EventReceiver, EventSender, InvalidPayload, ReplicationEvent};
pub use form::{CommonFormValidator, FormValidator};
pub use replicator::Replicator;
pub use role::SessionState;
pub use splitter::{DigestSplitter, DELIMITER, MAX_LINE};
