//! Observable replication events
//!
//! Every lifecycle step of a replication session logs one of these.

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Session lifecycle
    /// `start` called, session created
    ReplicationStart,
    /// Callback registration confirmed
    CallbackRegistered,
    /// Callback registration failed
    CallbackRejected,
    /// Session stopped
    ReplicationStop,

    // Listing
    /// `GET /forms` issued
    ListingStart,
    /// Listing body ended
    ListingComplete,
    /// Listing failed
    ListingFailed,

    // Digests and fetches
    /// Digest accepted from listing or callback
    DigestReceived,
    /// Malformed digest rejected
    DigestRejected,
    /// Fetch not issued
    FetchSkipped,
    /// Form fetched and valid
    FormReplicated,
    /// Form fetched but invalid
    FormInvalid,
    /// Fetch failed
    FetchFailed,

    // Process
    /// Configuration loaded
    ConfigLoaded,
    /// Callback server listening
    ServerStart,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ReplicationStart => "REPLICATION_START",
            Event::CallbackRegistered => "CALLBACK_REGISTERED",
            Event::CallbackRejected => "CALLBACK_REJECTED",
            Event::ReplicationStop => "REPLICATION_STOP",

            Event::ListingStart => "LISTING_START",
            Event::ListingComplete => "LISTING_COMPLETE",
            Event::ListingFailed => "LISTING_FAILED",

            Event::DigestReceived => "DIGEST_RECEIVED",
            Event::DigestRejected => "DIGEST_REJECTED",
            Event::FetchSkipped => "FETCH_SKIPPED",
            Event::FormReplicated => "FORM_REPLICATED",
            Event::FormInvalid => "FORM_INVALID",
            Event::FetchFailed => "FETCH_FAILED",

            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::ServerStart => "SERVER_START",
        }
    }

    /// Returns true if this event reports a failed remote operation
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Event::CallbackRejected | Event::ListingFailed | Event::FetchFailed
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
