//! Replication Coordinator
//!
//! Owns the start/stop lifecycle of a replication session and merges the
//! two digest sources (the listing stream and inbound callbacks) into a
//! single fetch path.
//!
//! ## Ordering
//!
//! `start` registers the callback and waits for a 2xx before issuing
//! `GET /forms`. Every form created after registration produces a callback;
//! every form created before it is in the listing. Listing first would let
//! a form created between the two requests escape both.
//!
//! Beyond that one rule nothing is ordered. Fetches run on their own tasks
//! and their events interleave freely. Duplicate digests are fetched twice.

use std::sync::{Arc, Mutex, MutexGuard};

use axum::http::StatusCode;
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use uuid::Uuid;

use super::client::{FetchOutcome, RemoteClient};
use super::config::FormServer;
use super::digest::Digest;
use super::errors::{ReplicationError, ReplicationResult};
use super::event::{EventReceiver, EventSender, InvalidPayload, ReplicationEvent};
use super::form::{CommonFormValidator, FormValidator};
use super::role::SessionState;
use crate::observability::{log_event_with_fields, Event, Logger};

/// State of one `start`/`stop` cycle
#[derive(Debug)]
struct Session {
    id: Uuid,
    state: SessionState,
    client: RemoteClient,
    callback_endpoint: String,
    listing: Option<AbortHandle>,
}

struct Inner {
    events: EventSender,
    validator: Arc<dyn FormValidator>,
    session: Mutex<Option<Session>>,
}

/// Replicates forms from a remote form server.
///
/// Cheap to clone; clones share the same session and event channel, which
/// is how the callback route and spawned tasks reach it.
#[derive(Clone)]
pub struct Replicator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Replicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Replicator")
            .field("state", &self.state())
            .finish()
    }
}

impl Replicator {
    /// Create a replicator using the Common Form validator.
    ///
    /// Returns the replicator and the receiving end of its event channel.
    pub fn new() -> (Self, EventReceiver) {
        Self::with_validator(Arc::new(CommonFormValidator))
    }

    /// Create a replicator with a custom document validator.
    pub fn with_validator(validator: Arc<dyn FormValidator>) -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let replicator = Self {
            inner: Arc::new(Inner {
                events: tx,
                validator,
                session: Mutex::new(None),
            }),
        };
        (replicator, rx)
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        self.session()
            .as_ref()
            .map(|s| s.state)
            .unwrap_or_default()
    }

    /// Callback endpoint of the active session
    pub fn callback_endpoint(&self) -> Option<String> {
        self.session().as_ref().map(|s| s.callback_endpoint.clone())
    }

    /// Start replicating from `form_server_url`, asking it to POST new
    /// digests to `callback_endpoint`.
    ///
    /// Resolves once the callback is registered and the listing task has
    /// been spawned. Registration failure is returned and also emitted as
    /// an `Error` event; the session goes back to idle and no listing is
    /// requested.
    pub async fn start(&self, form_server_url: &str, callback_endpoint: &str) -> ReplicationResult<()> {
        let client = match FormServer::parse(form_server_url)
            .and_then(|server| RemoteClient::new(server, Arc::clone(&self.inner.validator)))
        {
            Ok(client) => client,
            Err(e) => {
                self.emit(ReplicationEvent::Error(e.clone()));
                return Err(e);
            }
        };

        let session_id = Uuid::new_v4();
        {
            let mut guard = self.session();
            let current = guard.as_ref().map(|s| s.state).unwrap_or_default();
            let state = current.begin_registration()?;
            *guard = Some(Session {
                id: session_id,
                state,
                client: client.clone(),
                callback_endpoint: callback_endpoint.to_string(),
                listing: None,
            });
        }

        let session_field = session_id.to_string();
        let transport = client.server().transport.scheme();
        log_event_with_fields(
            Event::ReplicationStart,
            &[
                ("session", session_field.as_str()),
                ("form_server", client.server().base_url().as_str()),
                ("transport", transport),
                ("callback_endpoint", callback_endpoint),
            ],
        );

        if let Err(e) = client.register_callback(callback_endpoint).await {
            let status = e.status_code().map(|s| s.to_string()).unwrap_or_default();
            log_event_with_fields(
                Event::CallbackRejected,
                &[
                    ("session", session_field.as_str()),
                    ("error", e.to_string().as_str()),
                    ("status", status.as_str()),
                ],
            );
            self.end_session(session_id);
            self.emit(ReplicationEvent::Error(e.clone()));
            return Err(e);
        }

        let mut guard = self.session();
        let Some(session) = guard.as_mut().filter(|s| s.id == session_id) else {
            // stopped while registering
            return Ok(());
        };
        session.state = session.state.registered()?;

        log_event_with_fields(Event::CallbackRegistered, &[("session", session_field.as_str())]);
        self.emit(ReplicationEvent::Info("Registered HTTP callback.".to_string()));

        let task = tokio::spawn(self.clone().enumerate(client, session_id));
        session.listing = Some(task.abort_handle());
        session.state = session.state.activate()?;

        Ok(())
    }

    /// Stop replicating.
    ///
    /// Aborts the listing request. Fetches already in flight keep running
    /// and still report their outcome. The remote callback stays
    /// registered; there is no unregister operation.
    pub fn stop(&self) -> ReplicationResult<()> {
        let session = self.session().take().ok_or(ReplicationError::NotStarted)?;

        if let Some(listing) = session.listing {
            listing.abort();
        }

        log_event_with_fields(
            Event::ReplicationStop,
            &[("session", session.id.to_string().as_str())],
        );
        self.emit(ReplicationEvent::Info("Stopped replication.".to_string()));
        Ok(())
    }

    /// Handle the body of an inbound callback request.
    ///
    /// A body that is exactly one digest is accepted with 200 and fed to
    /// the fetch path; anything else is answered 400 and reported as
    /// `Invalid` with the raw body. The fetch runs on its own task, so the
    /// response never waits for it.
    pub fn handle_callback(&self, body: Bytes) -> StatusCode {
        match std::str::from_utf8(&body).ok().and_then(Digest::parse) {
            Some(digest) => {
                self.accept_digest(digest, "callback");
                StatusCode::OK
            }
            None => {
                Logger::warn(
                    Event::DigestRejected.as_str(),
                    &[("source", "callback"), ("length", body.len().to_string().as_str())],
                );
                self.emit(ReplicationEvent::Invalid(InvalidPayload::Raw(body)));
                StatusCode::BAD_REQUEST
            }
        }
    }

    /// Fetch one digest through the active session.
    ///
    /// The outcome arrives later as a `Form`, `Invalid` or `Error` event.
    /// Without an active session nothing is fetched.
    pub fn request(&self, digest: Digest) {
        let client = self.session().as_ref().map(|s| s.client.clone());
        let Some(client) = client else {
            Logger::warn(
                Event::FetchSkipped.as_str(),
                &[("digest", digest.as_str()), ("reason", "no active session")],
            );
            return;
        };

        let replicator = self.clone();
        tokio::spawn(async move {
            let event = match client.fetch_form(&digest).await {
                Ok(FetchOutcome::Form(form)) => {
                    log_event_with_fields(Event::FormReplicated, &[("digest", digest.as_str())]);
                    ReplicationEvent::Form { digest, form }
                }
                Ok(FetchOutcome::Invalid(payload)) => {
                    log_event_with_fields(Event::FormInvalid, &[("digest", digest.as_str())]);
                    ReplicationEvent::Invalid(payload)
                }
                Err(e) => {
                    log_event_with_fields(
                        Event::FetchFailed,
                        &[("digest", digest.as_str()), ("error", e.to_string().as_str())],
                    );
                    ReplicationEvent::Error(e)
                }
            };
            replicator.emit(event);
        });
    }

    /// Drive the listing until it ends, fails, or the task is aborted.
    async fn enumerate(self, client: RemoteClient, session_id: Uuid) {
        let session_field = session_id.to_string();
        log_event_with_fields(Event::ListingStart, &[("session", session_field.as_str())]);

        let mut listing = match client.list_digests().await {
            Ok(listing) => listing,
            Err(e) => return self.fail_listing(session_id, e),
        };

        let mut count: u64 = 0;
        while let Some(line) = listing.next_line().await {
            let line = match line {
                Ok(line) => line,
                Err(e) => return self.fail_listing(session_id, e),
            };
            if line.is_empty() {
                continue;
            }

            match std::str::from_utf8(&line).ok().and_then(Digest::parse) {
                Some(digest) => {
                    count += 1;
                    self.accept_digest(digest, "listing");
                }
                None => {
                    Logger::warn(Event::DigestRejected.as_str(), &[("source", "listing")]);
                    self.emit(ReplicationEvent::Invalid(InvalidPayload::Raw(line)));
                }
            }
        }

        log_event_with_fields(
            Event::ListingComplete,
            &[("session", session_field.as_str()), ("digests", count.to_string().as_str())],
        );
        self.emit(ReplicationEvent::Info("Digest listing complete.".to_string()));
    }

    fn fail_listing(&self, session_id: Uuid, error: ReplicationError) {
        log_event_with_fields(
            Event::ListingFailed,
            &[("session", session_id.to_string().as_str()), ("error", error.to_string().as_str())],
        );
        self.end_session(session_id);
        self.emit(ReplicationEvent::Error(error));
    }

    fn accept_digest(&self, digest: Digest, source: &str) {
        Logger::trace(
            Event::DigestReceived.as_str(),
            &[("digest", digest.as_str()), ("source", source)],
        );
        self.emit(ReplicationEvent::Digest(digest.clone()));
        self.request(digest);
    }

    /// Tear down the session if it is still the one identified by `id`.
    fn end_session(&self, id: Uuid) {
        let mut guard = self.session();
        if guard.as_ref().map(|s| s.id == id).unwrap_or(false) {
            *guard = None;
        }
    }

    fn emit(&self, event: ReplicationEvent) {
        // A dropped receiver means nobody is listening
        let _ = self.inner.events.send(event);
    }

    fn session(&self) -> MutexGuard<'_, Option<Session>> {
        self.inner
            .session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
