//! Remote Form Server Client
//!
//! The three operations the replicator performs against the form server:
//!
//! - `POST /callbacks` registers our callback endpoint
//! - `GET /forms` streams every known digest, one per line
//! - `GET /forms/<digest>` fetches one form
//!
//! Nothing here retries or times out. Outcomes go back to the replicator,
//! which publishes them as events.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::stream::{BoxStream, Stream, StreamExt};
use reqwest::{Method, RequestBuilder};
use serde_json::Value;

use super::config::FormServer;
use super::digest::Digest;
use super::errors::{Action, ReplicationError, ReplicationResult};
use super::event::InvalidPayload;
use super::form::FormValidator;
use super::splitter::DigestSplitter;

/// Outcome of fetching a form that reached the server
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Body parsed and validated
    Form(Value),
    /// Body did not parse, or parsed but failed validation
    Invalid(InvalidPayload),
}

/// HTTP client bound to one form server
#[derive(Clone)]
pub struct RemoteClient {
    server: FormServer,
    http: reqwest::Client,
    validator: Arc<dyn FormValidator>,
}

impl fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteClient")
            .field("server", &self.server)
            .finish_non_exhaustive()
    }
}

impl RemoteClient {
    /// Create a client for the given server.
    pub fn new(server: FormServer, validator: Arc<dyn FormValidator>) -> ReplicationResult<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ReplicationError::transport(Action::Register, e.to_string()))?;

        Ok(Self {
            server,
            http,
            validator,
        })
    }

    /// The server this client talks to
    pub fn server(&self) -> &FormServer {
        &self.server
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.server.url_for(path));
        match &self.server.credentials {
            Some(creds) => builder.basic_auth(&creds.username, creds.password.as_ref()),
            None => builder,
        }
    }

    /// Ask the server to POST new digests to `endpoint`.
    ///
    /// Any 2xx is success.
    pub async fn register_callback(&self, endpoint: &str) -> ReplicationResult<()> {
        let response = self
            .request(Method::POST, "/callbacks")
            .body(endpoint.to_string())
            .send()
            .await
            .map_err(|e| ReplicationError::transport(Action::Register, e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ReplicationError::rejected(Action::Register, status.as_u16()))
        }
    }

    /// Open the digest listing.
    ///
    /// Returns once response headers arrive; the body is consumed
    /// incrementally through [`DigestListing::next_line`].
    pub async fn list_digests(&self) -> ReplicationResult<DigestListing> {
        let response = self
            .request(Method::GET, "/forms")
            .send()
            .await
            .map_err(|e| ReplicationError::transport(Action::ListForms, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReplicationError::rejected(Action::ListForms, status.as_u16()));
        }

        Ok(DigestListing::new(response.bytes_stream()))
    }

    /// Fetch and validate one form.
    ///
    /// The status code is not inspected: whatever body comes back must
    /// parse and validate, or the outcome is `Invalid`.
    pub async fn fetch_form(&self, digest: &Digest) -> ReplicationResult<FetchOutcome> {
        let path = format!("/forms/{}", digest);
        let response = self
            .request(Method::GET, &path)
            .send()
            .await
            .map_err(|e| ReplicationError::transport(Action::RequestForm, e.to_string()))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| ReplicationError::transport(Action::RequestForm, e.to_string()))?;

        Ok(self.classify(body))
    }

    fn classify(&self, body: Bytes) -> FetchOutcome {
        match serde_json::from_slice::<Value>(&body) {
            Err(_) => FetchOutcome::Invalid(InvalidPayload::Raw(body)),
            Ok(value) if self.validator.is_valid(&value) => FetchOutcome::Form(value),
            Ok(value) => FetchOutcome::Invalid(InvalidPayload::Parsed(value)),
        }
    }
}

/// Incremental reader over a `GET /forms` response body
pub struct DigestListing {
    chunks: BoxStream<'static, Result<Bytes, String>>,
    splitter: DigestSplitter,
    ready: VecDeque<Bytes>,
    done: bool,
}

impl DigestListing {
    /// Wrap a stream of body chunks.
    pub fn new<S, E>(chunks: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: fmt::Display,
    {
        Self {
            chunks: chunks.map(|chunk| chunk.map_err(|e| e.to_string())).boxed(),
            splitter: DigestSplitter::new(),
            ready: VecDeque::new(),
            done: false,
        }
    }

    /// Next complete line, waiting for more of the body as needed.
    ///
    /// Returns `None` once the body ends. A body error is yielded once and
    /// ends the listing.
    pub async fn next_line(&mut self) -> Option<ReplicationResult<Bytes>> {
        loop {
            if let Some(line) = self.ready.pop_front() {
                return Some(Ok(line));
            }
            if self.done {
                return None;
            }

            match self.chunks.next().await {
                Some(Ok(chunk)) => self.ready.extend(self.splitter.push(&chunk)),
                Some(Err(message)) => {
                    self.done = true;
                    return Some(Err(ReplicationError::transport(Action::ListForms, message)));
                }
                None => {
                    self.done = true;
                    self.ready.extend(self.splitter.finish());
                }
            }
        }
    }
}

impl fmt::Debug for DigestListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestListing")
            .field("pending", &self.splitter.pending())
            .field("ready", &self.ready.len())
            .field("done", &self.done)
            .finish()
    }
}
