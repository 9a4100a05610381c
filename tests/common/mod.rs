//! In-process form server for replication tests.
//!
//! Serves `POST /callbacks`, `GET /forms` and `GET /forms/:digest` the way a
//! real form server does, and records the order requests arrive in. The
//! listing is written a few bytes at a time so digests straddle chunks.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use serde_json::Value;
use sha2::{Digest as _, Sha256};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};

use formrepl::http_server::{HttpServer, HttpServerConfig};
use formrepl::replication::{EventReceiver, Replicator};

/// Bytes per listing chunk
const LISTING_CHUNK: usize = 10;

/// Behaviour switches for the fake server
#[derive(Debug, Clone)]
pub struct FakeOptions {
    /// Status returned by `POST /callbacks`
    pub register_status: u16,
    /// Status returned by `GET /forms`
    pub listing_status: u16,
    /// Hold the registration response until [`FakeFormServer::release_register`]
    pub hold_register: bool,
    /// Hold the listing response until [`FakeFormServer::release_listing`]
    pub hold_listing: bool,
    /// Keep the listing open and stream digests announced later
    pub stream_listing: bool,
}

impl Default for FakeOptions {
    fn default() -> Self {
        Self {
            register_status: 201,
            listing_status: 200,
            hold_register: false,
            hold_listing: false,
            stream_listing: false,
        }
    }
}

struct FakeState {
    options: FakeOptions,
    /// Listing lines in insertion order
    lines: Mutex<Vec<String>>,
    bodies: Mutex<HashMap<String, Bytes>>,
    /// Digests whose fetch drops the connection mid-body
    broken: Mutex<HashSet<String>>,
    callbacks: Mutex<Vec<String>>,
    requests: Mutex<Vec<String>>,
    gate: watch::Sender<bool>,
    register_gate: watch::Sender<bool>,
    announcements: broadcast::Sender<String>,
}

impl FakeState {
    fn record(&self, request: &str) {
        self.requests.lock().unwrap().push(request.to_string());
    }
}

async fn wait_open(gate: &watch::Sender<bool>) {
    let mut gate = gate.subscribe();
    while !*gate.borrow_and_update() {
        if gate.changed().await.is_err() {
            break;
        }
    }
}

/// Handle to a running fake form server
pub struct FakeFormServer {
    addr: SocketAddr,
    state: Arc<FakeState>,
    http: reqwest::Client,
}

impl FakeFormServer {
    pub async fn spawn(options: FakeOptions) -> Self {
        let (gate, _) = watch::channel(false);
        let (register_gate, _) = watch::channel(false);
        let (announcements, _) = broadcast::channel(64);
        let state = Arc::new(FakeState {
            options,
            lines: Mutex::new(Vec::new()),
            bodies: Mutex::new(HashMap::new()),
            broken: Mutex::new(HashSet::new()),
            callbacks: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            gate,
            register_gate,
            announcements,
        });

        let router = Router::new()
            .route("/callbacks", post(register_callback))
            .route("/forms", get(list_forms))
            .route("/forms/:digest", get(fetch_form))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            addr,
            state,
            http: reqwest::Client::new(),
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Store a form and deliver its digest to every registered callback.
    ///
    /// Returns once every callback has answered.
    pub async fn post_form(&self, form: &Value) -> String {
        let body = serde_json::to_vec(form).unwrap();
        let digest = digest_of(&body);
        self.state
            .bodies
            .lock()
            .unwrap()
            .insert(digest.clone(), Bytes::from(body));
        self.state.lines.lock().unwrap().push(digest.clone());

        let callbacks = self.callbacks();
        for callback in callbacks {
            let _ = self.http.post(&callback).body(digest.clone()).send().await;
        }
        digest
    }

    /// Serve `body` verbatim for a digest that appears in the listing
    pub fn insert_raw(&self, body: &[u8]) -> String {
        let digest = digest_of(body);
        self.state
            .bodies
            .lock()
            .unwrap()
            .insert(digest.clone(), Bytes::copy_from_slice(body));
        self.state.lines.lock().unwrap().push(digest.clone());
        digest
    }

    /// List a digest whose fetch fails with a dropped connection
    pub fn insert_broken(&self, seed: &[u8]) -> String {
        let digest = digest_of(seed);
        self.state.broken.lock().unwrap().insert(digest.clone());
        self.state.lines.lock().unwrap().push(digest.clone());
        digest
    }

    /// Add a listing line that is not necessarily a digest
    pub fn insert_listing_line(&self, line: &str) {
        self.state.lines.lock().unwrap().push(line.to_string());
    }

    /// Store a form and push its digest down open streaming listings only
    pub fn announce_on_listing(&self, form: &Value) -> String {
        let body = serde_json::to_vec(form).unwrap();
        let digest = digest_of(&body);
        self.state
            .bodies
            .lock()
            .unwrap()
            .insert(digest.clone(), Bytes::from(body));
        let _ = self.state.announcements.send(digest.clone());
        digest
    }

    pub fn release_listing(&self) {
        self.state.gate.send_replace(true);
    }

    pub fn release_register(&self) {
        self.state.register_gate.send_replace(true);
    }

    pub fn requests(&self) -> Vec<String> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn callbacks(&self) -> Vec<String> {
        self.state.callbacks.lock().unwrap().clone()
    }

    /// Poll until `request` has been received
    pub async fn wait_for_request(&self, request: &str) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !self.requests().iter().any(|r| r == request) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("{} never arrived", request));
    }
}

pub fn digest_of(body: &[u8]) -> String {
    Sha256::digest(body)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

async fn register_callback(State(state): State<Arc<FakeState>>, body: String) -> StatusCode {
    state.record("POST /callbacks");
    if state.options.hold_register {
        wait_open(&state.register_gate).await;
    }
    let status = StatusCode::from_u16(state.options.register_status).unwrap();
    if status.is_success() {
        state.callbacks.lock().unwrap().push(body);
    }
    status
}

async fn list_forms(State(state): State<Arc<FakeState>>) -> Response {
    state.record("GET /forms");
    let status = StatusCode::from_u16(state.options.listing_status).unwrap();
    if !status.is_success() {
        return (status, "listing unavailable").into_response();
    }

    // Snapshot at arrival; anything posted later must come by callback.
    let snapshot: String = state
        .lines
        .lock()
        .unwrap()
        .iter()
        .map(|line| format!("{}\n", line))
        .collect();
    let announcements = state.announcements.subscribe();

    if state.options.hold_listing {
        wait_open(&state.gate).await;
    }

    let chunks: Vec<Result<Bytes, Infallible>> = snapshot
        .as_bytes()
        .chunks(LISTING_CHUNK)
        .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
        .collect();
    let head = stream::iter(chunks);

    if state.options.stream_listing {
        let tail = stream::unfold(announcements, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(digest) => {
                        return Some((Ok(Bytes::from(format!("{}\n", digest))), rx));
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });
        Body::from_stream(head.chain(tail)).into_response()
    } else {
        Body::from_stream(head).into_response()
    }
}

async fn fetch_form(State(state): State<Arc<FakeState>>, Path(digest): Path<String>) -> Response {
    state.record(&format!("GET /forms/{}", digest));
    if state.broken.lock().unwrap().contains(&digest) {
        let chunks: Vec<Result<Bytes, io::Error>> = vec![
            Ok(Bytes::from_static(b"{\"content\":")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "dropped")),
        ];
        return Body::from_stream(stream::iter(chunks)).into_response();
    }
    match state.bodies.lock().unwrap().get(&digest).cloned() {
        Some(body) => body.into_response(),
        None => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}

/// A replicator with its callback server bound on an ephemeral port
pub struct Harness {
    pub replicator: Replicator,
    pub events: EventReceiver,
    pub callback_endpoint: String,
}

impl Harness {
    pub async fn spawn() -> Self {
        let (replicator, events) = Replicator::new();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let config = HttpServerConfig {
            host: "127.0.0.1".to_string(),
            port,
            callback_path: "/forms".to_string(),
        };
        let server = HttpServer::with_config(replicator.clone(), config);
        tokio::spawn(server.serve(listener, std::future::pending()));

        Self {
            replicator,
            events,
            callback_endpoint: format!("http://127.0.0.1:{}/forms", port),
        }
    }
}
