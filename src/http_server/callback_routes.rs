//! Callback HTTP Routes
//!
//! The endpoint the form server POSTs to when it stores a new form. The
//! body is the bare digest as plain text.
//!
//! At most [`MAX_CALLBACK_BODY`] bytes are read. A longer body is cut there
//! and still answered like any other non-digest.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::StatusCode,
    routing::post,
    Router,
};
use bytes::BytesMut;
use futures_util::StreamExt;

use super::config::MAX_CALLBACK_BODY;
use crate::replication::Replicator;

/// Create the callback route at `path`
pub fn callback_routes(replicator: Replicator, path: &str) -> Router {
    Router::new()
        .route(path, post(callback_handler))
        .with_state(replicator)
}

/// Answer 200 for a digest, 400 otherwise. Never waits for the fetch.
async fn callback_handler(State(replicator): State<Replicator>, body: Body) -> StatusCode {
    let body = read_capped(body, MAX_CALLBACK_BODY).await;
    replicator.handle_callback(body)
}

/// Buffer up to `limit` bytes of `body`. A body error ends the read with
/// whatever arrived.
async fn read_capped(body: Body, limit: usize) -> Bytes {
    let mut stream = body.into_data_stream();
    let mut buf = BytesMut::new();

    while let Some(Ok(chunk)) = stream.next().await {
        let room = limit - buf.len();
        if chunk.len() >= room {
            buf.extend_from_slice(&chunk[..room]);
            break;
        }
        buf.extend_from_slice(&chunk);
    }

    buf.freeze()
}
