//! End-to-end replication against an in-process form server.
//!
//! Verifies:
//! - The callback is registered before the listing is requested
//! - Forms that exist before start and forms created after it both arrive
//! - Bad listing lines and bad fetched bodies surface as `Invalid`
//! - A failed fetch is reported and the session carries on
//! - Stop during registration never requests the listing
//! - A rejected registration never requests the listing
//! - A failed listing ends the session
//! - Stop cancels an open listing

mod common;

use std::collections::HashMap;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::time::timeout;

use common::{FakeFormServer, FakeOptions, Harness};
use formrepl::replication::{
    Action, EventReceiver, InvalidPayload, ReplicationError, ReplicationEvent, SessionState,
    MAX_LINE,
};

const WAIT: Duration = Duration::from_secs(5);

async fn next_event(events: &mut EventReceiver) -> ReplicationEvent {
    timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

/// Collect `Form` events until `count` distinct digests have arrived
async fn collect_forms(events: &mut EventReceiver, count: usize) -> HashMap<String, Value> {
    let mut forms = HashMap::new();
    while forms.len() < count {
        match next_event(events).await {
            ReplicationEvent::Form { digest, form } => {
                forms.insert(digest.into_string(), form);
            }
            ReplicationEvent::Error(e) => panic!("unexpected error event: {}", e),
            _ => {}
        }
    }
    forms
}

fn form(text: &str) -> Value {
    json!({ "content": [text] })
}

#[tokio::test]
async fn test_registers_callback_before_listing() {
    let server = FakeFormServer::spawn(FakeOptions::default()).await;
    let a = server.post_form(&form("A")).await;
    let mut harness = Harness::spawn().await;

    harness
        .replicator
        .start(&server.url(), &harness.callback_endpoint)
        .await
        .unwrap();
    let forms = collect_forms(&mut harness.events, 1).await;
    assert_eq!(forms[&a], form("A"));

    let requests = server.requests();
    assert_eq!(requests[0], "POST /callbacks");
    assert_eq!(requests[1], "GET /forms");
    assert_eq!(server.callbacks(), vec![harness.callback_endpoint.clone()]);
    assert_eq!(harness.replicator.state(), SessionState::Active);

    let err = harness
        .replicator
        .start(&server.url(), &harness.callback_endpoint)
        .await
        .unwrap_err();
    assert_eq!(err, ReplicationError::AlreadyStarted);
}

#[tokio::test]
async fn test_replicates_existing_and_new_forms() {
    let server = FakeFormServer::spawn(FakeOptions {
        hold_listing: true,
        ..FakeOptions::default()
    })
    .await;
    let a = server.post_form(&form("A")).await;
    let b = server.post_form(&form("B")).await;
    let mut harness = Harness::spawn().await;

    harness
        .replicator
        .start(&server.url(), &harness.callback_endpoint)
        .await
        .unwrap();
    server.wait_for_request("GET /forms").await;

    // Posted after the listing snapshot, so only the callback can carry it
    let c = server.post_form(&form("C")).await;
    server.release_listing();

    let forms = collect_forms(&mut harness.events, 3).await;
    assert_eq!(forms[&a], form("A"));
    assert_eq!(forms[&b], form("B"));
    assert_eq!(forms[&c], form("C"));
}

#[tokio::test]
async fn test_invalid_listing_lines_and_bodies() {
    let server = FakeFormServer::spawn(FakeOptions::default()).await;
    let good = server.post_form(&form("Good")).await;
    server.insert_raw(b"<html>gone</html>");
    server.insert_raw(br#"{"content":[]}"#);
    server.insert_listing_line("NOT-A-DIGEST");
    server.insert_listing_line(&"f".repeat(10_000));
    let mut harness = Harness::spawn().await;

    harness
        .replicator
        .start(&server.url(), &harness.callback_endpoint)
        .await
        .unwrap();

    let mut invalid = Vec::new();
    let mut forms = Vec::new();
    let mut complete = false;
    while invalid.len() < 4 || forms.is_empty() || !complete {
        match next_event(&mut harness.events).await {
            ReplicationEvent::Invalid(payload) => invalid.push(payload),
            ReplicationEvent::Form { digest, .. } => forms.push(digest.into_string()),
            ReplicationEvent::Info(message) if message == "Digest listing complete." => {
                complete = true;
            }
            ReplicationEvent::Error(e) => panic!("unexpected error event: {}", e),
            _ => {}
        }
    }

    assert_eq!(forms, vec![good]);
    assert!(invalid.iter().any(|p| p.as_text() == Some("NOT-A-DIGEST")));
    assert!(invalid.iter().any(|p| p.as_text() == Some("<html>gone</html>")));
    assert!(invalid.contains(&InvalidPayload::Parsed(json!({ "content": [] }))));
    let overlong = "f".repeat(MAX_LINE);
    assert!(invalid.iter().any(|p| p.as_text() == Some(overlong.as_str())));
}

#[tokio::test]
async fn test_failed_fetch_keeps_session_active() {
    let server = FakeFormServer::spawn(FakeOptions::default()).await;
    let broken = server.insert_broken(b"gone mid-body");
    let a = server.post_form(&form("A")).await;
    let mut harness = Harness::spawn().await;

    harness
        .replicator
        .start(&server.url(), &harness.callback_endpoint)
        .await
        .unwrap();

    let mut failed = None;
    let mut forms = Vec::new();
    while failed.is_none() || forms.is_empty() {
        match next_event(&mut harness.events).await {
            ReplicationEvent::Error(e) => failed = Some(e),
            ReplicationEvent::Form { digest, .. } => forms.push(digest.into_string()),
            _ => {}
        }
    }
    let failed = failed.unwrap();
    assert_eq!(failed.action(), Some(Action::RequestForm));
    assert_eq!(forms, vec![a]);
    assert!(server
        .requests()
        .contains(&format!("GET /forms/{}", broken)));
    assert_eq!(harness.replicator.state(), SessionState::Active);

    // Callbacks still flow after the failure
    let b = server.post_form(&form("B")).await;
    let forms = collect_forms(&mut harness.events, 1).await;
    assert_eq!(forms[&b], form("B"));
    assert_eq!(harness.replicator.state(), SessionState::Active);
}

#[tokio::test]
async fn test_stop_during_registration_skips_listing() {
    let server = FakeFormServer::spawn(FakeOptions {
        hold_register: true,
        ..FakeOptions::default()
    })
    .await;
    server.post_form(&form("A")).await;
    let mut harness = Harness::spawn().await;

    let replicator = harness.replicator.clone();
    let url = server.url();
    let endpoint = harness.callback_endpoint.clone();
    let starting = tokio::spawn(async move { replicator.start(&url, &endpoint).await });

    server.wait_for_request("POST /callbacks").await;
    assert_eq!(harness.replicator.state(), SessionState::Registering);
    harness.replicator.stop().unwrap();
    server.release_register();

    timeout(WAIT, starting).await.unwrap().unwrap().unwrap();
    assert!(harness.replicator.state().is_idle());

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(server.requests(), vec!["POST /callbacks".to_string()]);

    let mut infos = Vec::new();
    while let Ok(event) = harness.events.try_recv() {
        match event {
            ReplicationEvent::Info(message) => infos.push(message),
            other => panic!("unexpected event {:?}", other),
        }
    }
    assert_eq!(infos, vec!["Stopped replication.".to_string()]);
}

#[tokio::test]
async fn test_rejected_registration_skips_listing() {
    let server = FakeFormServer::spawn(FakeOptions {
        register_status: 500,
        ..FakeOptions::default()
    })
    .await;
    server.post_form(&form("A")).await;
    let mut harness = Harness::spawn().await;

    let err = harness
        .replicator
        .start(&server.url(), &harness.callback_endpoint)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ReplicationError::Rejected {
            action: Action::Register,
            status: 500
        }
    );

    match next_event(&mut harness.events).await {
        ReplicationEvent::Error(e) => assert_eq!(e, err),
        other => panic!("unexpected event {:?}", other),
    }
    assert_eq!(server.requests(), vec!["POST /callbacks".to_string()]);
    assert!(harness.replicator.state().is_idle());
}

#[tokio::test]
async fn test_failed_listing_ends_session() {
    let server = FakeFormServer::spawn(FakeOptions {
        listing_status: 503,
        ..FakeOptions::default()
    })
    .await;
    let mut harness = Harness::spawn().await;

    harness
        .replicator
        .start(&server.url(), &harness.callback_endpoint)
        .await
        .unwrap();

    loop {
        match next_event(&mut harness.events).await {
            ReplicationEvent::Error(e) => {
                assert_eq!(e.action(), Some(Action::ListForms));
                assert_eq!(e.status_code(), Some(503));
                break;
            }
            ReplicationEvent::Info(_) => {}
            other => panic!("unexpected event {:?}", other),
        }
    }
    assert!(harness.replicator.state().is_idle());
    assert_eq!(harness.replicator.stop(), Err(ReplicationError::NotStarted));
}

#[tokio::test]
async fn test_stop_cancels_streaming_listing() {
    let server = FakeFormServer::spawn(FakeOptions {
        stream_listing: true,
        ..FakeOptions::default()
    })
    .await;
    let a = server.post_form(&form("A")).await;
    let mut harness = Harness::spawn().await;

    harness
        .replicator
        .start(&server.url(), &harness.callback_endpoint)
        .await
        .unwrap();
    let forms = collect_forms(&mut harness.events, 1).await;
    assert!(forms.contains_key(&a));

    // The listing stays open and delivers announcements while active
    let b = server.announce_on_listing(&form("B"));
    let forms = collect_forms(&mut harness.events, 1).await;
    assert!(forms.contains_key(&b));

    harness.replicator.stop().unwrap();
    loop {
        match next_event(&mut harness.events).await {
            ReplicationEvent::Info(message) if message == "Stopped replication." => break,
            ReplicationEvent::Error(e) => panic!("unexpected error event: {}", e),
            _ => {}
        }
    }

    server.announce_on_listing(&form("C"));
    let quiet = timeout(Duration::from_millis(300), harness.events.recv()).await;
    assert!(quiet.is_err(), "event after stop: {:?}", quiet);
    assert!(harness.replicator.state().is_idle());
}
