//! End-to-end pipeline tests against an in-process WebSocket server.

use arena_realtime::{ArenaClient, ArenaClientOptions, ConnectionState, SendOutcome};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};

const WAIT: Duration = Duration::from_secs(10);

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

async fn local_listener() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, format!("ws://{addr}"))
}

#[tokio::test]
async fn connect_dispatch_send_and_manual_disconnect() {
    init_tracing();
    let (listener, endpoint) = local_listener().await;
    let (uri_tx, mut uri_rx) = mpsc::unbounded_channel::<String>();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_hdr_async(stream, |req: &Request, resp: Response| {
            uri_tx.send(req.uri().to_string()).unwrap();
            Ok(resp)
        })
        .await
        .unwrap();

        ws.send(Message::Text(
            "{\"type\":\"team_flag_submitted\",\"points\":100}".into(),
        ))
        .await
        .unwrap();

        // Wait for the client's outbound frame.
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return text.to_string(),
                Some(Ok(_)) => continue,
                other => panic!("client closed early: {other:?}"),
            }
        }
    });

    let client = ArenaClient::new(endpoint, ArenaClientOptions::default()).unwrap();
    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<Value>();
    client.registry().on("team_flag_submitted", move |value| {
        frame_tx.send(value.clone()).ok();
    });

    client.connect("integration-token").await.unwrap();
    assert!(client.is_connected().await);

    let uri = timeout(WAIT, uri_rx.recv()).await.unwrap().unwrap();
    assert_eq!(uri, "/api/ws/arena?token=integration-token");

    // Inbound frame reaches both the external subscriber and the built-in
    // score tracker.
    let frame = timeout(WAIT, frame_rx.recv()).await.unwrap().unwrap();
    assert_eq!(frame["points"], 100);
    assert_eq!(client.team_score().total(), 100);
    assert_eq!(client.charts().submission_timeline().len(), 1);

    let outcome = client.submit_flag(7, "flag{integration}").await.unwrap();
    assert_eq!(outcome, SendOutcome::Delivered);

    let sent = timeout(WAIT, server).await.unwrap().unwrap();
    let sent: Value = serde_json::from_str(&sent).unwrap();
    assert_eq!(sent["type"], "flag_submission");
    assert_eq!(sent["challenge_id"], 7);
    assert_eq!(sent["flag"], "flag{integration}");

    client.disconnect().await;
    assert_eq!(client.state().await, ConnectionState::Closed);

    // Send after disconnect is an explicit drop, not an error.
    let outcome = client.ping().await.unwrap();
    assert_eq!(outcome, SendOutcome::NotConnected);
}

#[tokio::test]
async fn reconnects_after_server_drop() {
    init_tracing();
    let (listener, endpoint) = local_listener().await;

    let server = tokio::spawn(async move {
        // First session: accept and drop immediately.
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.close(None).await.unwrap();
        drop(ws);

        // Second session: stay alive until the test finishes.
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    });

    let client = ArenaClient::new(endpoint, ArenaClientOptions::default()).unwrap();
    let (lifecycle_tx, mut lifecycle_rx) = mpsc::unbounded_channel::<&'static str>();
    {
        let tx = lifecycle_tx.clone();
        client.registry().on("connected", move |_| {
            tx.send("connected").ok();
        });
    }
    client.registry().on("disconnected", move |_| {
        lifecycle_tx.send("disconnected").ok();
    });

    client.connect("integration-token").await.unwrap();

    let mut events = Vec::new();
    // connected, disconnected, then connected again after the 1s backoff.
    while events.iter().filter(|e| **e == "connected").count() < 2 {
        let event = timeout(WAIT, lifecycle_rx.recv()).await.unwrap().unwrap();
        events.push(event);
    }
    assert!(events.contains(&"disconnected"));
    assert!(client.is_connected().await);

    client.disconnect().await;
    server.abort();
}

#[tokio::test]
async fn immediate_server_close_never_wedges_the_client() {
    init_tracing();
    let (listener, endpoint) = local_listener().await;

    let server = tokio::spawn(async move {
        // Three sessions closed right after the handshake, then one that
        // stays alive. Each instant close races the client's open transition.
        for _ in 0..3 {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.close(None).await.unwrap();
        }
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    });

    let options = ArenaClientOptions {
        reconnect_base_delay_ms: 50,
        reconnect_max_delay_ms: 200,
        ..ArenaClientOptions::default()
    };
    let client = ArenaClient::new(endpoint, options).unwrap();
    client.connect("integration-token").await.unwrap();

    // `Open` must always mean a live writer, so the client settles into a
    // state where a ping is actually delivered. A state stuck at `Open` with
    // every send reporting `NotConnected` fails here by timeout.
    let deadline = tokio::time::Instant::now() + WAIT;
    loop {
        if client.is_connected().await
            && matches!(client.ping().await, Ok(SendOutcome::Delivered))
        {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "client never reached a usable open connection"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    client.disconnect().await;
    server.abort();
}

#[tokio::test]
async fn retry_budget_exhaustion_emits_one_terminal_disconnect() {
    init_tracing();
    let (listener, endpoint) = local_listener().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.close(None).await.unwrap();
        // Listener drops here; every retry is refused.
    });

    let options = ArenaClientOptions {
        reconnect_base_delay_ms: 5,
        reconnect_max_delay_ms: 20,
        ..ArenaClientOptions::default()
    };
    let client = ArenaClient::new(endpoint, options).unwrap();

    let (connected_tx, mut connected_rx) = mpsc::unbounded_channel::<()>();
    let (dropped_tx, mut dropped_rx) = mpsc::unbounded_channel::<Value>();
    client.registry().on("connected", move |_| {
        connected_tx.send(()).ok();
    });
    client.registry().on("disconnected", move |value| {
        dropped_tx.send(value.clone()).ok();
    });

    client.connect("integration-token").await.unwrap();
    timeout(WAIT, connected_rx.recv()).await.unwrap().unwrap();

    // The first disconnected event comes from the server drop; once the five
    // refused retries spend the budget, the terminal one follows.
    loop {
        let value = timeout(WAIT, dropped_rx.recv()).await.unwrap().unwrap();
        if value["terminal"] == true {
            break;
        }
    }
    assert_eq!(client.state().await, ConnectionState::Closed);

    // The budget stays spent: no further attempt, and the terminal event
    // fires exactly once.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(connected_rx.try_recv().is_err(), "no reconnect after exhaustion");
    assert!(dropped_rx.try_recv().is_err(), "terminal disconnect fires once");

    let _ = timeout(WAIT, server).await;
}

#[tokio::test]
async fn manual_disconnect_cancels_pending_reconnect() {
    init_tracing();
    let (listener, endpoint) = local_listener().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.close(None).await.unwrap();
        // Listener drops here; any further connect attempt is refused.
    });

    let client = ArenaClient::new(endpoint, ArenaClientOptions::default()).unwrap();
    let (connected_tx, mut connected_rx) = mpsc::unbounded_channel::<()>();
    let (dropped_tx, mut dropped_rx) = mpsc::unbounded_channel::<()>();
    client.registry().on("connected", move |_| {
        connected_tx.send(()).ok();
    });
    client.registry().on("disconnected", move |_| {
        dropped_tx.send(()).ok();
    });

    client.connect("integration-token").await.unwrap();
    timeout(WAIT, connected_rx.recv()).await.unwrap().unwrap();

    // Server drop schedules a retry; disconnect before it fires.
    timeout(WAIT, dropped_rx.recv()).await.unwrap().unwrap();
    client.disconnect().await;

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(client.state().await, ConnectionState::Closed);
    assert!(connected_rx.try_recv().is_err(), "no reconnect may occur after disconnect()");

    let _ = timeout(WAIT, server).await;
}
