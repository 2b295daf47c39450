//! End-to-end over a real loopback WebSocket.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use livechat_client::{
    ChatSession, ClientConfig, IdentityProvider, SessionEvent, SessionIdentity, WsConnector,
};
use livechat_core::{ConnectionState, Identity, Notification, Origin, WireEvent};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

const TIMEOUT: Duration = Duration::from_secs(10);
const SERVER_TIME: &str = "2024-05-01T12:00:00.000Z";

/// A one-connection broker: greets, then stamps and echoes every message.
async fn spawn_broker() -> (String, tokio::task::JoinHandle<Vec<WireEvent>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let task = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let (mut sink, mut stream) = ws.split();

        let hello = WireEvent::Notification(Notification {
            message: "alice joined".into(),
        });
        sink.send(Message::Text(hello.encode().unwrap().into()))
            .await
            .unwrap();

        let mut received = Vec::new();
        while let Some(Ok(msg)) = stream.next().await {
            let Message::Text(text) = msg else { continue };
            let event = WireEvent::decode(text.as_str()).unwrap();
            received.push(event.clone());
            if let WireEvent::PeerMessage(mut m) = event {
                m.timestamp = Some(SERVER_TIME.into());
                let echo = WireEvent::PeerMessage(m).encode().unwrap();
                if sink.send(Message::Text(echo.into())).await.is_err() {
                    break;
                }
            }
        }
        received
    });

    (format!("http://{addr}"), task)
}

async fn wait_for(
    events: &mut tokio::sync::mpsc::UnboundedReceiver<SessionEvent>,
    wanted: impl Fn(&SessionEvent) -> bool,
) -> SessionEvent {
    tokio::time::timeout(TIMEOUT, async {
        loop {
            let event = events.recv().await.expect("session ended");
            if wanted(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for session event")
}

#[tokio::test]
async fn chat_round_trip_over_websocket() {
    let (base_url, broker) = spawn_broker().await;
    let config = ClientConfig {
        base_url,
        ..ClientConfig::default()
    };

    let provider = SessionIdentity::new();
    let (session, handle, mut events) =
        ChatSession::from_config(&config, WsConnector, provider.subscribe()).unwrap();
    let task = session.spawn();

    provider.sign_in(Identity::new("alice").unwrap());
    wait_for(&mut events, |e| *e == SessionEvent::StateChanged(ConnectionState::Open)).await;

    let greeting = wait_for(&mut events, |e| matches!(e, SessionEvent::MessageAppended(_))).await;
    let SessionEvent::MessageAppended(greeting) = greeting else {
        unreachable!()
    };
    assert_eq!(greeting.origin(), Origin::System);
    assert_eq!(greeting.text(), "alice joined");

    assert!(handle.send("  hi  "));
    let echo = wait_for(&mut events, |e| matches!(e, SessionEvent::MessageAppended(_))).await;
    let SessionEvent::MessageAppended(echo) = echo else {
        unreachable!()
    };
    assert_eq!(echo.author(), "alice");
    assert_eq!(echo.text(), "hi");
    assert_eq!(echo.timestamp(), SERVER_TIME);
    assert_eq!(echo.origin(), Origin::Peer);

    provider.sign_out();
    let received = tokio::time::timeout(TIMEOUT, broker)
        .await
        .expect("broker still connected after sign-out")
        .unwrap();
    assert_eq!(received, vec![WireEvent::outbound_message("alice", "hi")]);

    let log = handle.snapshot().await.unwrap();
    assert_eq!(log.len(), 2);

    handle.shutdown();
    tokio::time::timeout(TIMEOUT, task).await.unwrap().unwrap();
}

#[tokio::test]
async fn unreachable_broker_reports_failure() {
    // Bind then drop, so the port is very likely closed.
    let addr = TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap()
        .local_addr()
        .unwrap();
    let config = ClientConfig {
        base_url: format!("http://{addr}"),
        ..ClientConfig::default()
    };

    let provider = SessionIdentity::new();
    let (session, handle, mut events) =
        ChatSession::from_config(&config, WsConnector, provider.subscribe()).unwrap();
    let _task = session.spawn();

    provider.sign_in(Identity::new("alice").unwrap());
    wait_for(&mut events, |e| *e == SessionEvent::StateChanged(ConnectionState::Closed)).await;
    wait_for(&mut events, |e| matches!(e, SessionEvent::ConnectionFailed { .. })).await;

    assert!(handle.snapshot().await.unwrap().is_empty());
}
