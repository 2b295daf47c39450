//! Broker implementation.

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use livechat_core::{format_timestamp, Notification, PeerMessage, WireEvent};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;

pub async fn run(addr: SocketAddr) -> anyhow::Result<()> {
    let (broadcast_tx, _) = broadcast::channel::<String>(100);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on ws://{}", addr);

    loop {
        let (stream, client_addr) = listener.accept().await?;
        let broadcast_tx = broadcast_tx.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, client_addr, broadcast_tx).await {
                tracing::warn!("Connection error from {}: {}", client_addr, e);
            }
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    broadcast_tx: broadcast::Sender<String>,
) -> anyhow::Result<()> {
    let ws = tokio_tungstenite::accept_async(stream).await?;
    let (mut sink, mut stream) = ws.split();
    let mut broadcast_rx = broadcast_tx.subscribe();

    tracing::debug!("New connection from {}", addr);

    // Learned from the first message on this connection.
    let mut author: Option<String> = None;

    loop {
        tokio::select! {
            msg = stream.next() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        tracing::debug!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                };

                let Message::Text(text) = msg else { continue };
                let event = match WireEvent::decode(text.as_str()) {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::warn!("Invalid event from {}: {}", addr, e);
                        continue;
                    }
                };

                match event {
                    WireEvent::PeerMessage(msg) => {
                        if author.is_none() {
                            author = Some(msg.author.clone());
                            announce(&broadcast_tx, format!("{} joined", msg.author))?;
                        }
                        let stamped = stamp(msg);
                        let _ = broadcast_tx.send(stamped.encode()?);
                    }
                    WireEvent::Notification(_) => {
                        tracing::warn!("Ignoring notification sent by client {}", addr);
                    }
                }
            }

            frame = broadcast_rx.recv() => match frame {
                Ok(frame) => sink.send(Message::Text(frame.into())).await?,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("{} lagged, skipped {} events", addr, n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    if let Some(author) = author {
        announce(&broadcast_tx, format!("{author} left"))?;
    }

    tracing::debug!("Connection closed: {}", addr);
    Ok(())
}

/// Give a client message the broker's receipt time.
fn stamp(msg: PeerMessage) -> WireEvent {
    WireEvent::PeerMessage(PeerMessage {
        timestamp: Some(format_timestamp(Utc::now())),
        ..msg
    })
}

fn announce(broadcast_tx: &broadcast::Sender<String>, message: String) -> anyhow::Result<()> {
    let frame = WireEvent::Notification(Notification { message }).encode()?;
    let _ = broadcast_tx.send(frame);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamp_replaces_client_timestamp() {
        let WireEvent::PeerMessage(msg) = stamp(PeerMessage {
            author: "alice".into(),
            text: "hi".into(),
            timestamp: Some("forged".into()),
        }) else {
            panic!("expected a peer message");
        };
        assert_eq!(msg.author, "alice");
        let stamped = msg.timestamp.unwrap();
        assert_ne!(stamped, "forged");
        assert!(chrono::DateTime::parse_from_rfc3339(&stamped).is_ok());
    }
}
