//! Transport layer.
//!
//! A [`Connector`] turns an endpoint into a [`Channel`]: an outbound queue of
//! [`WireEvent`]s and an inbound queue of [`ChannelEvent`]s, with a background
//! task doing the actual I/O. Protocol logic stays in the router and gate.

use std::future::Future;

use futures_util::{SinkExt, StreamExt};
use livechat_core::WireEvent;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The handshake with the broker did not complete.
    #[error("handshake failed: {0}")]
    Handshake(String),
}

/// Something the transport delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Handshake completed. Always the first event on a channel.
    Connected,
    /// A text frame, not yet validated.
    Frame(String),
    /// The transport ended. Synthesized once by the connection manager.
    Disconnected,
}

/// A live bidirectional channel to the broker.
///
/// Dropping the channel aborts its I/O task and detaches the inbound queue, so
/// nothing sent afterwards can be observed.
#[derive(Debug)]
pub struct Channel {
    outbound: mpsc::UnboundedSender<WireEvent>,
    inbound: mpsc::Receiver<ChannelEvent>,
    io_task: Option<AbortHandle>,
}

impl Channel {
    pub fn new(
        outbound: mpsc::UnboundedSender<WireEvent>,
        inbound: mpsc::Receiver<ChannelEvent>,
    ) -> Self {
        Self {
            outbound,
            inbound,
            io_task: None,
        }
    }

    /// Tie a background I/O task to this channel's lifetime.
    pub fn with_io_task(mut self, task: AbortHandle) -> Self {
        self.io_task = Some(task);
        self
    }

    /// Queue an outbound event. Returns `false` if the transport is gone.
    pub(crate) fn send(&self, event: WireEvent) -> bool {
        self.outbound.send(event).is_ok()
    }

    /// Next inbound event, or `None` once the transport has ended.
    pub(crate) async fn recv(&mut self) -> Option<ChannelEvent> {
        self.inbound.recv().await
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        if let Some(task) = self.io_task.take() {
            task.abort();
        }
    }
}

/// Opens channels to a broker endpoint.
pub trait Connector: Send + Sync + 'static {
    /// Perform the handshake. `buffer` bounds the inbound queue.
    fn connect(
        &self,
        endpoint: &Url,
        buffer: usize,
    ) -> impl Future<Output = Result<Channel, TransportError>> + Send;
}

/// WebSocket transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl Connector for WsConnector {
    fn connect(
        &self,
        endpoint: &Url,
        buffer: usize,
    ) -> impl Future<Output = Result<Channel, TransportError>> + Send {
        let endpoint = endpoint.clone();
        async move {
            let (ws, _response) = tokio_tungstenite::connect_async(endpoint.as_str())
                .await
                .map_err(|e| TransportError::Handshake(e.to_string()))?;

            let (in_tx, in_rx) = mpsc::channel(buffer.max(1));
            let (out_tx, out_rx) = mpsc::unbounded_channel();
            let _ = in_tx.try_send(ChannelEvent::Connected);

            let task = tokio::spawn(pump(ws, in_tx, out_rx));
            Ok(Channel::new(out_tx, in_rx).with_io_task(task.abort_handle()))
        }
    }
}

/// Bridge the socket and the channel queues until either side goes away.
async fn pump(
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    inbound: mpsc::Sender<ChannelEvent>,
    mut outbound: mpsc::UnboundedReceiver<WireEvent>,
) {
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    if inbound.send(ChannelEvent::Frame(text.as_str().to_owned())).await.is_err() {
                        break;
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!("WebSocket error: {}", e);
                    break;
                }
            },

            event = outbound.recv() => match event {
                Some(event) => {
                    let frame = match event.encode() {
                        Ok(frame) => frame,
                        Err(e) => {
                            tracing::warn!("Could not encode outbound event: {}", e);
                            continue;
                        }
                    };
                    if let Err(e) = sink.send(WsMessage::Text(frame.into())).await {
                        tracing::debug!("WebSocket send failed: {}", e);
                        break;
                    }
                }
                None => {
                    let _ = sink.close().await;
                    break;
                }
            },
        }
    }
}
