//! In-process transport.
//!
//! [`MemoryConnector`] hands every accepted connection to a [`MemoryListener`]
//! as a [`MemoryPeer`], which plays the broker's side of the channel. Used to
//! embed a client next to a local broker, and in tests.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use livechat_core::WireEvent;
use tokio::sync::{mpsc, watch};
use url::Url;

use crate::transport::{Channel, ChannelEvent, Connector, TransportError};

/// Connector whose "network" is a pair of in-memory queues.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    peers: mpsc::UnboundedSender<MemoryPeer>,
    refuse_next: Arc<AtomicBool>,
    accepting: watch::Sender<bool>,
}

/// Receives the broker side of each connection.
#[derive(Debug)]
pub struct MemoryListener {
    peers: mpsc::UnboundedReceiver<MemoryPeer>,
}

impl MemoryConnector {
    pub fn new() -> (Self, MemoryListener) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = Self {
            peers: tx,
            refuse_next: Arc::new(AtomicBool::new(false)),
            accepting: watch::Sender::new(true),
        };
        (connector, MemoryListener { peers: rx })
    }

    /// Fail the next handshake.
    pub fn refuse_next(&self) {
        self.refuse_next.store(true, Ordering::SeqCst);
    }

    /// Hold handshakes in flight until [`MemoryConnector::resume`].
    pub fn pause(&self) {
        self.accepting.send_replace(false);
    }

    pub fn resume(&self) {
        self.accepting.send_replace(true);
    }
}

impl Connector for MemoryConnector {
    fn connect(
        &self,
        endpoint: &Url,
        buffer: usize,
    ) -> impl Future<Output = Result<Channel, TransportError>> + Send {
        let endpoint = endpoint.clone();
        let peers = self.peers.clone();
        let refuse = self.refuse_next.swap(false, Ordering::SeqCst);
        let mut accepting = self.accepting.subscribe();

        async move {
            if refuse {
                return Err(TransportError::Handshake(format!(
                    "{endpoint}: connection refused"
                )));
            }
            let accepted = accepting.wait_for(|open| *open).await.is_ok();
            if !accepted {
                return Err(TransportError::Handshake("connector dropped".into()));
            }

            let (in_tx, in_rx) = mpsc::channel(buffer.max(1));
            let (out_tx, out_rx) = mpsc::unbounded_channel();
            let _ = in_tx.try_send(ChannelEvent::Connected);

            let peer = MemoryPeer {
                endpoint,
                to_client: in_tx,
                from_client: out_rx,
            };
            peers
                .send(peer)
                .map_err(|_| TransportError::Handshake("no listener".into()))?;

            Ok(Channel::new(out_tx, in_rx))
        }
    }
}

impl MemoryListener {
    /// Wait for the next connection.
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.peers.recv().await
    }

    /// A connection that has already been made, if any.
    pub fn try_accept(&mut self) -> Option<MemoryPeer> {
        self.peers.try_recv().ok()
    }
}

/// The broker's side of one in-memory connection.
#[derive(Debug)]
pub struct MemoryPeer {
    endpoint: Url,
    to_client: mpsc::Sender<ChannelEvent>,
    from_client: mpsc::UnboundedReceiver<WireEvent>,
}

impl MemoryPeer {
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Send an event to the client. Returns `false` once the client has
    /// released the channel.
    pub async fn deliver(&self, event: &WireEvent) -> bool {
        match event.encode() {
            Ok(frame) => self.deliver_raw(frame).await,
            Err(_) => false,
        }
    }

    /// Send an arbitrary text frame, well-formed or not.
    pub async fn deliver_raw(&self, frame: impl Into<String>) -> bool {
        self.to_client
            .send(ChannelEvent::Frame(frame.into()))
            .await
            .is_ok()
    }

    /// Next event the client emitted, or `None` once the client is gone.
    pub async fn recv(&mut self) -> Option<WireEvent> {
        self.from_client.recv().await
    }

    pub fn try_recv(&mut self) -> Option<WireEvent> {
        self.from_client.try_recv().ok()
    }

    /// Whether the client has released its end of the channel.
    pub fn is_closed(&self) -> bool {
        self.to_client.is_closed()
    }
}
