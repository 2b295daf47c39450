//! Connection lifecycle.
//!
//! [`ConnectionManager`] owns at most one [`Channel`] and moves through
//! `Idle -> Connecting -> Open -> Closed`, returning to `Idle` only through an
//! explicit [`ConnectionManager::reset`]. All methods take `&mut self`, so the
//! owner's task is the only place a transition can happen.

use livechat_core::{ConnectionState, Identity, WireEvent};
use url::Url;

use crate::error::{ConnectionError, SendError};
use crate::gate::Emitter;
use crate::transport::{Channel, ChannelEvent, Connector};

/// Default bound on queued inbound events per channel.
pub const DEFAULT_EVENT_BUFFER: usize = 64;

/// Owns the live channel to the broker.
#[derive(Debug)]
pub struct ConnectionManager<C> {
    connector: C,
    buffer: usize,
    state: ConnectionState,
    identity: Option<Identity>,
    channel: Option<Channel>,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(connector: C) -> Self {
        Self::with_buffer(connector, DEFAULT_EVENT_BUFFER)
    }

    pub fn with_buffer(connector: C, buffer: usize) -> Self {
        Self {
            connector,
            buffer,
            state: ConnectionState::Idle,
            identity: None,
            channel: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Identity the current (or last) connection was opened for.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Open a channel for `identity`.
    ///
    /// Already open for the same identity is a no-op. Open or connecting for a
    /// different identity is an error: the caller must close first.
    pub async fn open(
        &mut self,
        identity: &Identity,
        endpoint: &Url,
    ) -> Result<(), ConnectionError> {
        match self.state {
            ConnectionState::Open | ConnectionState::Connecting
                if self.identity.as_ref() != Some(identity) =>
            {
                let current = self.identity.clone().unwrap_or_else(|| identity.clone());
                return Err(ConnectionError::AlreadyOpen {
                    state: self.state,
                    current,
                    requested: identity.clone(),
                });
            }
            ConnectionState::Open => {
                tracing::debug!("Already connected as {}", identity);
                return Ok(());
            }
            ConnectionState::Closed => return Err(ConnectionError::NotReset),
            // A Connecting state here means an earlier handshake future was
            // dropped before finishing; start over.
            ConnectionState::Connecting | ConnectionState::Idle => {}
        }

        self.identity = Some(identity.clone());
        self.state = ConnectionState::Connecting;
        tracing::debug!("Connecting to {} as {}", endpoint, identity);

        match self.connector.connect(endpoint, self.buffer).await {
            Ok(channel) => {
                self.channel = Some(channel);
                self.state = ConnectionState::Open;
                tracing::info!("Connected to {} as {}", endpoint, identity);
                Ok(())
            }
            Err(source) => {
                self.state = ConnectionState::Closed;
                tracing::warn!("Connection to {} failed: {}", endpoint, source);
                Err(ConnectionError::ConnectionFailed {
                    endpoint: endpoint.clone(),
                    source,
                })
            }
        }
    }

    /// Release the channel. Idempotent.
    pub fn close(&mut self) {
        if matches!(self.state, ConnectionState::Idle | ConnectionState::Closed) {
            return;
        }
        // Dropping the channel aborts its I/O task and detaches the inbound queue.
        self.channel = None;
        self.state = ConnectionState::Closed;
        if let Some(identity) = &self.identity {
            tracing::info!("Connection closed for {}", identity);
        }
    }

    /// `Closed -> Idle`. Returns whether a reset happened.
    pub fn reset(&mut self) -> bool {
        if self.state != ConnectionState::Closed {
            return false;
        }
        self.state = ConnectionState::Idle;
        self.identity = None;
        true
    }

    /// Next inbound event, in transport order.
    ///
    /// Pends forever while there is no channel. When the transport ends, the
    /// manager closes itself and yields a single [`ChannelEvent::Disconnected`].
    /// Cancel-safe.
    pub async fn next_event(&mut self) -> ChannelEvent {
        let Some(channel) = self.channel.as_mut() else {
            return std::future::pending().await;
        };

        match channel.recv().await {
            Some(event) => event,
            None => {
                self.channel = None;
                self.state = ConnectionState::Closed;
                ChannelEvent::Disconnected
            }
        }
    }
}

impl<C: Connector> Emitter for ConnectionManager<C> {
    fn emit(&self, event: WireEvent) -> Result<(), SendError> {
        let channel = match (&self.channel, self.state) {
            (Some(channel), ConnectionState::Open) => channel,
            _ => return Err(SendError::NotConnected),
        };
        if channel.send(event) {
            Ok(())
        } else {
            Err(SendError::NotConnected)
        }
    }
}
