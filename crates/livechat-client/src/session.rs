//! Chat session: the single event loop that ties everything together.
//!
//! A [`ChatSession`] owns one [`ConnectionManager`], one [`EventRouter`], and
//! one [`MessageStore`]. It watches the identity provider and keeps the
//! connection in step with it, routes inbound events into the store, and
//! executes commands from any number of [`SessionHandle`]s. Every identity
//! change, command, and inbound event is handled as one turn of the loop, so
//! nothing here needs a lock.
//!
//! The connection never outlives the identity it was opened for: on a change,
//! the old channel is closed (and its inbound queue dropped) before the next
//! handshake starts. There is no automatic retry. After a failed handshake or
//! a dropped connection the session stays closed until the identity changes or
//! a handle asks for [`SessionHandle::reconnect`].

use livechat_core::{
    ConnectionState, Identity, IdentityState, Message, MessageStore, Snapshot, WireEvent,
};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use url::Url;

use crate::config::{ClientConfig, ConfigError};
use crate::connection::ConnectionManager;
use crate::error::{ConnectionError, SendError};
use crate::gate::{self, Emitter};
use crate::router::{EventRouter, Routed};
use crate::transport::{ChannelEvent, Connector};

/// Requests a [`SessionHandle`] can make.
#[derive(Debug)]
pub enum SessionCommand {
    /// Send a draft through the outbound gate.
    Send(String),
    /// Reply with a snapshot of the message log.
    Snapshot(oneshot::Sender<Snapshot>),
    /// Re-open after a failure or drop, for the current identity.
    Reconnect,
    /// Close the connection and end the session.
    Shutdown,
}

/// What the presentation layer is told.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    StateChanged(ConnectionState),
    MessageAppended(Message),
    /// The handshake failed. Live updates stop until a new open succeeds.
    ConnectionFailed { reason: String },
    /// A malformed inbound event was dropped.
    EventDropped { reason: String },
}

/// Cheap, clonable handle to a running session.
///
/// The session ends once every handle has been dropped.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    /// Queue a draft for sending. Returns `false` if the session has ended.
    pub fn send(&self, draft: impl Into<String>) -> bool {
        self.command(SessionCommand::Send(draft.into()))
    }

    /// Snapshot of the message log, or `None` if the session has ended.
    pub async fn snapshot(&self) -> Option<Snapshot> {
        let (tx, rx) = oneshot::channel();
        if !self.command(SessionCommand::Snapshot(tx)) {
            return None;
        }
        rx.await.ok()
    }

    pub fn reconnect(&self) -> bool {
        self.command(SessionCommand::Reconnect)
    }

    pub fn shutdown(&self) -> bool {
        self.command(SessionCommand::Shutdown)
    }

    fn command(&self, command: SessionCommand) -> bool {
        self.commands.send(command).is_ok()
    }
}

/// The session event loop. See the module docs.
#[derive(Debug)]
pub struct ChatSession<C> {
    endpoint: Url,
    connection: ConnectionManager<C>,
    router: EventRouter,
    store: MessageStore,
    identity: watch::Receiver<IdentityState>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    events: mpsc::UnboundedSender<SessionEvent>,
    /// Identity the connection was last opened (or attempted) for.
    target: Option<Identity>,
    published: ConnectionState,
}

impl<C: Connector> ChatSession<C> {
    pub fn new(
        connection: ConnectionManager<C>,
        endpoint: Url,
        identity: watch::Receiver<IdentityState>,
    ) -> (Self, SessionHandle, mpsc::UnboundedReceiver<SessionEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let session = Self {
            endpoint,
            connection,
            router: EventRouter::new(),
            store: MessageStore::new(),
            identity,
            commands: cmd_rx,
            events: event_tx,
            target: None,
            published: ConnectionState::Idle,
        };
        (session, SessionHandle { commands: cmd_tx }, event_rx)
    }

    /// Build a session for the broker named in `config`.
    pub fn from_config(
        config: &ClientConfig,
        connector: C,
        identity: watch::Receiver<IdentityState>,
    ) -> Result<(Self, SessionHandle, mpsc::UnboundedReceiver<SessionEvent>), ConfigError> {
        let endpoint = config.socket_url()?;
        let connection = ConnectionManager::with_buffer(connector, config.event_buffer);
        Ok(Self::new(connection, endpoint, identity))
    }

    pub fn with_router(mut self, router: EventRouter) -> Self {
        self.router = router;
        self
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run until shutdown, until every handle is dropped, or until the
    /// identity provider goes away. The connection is always closed on exit.
    pub async fn run(mut self) {
        loop {
            let desired = self.identity.borrow_and_update().present().cloned();
            if desired != self.target {
                if !self.switch_identity(desired).await {
                    break;
                }
                continue;
            }

            tokio::select! {
                biased;

                changed = self.identity.changed() => {
                    if changed.is_err() {
                        tracing::debug!("Identity provider dropped");
                        break;
                    }
                }

                command = self.commands.recv() => match command {
                    Some(SessionCommand::Send(draft)) => self.handle_send(&draft),
                    Some(SessionCommand::Snapshot(reply)) => {
                        let _ = reply.send(self.store.snapshot());
                    }
                    Some(SessionCommand::Reconnect) => {
                        if !self.reconnect().await {
                            break;
                        }
                    }
                    Some(SessionCommand::Shutdown) | None => break,
                },

                event = self.connection.next_event() => self.handle_event(event),
            }
        }

        self.connection.close();
        self.publish_state();
        tracing::debug!("Session ended with {} messages", self.store.len());
    }

    /// Close whatever is open, then open for `desired` if present.
    /// Returns `false` if the identity provider went away.
    async fn switch_identity(&mut self, desired: Option<Identity>) -> bool {
        self.connection.close();
        self.connection.reset();
        self.publish_state();
        self.target = desired.clone();

        match desired {
            Some(identity) => self.connect(identity).await,
            None => true,
        }
    }

    async fn reconnect(&mut self) -> bool {
        if self.connection.state() == ConnectionState::Open {
            tracing::debug!("Reconnect requested while connected");
            return true;
        }
        let Some(identity) = self.identity.borrow().present().cloned() else {
            tracing::debug!("Reconnect requested without an identity");
            return true;
        };
        self.switch_identity(Some(identity)).await
    }

    /// Handshake for `identity`.
    ///
    /// Commands are still served while it is in flight: sends are rejected as
    /// not connected, and shutdown abandons the handshake. An identity change
    /// abandons it too. Returns `false` if the session should end.
    async fn connect(&mut self, identity: Identity) -> bool {
        self.publish(ConnectionState::Connecting);

        let outcome = {
            let open = self.connection.open(&identity, &self.endpoint);
            let leaves = identity_leaves(&mut self.identity, &identity);
            tokio::pin!(open, leaves);

            loop {
                tokio::select! {
                    biased;

                    alive = &mut leaves => {
                        if alive {
                            tracing::info!(
                                "Identity changed during handshake, abandoning connection for {}",
                                identity
                            );
                        } else {
                            tracing::debug!("Identity provider dropped during handshake");
                        }
                        break Handshake::Abandoned { resume: alive };
                    }

                    command = self.commands.recv() => match command {
                        Some(SessionCommand::Send(draft)) => {
                            log_send(gate::send(Some(&identity), &draft, &Handshaking));
                        }
                        Some(SessionCommand::Snapshot(reply)) => {
                            let _ = reply.send(self.store.snapshot());
                        }
                        Some(SessionCommand::Reconnect) => {
                            tracing::debug!("Reconnect requested while connecting");
                        }
                        Some(SessionCommand::Shutdown) | None => {
                            tracing::debug!("Session ending during handshake for {}", identity);
                            break Handshake::Abandoned { resume: false };
                        }
                    },

                    result = &mut open => break Handshake::Finished(result),
                }
            }
        };

        match outcome {
            Handshake::Finished(Ok(())) => {
                self.publish_state();
                true
            }
            Handshake::Finished(Err(e)) => {
                self.publish_state();
                self.notify(SessionEvent::ConnectionFailed {
                    reason: e.to_string(),
                });
                true
            }
            Handshake::Abandoned { resume } => {
                self.connection.close();
                self.target = None;
                self.publish_state();
                resume
            }
        }
    }

    fn handle_send(&self, draft: &str) {
        let identity = self.identity.borrow().present().cloned();
        log_send(gate::send(identity.as_ref(), draft, &self.connection));
    }

    fn handle_event(&mut self, event: ChannelEvent) {
        match self.router.route(event, &mut self.store) {
            Ok(Routed::Appended { message, .. }) => {
                self.notify(SessionEvent::MessageAppended(message));
            }
            Ok(Routed::Logged) => {}
            Err(e) => {
                tracing::warn!("Dropping malformed event: {}", e);
                self.notify(SessionEvent::EventDropped {
                    reason: e.to_string(),
                });
            }
        }
        self.publish_state();
    }

    fn publish_state(&mut self) {
        self.publish(self.connection.state());
    }

    fn publish(&mut self, state: ConnectionState) {
        if state != self.published {
            self.published = state;
            self.notify(SessionEvent::StateChanged(state));
        }
    }

    // The presentation may have gone away; the session carries on regardless.
    fn notify(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}

enum Handshake {
    Finished(Result<(), ConnectionError>),
    /// Dropped before completing. `resume` is whether the session carries on.
    Abandoned { resume: bool },
}

/// Emitter for the handshake window: nothing is open yet.
struct Handshaking;

impl Emitter for Handshaking {
    fn emit(&self, _event: WireEvent) -> Result<(), SendError> {
        Err(SendError::NotConnected)
    }
}

fn log_send(result: Result<(), SendError>) {
    match result {
        Ok(()) => tracing::debug!("Message sent"),
        Err(e) if e.is_silent() => tracing::debug!("Send skipped: {}", e),
        Err(e) => tracing::warn!("Send failed: {}", e),
    }
}

/// Resolves once the provider no longer reports `current`. Yields `false` if
/// the provider was dropped.
async fn identity_leaves(
    identity: &mut watch::Receiver<IdentityState>,
    current: &Identity,
) -> bool {
    loop {
        if identity.changed().await.is_err() {
            return false;
        }
        if identity.borrow().present() != Some(current) {
            return true;
        }
    }
}
