//! Core types for livechat.
//!
//! This crate has no I/O. It defines who the user is, what a chat message
//! looks like, how events are framed on the wire, and the append-only log the
//! client renders from.

mod event;
mod identity;
mod message;
mod store;

pub use event::{
    InboundEvent, MalformedEventError, Notification, PeerMessage, WireEvent, NOTIFICATION,
    PEER_MESSAGE, PEER_MESSAGE_LEGACY,
};
pub use identity::{Identity, IdentityParseError, IdentityState};
pub use message::{format_timestamp, Message, Origin, SYSTEM_AUTHOR};
pub use store::{MessageStore, Snapshot};

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection has been attempted since the last reset.
    #[default]
    Idle,
    /// Transport handshake in flight.
    Connecting,
    /// Channel is live.
    Open,
    /// Channel released. Must be reset before the next open.
    Closed,
}

impl ConnectionState {
    /// Whether a channel is live or being established.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Connecting | Self::Open)
    }
}
