//! Client errors.

use livechat_core::{ConnectionState, Identity};
use thiserror::Error;
use url::Url;

use crate::transport::TransportError;

/// Why a connection could not be opened.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// A connection for another identity is live; close it first.
    #[error("connection already {state:?} for {current}, cannot open for {requested}")]
    AlreadyOpen {
        state: ConnectionState,
        current: Identity,
        requested: Identity,
    },

    /// The manager is closed and has not been reset.
    #[error("connection is closed; reset before opening again")]
    NotReset,

    /// The transport handshake failed.
    #[error("connection to {endpoint} failed: {source}")]
    ConnectionFailed {
        endpoint: Url,
        #[source]
        source: TransportError,
    },
}

/// Why an outbound message was not sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("no signed-in identity")]
    NoIdentity,

    #[error("message is empty")]
    EmptyDraft,

    #[error("not connected")]
    NotConnected,
}

impl SendError {
    /// Validation failures are dropped quietly; the user simply sees nothing sent.
    pub fn is_silent(self) -> bool {
        matches!(self, Self::NoIdentity | Self::EmptyDraft)
    }
}
