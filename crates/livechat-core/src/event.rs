//! Wire events exchanged with the broker.
//!
//! Every frame is a JSON object `{"event": <name>, "data": <payload>}`.
//! [`WireEvent`] is the strict form used for encoding (and by brokers).
//! [`InboundEvent`] is what a client accepts: it is validated field by field so
//! a bad frame is reported precisely instead of failing as a whole.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Chat content, in either direction.
pub const PEER_MESSAGE: &str = "peerMessage";
/// Older brokers emit chat content under this name.
pub const PEER_MESSAGE_LEGACY: &str = "newMessage";
/// System-originated notice.
pub const NOTIFICATION: &str = "notification";

/// A strictly typed wire event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum WireEvent {
    #[serde(rename = "peerMessage", alias = "newMessage")]
    PeerMessage(PeerMessage),
    #[serde(rename = "notification")]
    Notification(Notification),
}

impl WireEvent {
    /// Outbound chat message. The broker stamps the timestamp.
    pub fn outbound_message(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self::PeerMessage(PeerMessage {
            author: author.into(),
            text: text.into(),
            timestamp: None,
        })
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(frame: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(frame)
    }
}

/// `peerMessage` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerMessage {
    #[serde(alias = "user")]
    pub author: String,
    pub text: String,
    /// Absent on outbound messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// `notification` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
}

/// A validated inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    PeerMessage(PeerMessage),
    Notification(Notification),
    /// An event this client does not subscribe to.
    Unknown(String),
}

impl FromStr for InboundEvent {
    type Err = MalformedEventError;

    fn from_str(frame: &str) -> Result<Self, Self::Err> {
        let envelope: Envelope = serde_json::from_str(frame)
            .map_err(|e| MalformedEventError::InvalidEnvelope(e.to_string()))?;

        match envelope.event.as_str() {
            PEER_MESSAGE | PEER_MESSAGE_LEGACY => {
                let raw: RawPeerMessage = payload(PEER_MESSAGE, envelope.data)?;
                let author = raw.author.ok_or(MalformedEventError::MissingField {
                    event: PEER_MESSAGE,
                    field: "author",
                })?;
                let text = raw.text.ok_or(MalformedEventError::MissingField {
                    event: PEER_MESSAGE,
                    field: "text",
                })?;
                Ok(Self::PeerMessage(PeerMessage {
                    author,
                    text,
                    timestamp: raw.timestamp,
                }))
            }
            NOTIFICATION => {
                let raw: RawNotification = payload(NOTIFICATION, envelope.data)?;
                let message = raw.message.ok_or(MalformedEventError::MissingField {
                    event: NOTIFICATION,
                    field: "message",
                })?;
                Ok(Self::Notification(Notification { message }))
            }
            _ => Ok(Self::Unknown(envelope.event)),
        }
    }
}

#[derive(Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Deserialize)]
struct RawPeerMessage {
    #[serde(alias = "user")]
    author: Option<String>,
    text: Option<String>,
    timestamp: Option<String>,
}

#[derive(Deserialize)]
struct RawNotification {
    message: Option<String>,
}

fn payload<T: serde::de::DeserializeOwned>(
    event: &'static str,
    data: serde_json::Value,
) -> Result<T, MalformedEventError> {
    serde_json::from_value(data).map_err(|e| MalformedEventError::InvalidPayload {
        event,
        reason: e.to_string(),
    })
}

/// An inbound frame that could not be turned into an event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedEventError {
    #[error("frame is not an event envelope: {0}")]
    InvalidEnvelope(String),
    #[error("`{event}` payload is missing `{field}`")]
    MissingField {
        event: &'static str,
        field: &'static str,
    },
    #[error("`{event}` payload is invalid: {reason}")]
    InvalidPayload { event: &'static str, reason: String },
}
