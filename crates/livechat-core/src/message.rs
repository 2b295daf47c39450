//! Chat log entries.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Author name used for messages synthesized from notifications.
pub const SYSTEM_AUTHOR: &str = "System";

/// Where a message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Sent by a user and relayed by the broker.
    Peer,
    /// Synthesized locally from a broker notification.
    System,
}

/// A single entry in the chat log. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    author: String,
    text: String,
    timestamp: String,
    origin: Origin,
}

impl Message {
    /// A message relayed from a peer, keeping the broker's timestamp verbatim.
    pub fn peer(
        author: impl Into<String>,
        text: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            author: author.into(),
            text: text.into(),
            timestamp: timestamp.into(),
            origin: Origin::Peer,
        }
    }

    /// A system message stamped with the local receipt time.
    pub fn system(text: impl Into<String>, received_at: DateTime<Utc>) -> Self {
        Self {
            author: SYSTEM_AUTHOR.to_string(),
            text: text.into(),
            timestamp: format_timestamp(received_at),
            origin: Origin::System,
        }
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// ISO-8601 timestamp. For system messages this is local receipt time.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }
}

/// Format a time the way browsers' `Date#toISOString` does.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn system_message_shape() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let msg = Message::system("bob left", at);
        assert_eq!(msg.author(), SYSTEM_AUTHOR);
        assert_eq!(msg.text(), "bob left");
        assert_eq!(msg.timestamp(), "2024-05-01T12:00:00.000Z");
        assert_eq!(msg.origin(), Origin::System);
    }

    #[test]
    fn peer_timestamp_is_verbatim() {
        let msg = Message::peer("bob", "hey", "T1");
        assert_eq!(msg.timestamp(), "T1");
        assert_eq!(msg.origin(), Origin::Peer);
    }

    #[test]
    fn origin_serializes_lowercase() {
        let json = serde_json::to_value(Message::peer("a", "b", "c")).unwrap();
        assert_eq!(json["origin"], "peer");
    }
}
