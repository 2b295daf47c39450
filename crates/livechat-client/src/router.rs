//! Inbound event routing.
//!
//! Turns raw channel events into log entries. Connect and disconnect are
//! log-only; chat content and notifications are appended in the order they
//! were delivered. A malformed frame is reported and dropped, and the router
//! carries on with the next one.

use chrono::{DateTime, Utc};
use livechat_core::{format_timestamp, InboundEvent, MalformedEventError, Message, MessageStore};

use crate::transport::ChannelEvent;

/// What routing an event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    /// The message was appended; `len` is the new log length.
    Appended { message: Message, len: usize },
    /// Nothing was stored.
    Logged,
}

/// Maps channel events onto the message log.
#[derive(Debug, Clone, Copy)]
pub struct EventRouter {
    clock: fn() -> DateTime<Utc>,
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl EventRouter {
    pub fn new() -> Self {
        Self::with_clock(Utc::now)
    }

    /// Use `clock` for the receipt time of system messages.
    pub fn with_clock(clock: fn() -> DateTime<Utc>) -> Self {
        Self { clock }
    }

    pub fn route(
        &self,
        event: ChannelEvent,
        store: &mut MessageStore,
    ) -> Result<Routed, MalformedEventError> {
        let frame = match event {
            ChannelEvent::Connected => {
                tracing::info!("Connected to broker");
                return Ok(Routed::Logged);
            }
            ChannelEvent::Disconnected => {
                tracing::info!("Disconnected from broker");
                return Ok(Routed::Logged);
            }
            ChannelEvent::Frame(frame) => frame,
        };

        let message = match frame.parse::<InboundEvent>()? {
            InboundEvent::PeerMessage(msg) => {
                let timestamp = msg
                    .timestamp
                    .unwrap_or_else(|| format_timestamp((self.clock)()));
                Message::peer(msg.author, msg.text, timestamp)
            }
            InboundEvent::Notification(note) => Message::system(note.message, (self.clock)()),
            InboundEvent::Unknown(name) => {
                tracing::debug!("Ignoring unsubscribed event {}", name);
                return Ok(Routed::Logged);
            }
        };

        let len = store.append(message.clone());
        Ok(Routed::Appended { message, len })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use livechat_core::{Origin, SYSTEM_AUTHOR};

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn frame(json: &str) -> ChannelEvent {
        ChannelEvent::Frame(json.to_string())
    }

    #[test]
    fn peer_then_notification() {
        let router = EventRouter::with_clock(fixed_now);
        let mut store = MessageStore::new();

        router
            .route(
                frame(r#"{"event":"peerMessage","data":{"author":"bob","text":"hey","timestamp":"T1"}}"#),
                &mut store,
            )
            .unwrap();
        router
            .route(
                frame(r#"{"event":"notification","data":{"message":"bob left"}}"#),
                &mut store,
            )
            .unwrap();

        assert_eq!(
            store.snapshot().to_vec(),
            vec![
                Message::peer("bob", "hey", "T1"),
                Message::system("bob left", fixed_now()),
            ]
        );
        let snapshot = store.snapshot();
        let last = snapshot.iter().last().unwrap();
        assert_eq!(last.author(), SYSTEM_AUTHOR);
        assert_eq!(last.origin(), Origin::System);
        assert_eq!(last.timestamp(), "2024-05-01T12:00:00.000Z");
    }

    #[test]
    fn connect_and_disconnect_do_not_touch_the_store() {
        let router = EventRouter::new();
        let mut store = MessageStore::new();
        store.append(Message::peer("bob", "hey", "T1"));

        assert_eq!(router.route(ChannelEvent::Connected, &mut store), Ok(Routed::Logged));
        assert_eq!(
            router.route(ChannelEvent::Disconnected, &mut store),
            Ok(Routed::Logged)
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn malformed_frames_are_dropped_and_routing_continues() {
        let router = EventRouter::new();
        let mut store = MessageStore::new();

        let bad = router.route(frame(r#"{"event":"peerMessage","data":{"text":"x"}}"#), &mut store);
        assert!(bad.is_err());
        assert!(router.route(frame("{"), &mut store).is_err());
        assert!(store.is_empty());

        let good = router
            .route(
                frame(r#"{"event":"peerMessage","data":{"author":"bob","text":"ok","timestamp":"T2"}}"#),
                &mut store,
            )
            .unwrap();
        assert!(matches!(good, Routed::Appended { len: 1, .. }));
    }

    #[test]
    fn missing_timestamp_uses_receipt_time() {
        let router = EventRouter::with_clock(fixed_now);
        let mut store = MessageStore::new();
        router
            .route(frame(r#"{"event":"newMessage","data":{"user":"bob","text":"hi"}}"#), &mut store)
            .unwrap();
        let snapshot = store.snapshot();
        let msg = snapshot.iter().next().unwrap();
        assert_eq!(msg.timestamp(), "2024-05-01T12:00:00.000Z");
        assert_eq!(msg.origin(), Origin::Peer);
    }

    #[test]
    fn unknown_events_are_ignored() {
        let router = EventRouter::new();
        let mut store = MessageStore::new();
        assert_eq!(
            router.route(frame(r#"{"event":"typing","data":{}}"#), &mut store),
            Ok(Routed::Logged)
        );
        assert!(store.is_empty());
    }
}
