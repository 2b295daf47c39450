//! Text rendering of chat messages and session events.

use chrono::{DateTime, Local};
use livechat_client::SessionEvent;
use livechat_core::{ConnectionState, Message, Origin};

/// `[12:34] bob: hey`, with `you` for the signed-in user and `*` for notices.
pub fn message(message: &Message, me: &str) -> String {
    let time = short_time(message.timestamp());
    match message.origin() {
        Origin::System => format!("[{time}] * {}", message.text()),
        Origin::Peer if message.author() == me => format!("[{time}] you: {}", message.text()),
        Origin::Peer => format!("[{time}] {}: {}", message.author(), message.text()),
    }
}

pub fn event(event: &SessionEvent, me: &str) -> Option<String> {
    match event {
        SessionEvent::MessageAppended(m) => Some(message(m, me)),
        SessionEvent::StateChanged(ConnectionState::Open) => Some("-- connected".to_string()),
        SessionEvent::StateChanged(ConnectionState::Closed) => {
            Some("-- disconnected (/reconnect to retry)".to_string())
        }
        SessionEvent::StateChanged(_) => None,
        SessionEvent::ConnectionFailed { reason } => Some(format!("-- {reason}")),
        SessionEvent::EventDropped { .. } => None,
    }
}

/// Hours and minutes in local time, or the raw string if it does not parse.
fn short_time(timestamp: &str) -> String {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(at) => at.with_timezone(&Local).format("%H:%M").to_string(),
        Err(_) => timestamp.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_messages_say_you() {
        let m = Message::peer("alice", "hi", "T1");
        assert_eq!(message(&m, "alice"), "[T1] you: hi");
        assert_eq!(message(&m, "bob"), "[T1] alice: hi");
    }

    #[test]
    fn system_messages_are_starred() {
        let m = Message::system("bob left", chrono::Utc::now());
        assert!(message(&m, "alice").ends_with("] * bob left"));
    }

    #[test]
    fn quiet_events() {
        assert_eq!(
            event(&SessionEvent::StateChanged(ConnectionState::Connecting), "a"),
            None
        );
        assert_eq!(
            event(&SessionEvent::StateChanged(ConnectionState::Open), "a").as_deref(),
            Some("-- connected")
        );
    }
}
