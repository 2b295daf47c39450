//! Outbound messages.

use livechat_core::{Identity, WireEvent};

use crate::error::SendError;

/// Anything that can put an event on the wire without waiting.
pub trait Emitter {
    fn emit(&self, event: WireEvent) -> Result<(), SendError>;
}

/// Validate a draft and emit it as a `peerMessage`.
///
/// Fire-and-forget: nothing is appended locally, the broker echoes the message
/// back to every connection including this one.
pub fn send<E: Emitter + ?Sized>(
    identity: Option<&Identity>,
    draft: &str,
    emitter: &E,
) -> Result<(), SendError> {
    let identity = identity.ok_or(SendError::NoIdentity)?;
    let text = draft.trim();
    if text.is_empty() {
        return Err(SendError::EmptyDraft);
    }
    emitter.emit(WireEvent::outbound_message(identity.as_str(), text))
}
