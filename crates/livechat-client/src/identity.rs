//! Identity provider adapter.
//!
//! The session system is external. All the client needs from it is a watch
//! channel of [`IdentityState`]; [`SessionIdentity`] is the writable end the
//! sign-in flow drives.

use livechat_core::{Identity, IdentityState};
use tokio::sync::watch;

/// Source of the current identity.
pub trait IdentityProvider {
    fn subscribe(&self) -> watch::Receiver<IdentityState>;
}

/// Identity held by the local session. Starts out resolving.
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    state: watch::Sender<IdentityState>,
}

impl Default for SessionIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionIdentity {
    pub fn new() -> Self {
        Self {
            state: watch::Sender::new(IdentityState::Resolving),
        }
    }

    /// Finish resolving, with or without a signed-in user.
    pub fn resolve(&self, identity: Option<Identity>) {
        self.set(IdentityState::from(identity));
    }

    pub fn sign_in(&self, identity: Identity) {
        self.set(IdentityState::Present(identity));
    }

    pub fn sign_out(&self) {
        self.set(IdentityState::Absent);
    }

    pub fn current(&self) -> IdentityState {
        self.state.borrow().clone()
    }

    // Unchanged states are not republished.
    fn set(&self, next: IdentityState) {
        self.state.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            tracing::debug!("Identity changed: {:?} -> {:?}", state, next);
            *state = next;
            true
        });
    }
}

impl IdentityProvider for SessionIdentity {
    fn subscribe(&self) -> watch::Receiver<IdentityState> {
        self.state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_resolving() {
        let session = SessionIdentity::new();
        assert_eq!(session.current(), IdentityState::Resolving);
        assert_eq!(session.current().present(), None);
    }

    #[tokio::test]
    async fn same_identity_does_not_notify() {
        let session = SessionIdentity::new();
        let mut rx = session.subscribe();
        let alice = Identity::new("alice").unwrap();

        session.sign_in(alice.clone());
        assert!(rx.has_changed().unwrap());
        let _ = rx.borrow_and_update();

        session.sign_in(alice.clone());
        assert!(!rx.has_changed().unwrap());

        session.sign_out();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), IdentityState::Absent);
    }

    #[test]
    fn resolve_none_is_absent() {
        let session = SessionIdentity::new();
        session.resolve(None);
        assert_eq!(session.current(), IdentityState::Absent);
    }
}
