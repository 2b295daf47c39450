//! Authenticated identity.
//!
//! An identity is the display handle of the signed-in user: a display name or
//! an email address. It is resolved by the external session system; this crate
//! only carries it around.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The signed-in user's display handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Create an identity, rejecting blank handles.
    pub fn new(handle: impl Into<String>) -> Result<Self, IdentityParseError> {
        let handle = handle.into();
        if handle.trim().is_empty() {
            return Err(IdentityParseError::Blank);
        }
        Ok(Self(handle))
    }

    /// The handle as shown to other users.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Identity {
    type Err = IdentityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Identity {
    type Error = IdentityParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Identity> for String {
    fn from(id: Identity) -> Self {
        id.0
    }
}

/// What the session system currently knows about the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum IdentityState {
    /// Still being resolved. Treated exactly like [`IdentityState::Absent`].
    #[default]
    Resolving,
    /// Nobody is signed in.
    Absent,
    /// Signed in as this identity.
    Present(Identity),
}

impl IdentityState {
    /// The identity, if one is present.
    pub fn present(&self) -> Option<&Identity> {
        match self {
            Self::Present(identity) => Some(identity),
            Self::Resolving | Self::Absent => None,
        }
    }
}

impl From<Option<Identity>> for IdentityState {
    fn from(identity: Option<Identity>) -> Self {
        identity.map_or(Self::Absent, Self::Present)
    }
}

/// Error parsing an identity string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityParseError {
    #[error("identity cannot be blank")]
    Blank,
}
