//! Session-gated real-time chat client.
//!
//! A connection to the broker exists only while somebody is signed in:
//!
//! - [`identity`]: the identity provider seam and the local session adapter.
//! - [`connection`]: [`ConnectionManager`], which owns at most one channel.
//! - [`router`]: [`EventRouter`], which turns inbound events into log entries.
//! - [`gate`]: validation and emission of outbound messages.
//! - [`session`]: [`ChatSession`], the event loop binding them together.
//!
//! [`transport`] has the WebSocket connector, [`memory`] an in-process one.
//! [`auth`] talks to the sign-in/sign-up API.

pub mod auth;
pub mod config;
pub mod connection;
pub mod error;
pub mod gate;
pub mod identity;
pub mod memory;
pub mod router;
pub mod session;
pub mod transport;

pub use auth::{AuthClient, AuthError, SignedIn};
pub use config::{ClientConfig, ConfigError};
pub use connection::ConnectionManager;
pub use error::{ConnectionError, SendError};
pub use gate::Emitter;
pub use identity::{IdentityProvider, SessionIdentity};
pub use memory::{MemoryConnector, MemoryListener, MemoryPeer};
pub use router::{EventRouter, Routed};
pub use session::{ChatSession, SessionCommand, SessionEvent, SessionHandle};
pub use transport::{Channel, ChannelEvent, Connector, TransportError, WsConnector};
