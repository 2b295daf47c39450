//! Client configuration.
//!
//! Loaded from TOML. Every field has a default, so an empty file (or no file)
//! is a valid configuration pointing at a broker on localhost.
//!
//! ```toml
//! base_url = "https://chat.example.com"
//! socket_path = "/"
//! event_buffer = 64
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::connection::DEFAULT_EVENT_BUFFER;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("unsupported URL scheme `{0}`")]
    UnsupportedScheme(String),
}

/// Where the backend lives and how to talk to it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL shared by the auth API and the broker.
    pub base_url: String,
    /// Path of the broker's socket endpoint, relative to `base_url`.
    pub socket_path: String,
    /// Bound on queued inbound events per connection.
    pub event_buffer: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            socket_path: "/".to_string(),
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl ClientConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_toml_str(&text)
    }

    /// Base URL for HTTP calls.
    pub fn http_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.base_url)?;
        match url.scheme() {
            "http" | "https" | "ws" | "wss" => Ok(url),
            other => Err(ConfigError::UnsupportedScheme(other.to_string())),
        }
    }

    /// Broker endpoint: the base URL with its scheme switched to WebSocket.
    pub fn socket_url(&self) -> Result<Url, ConfigError> {
        let base = self.http_url()?;
        let scheme = match base.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        let mut url = base.join(&self.socket_path)?;
        url.set_scheme(scheme)
            .map_err(|()| ConfigError::UnsupportedScheme(scheme.to_string()))?;
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClientConfig::from_toml_str("").unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.socket_url().unwrap().as_str(), "ws://localhost:3000/");
    }

    #[test]
    fn https_becomes_wss() {
        let config = ClientConfig::from_toml_str(
            r#"
            base_url = "https://chat.example.com/api/"
            socket_path = "socket"
            event_buffer = 8
            "#,
        )
        .unwrap();
        assert_eq!(
            config.socket_url().unwrap().as_str(),
            "wss://chat.example.com/api/socket"
        );
        assert_eq!(config.event_buffer, 8);
    }

    #[test]
    fn rejects_other_schemes() {
        let config = ClientConfig {
            base_url: "ftp://example.com".into(),
            ..ClientConfig::default()
        };
        assert!(matches!(
            config.socket_url(),
            Err(ConfigError::UnsupportedScheme(s)) if s == "ftp"
        ));
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            ClientConfig::from_toml_str("event_buffer = \"lots\""),
            Err(ConfigError::Parse(_))
        ));
        let config = ClientConfig {
            base_url: "not a url".into(),
            ..ClientConfig::default()
        };
        assert!(matches!(config.http_url(), Err(ConfigError::InvalidUrl(_))));
    }
}
