//! Auth API client.
//!
//! Credential checks and token issuance happen on the backend. This module
//! validates input locally, calls the sign-in and sign-up endpoints, and works
//! out the display identity the chat session runs under. The access token is
//! handed back to the caller; the chat core never looks at it.

use livechat_core::Identity;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::config::{ClientConfig, ConfigError};

const MIN_PASSWORD_LEN: usize = 6;
const MIN_USERNAME_LEN: usize = 3;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Rejected locally before any request was made.
    #[error("{0}")]
    Invalid(&'static str),

    #[error("Sign-in failed: Invalid email or password.")]
    Rejected,

    #[error("{0}")]
    SignUpFailed(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid auth URL: {0}")]
    Url(#[from] url::ParseError),
}

/// A successful sign-in.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub access_token: String,
    pub user_id: Option<serde_json::Value>,
    /// Who the chat session should run as.
    pub identity: Identity,
}

#[derive(Serialize)]
struct SignInRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SignUpRequest<'a> {
    username: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct SignInResponse {
    access_token: Option<String>,
    user_id: Option<serde_json::Value>,
    name: Option<String>,
    username: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorResponse {
    message: Option<String>,
}

/// Client for `POST /auth/signin` and `POST /auth/signup`.
#[derive(Debug, Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    base: Url,
}

impl AuthClient {
    pub fn new(base: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            base,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.http_url()?))
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, AuthError> {
        validate_sign_in(email, password)?;

        let url = self.base.join("auth/signin")?;
        tracing::debug!("Signing in {} at {}", email, url);
        let response = self
            .http
            .post(url)
            .json(&SignInRequest { email, password })
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::debug!("Sign-in rejected with {}", response.status());
            return Err(AuthError::Rejected);
        }

        let body: SignInResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!("Unreadable sign-in response: {}", e);
                SignInResponse::default()
            }
        };
        let access_token = body.access_token.clone().ok_or(AuthError::Rejected)?;
        let identity = resolve_identity(&body, email)?;
        tracing::info!("Signed in as {}", identity);

        Ok(SignedIn {
            access_token,
            user_id: body.user_id,
            identity,
        })
    }

    pub async fn sign_up(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        validate_sign_up(username, email, password)?;

        let url = self.base.join("auth/signup")?;
        let response = self
            .http
            .post(url)
            .json(&SignUpRequest {
                username,
                email,
                password,
            })
            .send()
            .await?;

        if response.status().is_success() {
            tracing::info!("Signed up {}", email);
            return Ok(());
        }

        let body: ErrorResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!("Unreadable sign-up error response: {}", e);
                ErrorResponse::default()
            }
        };
        Err(AuthError::SignUpFailed(
            body.message.unwrap_or_else(|| "Sign-up failed.".to_string()),
        ))
    }
}

pub fn validate_sign_in(email: &str, password: &str) -> Result<(), AuthError> {
    if email.trim().is_empty() {
        return Err(AuthError::Invalid("Email is required."));
    }
    if password.trim().is_empty() || password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Invalid("Password must be at least 6 characters."));
    }
    Ok(())
}

pub fn validate_sign_up(username: &str, email: &str, password: &str) -> Result<(), AuthError> {
    validate_sign_in(email, password)?;
    if username.trim().is_empty() || username.chars().count() < MIN_USERNAME_LEN {
        return Err(AuthError::Invalid("Username must be at least 3 characters."));
    }
    Ok(())
}

/// Display name if the backend sent one, else username, else the email.
fn resolve_identity(body: &SignInResponse, email: &str) -> Result<Identity, AuthError> {
    [body.name.as_deref(), body.username.as_deref(), Some(email)]
        .into_iter()
        .flatten()
        .find_map(|candidate| Identity::new(candidate).ok())
        .ok_or(AuthError::Invalid("Email is required."))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(name: Option<&str>, username: Option<&str>) -> SignInResponse {
        SignInResponse {
            access_token: Some("token".into()),
            user_id: None,
            name: name.map(Into::into),
            username: username.map(Into::into),
        }
    }

    #[test]
    fn identity_prefers_name_then_username_then_email() {
        let email = "alice@example.com";
        let id = |r: SignInResponse| resolve_identity(&r, email).unwrap().to_string();

        assert_eq!(id(response(Some("Alice"), Some("al"))), "Alice");
        assert_eq!(id(response(None, Some("al"))), "al");
        assert_eq!(id(response(Some("  "), None)), email);
        assert_eq!(id(response(None, None)), email);
    }

    #[test]
    fn sign_in_validation() {
        assert!(matches!(
            validate_sign_in(" ", "secret1"),
            Err(AuthError::Invalid("Email is required."))
        ));
        assert!(matches!(
            validate_sign_in("a@b.c", "12345"),
            Err(AuthError::Invalid("Password must be at least 6 characters."))
        ));
        assert!(validate_sign_in("a@b.c", "      ").is_err());
        assert!(validate_sign_in("a@b.c", "123456").is_ok());
    }

    #[test]
    fn sign_up_validation() {
        assert!(matches!(
            validate_sign_up("al", "a@b.c", "123456"),
            Err(AuthError::Invalid("Username must be at least 3 characters."))
        ));
        assert!(validate_sign_up("ali", "a@b.c", "123456").is_ok());
        assert!(validate_sign_up("ali", "", "123456").is_err());
    }
}
