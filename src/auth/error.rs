//! Error types for the login flow.

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::session::SessionError;

/// Errors surfaced to the browser by the auth handlers.
///
/// Transient provider failures are not in here: the flow recovers from
/// those by sending the browser home (see [`ProviderError`]).
#[derive(Debug, Clone)]
pub enum AuthError {
    /// Callback state does not match the pending login (possible CSRF)
    InvalidState,
    /// The user-info endpoint answered with an empty body
    EmptyProfile,
    /// The user-info payload could not be decoded
    MalformedProfile(String),
    /// No principal in the session
    NotFound,
    /// Session store failure
    Session(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidState => write!(f, "invalid oauth state"),
            Self::EmptyProfile => write!(f, "no response body"),
            Self::MalformedProfile(msg) => write!(f, "{}", msg),
            Self::NotFound => write!(f, "no user in session"),
            Self::Session(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<SessionError> for AuthError {
    fn from(err: SessionError) -> Self {
        Self::Session(err.to_string())
    }
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidState | Self::NotFound | Self::Session(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::EmptyProfile | Self::MalformedProfile(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

/// Failures talking to the identity provider.
#[derive(Debug, Clone)]
pub enum ProviderError {
    /// Network error, timeout, or client construction failure
    Transport(String),
    /// Non-success HTTP status
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },
    /// Token endpoint answered without a usable access token
    InvalidTokenResponse(String),
    /// Empty response body
    EmptyBody,
    /// Response body could not be decoded
    Decode(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "Transport error: {}", msg),
            Self::Status {
                operation,
                status,
                body,
            } => write!(f, "{} failed with HTTP {}: {}", operation, status, body),
            Self::InvalidTokenResponse(msg) => write!(f, "Invalid token response: {}", msg),
            Self::EmptyBody => write!(f, "Empty response body"),
            Self::Decode(msg) => write!(f, "Decode error: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
