//! The login state machine: begin, callback, logout, and principal lookup.
//!
//! ```text
//! NO_SESSION -> STATE_PENDING -> STATE_VALID | STATE_INVALID
//!            -> TOKEN_OK | TOKEN_FAIL -> PROFILE_OK | PROFILE_FAIL -> AUTHENTICATED
//! ```
//!
//! The state check runs before any provider call, so a forged callback
//! never reaches the token endpoint. Provider failures send the browser home
//! (the user can retry); bad state and undecodable profiles are errors.

use axum::http::StatusCode;
use axum::http::header::LOCATION;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::auth::client::OAuthClient;
use crate::auth::error::{AuthError, ProviderError};
use crate::auth::principal::{CurrentUser, Principal};
use crate::auth::state_token::{generate_state_token, state_matches};
use crate::config::OAuthConfig;
use crate::session::{Session, SessionStore};

/// Where the browser goes after an abandoned login attempt.
pub const HOME_URL: &str = "/";

/// Redirect issued by the flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRedirect {
    status: StatusCode,
    location: String,
}

impl AuthRedirect {
    /// 307 Temporary Redirect.
    pub fn temporary(location: impl Into<String>) -> Self {
        Self {
            status: StatusCode::TEMPORARY_REDIRECT,
            location: location.into(),
        }
    }

    /// 302 Found.
    pub fn found(location: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FOUND,
            location: location.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

impl IntoResponse for AuthRedirect {
    fn into_response(self) -> Response {
        (self.status, [(LOCATION, self.location)]).into_response()
    }
}

/// Query parameters of the provider callback.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub state: Option<String>,
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Start a login: store a fresh state token and redirect to the provider.
///
/// Exits the process if no state token can be generated; without entropy
/// there is no anti-forgery guarantee to offer.
pub async fn begin_login<S: SessionStore>(
    session: &Session<S>,
    client: &OAuthClient,
    config: &OAuthConfig,
) -> Result<AuthRedirect, AuthError> {
    let state = match generate_state_token() {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "Error generating OAuth2 state token");
            std::process::exit(1);
        }
    };

    session.set_pending_state(state.clone()).await?;
    let url = client.authorization_url(config, &state);

    Ok(AuthRedirect::temporary(url.as_str()))
}

/// Handle the provider callback.
pub async fn handle_callback<S: SessionStore>(
    session: &Session<S>,
    client: &OAuthClient,
    config: &OAuthConfig,
    landing_url: &str,
    params: CallbackParams,
) -> Result<AuthRedirect, AuthError> {
    // Consumed whatever the outcome: a pending state is checked once.
    let pending = session.take_pending_state().await?;
    let state_matches = match (&pending, params.state.as_deref()) {
        (Some(expected), Some(received)) => state_matches(expected, received),
        _ => false,
    };
    if !state_matches {
        warn!(
            session_id = %session.id(),
            pending = pending.is_some(),
            received = params.state.is_some(),
            "invalid oauth state"
        );
        return Err(AuthError::InvalidState);
    }

    if let Some(provider_error) = &params.error {
        warn!(
            error = %provider_error,
            description = params.error_description.as_deref().unwrap_or(""),
            "Provider refused authorization"
        );
        return Ok(AuthRedirect::temporary(HOME_URL));
    }

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        warn!("Callback without authorization code");
        return Ok(AuthRedirect::temporary(HOME_URL));
    };

    let token = match client.exchange_code(config, &code).await {
        Ok(token) => token,
        Err(e) => {
            warn!(error = %e, "Code exchange failed");
            return Ok(AuthRedirect::temporary(HOME_URL));
        }
    };

    let user_info = match client.fetch_user_info(config, &token.access_token).await {
        Ok(info) => info,
        Err(ProviderError::EmptyBody) => return Err(AuthError::EmptyProfile),
        Err(ProviderError::Decode(detail)) => return Err(AuthError::MalformedProfile(detail)),
        Err(e) => {
            warn!(error = %e, "User info failed");
            return Ok(AuthRedirect::temporary(HOME_URL));
        }
    };

    if user_info.login.is_empty() {
        return Err(AuthError::MalformedProfile(
            "user info has no login".to_string(),
        ));
    }

    let principal = Principal::from_user_info(user_info);
    info!(
        login = %principal.login,
        groups = principal.member_of.len(),
        "OAuth2 login successful"
    );
    session.set_principal(principal).await?;

    Ok(AuthRedirect::found(landing_url))
}

/// Clear the principal and redirect to the configured logout URL.
pub async fn logout<S: SessionStore>(
    session: &Session<S>,
    config: &OAuthConfig,
) -> Result<AuthRedirect, AuthError> {
    session.remove_principal().await?;
    Ok(AuthRedirect::temporary(config.logout_url.as_str()))
}

/// The logged-in user with the admin role derived from `config` right now.
pub async fn current_user<S: SessionStore>(
    session: &Session<S>,
    config: &OAuthConfig,
) -> Result<CurrentUser, AuthError> {
    let principal = session
        .principal()
        .await?
        .filter(|p| !p.login.is_empty())
        .ok_or(AuthError::NotFound)?;

    Ok(CurrentUser::derive(principal, &config.admin_group))
}

/// Role predicate for protected resources. Anonymous callers are not admins.
pub async fn is_admin<S: SessionStore>(session: &Session<S>, config: &OAuthConfig) -> bool {
    current_user(session, config)
        .await
        .map(|user| user.is_admin)
        .unwrap_or(false)
}
