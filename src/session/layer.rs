//! Cookie plumbing: attach a [`Session`] to every request.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use tracing::warn;

use super::{Session, SessionStore};
use crate::config::ServerSettings;
use crate::types::SessionId;

/// What the middleware needs to resolve and issue session cookies.
pub struct SessionLayerConfig<S> {
    pub store: Arc<S>,
    pub cookie_name: String,
    pub lifetime: Duration,
    pub secure: bool,
}

impl<S> Clone for SessionLayerConfig<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            cookie_name: self.cookie_name.clone(),
            lifetime: self.lifetime,
            secure: self.secure,
        }
    }
}

impl<S> SessionLayerConfig<S> {
    pub fn from_settings(store: Arc<S>, settings: &ServerSettings) -> Self {
        Self {
            store,
            cookie_name: settings.session_cookie_name.clone(),
            lifetime: settings.session_lifetime,
            secure: settings.secure_cookies,
        }
    }
}

/// Resolve the session cookie, expose a [`Session`] to the handler and
/// issue a cookie when a new session got persisted.
pub async fn session_middleware<S: SessionStore>(
    State(config): State<SessionLayerConfig<S>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let existing = match jar.get(&config.cookie_name) {
        Some(cookie) => {
            let id = SessionId::new(cookie.value());
            match config.store.load(&id).await {
                Ok(Some(_)) => Some(id),
                Ok(None) => None,
                Err(e) => {
                    warn!(error = %e, "Session lookup failed, starting a new session");
                    None
                }
            }
        }
        None => None,
    };

    let is_new = existing.is_none();
    let id = existing.unwrap_or_else(SessionId::generate);
    request.extensions_mut().insert(Session::new(
        id.clone(),
        config.store.clone(),
        config.lifetime,
    ));

    let response = next.run(request).await;

    if !is_new || !matches!(config.store.load(&id).await, Ok(Some(_))) {
        return response;
    }

    let cookie = session_cookie(&config, &id);
    (jar.add(cookie), response).into_response()
}

fn session_cookie<S>(config: &SessionLayerConfig<S>, id: &SessionId) -> Cookie<'static> {
    let max_age = time::Duration::try_from(config.lifetime).unwrap_or(time::Duration::MAX);
    Cookie::build((config.cookie_name.clone(), id.to_string()))
        .http_only(true)
        .secure(config.secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(max_age)
        .build()
}

impl<S, St> FromRequestParts<St> for Session<S>
where
    S: SessionStore,
    St: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session<S>>()
            .cloned()
            .ok_or((StatusCode::INTERNAL_SERVER_ERROR, "session layer not installed"))
    }
}
