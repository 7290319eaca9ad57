// HTTP routes for login, logout and the user-info endpoint

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::auth::{self, AuthError, AuthRedirect, CallbackParams, CurrentUser, OAuthClient};
use crate::config::{ConfigHandle, ServerSettings};
use crate::session::{Session, SessionLayerConfig, SessionStore, session_middleware};

/// Shared state behind every route.
pub struct AppState<S> {
    pub client: OAuthClient,
    pub config: ConfigHandle,
    pub settings: Arc<ServerSettings>,
    pub store: Arc<S>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            config: self.config.clone(),
            settings: self.settings.clone(),
            store: self.store.clone(),
        }
    }
}

impl<S: SessionStore> AppState<S> {
    pub fn new(
        client: OAuthClient,
        config: ConfigHandle,
        settings: ServerSettings,
        store: Arc<S>,
    ) -> Self {
        Self {
            client,
            config,
            settings: Arc::new(settings),
            store,
        }
    }
}

pub fn create_router<S: SessionStore>(state: AppState<S>) -> Router {
    let session_layer = SessionLayerConfig::from_settings(state.store.clone(), &state.settings);

    Router::new()
        .route("/healthcheck", get(health_check))
        .route(&state.settings.login_path, get(login::<S>))
        .route("/OAuth2Callback", get(callback::<S>))
        .route("/logout", get(logout::<S>))
        .route("/api/userinfo", get(user_info::<S>))
        .route("/admin", get(admin_landing::<S>))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(from_fn_with_state(session_layer, session_middleware::<S>)),
        )
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn login<S: SessionStore>(
    State(state): State<AppState<S>>,
    session: Session<S>,
) -> Result<AuthRedirect, AuthError> {
    let config = state.config.current().await;
    auth::begin_login(&session, &state.client, &config).await
}

async fn callback<S: SessionStore>(
    State(state): State<AppState<S>>,
    session: Session<S>,
    Query(params): Query<CallbackParams>,
) -> Result<AuthRedirect, AuthError> {
    let config = state.config.current().await;
    auth::handle_callback(
        &session,
        &state.client,
        &config,
        &state.settings.landing_url,
        params,
    )
    .await
}

async fn logout<S: SessionStore>(
    State(state): State<AppState<S>>,
    session: Session<S>,
) -> Result<AuthRedirect, AuthError> {
    let config = state.config.current().await;
    auth::logout(&session, &config).await
}

/// The logged-in user as JSON. Other methods get 405 from the router.
async fn user_info<S: SessionStore>(
    State(state): State<AppState<S>>,
    session: Session<S>,
) -> Result<Json<CurrentUser>, AuthError> {
    let config = state.config.current().await;
    auth::current_user(&session, &config).await.map(Json)
}

/// Entry point of the admin surface.
///
/// Anonymous callers are sent to the login; everyone else gets their name
/// and role, which is all the admin layer needs from us.
async fn admin_landing<S: SessionStore>(
    State(state): State<AppState<S>>,
    session: Session<S>,
) -> Response {
    let config = state.config.current().await;
    match auth::current_user(&session, &config).await {
        Ok(user) => Json(json!({
            "user": user.principal.display(),
            "login": user.principal.login,
            "isAdmin": user.is_admin,
        }))
        .into_response(),
        Err(AuthError::NotFound) => {
            AuthRedirect::temporary(state.settings.login_path.as_str()).into_response()
        }
        Err(e) => e.into_response(),
    }
}
