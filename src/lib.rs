// Core modules
mod config;
mod types;

pub mod api;
pub mod auth;
pub mod mock_provider;
pub mod session;

// Re-export key types and functions
pub use api::{AppState, create_router};
pub use auth::{AuthError, CurrentUser, OAuthClient, Principal, current_user, is_admin};
pub use config::{
    ConfigHandle, DEFAULT_PROVIDER_TIMEOUT_SECONDS, DEFAULT_SCOPES, OAuthConfig, ProviderEndpoints,
    ServerSettings,
};
pub use session::{MemorySessionStore, Session, SessionStore};
pub use types::{GroupName, SessionId, StateToken};

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::Router;

/// Interval between sweeps of expired sessions.
pub const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Convenience function to build the full application over an in-memory
/// session store.
///
/// Also spawns the background task that purges expired sessions, so it
/// must be called from within a tokio runtime.
pub fn create_app(config: OAuthConfig, settings: ServerSettings) -> Result<(Router, ConfigHandle)> {
    let client = OAuthClient::new(settings.provider_timeout)?;
    let config = ConfigHandle::new(config);
    let store = Arc::new(MemorySessionStore::new());

    spawn_session_reaper(store.clone(), SESSION_PURGE_INTERVAL);

    let state = AppState::new(client, config.clone(), settings, store);
    Ok((create_router(state), config))
}

fn spawn_session_reaper(store: Arc<MemorySessionStore>, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            store.purge_expired().await;
        }
    });
}
