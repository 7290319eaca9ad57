//! OAuth2 client configuration and the process-wide handle that shares it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use url::Url;

use crate::types::GroupName;

/// Scopes requested from the directory identity provider.
pub const DEFAULT_SCOPES: [&str; 4] = ["login", "memberOf", "displayName", "email"];

/// Default timeout for calls to the identity provider.
pub const DEFAULT_PROVIDER_TIMEOUT_SECONDS: u64 = 10;

/// Everything the login flow needs to talk to the identity provider.
///
/// Required values are constructor parameters; there is no partially
/// configured state.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: Url,
    pub token_url: Url,
    pub userinfo_url: Url,
    pub redirect_url: Url,
    /// Where the browser is sent after logout (local path or external URL)
    pub logout_url: String,
    /// Membership in this group makes a principal an admin
    pub admin_group: GroupName,
    pub scopes: Vec<String>,
}

/// Provider endpoints, grouped so the constructor stays readable.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub auth_url: Url,
    pub token_url: Url,
    pub userinfo_url: Url,
}

impl OAuthConfig {
    /// Create a configuration with the default scopes.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        endpoints: ProviderEndpoints,
        redirect_url: Url,
        logout_url: impl Into<String>,
        admin_group: impl Into<GroupName>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            auth_url: endpoints.auth_url,
            token_url: endpoints.token_url,
            userinfo_url: endpoints.userinfo_url,
            redirect_url,
            logout_url: logout_url.into(),
            admin_group: admin_group.into(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Override the requested scopes.
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Override the admin group.
    pub fn with_admin_group(mut self, group: impl Into<GroupName>) -> Self {
        self.admin_group = group.into();
        self
    }
}

/// Shared, atomically replaceable view of the current [`OAuthConfig`].
///
/// Readers take an `Arc` snapshot once per request, so a concurrent
/// [`ConfigHandle::replace`] is never observed half-applied.
#[derive(Debug, Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<Arc<OAuthConfig>>>,
}

impl ConfigHandle {
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    /// Snapshot of the configuration in effect right now.
    pub async fn current(&self) -> Arc<OAuthConfig> {
        self.inner.read().await.clone()
    }

    /// Swap in a whole new configuration.
    pub async fn replace(&self, config: OAuthConfig) {
        let mut guard = self.inner.write().await;
        *guard = Arc::new(config);
        tracing::info!(admin_group = %guard.admin_group, "OAuth2 configuration replaced");
    }
}

/// Server-side settings that are not part of the provider contract.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Where a successful login lands
    pub landing_url: String,
    /// Route that starts a login (used by the admin surface for anonymous users)
    pub login_path: String,
    pub session_cookie_name: String,
    /// Fixed session lifetime from creation
    pub session_lifetime: Duration,
    pub secure_cookies: bool,
    pub provider_timeout: Duration,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            landing_url: "/admin".to_string(),
            login_path: "/OAuth2Login".to_string(),
            session_cookie_name: "session".to_string(),
            session_lifetime: Duration::from_secs(24 * 60 * 60),
            secure_cookies: false,
            provider_timeout: Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECONDS),
        }
    }
}

/// Configuration pointing at an unreachable example provider.
#[cfg(test)]
pub(crate) fn test_config() -> OAuthConfig {
    OAuthConfig::new(
        "clientid",
        "clientsecret",
        ProviderEndpoints {
            auth_url: "https://idp.example.com/auth".parse().unwrap(),
            token_url: "https://idp.example.com/token".parse().unwrap(),
            userinfo_url: "https://idp.example.com/userinfo".parse().unwrap(),
        },
        "http://localhost:8081/OAuth2Callback".parse().unwrap(),
        "https://idp.example.com/logout",
        "GGD_PASI_ADMIN_GROUP",
    )
}
