//! OAuth2 authorization-code client for the directory identity provider.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::auth::error::ProviderError;
use crate::auth::principal::UserInfo;
use crate::config::OAuthConfig;
use crate::types::StateToken;

/// Token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl TokenResponse {
    /// Parse a token response body.
    ///
    /// Providers answer either with JSON or with a form-encoded body, as
    /// signalled by the content type.
    pub fn parse(content_type: Option<&str>, body: &[u8]) -> Result<Self, ProviderError> {
        let form_encoded = content_type.is_some_and(|ct| {
            ct.starts_with("application/x-www-form-urlencoded") || ct.starts_with("text/plain")
        });

        let token = if form_encoded {
            let fields: HashMap<String, String> = url::form_urlencoded::parse(body)
                .into_owned()
                .collect();
            Self {
                access_token: fields.get("access_token").cloned().unwrap_or_default(),
                token_type: fields.get("token_type").cloned(),
                scope: fields.get("scope").cloned(),
                expires_in: fields.get("expires_in").and_then(|v| v.parse().ok()),
                refresh_token: fields.get("refresh_token").cloned(),
            }
        } else {
            serde_json::from_slice(body)
                .map_err(|e| ProviderError::InvalidTokenResponse(e.to_string()))?
        };

        if token.access_token.is_empty() {
            return Err(ProviderError::InvalidTokenResponse(
                "server response missing access_token".to_string(),
            ));
        }
        Ok(token)
    }
}

/// HTTP client for the provider's authorize, token and user-info endpoints.
///
/// Holds no configuration of its own; every call takes the caller's
/// [`OAuthConfig`] snapshot.
#[derive(Clone)]
pub struct OAuthClient {
    http: reqwest::Client,
}

impl OAuthClient {
    /// Create a client whose provider calls give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    /// Build the provider authorize URL for a login attempt.
    pub fn authorization_url(&self, config: &OAuthConfig, state: &StateToken) -> Url {
        let mut url = config.auth_url.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &config.client_id)
            .append_pair("redirect_uri", config.redirect_url.as_str())
            .append_pair("scope", &config.scopes.join(" "))
            .append_pair("state", state.as_str());
        url
    }

    /// Exchange an authorization code for an access token.
    pub async fn exchange_code(
        &self,
        config: &OAuthConfig,
        code: &str,
    ) -> Result<TokenResponse, ProviderError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", config.redirect_url.as_str()),
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(config.token_url.clone())
            .form(&params)
            .send()
            .await?;
        let response = ensure_success(response, "token exchange").await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = response.bytes().await?;

        debug!("Token endpoint answered ({} bytes)", body.len());
        TokenResponse::parse(content_type.as_deref(), &body)
    }

    /// Fetch the profile and group claims for an access token.
    ///
    /// The token goes in the `Authorization: Bearer` header and, for
    /// providers that expect it there, in the `access_token` query parameter.
    pub async fn fetch_user_info(
        &self,
        config: &OAuthConfig,
        access_token: &str,
    ) -> Result<UserInfo, ProviderError> {
        let mut url = config.userinfo_url.clone();
        url.query_pairs_mut().append_pair("access_token", access_token);

        let response = self.http.get(url).bearer_auth(access_token).send().await?;
        let response = ensure_success(response, "user info request").await?;

        let body = response.bytes().await?;
        if body.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(ProviderError::EmptyBody);
        }

        serde_json::from_slice(&body).map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

/// Return the response on success, or a status error carrying the body.
async fn ensure_success(
    response: reqwest::Response,
    operation: &'static str,
) -> Result<reqwest::Response, ProviderError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Status {
        operation,
        status,
        body,
    })
}
