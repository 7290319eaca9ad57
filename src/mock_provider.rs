//! Stand-in directory identity provider for local development.
//!
//! Served next to the app in `--debug` mode. It approves every login,
//! echoing the state back, and reports a fixed user in the `ADMIN` group.

use axum::{
    Router,
    extract::Query,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use url::Url;

/// Authorization code handed out by the mock provider.
pub const MOCK_CODE: &str = "mock_code";

const MOCK_USER: &str = r#"{
    "displayName": "Us ER",
    "memberOf": [
        "CN=ADMIN",
        "CN=OTHERS"
    ],
    "id": "aLongId==",
    "login": "USER"
}"#;

pub fn create_mock_provider() -> Router {
    Router::new()
        .route("/auth", get(authorize))
        .route("/token", post(token))
        .route("/userinfo", get(userinfo))
        .route("/logout", get(logout))
}

#[derive(Debug, Deserialize)]
struct AuthorizeParams {
    redirect_uri: String,
    #[serde(default)]
    state: String,
}

/// Approve immediately and send the browser back with a code.
async fn authorize(Query(params): Query<AuthorizeParams>) -> impl IntoResponse {
    let Ok(mut target) = Url::parse(&params.redirect_uri) else {
        return (StatusCode::BAD_REQUEST, "invalid redirect_uri").into_response();
    };
    target
        .query_pairs_mut()
        .append_pair("state", &params.state)
        .append_pair("code", MOCK_CODE);

    (StatusCode::FOUND, [(header::LOCATION, target.to_string())]).into_response()
}

async fn token() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/x-www-form-urlencoded")],
        "access_token=mocktoken&scope=user&token_type=bearer",
    )
}

async fn userinfo() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], MOCK_USER)
}

async fn logout() -> &'static str {
    "Logout OK"
}
