//! End-to-end login flow against a mocked directory identity provider.

use axum::Router;
use axum::body::Body;
use axum::http::header::{COOKIE, LOCATION, SET_COOKIE};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use malt_app::{ConfigHandle, OAuthConfig, ProviderEndpoints, ServerSettings, create_app};
use mockito::{Matcher, ServerGuard};
use tower::ServiceExt;

const USER_INFO: &str = r#"{
    "displayName": "Us ER",
    "memberOf": [
        "CN=GGD_ORG_DG-DEES-DINSI_TOUS,OU=ORGA,OU=APPLICATIONS,DC=ben,DC=oscar,DC=gly",
        "CN=GGD_ORG_DG-DEES-DINSI-DAAG_TOUS,OU=ORGA,OU=APPLICATIONS,DC=ben,DC=oscar,DC=gly"
    ],
    "id": "aLongId==",
    "login": "USER"
}"#;

const ADMIN_INFO: &str = r#"{
    "displayName": "Ad MIN",
    "memberOf": [
        "CN=GGD_ORG_DG-DEES-DINSI_TOUS,OU=ORGA,OU=APPLICATIONS,DC=ben,DC=oscar,DC=gly",
        "CN=GGD_PASI_ADMIN_GROUP,OU=ORGA,OU=APPLICATIONS,DC=ben,DC=oscar,DC=gly"
    ],
    "id": "anotherLongId==",
    "login": "ADMIN"
}"#;

fn provider_config(server: &ServerGuard) -> OAuthConfig {
    OAuthConfig::new(
        "clientid",
        "clientsecret",
        ProviderEndpoints {
            auth_url: format!("{}/auth", server.url()).parse().unwrap(),
            token_url: format!("{}/token", server.url()).parse().unwrap(),
            userinfo_url: format!("{}/userinfo", server.url()).parse().unwrap(),
        },
        "http://localhost:8081/OAuth2Callback".parse().unwrap(),
        format!("{}/logout", server.url()),
        "GGD_PASI_ADMIN_GROUP",
    )
}

async fn mock_provider(user_info: &str) -> ServerGuard {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/token")
        .with_status(200)
        .with_header("content-type", "application/x-www-form-urlencoded")
        .with_body("access_token=mocktoken&scope=user&token_type=bearer")
        .create_async()
        .await;
    server
        .mock("GET", "/userinfo")
        .match_query(Matcher::Any)
        .match_header("authorization", "Bearer mocktoken")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(user_info)
        .create_async()
        .await;
    server
}

fn app(server: &ServerGuard) -> (Router, ConfigHandle) {
    create_app(provider_config(server), ServerSettings::default()).unwrap()
}

/// A browser: remembers the session cookie between requests.
struct Browser {
    app: Router,
    cookie: Option<String>,
}

impl Browser {
    fn new(app: Router) -> Self {
        Self { app, cookie: None }
    }

    async fn get(&mut self, uri: &str) -> Response {
        let mut request = Request::builder().uri(uri);
        if let Some(cookie) = &self.cookie {
            request = request.header(COOKIE, cookie);
        }
        let response = self
            .app
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();

        if let Some(set_cookie) = response.headers().get(SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_string());
        }
        response
    }

    /// Start a login and return the state the provider would echo back.
    async fn begin_login(&mut self) -> String {
        let response = self.get("/OAuth2Login").await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);

        let location: url::Url = location(&response).parse().unwrap();
        location
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .expect("authorize URL carries a state")
    }
}

fn location(response: &Response) -> String {
    response
        .headers()
        .get(LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

#[tokio::test]
async fn test_healthcheck_is_always_ok() {
    let server = mock_provider(USER_INFO).await;
    let (app, _) = app(&server);
    let mut browser = Browser::new(app);

    let response = browser.get("/healthcheck").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "OK");

    browser.begin_login().await;
    let response = browser.get("/healthcheck").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_wrong_state_fails_login() {
    let server = mock_provider(USER_INFO).await;
    let (app, _) = app(&server);
    let mut browser = Browser::new(app);

    browser.begin_login().await;
    let response = browser
        .get("/OAuth2Callback?state=a-random-state&code=mock_code")
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_string(response).await.contains("invalid oauth state"));

    let response = browser.get("/api/userinfo").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_user_login_and_logout() {
    let server = mock_provider(USER_INFO).await;
    let (app, _) = app(&server);
    let mut browser = Browser::new(app);

    // Anonymous visit to the admin surface goes to the login
    let response = browser.get("/admin").await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/OAuth2Login");

    let state = browser.begin_login().await;
    let response = browser
        .get(&format!("/OAuth2Callback?state={state}&code=mock_code"))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/admin");

    let response = browser.get("/api/userinfo").await;
    assert_eq!(response.status(), StatusCode::OK);
    let user = body_json(response).await;
    assert_eq!(user["login"], "USER");
    assert_eq!(user["displayName"], "Us ER");
    assert_eq!(user["isAdmin"], false);
    assert_eq!(user["memberOf"][1], "GGD_ORG_DG-DEES-DINSI-DAAG_TOUS");

    let response = browser.get("/admin").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["user"], "Us ER");

    let response = browser.get("/logout").await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), format!("{}/logout", server.url()));

    let response = browser.get("/api/userinfo").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // Second logout is a harmless redirect
    let response = browser.get("/logout").await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
}

#[tokio::test]
async fn test_admin_role_follows_configuration() {
    let server = mock_provider(ADMIN_INFO).await;
    let (app, config) = app(&server);
    let mut browser = Browser::new(app);

    let state = browser.begin_login().await;
    let response = browser
        .get(&format!("/OAuth2Callback?state={state}&code=mock_code"))
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let user = body_json(browser.get("/api/userinfo").await).await;
    assert_eq!(user["login"], "ADMIN");
    assert_eq!(user["isAdmin"], true);
    assert_eq!(user["memberOf"][1], "GGD_PASI_ADMIN_GROUP");

    // Changing the admin group applies on the next read, no re-login
    config
        .replace(provider_config(&server).with_admin_group("SOME_OTHER_GROUP"))
        .await;
    let user = body_json(browser.get("/api/userinfo").await).await;
    assert_eq!(user["isAdmin"], false);
}

#[tokio::test]
async fn test_unreachable_provider_sends_browser_home() {
    let server = mock_provider(USER_INFO).await;
    let mut config = provider_config(&server);
    config.token_url = "http://127.0.0.1:1/token".parse().unwrap();
    let (app, _) = create_app(config, ServerSettings::default()).unwrap();
    let mut browser = Browser::new(app);

    let state = browser.begin_login().await;
    let response = browser
        .get(&format!("/OAuth2Callback?state={state}&code=mock_code"))
        .await;

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/");
    let response = browser.get("/api/userinfo").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
