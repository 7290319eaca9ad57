use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tower_http::cors::CorsLayer;
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;
use url::Url;

use malt_app::{OAuthConfig, ProviderEndpoints, ServerSettings, create_app};

#[derive(Parser)]
#[command(name = "malt-app")]
#[command(about = "Brewery back office: OAuth2 login and session service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Run only the mock identity provider
    MockProvider {
        #[arg(long, default_value = "127.0.0.1:8090")]
        bind: String,
    },
}

#[derive(Args)]
struct ServeArgs {
    /// Bind address, e.g. 0.0.0.0:8081
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8081")]
    bind: String,
    #[arg(long, env = "CLIENT_ID")]
    client_id: String,
    #[arg(long, env = "CLIENT_SECRET", hide_env_values = true)]
    client_secret: String,
    /// Provider authorization endpoint
    #[arg(long, env = "AUTH_URL")]
    auth_url: Url,
    /// Provider token endpoint
    #[arg(long, env = "TOKEN_URL")]
    token_url: Url,
    /// Provider user-info endpoint
    #[arg(long, env = "USERINFO_URL")]
    userinfo_url: Url,
    /// Callback URL registered with the provider
    #[arg(long, env = "REDIRECT_URL")]
    redirect_url: Url,
    /// Where the browser goes after logout
    #[arg(long, env = "LOGOUT_URL")]
    logout_url: String,
    /// Members of this group are admins
    #[arg(long, env = "ADMIN_GROUP")]
    admin_group: String,
    /// Comma-separated scopes, replacing the defaults
    #[arg(long, env = "SCOPES", value_delimiter = ',')]
    scopes: Option<Vec<String>>,
    #[arg(long, default_value = "/admin")]
    landing_url: String,
    /// At most one year
    #[arg(long, default_value_t = 24, value_parser = clap::value_parser!(u64).range(1..=8760))]
    session_lifetime_hours: u64,
    /// Mark the session cookie Secure (serve behind TLS)
    #[arg(long, default_value_t = false)]
    secure_cookies: bool,
    #[arg(long, default_value_t = malt_app::DEFAULT_PROVIDER_TIMEOUT_SECONDS, value_parser = clap::value_parser!(u64).range(1..=300))]
    provider_timeout_secs: u64,
    /// Serve the mock identity provider on 127.0.0.1:8090 and allow any CORS origin
    #[arg(long, default_value_t = false)]
    debug: bool,
}

impl ServeArgs {
    fn oauth_config(&self) -> OAuthConfig {
        let config = OAuthConfig::new(
            self.client_id.clone(),
            self.client_secret.clone(),
            ProviderEndpoints {
                auth_url: self.auth_url.clone(),
                token_url: self.token_url.clone(),
                userinfo_url: self.userinfo_url.clone(),
            },
            self.redirect_url.clone(),
            self.logout_url.clone(),
            self.admin_group.clone(),
        );
        match &self.scopes {
            Some(scopes) => config.with_scopes(scopes.clone()),
            None => config,
        }
    }

    fn settings(&self) -> ServerSettings {
        ServerSettings {
            landing_url: self.landing_url.clone(),
            session_lifetime: Duration::from_secs(self.session_lifetime_hours * 60 * 60),
            secure_cookies: self.secure_cookies,
            provider_timeout: Duration::from_secs(self.provider_timeout_secs),
            ..Default::default()
        }
    }
}

const DEBUG_PROVIDER_BIND: &str = "127.0.0.1:8090";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("malt_app=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => {
            let config = args.oauth_config();
            info!(
                "Using identity provider {} (admin group {})",
                config.auth_url, config.admin_group
            );

            let (mut app, _config) = create_app(config, args.settings())?;

            if args.debug {
                let listener = tokio::net::TcpListener::bind(DEBUG_PROVIDER_BIND).await?;
                info!("Mock OAuth2 server listening on http://{}", DEBUG_PROVIDER_BIND);
                tokio::spawn(async move {
                    if let Err(e) =
                        axum::serve(listener, malt_app::mock_provider::create_mock_provider()).await
                    {
                        tracing::error!("mock provider stopped: {:?}", e);
                    }
                });
                app = app.layer(CorsLayer::permissive());
            }

            let listener = tokio::net::TcpListener::bind(&args.bind).await?;
            info!("Listening on http://{}", args.bind);
            axum::serve(listener, app).await?;
        }
        Commands::MockProvider { bind } => {
            let listener = tokio::net::TcpListener::bind(&bind).await?;
            info!("Mock OAuth2 server listening on http://{}", bind);
            axum::serve(listener, malt_app::mock_provider::create_mock_provider()).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serve(extra: &[&str]) -> Result<ServeArgs, clap::Error> {
        serve_with_auth_url("https://idp.example.com/auth", extra)
    }

    fn serve_with_auth_url(auth_url: &str, extra: &[&str]) -> Result<ServeArgs, clap::Error> {
        let mut argv = vec![
            "malt-app",
            "serve",
            "--client-id",
            "clientid",
            "--client-secret",
            "clientsecret",
            "--auth-url",
            auth_url,
            "--token-url",
            "https://idp.example.com/token",
            "--userinfo-url",
            "https://idp.example.com/userinfo",
            "--redirect-url",
            "http://localhost:8081/OAuth2Callback",
            "--logout-url",
            "https://idp.example.com/logout",
            "--admin-group",
            "GGD_PASI_ADMIN_GROUP",
        ];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv)?.command {
            Commands::Serve(args) => Ok(args),
            Commands::MockProvider { .. } => unreachable!(),
        }
    }

    #[test]
    fn test_session_lifetime_is_bounded() {
        let args = serve(&[]).unwrap();
        assert_eq!(args.settings().session_lifetime, Duration::from_secs(86400));

        assert!(serve(&["--session-lifetime-hours", "0"]).is_err());
        assert!(serve(&["--session-lifetime-hours", "18446744073709551615"]).is_err());
        assert!(serve(&["--session-lifetime-hours", "8760"]).is_ok());
    }

    #[test]
    fn test_scopes_flag_replaces_defaults() {
        let args = serve(&[]).unwrap();
        assert_eq!(
            args.oauth_config().scopes,
            vec!["login", "memberOf", "displayName", "email"]
        );

        let args = serve(&["--scopes", "login,memberOf"]).unwrap();
        assert_eq!(args.oauth_config().scopes, vec!["login", "memberOf"]);
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        assert!(serve_with_auth_url("not a url", &[]).is_err());
    }
}
