use std::sync::Arc;

use clap::{Parser, Subcommand};

mod auth;
mod config;
mod dto;
mod error;
mod extract;
mod handlers;
mod models;
mod routes;
mod services;
#[cfg(test)]
mod test_support;

use auth::rate_limit::RateLimitState;
use config::{Backend, Config};
use services::completion::{CompletionModel, GeminiModel};
use services::firebase_db::FirebaseStore;
use services::google_auth::{ServiceAccountKey, TokenSource};
use services::identity::{FirebaseIdentity, IdentityProvider};
use services::memory::{MemoryIdentity, MemoryStore};
use services::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub identity: Arc<dyn IdentityProvider>,
    pub model: Arc<dyn CompletionModel>,
    pub rate_limiter: RateLimitState,
}

#[derive(Parser, Debug)]
#[command(name = "moodtracker-api", version, about = "Mood Tracker HTTP API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Print a signed admin token for /api/get_all_users
    IssueAdminToken {
        admin_id: String,
        #[arg(long, default_value_t = 3600)]
        ttl_secs: i64,
        /// Signing secret; must match the server's
        #[arg(long, env = "ADMIN_JWT_SECRET", hide_env_values = true)]
        secret: String,
    },
}

fn build_state(config: Config) -> anyhow::Result<AppState> {
    let http = reqwest::Client::builder()
        .timeout(config.http_timeout())
        .build()?;

    let (store, identity): (Arc<dyn Store>, Arc<dyn IdentityProvider>) = match config.backend {
        Backend::Firebase => {
            let key = ServiceAccountKey::from_file(&config.firebase_credentials)?;
            tracing::info!(project_id = %key.project_id, "Using Firebase backend");
            let tokens = Arc::new(TokenSource::new(key, http.clone()));
            (
                Arc::new(FirebaseStore::new(
                    http.clone(),
                    tokens.clone(),
                    &config.firebase_database_url,
                )?),
                Arc::new(FirebaseIdentity::new(http, tokens, &config.identity_base_url)),
            )
        }
        Backend::Memory => {
            tracing::warn!("Using in-memory backend; data is lost on shutdown");
            (Arc::new(MemoryStore::new()), Arc::new(MemoryIdentity::new()))
        }
    };

    if config.gemini_api_key.is_empty() {
        tracing::warn!("GEMINI_API_KEY is not set; /api/ai_chat will fail");
    }
    let model = GeminiModel::new(
        config.http_timeout(),
        &config.gemini_base_url,
        &config.gemini_api_key,
        &config.gemini_model,
    )?;

    if config.admin_jwt_secret.is_none() {
        tracing::warn!("ADMIN_JWT_SECRET is not set; /api/get_all_users is disabled");
    }

    Ok(AppState {
        rate_limiter: RateLimitState::new(
            config.auth_rate_limit_max,
            config.auth_rate_limit_window_secs,
        ),
        config: Arc::new(config),
        store,
        identity,
        model: Arc::new(model),
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "moodtracker_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve().await,
        Command::IssueAdminToken {
            admin_id,
            ttl_secs,
            secret,
        } => {
            let token = auth::jwt::create_admin_token(&admin_id, ttl_secs, &secret)?;
            println!("{}", token);
            Ok(())
        }
    }
}

async fn serve() -> anyhow::Result<()> {
    let config = Config::from_env();
    let addr = config.listen_addr();
    let state = build_state(config)?;
    let app = routes::router(state);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    // Client IPs are needed for rate limiting
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serve_is_default() {
        let cli = Cli::try_parse_from(["moodtracker-api"]).unwrap();
        assert_eq!(cli.command, None);

        let cli = Cli::try_parse_from(["moodtracker-api", "serve"]).unwrap();
        assert_eq!(cli.command, Some(Command::Serve));
    }

    #[test]
    fn test_issue_admin_token_args() {
        let cli = Cli::try_parse_from([
            "moodtracker-api",
            "issue-admin-token",
            "root-admin",
            "--ttl-secs",
            "60",
            "--secret",
            "cli-secret",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            Some(Command::IssueAdminToken {
                admin_id: "root-admin".into(),
                ttl_secs: 60,
                secret: "cli-secret".into(),
            })
        );
    }
}
