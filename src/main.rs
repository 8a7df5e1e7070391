use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use reelbase::auth::mailer;
use reelbase::auth::tokens::generate_secret;
use reelbase::config::{Cli, Config};
use reelbase::db::{self, SqliteDocumentStore};
use reelbase::routes;
use reelbase::state::AppState;
use reelbase::validation::SignupRequest;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli)?;
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Initialize database
    let pool = db::create_pool(&config.db_path())?;
    db::run_migrations(&pool)?;

    let secret = match config.auth.jwt_secret.as_deref() {
        Some(secret) if !secret.is_empty() => secret.to_string(),
        _ => {
            tracing::warn!("No JWT secret configured; using a random one, tokens will not survive a restart");
            generate_secret()
        }
    };

    // Build app state
    let store = Arc::new(SqliteDocumentStore::new(pool));
    let mailer = mailer::from_config(&config.mail)?;
    let state = AppState::new(&config, secret.as_bytes(), store, mailer);

    if let Some(seed) = &config.admin {
        let input = SignupRequest {
            first_name: Some(seed.first_name.clone()),
            last_name: Some(seed.last_name.clone()),
            email: Some(seed.email.clone()),
            password: Some(seed.password.clone()),
            avatar: Some(seed.avatar.clone()),
        }
        .validate()?;
        if state.identity.ensure_admin(input).await? {
            tracing::info!("Created admin account {}", seed.email);
        }
    }

    let app = routes::app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
