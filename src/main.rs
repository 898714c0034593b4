use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::{net::TcpListener, signal};
use tower::make::Shared;
use tracing_subscriber::EnvFilter;

use employee_dialogue::auth::jwt::JwtService;
use employee_dialogue::auth::provider::{IdentityProvider, OidcProvider};
use employee_dialogue::config::AppConfig;
use employee_dialogue::db::{self, PgPool};
use employee_dialogue::directory::{DirectoryLookup, GraphDirectory, NoDirectory};
use employee_dialogue::routes;
use employee_dialogue::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "server",
        database_url = %config.redacted_database_url(),
        pool_size = config.database_max_pool_size,
        server_host = %config.server_host,
        server_port = config.server_port,
        directory_enabled = config.directory_enabled(),
        single_entry_per_owner = config.single_entry_per_owner,
        "loaded configuration"
    );
    if config.oidc_client_secret.is_empty() {
        tracing::warn!("OIDC_CLIENT_SECRET is empty, logins and manager lookups will fail");
    }

    let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
    apply_migrations(&pool).await?;

    let jwt = JwtService::from_config(&config)?;
    let identity_provider: Arc<dyn IdentityProvider> = Arc::new(OidcProvider::from_config(&config)?);
    let directory: Arc<dyn DirectoryLookup> = if config.directory_enabled() {
        Arc::new(GraphDirectory::from_config(&config)?)
    } else {
        Arc::new(NoDirectory)
    };

    let listen_addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port)
        .parse()
        .context("SERVER_HOST and SERVER_PORT must form a socket address")?;
    let state = AppState::new(pool, config, jwt, identity_provider, directory);
    let router = routes::create_router(state);

    let listener = TcpListener::bind(listen_addr).await?;
    tracing::info!("listening on {}", listen_addr);

    axum::serve(listener, Shared::new(router))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn apply_migrations(pool: &PgPool) -> anyhow::Result<()> {
    let pool = pool.clone();
    let applied = tokio::task::spawn_blocking(move || {
        let mut conn = pool.get().context("failed to get database connection")?;
        db::run_migrations(&mut conn)
    })
    .await
    .context("migration task panicked")??;

    for version in &applied {
        tracing::info!(%version, "applied migration");
    }
    Ok(())
}

async fn shutdown_signal() {
    if signal::ctrl_c().await.is_ok() {
        tracing::info!("server received shutdown signal");
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
