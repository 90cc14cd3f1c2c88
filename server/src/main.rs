use std::sync::Arc;

use nocode_server::api::{self, AppState};
use nocode_server::auth::{Authenticator, HttpKeySetSource, JwksClient, RefreshPolicy};
use nocode_server::config::ServerConfig;
use nocode_server::storage::{Database, TestCaseStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nocode_server=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment variables
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Loaded configuration: database_path={}, issuer={}, jwk_set_uri={}",
        config.database_path.display(),
        config.jwt_issuer_uri,
        config.jwk_set_uri
    );

    let database = match Database::open(&config.database_path) {
        Ok(database) => database,
        Err(e) => {
            tracing::error!("Failed to open database: {e}");
            std::process::exit(1);
        }
    };
    let store = Arc::new(TestCaseStore::new(database));

    let key_source = match HttpKeySetSource::new(&config.jwk_set_uri, config.jwks_fetch_timeout) {
        Ok(source) => source,
        Err(e) => {
            tracing::error!("Failed to create key set client: {e}");
            std::process::exit(1);
        }
    };
    let keys = JwksClient::new(
        Arc::new(key_source),
        RefreshPolicy {
            ttl: config.jwks_cache_ttl,
            refresh_cooldown: config.jwks_refresh_cooldown,
        },
    );
    let authenticator = Authenticator::new(Arc::new(keys), &config.jwt_issuer_uri);

    let app = api::router(AppState {
        store,
        authenticator,
    });

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to bind: {e}");
            std::process::exit(1);
        });
    tracing::info!("listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Server error: {e}");
            std::process::exit(1);
        });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
