use std::sync::Arc;

use reelshelf::config::Config;
use reelshelf::db::{self, PgStore};
use reelshelf::{build_app, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("reelshelf=debug,tower_http=debug")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let pool = db::connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    if config.omdb_api_key.is_none() {
        tracing::warn!("OMDB_API_KEY not set; movie import is disabled");
    }
    if config.cron_token.is_none() {
        tracing::warn!("CRON_TOKEN not set; the release sweep endpoint rejects every call");
    }

    let listen_addr = config.listen_addr.clone();
    let state = AppState::new(Arc::new(PgStore::new(pool)), config);
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .expect("Failed to bind listen address");
    tracing::info!("Listening on {}", listen_addr);
    tracing::info!("Swagger UI at http://{}/docs/", listen_addr);
    axum::serve(listener, app).await.expect("Server error");
}
