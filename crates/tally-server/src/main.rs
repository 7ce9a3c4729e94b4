mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use tally_api::{AppState, AppStateInner};
use tally_auth::SystemClock;

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tally=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = Arc::new(tally_db::Database::open(&config.db_path)?);

    let app_state: AppState = Arc::new(AppStateInner::new(
        db,
        Arc::new(SystemClock),
        config.session_timeout,
        config.password_scheme,
    ));
    info!(
        session_timeout_secs = config.session_timeout.num_seconds(),
        password_scheme = ?config.password_scheme,
        "Auth layer ready"
    );

    let app = tally_api::router(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Tally server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
