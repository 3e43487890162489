use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use partybox::{config::Config, registry, routes, state::AppState};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "partybox=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting partybox...");

    let config = Config::from_env();
    let addr = match config.socket_addr() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!(bind = %config.bind, port = config.port, error = %e, "Invalid listen address");
            std::process::exit(1);
        }
    };

    let state = Arc::new(AppState::new(config));

    // Reap sessions nobody has touched for a while
    registry::spawn_reaper(state.games.clone());

    let app = routes::router(state)
        .fallback_service(ServeDir::new("static"))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
