//! HTTP surface: new-game redirect, the game page and its assets, health
//! check, version and the WebSocket endpoint.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    middleware,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use std::sync::Arc;

use crate::identity;
use crate::state::AppState;
use crate::ws;

const GAME_PAGE: &str = "static/celebrity/index.html";
const GAME_CSS: &str = "static/celebrity/app.css";
const GAME_JS: &str = "static/celebrity/app.js";

/// Headers attached to every response from the router
const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("cross-origin-embedder-policy", "require-corp"),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-site"),
    (
        "permissions-policy",
        "geolocation=(), midi=(), sync-xhr=(), microphone=(), camera=(), magnetometer=(), gyroscope=(), fullscreen=(), payment=()",
    ),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    ("x-content-type-options", "nosniff"),
    ("content-security-policy", "default-src 'self'"),
];

/// All game routes under the configured prefix
pub fn router(state: Arc<AppState>) -> Router {
    let prefix = state.prefix().to_string();

    Router::new()
        .route(&format!("{}/celebrity", prefix), get(new_game))
        .route(&format!("{}/celebrity/{{game_id}}", prefix), get(game_page))
        .route(&format!("{}/celebrity/{{game_id}}/ws", prefix), get(ws::ws_handler))
        .route(&format!("{}/assets/celebrity/app.css", prefix), get(game_css))
        .route(&format!("{}/assets/celebrity/app.js", prefix), get(game_js))
        .route(&format!("{}/healthz", prefix), get(healthz))
        .route(&format!("{}/version", prefix), get(version))
        .layer(middleware::map_response(security_headers))
        .with_state(state)
}

pub async fn security_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    for &(name, value) in SECURITY_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    response
}

/// Send the browser to a freshly generated game id
pub async fn new_game(State(state): State<Arc<AppState>>) -> Response {
    match state.games.new_session_id().await {
        Ok(id) => {
            tracing::info!(game_id = %id, "Created game");
            Redirect::temporary(&format!("{}/celebrity/{}", state.prefix(), id)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to generate game id");
            (StatusCode::INTERNAL_SERVER_ERROR, "Could not create game").into_response()
        }
    }
}

/// Client page for one game. Issues the identity cookie if the browser
/// has none yet.
pub async fn game_page(Path(game_id): Path<String>, headers: HeaderMap) -> Response {
    let (_, response_headers) = match identity::resolve(&headers) {
        Ok(resolved) => resolved,
        Err(e) => {
            tracing::error!(game_id = %game_id, error = %e, "Could not issue identity");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Could not assign identity").into_response();
        }
    };

    match tokio::fs::read_to_string(GAME_PAGE).await {
        Ok(content) => (response_headers, Html(content)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Game page missing");
            (StatusCode::NOT_FOUND, "Game page not found").into_response()
        }
    }
}

pub async fn game_css() -> Response {
    serve_asset(GAME_CSS, "text/css; charset=utf-8").await
}

pub async fn game_js() -> Response {
    serve_asset(GAME_JS, "application/javascript; charset=utf-8").await
}

async fn serve_asset(path: &str, content_type: &'static str) -> Response {
    match tokio::fs::read(path).await {
        Ok(content) => (
            [
                (header::CONTENT_TYPE, content_type),
                (header::CACHE_CONTROL, "public, max-age=3600"),
            ],
            content,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(path, error = %e, "Asset missing");
            (StatusCode::NOT_FOUND, "Asset not found").into_response()
        }
    }
}

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn version() -> String {
    format!("partybox v{}\n", env!("CARGO_PKG_VERSION"))
}
