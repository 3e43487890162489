pub mod pump;

use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures::stream::StreamExt;
use std::sync::Arc;

use crate::identity;
use crate::session::HubHandle;
use crate::state::AppState;
use crate::types::Identity;

/// WebSocket upgrade handler for `/celebrity/{game_id}/ws`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(game_id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let (identity, cookie_headers) = match identity::resolve(&headers) {
        Ok(resolved) => resolved,
        Err(e) => {
            tracing::error!(game_id = %game_id, error = %e, "Could not issue identity");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let hub = state.games.resolve_or_create(&game_id).await;
    tracing::info!(game_id = %game_id, identity = %identity, "WebSocket connection request");

    (
        cookie_headers,
        ws.on_upgrade(move |socket| handle_socket(socket, hub, identity)),
    )
        .into_response()
}

/// Register the socket with its session and pump frames until it closes
async fn handle_socket(socket: WebSocket, hub: HubHandle, identity: Identity) {
    let (connection, queue) = match hub.connect(identity.clone()) {
        Ok(registered) => registered,
        Err(e) => {
            tracing::warn!(game_id = %hub.id(), error = %e, "Session gone before connect");
            return;
        }
    };

    let (sender, receiver) = socket.split();
    pump::run_pumps(sender, receiver, hub, connection, identity, queue).await;
}
