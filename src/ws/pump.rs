//! The two loops bridging one transport to its session actor.
//!
//! They are generic over any `Sink`/`Stream` of WebSocket frames so they can
//! be driven by in-memory channels as well as a real socket.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::session::HubHandle;
use crate::types::*;
use axum::extract::ws::Message;
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use tokio::sync::mpsc;

/// Forward decoded client messages to the actor until the transport ends
/// or sends something undecodable.
pub async fn inbound_loop<S, E>(
    mut stream: S,
    hub: &HubHandle,
    connection: ConnectionId,
    identity: &str,
) where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    while let Some(frame) = stream.next().await {
        let decoded = match frame {
            Ok(Message::Text(text)) => serde_json::from_str::<ClientMessage>(text.as_str()),
            Ok(Message::Binary(bytes)) => serde_json::from_slice::<ClientMessage>(&bytes),
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Close(_)) => {
                tracing::debug!(%connection, "Client closed connection");
                return;
            }
            Err(e) => {
                tracing::debug!(%connection, error = %e, "Transport error");
                return;
            }
        };

        let message = match decoded {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(%connection, error = %e, "Malformed client message");
                return;
            }
        };

        if hub
            .submit(connection, identity.to_string(), message)
            .is_err()
        {
            return;
        }
    }
}

/// Write queued messages as JSON text frames, in order. Sends a close frame
/// once the actor drops the queue.
pub async fn outbound_loop<K>(mut sink: K, mut queue: mpsc::Receiver<ServerMessage>)
where
    K: Sink<Message> + Unpin,
    K::Error: Display,
{
    while let Some(message) = queue.recv().await {
        let json = match serde_json::to_string(&message) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize server message");
                continue;
            }
        };
        if let Err(e) = sink.send(Message::Text(json.into())).await {
            tracing::debug!(error = %e, "Write failed");
            return;
        }
    }

    let _ = sink.send(Message::Close(None)).await;
}

/// Run both loops until either finishes, then report the disconnect once
pub async fn run_pumps<K, S, E>(
    sink: K,
    stream: S,
    hub: HubHandle,
    connection: ConnectionId,
    identity: Identity,
    queue: mpsc::Receiver<ServerMessage>,
) where
    K: Sink<Message> + Unpin,
    K::Error: Display,
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    tokio::select! {
        _ = inbound_loop(stream, &hub, connection, &identity) => {}
        _ = outbound_loop(sink, queue) => {}
    }

    // A stopped actor has nothing left to clean up
    let _ = hub.disconnect(connection, identity);
    tracing::debug!(game_id = %hub.id(), %connection, "Connection finished");
}
