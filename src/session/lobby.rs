use super::{Command, Connection, Hub};
use crate::protocol::ServerMessage;
use crate::types::*;
use tokio::sync::mpsc;

impl Hub {
    /// Register a connection and send it a snapshot of the session
    pub(super) fn connect(
        &mut self,
        connection: ConnectionId,
        identity: Identity,
        outbound: mpsc::Sender<ServerMessage>,
    ) {
        // First connection becomes moderator, for good
        if self.moderator.is_none() {
            tracing::info!(game_id = %self.id, identity = %identity, "Moderator assigned");
            self.moderator = Some(identity.clone());
        }

        self.connections.insert(
            connection,
            Connection {
                identity: identity.clone(),
                outbound,
            },
        );

        let is_moderator = self.is_moderator(&identity);
        let username = self.username_of(&identity).map(str::to_string);
        tracing::debug!(
            game_id = %self.id,
            identity = %identity,
            %connection,
            is_moderator,
            is_existing = username.is_some(),
            "Client connected"
        );

        let info = ServerMessage::SessionInfo {
            lobby_locked: self.lobby_locked,
            is_existing: username.is_some(),
            is_moderator,
            username,
        };
        if !self.send_to(connection, info) {
            return;
        }

        if is_moderator && !self.send_to(connection, self.moderator_view()) {
            return;
        }

        let state = ServerMessage::GameState(self.game_state_view());
        if !self.send_to(connection, state) {
            return;
        }

        let celebrities = self.celebrities_visible_to(&identity);
        self.send_to(connection, ServerMessage::CelebrityList { celebrities });
    }

    /// Deregister a connection. Players get a grace period to come back
    /// before their record is dropped; the moderator never expires.
    pub(super) fn disconnect(&mut self, connection: ConnectionId, identity: &str) {
        if self.connections.remove(&connection).is_some() {
            tracing::debug!(game_id = %self.id, identity, %connection, "Client disconnected");
        }

        if self.is_moderator(identity) {
            return;
        }

        self.schedule_expiry(identity.to_string());
    }

    fn schedule_expiry(&self, identity: Identity) {
        let commands = self.commands.clone();
        let delay = self.config.player_timeout;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(sender) = commands.upgrade() {
                let _ = sender.send(Command::ExpirePlayer { identity });
            }
        });
    }

    /// Grace period elapsed. Remove the player unless they reconnected.
    pub(super) fn expire_player(&mut self, identity: &str) {
        if self.is_connected(identity) {
            return;
        }
        let Some(index) = self.players.iter().position(|p| p.identity == identity) else {
            return;
        };

        let player = self.players.remove(index);
        self.forget_player(identity);
        self.touch();
        tracing::info!(
            game_id = %self.id,
            username = %player.username,
            "Removed player after disconnect grace period"
        );

        self.after_player_left();
    }

    /// Shared follow-up for kicks and expiries
    pub(super) fn after_player_left(&mut self) {
        self.settle_after_departure();
        self.broadcast_celebrities();
        self.send_moderator_view();
        if self.phase.has_started() {
            self.broadcast_game_state();
        }
    }

    pub(super) fn join(
        &mut self,
        connection: ConnectionId,
        identity: &str,
        username: String,
        celebrity: String,
    ) {
        if username.is_empty() || celebrity.is_empty() {
            return;
        }
        if self.is_moderator(identity) {
            tracing::debug!(game_id = %self.id, "Moderator cannot join as a player");
            return;
        }

        let existing = self.players.iter().position(|p| p.identity == identity);

        if self.lobby_locked && existing.is_none() {
            self.send_to(
                connection,
                ServerMessage::LobbyLocked {
                    message: "The lobby is locked; no new players may join.".to_string(),
                },
            );
            return;
        }

        if let Some(field) = self.find_collision(identity, &username, &celebrity) {
            tracing::debug!(game_id = %self.id, identity, ?field, "Join collision");
            self.send_to(
                connection,
                ServerMessage::Collision {
                    field,
                    message: field.message().to_string(),
                },
            );
            return;
        }

        match existing {
            Some(index) => {
                let player = &mut self.players[index];
                player.username = username;
                player.celebrity = celebrity;
            }
            None => {
                tracing::info!(game_id = %self.id, username = %username, "Player joined");
                self.players.push(Player {
                    identity: identity.to_string(),
                    username,
                    celebrity,
                });
            }
        }

        self.broadcast_celebrities();
        self.send_moderator_view();
        if self.phase.has_started() {
            self.broadcast_game_state();
        }
    }

    /// First clash against any other identity's record, checked player by player
    fn find_collision(
        &self,
        identity: &str,
        username: &str,
        celebrity: &str,
    ) -> Option<CollisionField> {
        self.players
            .iter()
            .filter(|p| p.identity != identity)
            .find_map(|p| {
                if p.username == username {
                    Some(CollisionField::Username)
                } else if p.celebrity == celebrity {
                    Some(CollisionField::Celebrity)
                } else {
                    None
                }
            })
    }
}
