//! Delivery to connections and the views built for them.
//!
//! Every send is a non-blocking enqueue. A connection whose queue is full or
//! closed is dropped on the spot so one slow client never stalls the session.

use super::Hub;
use crate::protocol::{GameStateView, ServerMessage};
use crate::types::*;
use std::collections::HashMap;
use tokio::sync::mpsc::error::TrySendError;

impl Hub {
    /// Enqueue `msg` for one connection, evicting it if it cannot keep up.
    /// Returns false if the connection is gone afterwards.
    pub(super) fn send_to(&mut self, connection: ConnectionId, msg: ServerMessage) -> bool {
        let Some(conn) = self.connections.get(&connection) else {
            return false;
        };

        match conn.outbound.try_send(msg) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    game_id = %self.id,
                    identity = %conn.identity,
                    %connection,
                    "Outbound queue full, dropping slow connection"
                );
                self.connections.remove(&connection);
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(game_id = %self.id, %connection, "Outbound queue closed");
                self.connections.remove(&connection);
                false
            }
        }
    }

    /// Send to every live connection
    pub(super) fn broadcast(&mut self, msg: ServerMessage) {
        let targets: Vec<ConnectionId> = self.connections.keys().copied().collect();
        for connection in targets {
            self.send_to(connection, msg.clone());
        }
    }

    /// Send to every connection belonging to `identity`
    pub(super) fn send_to_identity(&mut self, identity: &str, msg: ServerMessage) {
        let targets = self.connections_of(identity);
        for connection in targets {
            self.send_to(connection, msg.clone());
        }
    }

    pub(super) fn connections_of(&self, identity: &str) -> Vec<ConnectionId> {
        self.connections
            .iter()
            .filter(|(_, c)| c.identity == identity)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Celebrities still in play. Once a game has started, eliminated
    /// players' entries are pruned.
    pub(super) fn remaining_celebrities(&self) -> Vec<String> {
        let started = self.phase.has_started();
        self.players
            .iter()
            .filter(|p| !(started && self.eliminated.contains(&p.identity)))
            .map(|p| p.celebrity.clone())
            .collect()
    }

    /// Outside an active game only the moderator may see who entered what;
    /// everyone else gets an empty list.
    pub(super) fn celebrities_visible_to(&self, identity: &str) -> Vec<String> {
        if self.phase.is_active() || self.is_moderator(identity) {
            self.remaining_celebrities()
        } else {
            Vec::new()
        }
    }

    pub(super) fn broadcast_celebrities(&mut self) {
        let all = self.remaining_celebrities();
        let targets: Vec<(ConnectionId, bool)> = self
            .connections
            .iter()
            .map(|(id, c)| (*id, self.phase.is_active() || self.is_moderator(&c.identity)))
            .collect();

        for (connection, visible) in targets {
            let celebrities = if visible { all.clone() } else { Vec::new() };
            self.send_to(connection, ServerMessage::CelebrityList { celebrities });
        }
    }

    pub(super) fn moderator_view(&self) -> ServerMessage {
        ServerMessage::ModeratorView {
            players: self
                .players
                .iter()
                .map(|p| ModeratorPlayer {
                    username: p.username.clone(),
                    celebrity: p.celebrity.clone(),
                })
                .collect(),
            lobby_locked: self.lobby_locked,
            created_at: self.created_at,
            last_active: self.last_active,
        }
    }

    /// Full roster to the moderator's connections, if any are live
    pub(super) fn send_moderator_view(&mut self) {
        let Some(moderator) = self.moderator.clone() else {
            return;
        };
        let view = self.moderator_view();
        self.send_to_identity(&moderator, view);
    }

    pub(super) fn game_state_view(&mut self) -> GameStateView {
        let usernames: HashMap<Identity, String> = self
            .players
            .iter()
            .map(|p| (p.identity.clone(), p.username.clone()))
            .collect();

        let turn_order = self
            .turn_order
            .iter()
            .filter_map(|id| usernames.get(id).cloned())
            .collect();

        let eliminated = self
            .players
            .iter()
            .filter(|p| self.eliminated.contains(&p.identity))
            .map(|p| p.username.clone())
            .collect();

        let current_turn = self
            .current_turn_identity()
            .and_then(|id| usernames.get(id).cloned());

        let winner = match &self.phase {
            Phase::Concluded {
                winner: Some(identity),
            } => usernames.get(identity).cloned(),
            _ => None,
        };

        GameStateView {
            started: self.phase.is_active(),
            current_turn,
            turn_order,
            eliminated,
            winner,
            teams: self.team_states(&usernames),
        }
    }

    /// Group current players by team root, in roster order
    fn team_states(&mut self, usernames: &HashMap<Identity, String>) -> Vec<TeamState> {
        let identities: Vec<Identity> = self.players.iter().map(|p| p.identity.clone()).collect();
        let mut roots: Vec<Identity> = Vec::new();
        let mut members: HashMap<Identity, Vec<String>> = HashMap::new();

        for identity in identities {
            let root = self.teams.find(&identity);
            if !members.contains_key(&root) {
                roots.push(root.clone());
            }
            let bucket = members.entry(root.clone()).or_default();
            if identity != root {
                if let Some(name) = usernames.get(&identity) {
                    bucket.push(name.clone());
                }
            }
        }

        roots
            .into_iter()
            .map(|root| TeamState {
                leader: usernames
                    .get(&root)
                    .cloned()
                    .unwrap_or_else(|| "(unknown)".to_string()),
                members: members.remove(&root).unwrap_or_default(),
            })
            .collect()
    }

    pub(super) fn broadcast_game_state(&mut self) {
        let view = self.game_state_view();
        self.broadcast(ServerMessage::GameState(view));
    }
}
