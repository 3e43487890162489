use super::Hub;
use crate::protocol::ServerMessage;
use crate::random;
use crate::types::*;

impl Hub {
    pub(super) fn lock_lobby(&mut self, lock: bool) {
        self.lobby_locked = lock;
        tracing::info!(game_id = %self.id, locked = lock, "Lobby lock changed");
        self.broadcast(ServerMessage::LobbyState { locked: lock });
        self.send_moderator_view();
    }

    pub(super) fn kick(&mut self, target_username: &str) {
        if target_username.is_empty() {
            return;
        }
        let Some(index) = self
            .players
            .iter()
            .position(|p| p.username == target_username)
        else {
            tracing::debug!(game_id = %self.id, target_username, "Kick target not found");
            return;
        };

        let player = self.players.remove(index);
        self.forget_player(&player.identity);
        tracing::info!(game_id = %self.id, username = %player.username, "Player kicked");

        // Tell every tab, then drop them
        self.send_to_identity(
            &player.identity,
            ServerMessage::Kicked {
                message: "You have been removed by the moderator.".to_string(),
            },
        );
        self.connections.retain(|_, c| c.identity != player.identity);

        self.after_player_left();
    }

    /// Start a game, or the next game after one has concluded
    pub(super) fn start_game(&mut self) {
        if self.phase.is_active() {
            tracing::debug!(game_id = %self.id, "Game already in progress");
            return;
        }

        let required = self.config.min_players_to_start.max(1);
        if self.players.len() < required {
            tracing::debug!(
                game_id = %self.id,
                players = self.players.len(),
                required,
                "Not enough players to start"
            );
            return;
        }

        let mut order: Vec<Identity> = self.players.iter().map(|p| p.identity.clone()).collect();
        if let Err(e) = random::secure_shuffle(&mut order) {
            tracing::error!(game_id = %self.id, error = %e, "Failed to shuffle turn order");
            return;
        }

        if matches!(self.phase, Phase::Concluded { .. }) && self.config.reset_between_games {
            self.eliminated.clear();
            self.teams.clear();
        }

        self.turn_order = order;
        self.current_turn = 0;
        self.phase = Phase::Active;

        // Leftover eliminations can leave the first slot unplayable
        if self
            .current_turn_identity()
            .is_some_and(|id| !self.can_take_turn(id))
        {
            self.advance_turn();
        }

        tracing::info!(
            game_id = %self.id,
            players = self.turn_order.len(),
            "Game started"
        );

        self.broadcast_celebrities();
        self.broadcast_game_state();
        // A single remaining contender has already won
        if self.conclude_if_decided() {
            self.broadcast_game_state();
        }
    }
}
