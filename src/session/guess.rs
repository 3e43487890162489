//! Guessing and turn rotation.

use super::Hub;
use crate::protocol::ServerMessage;
use crate::types::*;

impl Hub {
    /// Identity whose turn it is. Only defined while a game is running.
    pub(super) fn current_turn_identity(&self) -> Option<&Identity> {
        if !self.phase.is_active() {
            return None;
        }
        self.turn_order.get(self.current_turn)
    }

    /// Present in the roster and not yet eliminated
    pub(super) fn can_take_turn(&self, identity: &str) -> bool {
        self.player(identity).is_some() && !self.eliminated.contains(identity)
    }

    /// Step to the next playable identity in turn order, wrapping at most
    /// once. Leaves the index alone if nobody can play.
    pub(super) fn advance_turn(&mut self) {
        let len = self.turn_order.len();
        if len == 0 {
            return;
        }
        for step in 1..=len {
            let candidate = (self.current_turn + step) % len;
            if self.can_take_turn(&self.turn_order[candidate]) {
                self.current_turn = candidate;
                return;
            }
        }
    }

    /// End the game once at most one contender is left. Returns true if it ended.
    pub(super) fn conclude_if_decided(&mut self) -> bool {
        if !self.phase.is_active() {
            return false;
        }

        let mut remaining = self
            .players
            .iter()
            .filter(|p| !self.eliminated.contains(&p.identity));
        let first = remaining.next().map(|p| p.identity.clone());
        if remaining.next().is_some() {
            return false;
        }

        tracing::info!(game_id = %self.id, winner = ?first, "Game concluded");
        self.phase = Phase::Concluded { winner: first };
        true
    }

    /// Keep the game consistent after a player left mid-game
    pub(super) fn settle_after_departure(&mut self) {
        if self.conclude_if_decided() {
            return;
        }
        if self
            .current_turn_identity()
            .is_some_and(|id| !self.can_take_turn(id))
        {
            self.advance_turn();
        }
    }

    pub(super) fn guess(
        &mut self,
        connection: ConnectionId,
        identity: &str,
        celebrity: &str,
        target_username: &str,
    ) {
        if !self.phase.is_active() {
            return;
        }
        if celebrity.is_empty() || target_username.is_empty() {
            return;
        }
        let Some(guesser) = self.username_of(identity).map(str::to_string) else {
            return;
        };
        if self.eliminated.contains(identity) {
            return;
        }

        if self.current_turn_identity().map(String::as_str) != Some(identity) {
            self.send_to(
                connection,
                ServerMessage::NotYourTurn {
                    message: "It is not your turn to guess.".to_string(),
                },
            );
            return;
        }

        let owner = self
            .players
            .iter()
            .find(|p| p.celebrity == celebrity && !self.eliminated.contains(&p.identity))
            .map(|p| (p.identity.clone(), p.username.clone()));

        let (owner_identity, owner_username) = match owner {
            Some((id, _)) if id == identity => {
                self.send_guess_error(connection, "You cannot guess your own celebrity.");
                return;
            }
            Some(owner) => owner,
            None => {
                self.send_guess_error(connection, "That celebrity is not in the list.");
                return;
            }
        };

        let correct = owner_username == target_username;
        let message = if correct {
            self.eliminated.insert(owner_identity.clone());
            self.teams.union(identity, &owner_identity);
            format!(
                "{} correctly guessed that \"{}\" belongs to {}.",
                guesser, celebrity, owner_username
            )
        } else {
            self.advance_turn();
            format!(
                "{} incorrectly guessed that \"{}\" belongs to {}.",
                guesser, celebrity, target_username
            )
        };

        tracing::info!(
            game_id = %self.id,
            guesser = %guesser,
            target = %target_username,
            correct,
            "Guess made"
        );

        if correct {
            self.conclude_if_decided();
        }

        self.broadcast(ServerMessage::GuessResult {
            correct,
            guesser,
            target: target_username.to_string(),
            celebrity: celebrity.to_string(),
            message,
        });
        self.broadcast_celebrities();
        self.broadcast_game_state();
    }

    fn send_guess_error(&mut self, connection: ConnectionId, message: &str) {
        self.send_to(
            connection,
            ServerMessage::GuessError {
                message: message.to_string(),
            },
        );
    }
}
