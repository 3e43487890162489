use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Opaque ID types for type safety
pub type SessionId = String;
pub type Identity = String;
pub type ConnectionId = Ulid;

/// A joined identity's game-visible record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Player {
    pub identity: Identity,
    pub username: String,
    pub celebrity: String,
}

/// Session-level phase
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Phase {
    /// Waiting for the moderator to start the first game
    #[default]
    Lobby,
    Active,
    /// Back in the lobby after a game ended, carrying the last player standing
    Concluded { winner: Option<Identity> },
}

impl Phase {
    pub fn is_active(&self) -> bool {
        matches!(self, Phase::Active)
    }

    /// True once the first game has been started, whether or not it is still running
    pub fn has_started(&self) -> bool {
        !matches!(self, Phase::Lobby)
    }
}

/// Which field of a join request clashed with another player
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CollisionField {
    Username,
    Celebrity,
}

impl CollisionField {
    pub fn message(&self) -> &'static str {
        match self {
            CollisionField::Username => {
                "That username is already taken. Please choose a different username."
            }
            CollisionField::Celebrity => {
                "That celebrity name has already been used. Please choose a different celebrity."
            }
        }
    }
}

/// Roster entry sent only to the moderator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModeratorPlayer {
    pub username: String,
    pub celebrity: String,
}

/// A team as shown to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamState {
    pub leader: String,
    #[serde(default)]
    pub members: Vec<String>,
}
