use crate::types::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Join {
        #[serde(default)]
        username: String,
        #[serde(default)]
        celebrity: String,
    },
    // Moderator-only messages
    LockLobby {
        #[serde(default)]
        lock: bool,
    },
    Kick {
        #[serde(default)]
        target_username: String,
    },
    StartGame,
    Guess {
        #[serde(default)]
        celebrity: String,
        #[serde(default)]
        target_username: String,
    },
    /// Any message type this server does not know about
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    pub fn is_moderator_command(&self) -> bool {
        matches!(
            self,
            ClientMessage::LockLobby { .. } | ClientMessage::Kick { .. } | ClientMessage::StartGame
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    SessionInfo {
        lobby_locked: bool,
        is_existing: bool,
        is_moderator: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        username: Option<String>,
    },
    CelebrityList {
        celebrities: Vec<String>,
    },
    Collision {
        field: CollisionField,
        message: String,
    },
    LobbyState {
        locked: bool,
    },
    /// Join rejected because the lobby is locked
    LobbyLocked {
        message: String,
    },
    Kicked {
        message: String,
    },
    ModeratorView {
        players: Vec<ModeratorPlayer>,
        lobby_locked: bool,
        created_at: DateTime<Utc>,
        last_active: DateTime<Utc>,
    },
    GameState(GameStateView),
    GuessResult {
        correct: bool,
        guesser: String,
        target: String,
        celebrity: String,
        message: String,
    },
    NotYourTurn {
        message: String,
    },
    GuessError {
        message: String,
    },
}

/// Whose turn it is, who is out, and the current teams. All names are usernames.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GameStateView {
    pub started: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_turn: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub turn_order: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub eliminated: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub teams: Vec<TeamState>,
}
