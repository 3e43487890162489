//! Session actor ("hub").
//!
//! One actor task per game session owns all of that session's state. Every
//! mutation arrives as a [`Command`] on a single channel and is applied in
//! order, so handlers never need a lock. The rest of the system talks to the
//! actor through a cloneable [`HubHandle`].

mod broadcast;
mod guess;
mod lobby;
mod moderator;
mod teams;

pub use teams::Teams;

use crate::config::{GameConfig, MIN_OUTBOUND_QUEUE};
use crate::error::{GameError, GameResult};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::types::*;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

/// Messages processed by the session actor
#[derive(Debug)]
pub enum Command {
    Connect {
        connection: ConnectionId,
        identity: Identity,
        outbound: mpsc::Sender<ServerMessage>,
    },
    Disconnect {
        connection: ConnectionId,
        identity: Identity,
    },
    Client {
        connection: ConnectionId,
        identity: Identity,
        message: ClientMessage,
    },
    /// Fired by the grace timer after a non-moderator disconnects
    ExpirePlayer { identity: Identity },
    Snapshot {
        respond_to: oneshot::Sender<HubSnapshot>,
    },
    /// Close every connection and stop the actor
    Shutdown,
}

/// A live transport registered with the session
#[derive(Debug)]
struct Connection {
    identity: Identity,
    outbound: mpsc::Sender<ServerMessage>,
}

/// Point-in-time copy of a session's state, for inspection and tests
#[derive(Debug, Clone)]
pub struct HubSnapshot {
    pub id: SessionId,
    pub phase: Phase,
    pub players: Vec<Player>,
    pub moderator: Option<Identity>,
    pub lobby_locked: bool,
    pub turn_order: Vec<Identity>,
    pub current_turn: Option<Identity>,
    pub eliminated: HashSet<Identity>,
    /// Team root for every current player
    pub team_roots: HashMap<Identity, Identity>,
    pub connections: usize,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl HubSnapshot {
    pub fn player_by_username(&self, username: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.username == username)
    }
}

/// All mutable state for one session. Only ever touched by its actor task.
pub struct Hub {
    id: SessionId,
    config: Arc<GameConfig>,
    connections: HashMap<ConnectionId, Connection>,
    players: Vec<Player>,
    moderator: Option<Identity>,
    lobby_locked: bool,
    phase: Phase,
    turn_order: Vec<Identity>,
    current_turn: usize,
    eliminated: HashSet<Identity>,
    teams: Teams,
    created_at: DateTime<Utc>,
    last_active: DateTime<Utc>,
    activity: watch::Sender<Instant>,
    /// Weak so pending grace timers never keep a finished actor alive
    commands: mpsc::WeakUnboundedSender<Command>,
}

impl Hub {
    pub fn new(
        id: SessionId,
        config: Arc<GameConfig>,
        commands: mpsc::WeakUnboundedSender<Command>,
    ) -> (Self, watch::Receiver<Instant>) {
        let (activity, activity_rx) = watch::channel(Instant::now());
        let now = Utc::now();
        let hub = Self {
            id,
            config,
            connections: HashMap::new(),
            players: Vec::new(),
            moderator: None,
            lobby_locked: false,
            phase: Phase::Lobby,
            turn_order: Vec::new(),
            current_turn: 0,
            eliminated: HashSet::new(),
            teams: Teams::default(),
            created_at: now,
            last_active: now,
            activity,
            commands,
        };
        (hub, activity_rx)
    }

    /// Apply one command. Returns false once the actor should stop.
    pub fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Connect {
                connection,
                identity,
                outbound,
            } => {
                self.touch();
                self.connect(connection, identity, outbound);
            }
            Command::Disconnect {
                connection,
                identity,
            } => {
                self.touch();
                self.disconnect(connection, &identity);
            }
            Command::Client {
                connection,
                identity,
                message,
            } => {
                self.touch();
                self.handle_client_message(connection, &identity, message);
            }
            Command::ExpirePlayer { identity } => self.expire_player(&identity),
            Command::Snapshot { respond_to } => {
                let _ = respond_to.send(self.snapshot());
            }
            Command::Shutdown => {
                self.close_all();
                return false;
            }
        }
        true
    }

    fn handle_client_message(
        &mut self,
        connection: ConnectionId,
        identity: &str,
        message: ClientMessage,
    ) {
        if message.is_moderator_command() && !self.is_moderator(identity) {
            tracing::debug!(
                game_id = %self.id,
                identity,
                "Ignoring moderator command from non-moderator"
            );
            return;
        }

        match message {
            ClientMessage::Join {
                username,
                celebrity,
            } => self.join(connection, identity, username, celebrity),
            ClientMessage::LockLobby { lock } => self.lock_lobby(lock),
            ClientMessage::Kick { target_username } => self.kick(&target_username),
            ClientMessage::StartGame => self.start_game(),
            ClientMessage::Guess {
                celebrity,
                target_username,
            } => self.guess(connection, identity, &celebrity, &target_username),
            ClientMessage::Unknown => {
                tracing::debug!(game_id = %self.id, identity, "Ignoring unknown message type");
            }
        }
    }

    /// Record activity for the reaper and the moderator view
    fn touch(&mut self) {
        self.last_active = Utc::now();
        self.activity.send_replace(Instant::now());
    }

    fn is_moderator(&self, identity: &str) -> bool {
        self.moderator.as_deref() == Some(identity)
    }

    fn player(&self, identity: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.identity == identity)
    }

    fn username_of(&self, identity: &str) -> Option<&str> {
        self.player(identity).map(|p| p.username.as_str())
    }

    fn is_connected(&self, identity: &str) -> bool {
        self.connections.values().any(|c| c.identity == identity)
    }

    /// Drop a departed player's elimination and team entries
    fn forget_player(&mut self, identity: &str) {
        self.eliminated.remove(identity);
        self.teams.remove(identity);
    }

    /// Drop every connection. Closing the queues ends each outbound loop.
    fn close_all(&mut self) {
        let count = self.connections.len();
        self.connections.clear();
        tracing::info!(game_id = %self.id, connections = count, "Session closed");
    }

    fn snapshot(&mut self) -> HubSnapshot {
        let identities: Vec<Identity> = self.players.iter().map(|p| p.identity.clone()).collect();
        let team_roots = identities
            .into_iter()
            .map(|id| {
                let root = self.teams.find(&id);
                (id, root)
            })
            .collect();

        HubSnapshot {
            id: self.id.clone(),
            phase: self.phase.clone(),
            players: self.players.clone(),
            moderator: self.moderator.clone(),
            lobby_locked: self.lobby_locked,
            turn_order: self.turn_order.clone(),
            current_turn: self.current_turn_identity().cloned(),
            eliminated: self.eliminated.clone(),
            team_roots,
            connections: self.connections.len(),
            created_at: self.created_at,
            last_active: self.last_active,
        }
    }
}

/// Actor loop: apply commands in arrival order until shutdown
pub async fn run_hub(mut hub: Hub, mut receiver: mpsc::UnboundedReceiver<Command>) {
    tracing::info!(game_id = %hub.id, "Session started");

    while let Some(command) = receiver.recv().await {
        if !hub.handle_command(command) {
            break;
        }
    }

    hub.close_all();
    tracing::info!(game_id = %hub.id, "Session actor stopped");
}

/// Cloneable handle for submitting commands to a session actor
#[derive(Clone, Debug)]
pub struct HubHandle {
    id: SessionId,
    sender: mpsc::UnboundedSender<Command>,
    activity: watch::Receiver<Instant>,
    outbound_queue: usize,
}

impl HubHandle {
    /// Create a session actor and start its task
    pub fn spawn(id: SessionId, config: Arc<GameConfig>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let outbound_queue = config.outbound_queue.max(MIN_OUTBOUND_QUEUE);
        let (hub, activity) = Hub::new(id.clone(), config, sender.downgrade());
        tokio::spawn(run_hub(hub, receiver));

        Self {
            id,
            sender,
            activity,
            outbound_queue,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// When the actor last processed client activity
    pub fn last_active(&self) -> Instant {
        *self.activity.borrow()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    fn send(&self, command: Command) -> GameResult<()> {
        self.sender
            .send(command)
            .map_err(|_| GameError::SessionClosed(self.id.clone()))
    }

    /// Register a new connection for `identity`. Returns its id and the
    /// receiving end of its bounded outbound queue.
    pub fn connect(
        &self,
        identity: Identity,
    ) -> GameResult<(ConnectionId, mpsc::Receiver<ServerMessage>)> {
        let connection = ConnectionId::new();
        let (outbound, rx) = mpsc::channel(self.outbound_queue);
        self.send(Command::Connect {
            connection,
            identity,
            outbound,
        })?;
        Ok((connection, rx))
    }

    pub fn disconnect(&self, connection: ConnectionId, identity: Identity) -> GameResult<()> {
        self.send(Command::Disconnect {
            connection,
            identity,
        })
    }

    pub fn submit(
        &self,
        connection: ConnectionId,
        identity: Identity,
        message: ClientMessage,
    ) -> GameResult<()> {
        self.send(Command::Client {
            connection,
            identity,
            message,
        })
    }

    pub async fn snapshot(&self) -> GameResult<HubSnapshot> {
        let (respond_to, rx) = oneshot::channel();
        self.send(Command::Snapshot { respond_to })?;
        rx.await
            .map_err(|_| GameError::SessionClosed(self.id.clone()))
    }

    pub fn shutdown(&self) {
        // Already stopped is fine
        let _ = self.sender.send(Command::Shutdown);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// A hub driven directly, without its actor task. Keeps the command
    /// receiver so tests can observe scheduled expiries.
    pub struct TestHub {
        pub hub: Hub,
        pub commands: mpsc::UnboundedReceiver<Command>,
        _sender: mpsc::UnboundedSender<Command>,
    }

    impl TestHub {
        pub fn new(config: GameConfig) -> Self {
            let (sender, commands) = mpsc::unbounded_channel();
            let (hub, _activity) = Hub::new("TESTGAME".to_string(), Arc::new(config), sender.downgrade());
            Self {
                hub,
                commands,
                _sender: sender,
            }
        }

        /// Open a connection for `identity` and discard its welcome messages
        pub fn connect(&mut self, identity: &str) -> (ConnectionId, mpsc::Receiver<ServerMessage>) {
            let connection = ConnectionId::new();
            let capacity = self.hub.config.outbound_queue;
            let (outbound, mut rx) = mpsc::channel(capacity);
            self.hub.handle_command(Command::Connect {
                connection,
                identity: identity.to_string(),
                outbound,
            });
            drain(&mut rx);
            (connection, rx)
        }

        pub fn send(&mut self, connection: ConnectionId, identity: &str, message: ClientMessage) {
            self.hub.handle_command(Command::Client {
                connection,
                identity: identity.to_string(),
                message,
            });
        }

        pub fn join(&mut self, connection: ConnectionId, identity: &str, username: &str, celebrity: &str) {
            self.send(
                connection,
                identity,
                ClientMessage::Join {
                    username: username.to_string(),
                    celebrity: celebrity.to_string(),
                },
            );
        }

        pub fn snapshot(&mut self) -> HubSnapshot {
            self.hub.snapshot()
        }
    }

    pub fn drain(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    pub fn celebrity_lists(messages: &[ServerMessage]) -> Vec<Vec<String>> {
        messages
            .iter()
            .filter_map(|m| match m {
                ServerMessage::CelebrityList { celebrities } => Some(celebrities.clone()),
                _ => None,
            })
            .collect()
    }
}
