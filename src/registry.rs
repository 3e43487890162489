//! Session registry: maps game ids to running session actors.

use crate::config::GameConfig;
use crate::error::GameResult;
use crate::random;
use crate::session::HubHandle;
use crate::types::SessionId;
use rand::rngs::OsRng;
use rand::TryRngCore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Creates, looks up and reaps sessions
#[derive(Clone)]
pub struct GameManager {
    hubs: Arc<RwLock<HashMap<SessionId, HubHandle>>>,
    config: Arc<GameConfig>,
}

impl GameManager {
    pub fn new(config: Arc<GameConfig>) -> Self {
        Self {
            hubs: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Handle for `id`, starting a fresh session if none is running
    pub async fn resolve_or_create(&self, id: &str) -> HubHandle {
        let mut hubs = self.hubs.write().await;

        if let Some(handle) = hubs.get(id) {
            if !handle.is_closed() {
                return handle.clone();
            }
        }

        tracing::info!(game_id = %id, "Creating session");
        let handle = HubHandle::spawn(id.to_string(), self.config.clone());
        hubs.insert(id.to_string(), handle.clone());
        handle
    }

    pub async fn get(&self, id: &str) -> Option<HubHandle> {
        self.hubs.read().await.get(id).cloned()
    }

    pub async fn session_count(&self) -> usize {
        self.hubs.read().await.len()
    }

    /// Fresh id not currently in use
    pub async fn new_session_id(&self) -> GameResult<SessionId> {
        let hubs = self.hubs.read().await;
        unused_session_id(&hubs, &mut OsRng)
    }

    /// Shut down and forget every session idle for at least `timeout` as of `now`.
    /// Returns the reaped ids.
    pub async fn sweep_idle(&self, now: Instant, timeout: std::time::Duration) -> Vec<SessionId> {
        let mut hubs = self.hubs.write().await;

        let idle: Vec<SessionId> = hubs
            .iter()
            .filter(|(_, h)| h.is_closed() || now.saturating_duration_since(h.last_active()) >= timeout)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &idle {
            if let Some(handle) = hubs.remove(id) {
                handle.shutdown();
                tracing::info!(game_id = %id, "Reaped idle session");
            }
        }
        idle
    }
}

/// Spawn the background task that reaps idle sessions every half timeout.
/// Does nothing when the session timeout is zero.
pub fn spawn_reaper(games: GameManager) {
    let timeout = games.config().session_timeout;
    if timeout.is_zero() {
        tracing::info!("Session reaper disabled");
        return;
    }

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(timeout / 2);
        // The first tick completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;
            let reaped = games.sweep_idle(Instant::now(), timeout).await;
            if !reaped.is_empty() {
                tracing::debug!(count = reaped.len(), "Reaper pass finished");
            }
        }
    });
}

/// Draw ids from `rng` until one is not a key of `hubs`
pub(crate) fn unused_session_id<R: TryRngCore + ?Sized>(
    hubs: &HashMap<SessionId, HubHandle>,
    rng: &mut R,
) -> GameResult<SessionId> {
    loop {
        let id = random::session_id(rng)?;
        if !hubs.contains_key(&id) {
            return Ok(id);
        }
        tracing::debug!(game_id = %id, "Session id collision, retrying");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ServerMessage;
    use crate::random::test_support::ScriptedRng;
    use std::time::Duration;

    fn manager(session_timeout: Duration) -> GameManager {
        GameManager::new(Arc::new(GameConfig {
            session_timeout,
            ..GameConfig::default()
        }))
    }

    #[tokio::test]
    async fn test_resolve_reuses_running_session() {
        let games = manager(Duration::from_secs(60));
        let first = games.resolve_or_create("ABCD1234").await;
        let (_conn, _rx) = first.connect("mod".to_string()).unwrap();

        let second = games.resolve_or_create("ABCD1234").await;
        let snapshot = second.snapshot().await.unwrap();
        assert_eq!(snapshot.moderator.as_deref(), Some("mod"));
        assert_eq!(games.session_count().await, 1);
    }

    #[tokio::test]
    async fn test_resolve_replaces_stopped_session() {
        let games = manager(Duration::from_secs(60));
        let first = games.resolve_or_create("ABCD1234").await;
        first.shutdown();
        while !first.is_closed() {
            tokio::task::yield_now().await;
        }

        let second = games.resolve_or_create("ABCD1234").await;
        assert!(!second.is_closed());
        assert!(second.snapshot().await.unwrap().moderator.is_none());
    }

    #[tokio::test]
    async fn test_new_session_id_shape() {
        let games = manager(Duration::from_secs(60));
        let id = games.new_session_id().await.unwrap();
        assert_eq!(id.len(), random::SESSION_ID_LENGTH);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(games.get(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_session_id_in_use_is_redrawn() {
        let games = manager(Duration::from_secs(60));
        games.resolve_or_create("AAAAAAAA").await;

        // First draw spells an id that is already running, the second does not
        let mut rng = ScriptedRng([vec![0; 8], vec![1; 8]].concat());
        let hubs = games.hubs.read().await;
        assert_eq!(unused_session_id(&hubs, &mut rng).unwrap(), "BBBBBBBB");
        assert!(rng.0.is_empty());
    }

    #[tokio::test]
    async fn test_session_id_reports_exhausted_randomness() {
        let games = manager(Duration::from_secs(60));
        games.resolve_or_create("AAAAAAAA").await;

        let mut rng = ScriptedRng(vec![0; 8]);
        let hubs = games.hubs.read().await;
        assert!(unused_session_id(&hubs, &mut rng).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_uses_inclusive_threshold() {
        let games = manager(Duration::from_secs(60));
        let handle = games.resolve_or_create("IDLE0001").await;
        let created = handle.last_active();

        assert!(games
            .sweep_idle(created + Duration::from_secs(59), Duration::from_secs(60))
            .await
            .is_empty());
        assert_eq!(
            games
                .sweep_idle(created + Duration::from_secs(60), Duration::from_secs(60))
                .await,
            vec!["IDLE0001".to_string()]
        );
        assert!(games.get("IDLE0001").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reaper_closes_idle_session_connections() {
        let games = manager(Duration::from_secs(60));
        spawn_reaper(games.clone());

        let handle = games.resolve_or_create("IDLE0002").await;
        let (_conn, mut rx) = handle.connect("mod".to_string()).unwrap();
        assert!(matches!(rx.recv().await, Some(ServerMessage::SessionInfo { .. })));

        tokio::time::sleep(Duration::from_secs(120)).await;

        // Remaining welcome messages, then the queue is closed
        while rx.recv().await.is_some() {}
        assert_eq!(games.session_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_keeps_session_alive() {
        let games = manager(Duration::from_secs(60));
        spawn_reaper(games.clone());

        let handle = games.resolve_or_create("BUSY0001").await;
        let (conn, _rx) = handle.connect("mod".to_string()).unwrap();
        for _ in 0..6 {
            tokio::time::sleep(Duration::from_secs(20)).await;
            handle
                .submit(conn, "mod".to_string(), crate::protocol::ClientMessage::Unknown)
                .unwrap();
        }

        assert_eq!(games.session_count().await, 1);
    }
}
