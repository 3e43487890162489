use crate::config::Config;
use crate::registry::GameManager;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub games: GameManager,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let games = GameManager::new(Arc::new(config.game.clone()));
        Self {
            config: Arc::new(config),
            games,
        }
    }

    /// Route prefix, empty when serving from the root
    pub fn prefix(&self) -> &str {
        &self.config.prefix
    }
}
