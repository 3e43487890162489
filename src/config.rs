//! Process configuration loaded from `PARTYBOX_*` environment variables.

use std::net::SocketAddr;
use std::time::Duration;

/// Smallest outbound queue accepted. A connection is sent up to four
/// welcome messages before its writer starts draining.
pub const MIN_OUTBOUND_QUEUE: usize = 4;

/// Policy knobs shared by the registry and every session actor
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Grace period before a disconnected player's record is removed
    pub player_timeout: Duration,
    /// Idle time after which a whole session is reaped (zero disables the reaper)
    pub session_timeout: Duration,
    /// Capacity of each connection's outbound queue
    pub outbound_queue: usize,
    /// Players required before the moderator can start a game
    pub min_players_to_start: usize,
    /// Clear eliminations and teams when a new game starts after a finished one
    pub reset_between_games: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            player_timeout: Duration::from_secs(10 * 60),
            session_timeout: Duration::from_secs(60 * 60),
            outbound_queue: 8,
            min_players_to_start: 1,
            reset_between_games: false,
        }
    }
}

impl GameConfig {
    /// Load config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let player_timeout = env_parse("PARTYBOX_PLAYER_TIMEOUT")
            .map(Duration::from_secs)
            .unwrap_or(defaults.player_timeout);

        let session_timeout = env_parse("PARTYBOX_SESSION_TIMEOUT")
            .map(Duration::from_secs)
            .unwrap_or(defaults.session_timeout);

        let outbound_queue = env_parse("PARTYBOX_OUTBOUND_QUEUE")
            .filter(|n: &usize| *n > 0)
            .map(|n| n.max(MIN_OUTBOUND_QUEUE))
            .unwrap_or(defaults.outbound_queue);

        let min_players_to_start = env_parse("PARTYBOX_MIN_PLAYERS")
            .filter(|n: &usize| *n > 0)
            .unwrap_or(defaults.min_players_to_start);

        let reset_between_games = std::env::var("PARTYBOX_RESET_BETWEEN_GAMES")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(defaults.reset_between_games);

        tracing::info!(
            player_timeout_secs = player_timeout.as_secs(),
            session_timeout_secs = session_timeout.as_secs(),
            outbound_queue,
            min_players_to_start,
            reset_between_games,
            "Game config loaded"
        );

        Self {
            player_timeout,
            session_timeout,
            outbound_queue,
            min_players_to_start,
            reset_between_games,
        }
    }
}

/// Listener and routing configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    /// Path prepended to every route, for running behind a reverse proxy
    pub prefix: String,
    pub game: GameConfig,
}

impl Config {
    pub fn from_env() -> Self {
        let bind = std::env::var("PARTYBOX_BIND")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "0.0.0.0".to_string());

        let port = env_parse("PARTYBOX_PORT")
            .filter(|p: &u16| *p != 0)
            .unwrap_or(8080);

        let prefix = std::env::var("PARTYBOX_PREFIX")
            .map(|p| normalize_prefix(&p))
            .unwrap_or_default();

        Self {
            bind,
            port,
            prefix,
            game: GameConfig::from_env(),
        }
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.bind, self.port).parse()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// `"/games/"` -> `"/games"`, `"games"` -> `"/games"`, `"/"` -> `""`
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "PARTYBOX_BIND",
        "PARTYBOX_PORT",
        "PARTYBOX_PREFIX",
        "PARTYBOX_PLAYER_TIMEOUT",
        "PARTYBOX_SESSION_TIMEOUT",
        "PARTYBOX_OUTBOUND_QUEUE",
        "PARTYBOX_MIN_PLAYERS",
        "PARTYBOX_RESET_BETWEEN_GAMES",
    ];

    fn clear_env() {
        for key in KEYS {
            std::env::remove_var(key);
        }
    }

    fn set_env(key: &str, value: &str) {
        std::env::set_var(key, value);
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = Config::from_env();
        assert_eq!(config.bind, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.prefix, "");
        assert_eq!(config.game.player_timeout, Duration::from_secs(600));
        assert_eq!(config.game.session_timeout, Duration::from_secs(3600));
        assert_eq!(config.game.outbound_queue, 8);
        assert_eq!(config.game.min_players_to_start, 1);
        assert!(!config.game.reset_between_games);
    }

    #[test]
    #[serial]
    fn test_overrides() {
        clear_env();
        set_env("PARTYBOX_PORT", "9000");
        set_env("PARTYBOX_PREFIX", "party/");
        set_env("PARTYBOX_PLAYER_TIMEOUT", "5");
        set_env("PARTYBOX_SESSION_TIMEOUT", "0");
        set_env("PARTYBOX_MIN_PLAYERS", "2");
        set_env("PARTYBOX_RESET_BETWEEN_GAMES", "true");

        let config = Config::from_env();
        assert_eq!(config.port, 9000);
        assert_eq!(config.prefix, "/party");
        assert_eq!(config.game.player_timeout, Duration::from_secs(5));
        assert_eq!(config.game.session_timeout, Duration::ZERO);
        assert_eq!(config.game.min_players_to_start, 2);
        assert!(config.game.reset_between_games);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_values_fall_back() {
        clear_env();
        set_env("PARTYBOX_PORT", "not-a-port");
        set_env("PARTYBOX_OUTBOUND_QUEUE", "0");
        let config = Config::from_env();
        assert_eq!(config.port, 8080);
        assert_eq!(config.game.outbound_queue, 8);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_small_outbound_queue_is_raised() {
        clear_env();
        set_env("PARTYBOX_OUTBOUND_QUEUE", "2");
        assert_eq!(Config::from_env().game.outbound_queue, MIN_OUTBOUND_QUEUE);

        set_env("PARTYBOX_OUTBOUND_QUEUE", "32");
        assert_eq!(Config::from_env().game.outbound_queue, 32);
        clear_env();
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix(""), "");
        assert_eq!(normalize_prefix("/"), "");
        assert_eq!(normalize_prefix("/games/"), "/games");
        assert_eq!(normalize_prefix("games"), "/games");
    }
}
