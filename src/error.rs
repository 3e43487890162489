/// Result type for session and registry operations
pub type GameResult<T> = Result<T, GameError>;

/// Errors that can occur outside the normal protocol replies
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// The OS random source could not be read. Never fall back to a weaker source.
    #[error("secure random source unavailable: {0}")]
    Randomness(String),

    #[error("session {0} is no longer running")]
    SessionClosed(String),
}
