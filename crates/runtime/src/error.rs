//! Runtime errors.

use warmarch_core::ActionError;

/// Failures inside a [`crate::GameStore`] backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("store backend: {0}")]
    Backend(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("game not found: {0}")]
    GameNotFound(String),

    #[error("game already exists: {0}")]
    GameAlreadyExists(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The reducer rejected the action; the stored snapshot is unchanged.
    #[error(transparent)]
    Action(#[from] ActionError),

    /// The stored snapshot does not deserialize; the game is not loadable.
    #[error("stored snapshot for {game_id} is corrupt: {reason}")]
    CorruptSnapshot { game_id: String, reason: String },
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
