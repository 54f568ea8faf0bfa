//! Persistence contracts for serialized game snapshots.
//!
//! Stores are opaque key-value: game id to serialized snapshot string.
//! They know nothing about game rules; the service layer owns
//! (de)serialization and locking.

mod file;
mod memory;

use async_trait::async_trait;

use crate::error::StoreError;

pub use file::FileStore;
pub use memory::MemoryStore;

#[async_trait]
pub trait GameStore: Send + Sync {
    /// Loads a snapshot; `None` when the game does not exist.
    async fn load(&self, game_id: &str) -> Result<Option<String>, StoreError>;

    /// Writes a snapshot, replacing any previous one.
    async fn save(&self, game_id: &str, snapshot: &str) -> Result<(), StoreError>;

    /// Removes a game. Removing a missing game is not an error.
    async fn delete(&self, game_id: &str) -> Result<(), StoreError>;

    /// Ids of all stored games, sorted.
    async fn list(&self) -> Result<Vec<String>, StoreError>;
}
