//! In-memory [`GameStore`] used for tests and local runs.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;

use super::GameStore;

#[derive(Default)]
pub struct MemoryStore {
    games: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GameStore for MemoryStore {
    async fn load(&self, game_id: &str) -> Result<Option<String>, StoreError> {
        Ok(self.games.read().await.get(game_id).cloned())
    }

    async fn save(&self, game_id: &str, snapshot: &str) -> Result<(), StoreError> {
        self.games
            .write()
            .await
            .insert(game_id.to_owned(), snapshot.to_owned());
        Ok(())
    }

    async fn delete(&self, game_id: &str) -> Result<(), StoreError> {
        self.games.write().await.remove(game_id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.games.read().await.keys().cloned().collect())
    }
}
