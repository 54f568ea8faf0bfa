//! Per-game orchestration: load, apply, commit-or-discard.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use warmarch_content::SetupBundle;
use warmarch_core::queries::{self, ValidationResult};
use warmarch_core::{Action, Definitions, GameEvent, GameState, apply_action};

use crate::error::{Result, RuntimeError};
use crate::store::GameStore;

/// What a store snapshot holds: the state plus the definitions the game
/// was created with. The definitions ride along so rule edits never reach
/// games already in flight.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub state: GameState,
    pub definitions: Definitions,
}

/// Serializes all reducer invocations per game id and persists snapshots
/// only after the reducer succeeded. Games are independent: actions on
/// different games proceed concurrently.
pub struct GameService<S> {
    store: S,
    locks: Mutex<BTreeMap<String, Arc<Mutex<()>>>>,
}

impl<S: GameStore> GameService<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The single-writer lock for one game.
    async fn lock_for(&self, game_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(game_id.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn load_record(&self, game_id: &str) -> Result<GameRecord> {
        let snapshot = self
            .store
            .load(game_id)
            .await?
            .ok_or_else(|| RuntimeError::GameNotFound(game_id.to_owned()))?;
        serde_json::from_str(&snapshot).map_err(|err| RuntimeError::CorruptSnapshot {
            game_id: game_id.to_owned(),
            reason: err.to_string(),
        })
    }

    async fn save_record(&self, game_id: &str, record: &GameRecord) -> Result<()> {
        let snapshot =
            serde_json::to_string(record).map_err(|err| RuntimeError::CorruptSnapshot {
                game_id: game_id.to_owned(),
                reason: err.to_string(),
            })?;
        self.store.save(game_id, &snapshot).await?;
        Ok(())
    }

    /// Creates a game from a setup bundle, snapshotting its definitions.
    pub async fn create_game(&self, game_id: &str, bundle: &SetupBundle) -> Result<GameState> {
        let lock = self.lock_for(game_id).await;
        let _guard = lock.lock().await;

        if self.store.load(game_id).await?.is_some() {
            return Err(RuntimeError::GameAlreadyExists(game_id.to_owned()));
        }

        let record = GameRecord {
            state: bundle.new_game(),
            definitions: bundle.definitions.clone(),
        };
        self.save_record(game_id, &record).await?;
        tracing::info!(game_id, setup = %bundle.id, "game created");
        Ok(record.state)
    }

    /// Loads a game's current state and definitions.
    pub async fn game(&self, game_id: &str) -> Result<GameRecord> {
        self.load_record(game_id).await
    }

    /// Applies one action: load, reduce, persist, return the new state and
    /// events. A rejected action leaves the stored snapshot untouched.
    pub async fn submit(
        &self,
        game_id: &str,
        action: &Action,
    ) -> Result<(GameState, Vec<GameEvent>)> {
        let lock = self.lock_for(game_id).await;
        let _guard = lock.lock().await;

        let record = self.load_record(game_id).await?;
        match apply_action(&record.state, action, &record.definitions) {
            Ok((state, events)) => {
                let updated = GameRecord {
                    state,
                    definitions: record.definitions,
                };
                self.save_record(game_id, &updated).await?;
                tracing::debug!(
                    game_id,
                    action = action.kind.name(),
                    faction = %action.faction,
                    events = events.len(),
                    "action applied"
                );
                Ok((updated.state, events))
            }
            Err(err) => {
                tracing::debug!(
                    game_id,
                    action = action.kind.name(),
                    faction = %action.faction,
                    error = %err,
                    "action rejected"
                );
                Err(err.into())
            }
        }
    }

    /// Dry-runs an action against the current snapshot.
    pub async fn validate(&self, game_id: &str, action: &Action) -> Result<ValidationResult> {
        let record = self.load_record(game_id).await?;
        Ok(queries::validate_action(
            &record.state,
            action,
            &record.definitions,
        ))
    }

    pub async fn list_games(&self) -> Result<Vec<String>> {
        Ok(self.store.list().await?)
    }

    pub async fn delete_game(&self, game_id: &str) -> Result<()> {
        let lock = self.lock_for(game_id).await;
        let _guard = lock.lock().await;
        self.store.delete(game_id).await?;
        Ok(())
    }
}
