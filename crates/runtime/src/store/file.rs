//! Filesystem-backed [`GameStore`]: one JSON file per game.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use crate::error::StoreError;

use super::GameStore;

pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, game_id: &str) -> Result<PathBuf, StoreError> {
        // Game ids are opaque keys, not paths.
        if game_id.is_empty() || game_id.contains(['/', '\\', '.']) {
            return Err(StoreError::Backend(format!("invalid game id: {game_id}")));
        }
        Ok(self.root.join(format!("{game_id}.json")))
    }
}

#[async_trait]
impl GameStore for FileStore {
    async fn load(&self, game_id: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(game_id)?;
        match fs::read_to_string(&path).await {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, game_id: &str, snapshot: &str) -> Result<(), StoreError> {
        let path = self.path_for(game_id)?;
        fs::create_dir_all(&self.root).await?;
        // Write-then-rename so a crash mid-write never truncates the save.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, snapshot).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn delete(&self, game_id: &str) -> Result<(), StoreError> {
        let path = self.path_for(game_id)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut games = Vec::new();
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(games),
            Err(err) => return Err(err.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    games.push(stem.to_owned());
                }
            }
        }
        games.sort();
        Ok(games)
    }
}
