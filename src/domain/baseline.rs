//! Baseline store — named snapshot persistence under one directory.
//!
//! One JSON file per baseline. Writes serialize to a `.tmp` file and then
//! atomically rename, so a reader never observes a partially written record.
//! A failed operation reports its own error and leaves every other baseline
//! untouched.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

use super::snapshot::{StoredBaseline, SystemSnapshot};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("baseline '{name}' not found")]
    NotFound { name: String },

    #[error("baseline store I/O failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("baseline file {path} is corrupt or failed checksum verification")]
    Corrupt { path: PathBuf },
}

pub struct BaselineStore {
    dir: PathBuf,
}

impl BaselineStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Save a snapshot under `name`, or under a timestamp-derived auto-name
    /// when omitted. Saving under an existing name overwrites it.
    pub async fn save(
        &self,
        snapshot: SystemSnapshot,
        name: Option<&str>,
    ) -> Result<StoredBaseline, StoreError> {
        let stored = match name {
            Some(n) if !n.trim().is_empty() => {
                StoredBaseline::new(n.trim().to_string(), snapshot)
            }
            _ => {
                let stored = StoredBaseline::new(String::new(), snapshot);
                let auto = stored.created_at.format("baseline_%Y%m%d_%H%M%S").to_string();
                StoredBaseline { name: auto, ..stored }
            }
        };

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StoreError::Io { path: self.dir.clone(), source })?;

        let path = self.path_for(&stored.name);
        let content = serde_json::to_string_pretty(&stored)
            .map_err(|_| StoreError::Corrupt { path: path.clone() })?;

        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &content)
            .await
            .map_err(|source| StoreError::Io { path: tmp_path.clone(), source })?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|source| StoreError::Io { path: path.clone(), source })?;

        Ok(stored)
    }

    /// Load a baseline by name, verifying its checksum.
    pub async fn get(&self, name: &str) -> Result<StoredBaseline, StoreError> {
        let path = self.path_for(name);
        if !path.exists() {
            return Err(StoreError::NotFound { name: name.to_string() });
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| StoreError::Io { path: path.clone(), source })?;

        let stored: StoredBaseline = serde_json::from_str(&content)
            .map_err(|_| StoreError::Corrupt { path: path.clone() })?;

        if !stored.verify() {
            warn!(path = %path.display(), "baseline checksum mismatch");
            return Err(StoreError::Corrupt { path });
        }

        Ok(stored)
    }

    /// The most recently created baseline.
    pub async fn latest(&self) -> Result<StoredBaseline, StoreError> {
        let mut entries = self.load_all().await?;
        entries.sort_by_key(|b| b.created_at);
        entries.pop().ok_or(StoreError::NotFound { name: "latest".to_string() })
    }

    /// All baseline names in creation order.
    pub async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = self.load_all().await?;
        entries.sort_by_key(|b| b.created_at);
        Ok(entries.into_iter().map(|b| b.name).collect())
    }

    pub async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let path = self.path_for(name);
        if !path.exists() {
            return Err(StoreError::NotFound { name: name.to_string() });
        }
        tokio::fs::remove_file(&path)
            .await
            .map_err(|source| StoreError::Io { path, source })
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    async fn load_all(&self) -> Result<Vec<StoredBaseline>, StoreError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut dir = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|source| StoreError::Io { path: self.dir.clone(), source })?;

        let mut entries = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|source| StoreError::Io { path: self.dir.clone(), source })?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_baseline(&path).await {
                Ok(stored) => entries.push(stored),
                Err(e) => {
                    // One unreadable file must not hide the rest.
                    warn!(path = %path.display(), error = %e, "skipping unreadable baseline");
                }
            }
        }

        Ok(entries)
    }
}

async fn read_baseline(path: &Path) -> Result<StoredBaseline, StoreError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| StoreError::Io { path: path.to_path_buf(), source })?;
    serde_json::from_str(&content).map_err(|_| StoreError::Corrupt { path: path.to_path_buf() })
}
