//! Persistent key-value property store for flags, selection and dedup state

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::core::dedup::DedupIndex;
use crate::error::{AltgenError, AltgenResult};

/// Run-control flag: RUNNING while a batch is active, STOP to cancel
pub const RUN_STATUS: &str = "RUN_STATUS";
/// Model selected for the active batch
pub const SELECTED_MODEL: &str = "SELECTED_MODEL";
/// Provider selected for the active batch
pub const SELECTED_PROVIDER: &str = "SELECTED_PROVIDER";
/// Serialized cross-run dedup snapshot
pub const GENERATED_ALTERNATIVES: &str = "GENERATED_ALTERNATIVES";

const STATUS_RUNNING: &str = "RUNNING";
const STATUS_STOP: &str = "STOP";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Stop,
}

/// String key-value storage surviving across runs
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PropertyStore: Send + Sync {
    async fn get(&self, key: &str) -> AltgenResult<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> AltgenResult<()>;
    async fn delete(&self, key: &str) -> AltgenResult<()>;
}

pub async fn run_status(store: &dyn PropertyStore) -> AltgenResult<RunStatus> {
    let value = store.get(RUN_STATUS).await?;
    Ok(match value.as_deref() {
        Some(STATUS_STOP) => RunStatus::Stop,
        _ => RunStatus::Running,
    })
}

pub async fn set_run_status(store: &dyn PropertyStore, status: RunStatus) -> AltgenResult<()> {
    let value = match status {
        RunStatus::Running => STATUS_RUNNING,
        RunStatus::Stop => STATUS_STOP,
    };
    store.set(RUN_STATUS, value).await
}

/// Load the persisted dedup snapshot; a missing key yields an empty index.
pub async fn load_snapshot(store: &dyn PropertyStore) -> AltgenResult<DedupIndex> {
    match store.get(GENERATED_ALTERNATIVES).await? {
        None => Ok(DedupIndex::new()),
        Some(raw) => {
            let snapshot: BTreeMap<String, Vec<String>> =
                serde_json::from_str(&raw).map_err(|e| AltgenError::StoreError {
                    message: format!("corrupt dedup snapshot: {e}"),
                })?;
            Ok(DedupIndex::from_snapshot(snapshot))
        }
    }
}

pub async fn save_snapshot(store: &dyn PropertyStore, index: &DedupIndex) -> AltgenResult<()> {
    let raw = serde_json::to_string(&index.snapshot())?;
    store.set(GENERATED_ALTERNATIVES, &raw).await
}

/// JSON-file-backed [`PropertyStore`].
///
/// The whole store is one flat string map, re-read and rewritten per
/// operation; there is a single writer by construction.
pub struct JsonPropertyStore {
    path: PathBuf,
}

impl JsonPropertyStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    async fn load(&self) -> AltgenResult<HashMap<String, String>> {
        match fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| AltgenError::StoreError {
                message: format!("corrupt property store {}: {e}", self.path.display()),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(AltgenError::StoreError {
                message: format!("read {}: {e}", self.path.display()),
            }),
        }
    }

    async fn save(&self, map: &HashMap<String, String>) -> AltgenResult<()> {
        // Sorted output keeps the file diffable.
        let ordered: BTreeMap<&String, &String> = map.iter().collect();
        let bytes = serde_json::to_vec_pretty(&ordered)?;
        fs::write(&self.path, bytes)
            .await
            .map_err(|e| AltgenError::StoreError {
                message: format!("write {}: {e}", self.path.display()),
            })
    }
}

#[async_trait]
impl PropertyStore for JsonPropertyStore {
    async fn get(&self, key: &str) -> AltgenResult<Option<String>> {
        Ok(self.load().await?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> AltgenResult<()> {
        let mut map = self.load().await?;
        map.insert(key.to_string(), value.to_string());
        self.save(&map).await
    }

    async fn delete(&self, key: &str) -> AltgenResult<()> {
        let mut map = self.load().await?;
        if map.remove(key).is_some() {
            self.save(&map).await?;
        }
        Ok(())
    }
}
