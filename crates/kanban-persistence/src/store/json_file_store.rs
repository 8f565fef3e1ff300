use crate::conflict::FileStamp;
use crate::store::atomic_writer::AtomicWriter;
use crate::traits::{PersistenceMetadata, PersistenceStore, StoreSnapshot, FORMAT_VERSION};
use kanban_core::{KanbanError, KanbanResult};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// JSON file-based persistence store.
///
/// Remembers the file's stamp from the last load or save and refuses to save
/// over a file some other process rewrote in between.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    instance_id: Uuid,
    last_seen: Mutex<Option<FileStamp>>,
}

/// On-disk wrapper around the snapshot data
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonEnvelope {
    pub version: u32,
    pub metadata: PersistenceMetadata,
    pub data: serde_json::Value,
}

impl JsonEnvelope {
    pub fn empty() -> Self {
        Self {
            version: FORMAT_VERSION,
            metadata: PersistenceMetadata::new(Uuid::new_v4()),
            data: serde_json::json!({}),
        }
    }

    pub fn to_json_string(&self) -> KanbanResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| KanbanError::Serialization(e.to_string()))
    }
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_instance_id(path, Uuid::new_v4())
    }

    pub fn with_instance_id(path: impl AsRef<Path>, instance_id: Uuid) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            instance_id,
            last_seen: Mutex::new(None),
        }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    fn check_not_modified(&self) -> KanbanResult<()> {
        let last_seen = *self.last_seen.lock();
        match last_seen {
            Some(stamp) if self.path.exists() && stamp.is_stale(&self.path) => {
                Err(KanbanError::Conflict(format!(
                    "{} was modified by another process since it was loaded",
                    self.path.display()
                )))
            }
            None if self.path.exists() => Err(KanbanError::Conflict(format!(
                "{} appeared after this process started; load it before saving",
                self.path.display()
            ))),
            _ => Ok(()),
        }
    }

    fn remember_stamp(&self) {
        *self.last_seen.lock() = FileStamp::of(&self.path).ok();
    }
}

#[async_trait::async_trait]
impl PersistenceStore for JsonFileStore {
    async fn save(&self, mut snapshot: StoreSnapshot) -> KanbanResult<PersistenceMetadata> {
        self.check_not_modified()?;

        snapshot.metadata.instance_id = self.instance_id;
        snapshot.metadata.saved_at = chrono::Utc::now();

        let data: serde_json::Value = serde_json::from_slice(&snapshot.data)
            .map_err(|e| KanbanError::Serialization(e.to_string()))?;
        let envelope = JsonEnvelope {
            version: FORMAT_VERSION,
            metadata: snapshot.metadata.clone(),
            data,
        };
        let bytes = serde_json::to_vec_pretty(&envelope)
            .map_err(|e| KanbanError::Serialization(e.to_string()))?;

        AtomicWriter::write_atomic(&self.path, &bytes).await?;
        self.remember_stamp();

        tracing::info!(bytes = bytes.len(), path = %self.path.display(), "Saved board data");
        Ok(snapshot.metadata)
    }

    async fn load(&self) -> KanbanResult<(StoreSnapshot, PersistenceMetadata)> {
        let bytes = AtomicWriter::read_all(&self.path).await?;
        self.remember_stamp();

        let envelope: JsonEnvelope = serde_json::from_slice(&bytes)
            .map_err(|e| KanbanError::Serialization(e.to_string()))?;
        if envelope.version != FORMAT_VERSION {
            return Err(KanbanError::Serialization(format!(
                "Unsupported format version: {}",
                envelope.version
            )));
        }

        let data = serde_json::to_vec(&envelope.data)
            .map_err(|e| KanbanError::Serialization(e.to_string()))?;
        tracing::info!(bytes = bytes.len(), path = %self.path.display(), "Loaded board data");

        Ok((
            StoreSnapshot {
                data,
                metadata: envelope.metadata.clone(),
            },
            envelope.metadata,
        ))
    }

    async fn exists(&self) -> bool {
        self.path.exists()
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn snapshot(store: &JsonFileStore, data: serde_json::Value) -> StoreSnapshot {
        StoreSnapshot {
            data: serde_json::to_vec(&data).unwrap(),
            metadata: PersistenceMetadata::new(store.instance_id()),
        }
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("board.json"));
        let data = json!({ "boards": [], "lists": [] });

        let metadata = store.save(snapshot(&store, data.clone())).await.unwrap();
        assert_eq!(metadata.format_version, FORMAT_VERSION);
        assert!(store.exists().await);

        let (loaded, _) = store.load().await.unwrap();
        let loaded: serde_json::Value = serde_json::from_slice(&loaded.data).unwrap();
        assert_eq!(loaded, data);
    }

    #[tokio::test]
    async fn test_external_modification_is_a_conflict() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("board.json");
        let store = JsonFileStore::new(&path);
        store.save(snapshot(&store, json!({}))).await.unwrap();

        std::fs::write(&path, JsonEnvelope::empty().to_json_string().unwrap() + "\n\n").unwrap();

        let err = store.save(snapshot(&store, json!({}))).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_consecutive_saves_from_one_process() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("board.json"));

        store.save(snapshot(&store, json!({"n": 1}))).await.unwrap();
        store.save(snapshot(&store, json!({"n": 2}))).await.unwrap();

        let (loaded, _) = store.load().await.unwrap();
        let loaded: serde_json::Value = serde_json::from_slice(&loaded.data).unwrap();
        assert_eq!(loaded["n"], 2);
    }

    #[tokio::test]
    async fn test_unknown_format_version_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("board.json");
        let mut envelope = JsonEnvelope::empty();
        envelope.version = 99;
        std::fs::write(&path, envelope.to_json_string().unwrap()).unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(
            store.load().await,
            Err(KanbanError::Serialization(_))
        ));
    }
}
