use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kanban_core::KanbanResult;
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Current version of the on-disk envelope.
pub const FORMAT_VERSION: u32 = 1;

/// Metadata for persistence operations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistenceMetadata {
    /// Version of the persistence format
    pub format_version: u32,
    /// ID of the process that performed the save
    pub instance_id: Uuid,
    /// When this data was saved
    pub saved_at: DateTime<Utc>,
}

impl PersistenceMetadata {
    pub fn new(instance_id: Uuid) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            instance_id,
            saved_at: Utc::now(),
        }
    }
}

/// Point-in-time snapshot of all data that needs to be persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Raw JSON bytes of a [`DataSnapshot`](crate::DataSnapshot)
    pub data: Vec<u8>,
    pub metadata: PersistenceMetadata,
}

/// Whole-snapshot storage backends (file, object store, ...).
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    /// Save a snapshot to the store
    async fn save(&self, snapshot: StoreSnapshot) -> KanbanResult<PersistenceMetadata>;

    /// Load the current snapshot from the store
    async fn load(&self) -> KanbanResult<(StoreSnapshot, PersistenceMetadata)>;

    async fn exists(&self) -> bool;

    fn path(&self) -> &Path;
}
