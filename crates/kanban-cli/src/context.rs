use kanban_core::{AppConfig, KanbanResult};
use kanban_domain::{ActivityLog, ReorderEngine};
use kanban_persistence::{
    DataSnapshot, JsonFileStore, MemoryStore, PersistenceMetadata, PersistenceStore, StoreSnapshot,
};
use std::sync::Arc;

/// State for one CLI invocation: the data file loaded into a
/// [`MemoryStore`], and a reorder engine writing through it.
pub struct CliContext {
    store: Arc<MemoryStore>,
    engine: ReorderEngine<MemoryStore>,
    file: JsonFileStore,
    config: AppConfig,
}

impl CliContext {
    pub async fn load(file_path: &str, config: AppConfig) -> KanbanResult<Self> {
        let file = JsonFileStore::new(file_path);

        let store = if file.exists().await {
            let (snapshot, metadata) = file.load().await?;
            tracing::debug!(
                saved_by = %metadata.instance_id,
                saved_at = %metadata.saved_at,
                "Loaded data file"
            );
            Arc::new(MemoryStore::from_snapshot(DataSnapshot::from_json_bytes(
                &snapshot.data,
            )?))
        } else {
            Arc::new(MemoryStore::new())
        };

        let log: Arc<dyn ActivityLog> = store.clone();
        let engine = ReorderEngine::new(store.clone())
            .with_settings(&config.reorder)
            .with_activity_log(log);

        Ok(Self {
            store,
            engine,
            file,
            config,
        })
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    pub fn engine(&self) -> &ReorderEngine<MemoryStore> {
        &self.engine
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub async fn save(&self) -> KanbanResult<()> {
        let snapshot = StoreSnapshot {
            data: self.store.snapshot().to_json_bytes()?,
            metadata: PersistenceMetadata::new(self.file.instance_id()),
        };
        self.file.save(snapshot).await?;
        Ok(())
    }
}
