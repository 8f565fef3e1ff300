use kanban_core::{KanbanError, KanbanResult};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Write-temp-then-rename, so readers never observe a half-written file.
pub struct AtomicWriter;

impl AtomicWriter {
    pub async fn write_atomic(path: &Path, data: &[u8]) -> KanbanResult<()> {
        let target: PathBuf = path.to_path_buf();
        let bytes = data.to_vec();

        tokio::task::spawn_blocking(move || -> KanbanResult<()> {
            // Same directory keeps the rename on one filesystem.
            let parent = target
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let mut temp = tempfile::NamedTempFile::new_in(parent)?;
            temp.write_all(&bytes)?;
            temp.as_file().sync_all()?;
            temp.persist(&target).map_err(|e| KanbanError::Io(e.error))?;
            Ok(())
        })
        .await
        .map_err(|e| KanbanError::Internal(format!("atomic write task failed: {}", e)))??;

        tracing::debug!(bytes = data.len(), path = %path.display(), "Atomically wrote file");
        Ok(())
    }

    pub async fn read_all(path: &Path) -> KanbanResult<Vec<u8>> {
        let data = tokio::fs::read(path).await?;
        tracing::debug!(bytes = data.len(), path = %path.display(), "Read file");
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("board.json");

        AtomicWriter::write_atomic(&path, b"{\"boards\":[]}").await.unwrap();
        assert_eq!(
            AtomicWriter::read_all(&path).await.unwrap(),
            b"{\"boards\":[]}"
        );
    }

    #[tokio::test]
    async fn test_overwrite_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("board.json");

        AtomicWriter::write_atomic(&path, b"first").await.unwrap();
        AtomicWriter::write_atomic(&path, b"second").await.unwrap();

        assert_eq!(AtomicWriter::read_all(&path).await.unwrap(), b"second");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
