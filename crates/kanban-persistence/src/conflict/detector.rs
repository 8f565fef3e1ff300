use std::fs;
use std::path::Path;
use std::time::SystemTime;

/// What a file looked like when this process last read or wrote it.
///
/// Comparing stamps is how two CLI invocations racing on the same data file
/// notice each other: a save whose stamp no longer matches the file on disk
/// would clobber the other writer's moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    pub modified_time: SystemTime,
    pub size: u64,
}

impl FileStamp {
    pub fn of(path: &Path) -> std::io::Result<Self> {
        let metadata = fs::metadata(path)?;
        Ok(Self {
            modified_time: metadata.modified()?,
            size: metadata.len(),
        })
    }

    /// A missing file counts as changed.
    pub fn is_stale(&self, path: &Path) -> bool {
        match Self::of(path) {
            Ok(current) => current != *self,
            Err(_) => true,
        }
    }
}
