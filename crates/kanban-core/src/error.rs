use thiserror::Error;

#[derive(Error, Debug)]
pub enum KanbanError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// A concurrent writer changed the container since it was read.
    /// Callers should refetch and retry.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Dispatch queue is full ({0} pending)")]
    QueueFull(usize),

    #[error("Dispatch failed: {0}")]
    Dispatch(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl KanbanError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, KanbanError::Conflict(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, KanbanError::Validation(_))
    }
}
