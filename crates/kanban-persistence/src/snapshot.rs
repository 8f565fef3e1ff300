use kanban_domain::{ActivityRecord, Board, Card, List, Reminder};
use serde::{Deserialize, Serialize};

/// Everything a [`MemoryStore`](crate::MemoryStore) holds, in a
/// serializable form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DataSnapshot {
    #[serde(default)]
    pub boards: Vec<Board>,
    #[serde(default)]
    pub lists: Vec<List>,
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub reminders: Vec<Reminder>,
    #[serde(default)]
    pub activity: Vec<ActivityRecord>,
}

impl DataSnapshot {
    pub fn to_json_bytes(&self) -> kanban_core::KanbanResult<Vec<u8>> {
        serde_json::to_vec_pretty(self)
            .map_err(|e| kanban_core::KanbanError::Serialization(e.to_string()))
    }

    pub fn from_json_bytes(bytes: &[u8]) -> kanban_core::KanbanResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| kanban_core::KanbanError::Serialization(e.to_string()))
    }
}
