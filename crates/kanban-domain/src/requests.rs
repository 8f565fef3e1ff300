//! Reorder requests as they arrive from the request layer, and their
//! validated forms. The engine only accepts the validated types.

use kanban_core::{KanbanError, KanbanResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::container::{Container, ContainerKind, ItemId};

/// Upper bound accepted for a target index; larger values are clamped by
/// the engine anyway, this only rejects nonsense.
pub const MAX_TARGET_INDEX: i64 = u32::MAX as i64;

/// Single-item move. Without `container_id` the item stays in its current
/// container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub item_id: ItemId,
    #[serde(default)]
    pub container_id: Option<Uuid>,
    pub target_index: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkReorderRequest {
    pub container_id: Uuid,
    pub ordered_item_ids: Vec<ItemId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedMove {
    kind: ContainerKind,
    item_id: ItemId,
    destination: Option<Container>,
    target_index: usize,
}

impl ValidatedMove {
    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    pub fn item_id(&self) -> ItemId {
        self.item_id
    }

    pub fn destination(&self) -> Option<Container> {
        self.destination
    }

    pub fn target_index(&self) -> usize {
        self.target_index
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkReorder {
    container: Container,
    ordered: Vec<ItemId>,
}

impl BulkReorder {
    pub fn container(&self) -> Container {
        self.container
    }

    pub fn ordered(&self) -> &[ItemId] {
        &self.ordered
    }
}

impl MoveRequest {
    pub fn validate(&self, kind: ContainerKind) -> KanbanResult<ValidatedMove> {
        if self.target_index < 0 {
            return Err(KanbanError::Validation(format!(
                "target index must not be negative (got {})",
                self.target_index
            )));
        }
        if self.target_index > MAX_TARGET_INDEX {
            return Err(KanbanError::Validation(format!(
                "target index {} is out of range",
                self.target_index
            )));
        }
        Ok(ValidatedMove {
            kind,
            item_id: self.item_id,
            destination: self.container_id.map(|id| Container::for_kind(kind, id)),
            target_index: self.target_index as usize,
        })
    }
}

impl BulkReorderRequest {
    pub fn validate(self, kind: ContainerKind) -> KanbanResult<BulkReorder> {
        let mut seen = HashSet::with_capacity(self.ordered_item_ids.len());
        if let Some(dup) = self.ordered_item_ids.iter().find(|id| !seen.insert(**id)) {
            return Err(KanbanError::Validation(format!(
                "item {} appears more than once in the requested order",
                dup
            )));
        }
        Ok(BulkReorder {
            container: Container::for_kind(kind, self.container_id),
            ordered: self.ordered_item_ids,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_index_rejected() {
        let request = MoveRequest {
            item_id: Uuid::new_v4(),
            container_id: None,
            target_index: -1,
        };
        let err = request.validate(ContainerKind::Cards).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_destination_follows_kind() {
        let list_id = Uuid::new_v4();
        let request = MoveRequest {
            item_id: Uuid::new_v4(),
            container_id: Some(list_id),
            target_index: 3,
        };
        let validated = request.validate(ContainerKind::Cards).unwrap();
        assert_eq!(validated.destination(), Some(Container::List(list_id)));
        assert_eq!(validated.target_index(), 3);
    }

    #[test]
    fn test_bulk_duplicates_rejected() {
        let id = Uuid::new_v4();
        let request = BulkReorderRequest {
            container_id: Uuid::new_v4(),
            ordered_item_ids: vec![id, Uuid::new_v4(), id],
        };
        assert!(request.validate(ContainerKind::Lists).is_err());
    }

    #[test]
    fn test_deserializes_without_container() {
        let json = format!(
            r#"{{"item_id":"{}","target_index":0}}"#,
            Uuid::new_v4()
        );
        let request: MoveRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(request.container_id, None);
    }
}
