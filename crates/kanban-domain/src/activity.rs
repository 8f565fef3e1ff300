use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::container::{Container, ItemId};
use crate::order_key::OrderKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    ListMoved,
    CardMoved,
    ListsReordered,
    CardsReordered,
}

/// Audit entry for a position change, handed to the activity log after the
/// write has committed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityRecord {
    pub id: Uuid,
    pub kind: ActivityKind,
    /// The moved item; `None` for bulk reorders.
    pub item_id: Option<ItemId>,
    #[serde(default)]
    pub from: Option<Container>,
    pub to: Container,
    #[serde(default)]
    pub order: Option<OrderKey>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ActivityRecord {
    pub fn moved(item_id: ItemId, from: Container, to: Container, order: OrderKey) -> Self {
        let kind = match to {
            Container::Board(_) => ActivityKind::ListMoved,
            Container::List(_) => ActivityKind::CardMoved,
        };
        let message = if from == to {
            format!("Moved {} within {} to {}", item_id, to, order)
        } else {
            format!("Moved {} from {} to {} at {}", item_id, from, to, order)
        };
        Self {
            id: Uuid::new_v4(),
            kind,
            item_id: Some(item_id),
            from: Some(from),
            to,
            order: Some(order),
            message,
            timestamp: Utc::now(),
        }
    }

    pub fn reordered(container: Container, count: usize) -> Self {
        let kind = match container {
            Container::Board(_) => ActivityKind::ListsReordered,
            Container::List(_) => ActivityKind::CardsReordered,
        };
        Self {
            id: Uuid::new_v4(),
            kind,
            item_id: None,
            from: None,
            to: container,
            order: None,
            message: format!("Reordered {} items in {}", count, container),
            timestamp: Utc::now(),
        }
    }
}
