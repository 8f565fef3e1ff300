use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::board::BoardId;
use crate::order_key::OrderKey;

pub type ListId = Uuid;

/// A column of cards on a board.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct List {
    pub id: ListId,
    pub board_id: BoardId,
    pub title: String,
    pub order: OrderKey,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl List {
    pub fn new(board_id: BoardId, title: String, order: OrderKey) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            board_id,
            title,
            order,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn update_order(&mut self, order: OrderKey) {
        self.order = order;
        self.updated_at = Utc::now();
    }
}
