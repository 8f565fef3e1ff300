use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::list::ListId;
use crate::order_key::OrderKey;

pub type CardId = Uuid;
pub type SprintId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardPriority {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Card {
    pub id: CardId,
    pub list_id: ListId,
    pub title: String,
    pub order: OrderKey,
    #[serde(default)]
    pub sprint_id: Option<SprintId>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Option<CardPriority>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Card {
    pub fn new(list_id: ListId, title: String, order: OrderKey) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            list_id,
            title,
            order,
            sprint_id: None,
            due_date: None,
            priority: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_due_date(mut self, due_date: Option<DateTime<Utc>>) -> Self {
        self.due_date = due_date;
        self
    }

    pub fn with_priority(mut self, priority: Option<CardPriority>) -> Self {
        self.priority = priority;
        self
    }

    /// List and order change together; a card's position is fully
    /// determined by the pair.
    pub fn move_to_list(&mut self, list_id: ListId, order: OrderKey) {
        self.list_id = list_id;
        self.order = order;
        self.updated_at = Utc::now();
    }

    pub fn update_order(&mut self, order: OrderKey) {
        self.order = order;
        self.updated_at = Utc::now();
    }
}
