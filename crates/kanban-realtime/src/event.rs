use chrono::{DateTime, Utc};
use kanban_domain::{
    BoardId, CardId, Container, ContainerSnapshot, DueReminder, ListId, ReminderId, ReminderType,
    Sibling, Version,
};
use serde::{Deserialize, Serialize};

/// Envelope pushed to client sessions:
/// `{ "type": ..., "data": { ... }, "timestamp": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerEvent {
    #[serde(flatten)]
    pub payload: EventPayload,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EventPayload {
    Reminder(ReminderPayload),
    ListsReordered(ReorderPayload),
    CardsReordered(ReorderPayload),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderPayload {
    pub reminder_id: ReminderId,
    pub card_id: CardId,
    pub card_title: String,
    pub due_date: Option<DateTime<Utc>>,
    pub reminder_type: ReminderType,
    pub board_id: BoardId,
    pub list_id: ListId,
}

/// Final keys of a container after a reorder committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReorderPayload {
    pub board_id: BoardId,
    pub container: Container,
    pub version: Version,
    pub items: Vec<Sibling>,
}

impl From<&DueReminder> for ReminderPayload {
    fn from(due: &DueReminder) -> Self {
        Self {
            reminder_id: due.reminder.id,
            card_id: due.reminder.card_id,
            card_title: due.card_title.clone(),
            due_date: due.due_date,
            reminder_type: due.reminder.reminder_type,
            board_id: due.board_id,
            list_id: due.list_id,
        }
    }
}

impl ServerEvent {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            payload,
            timestamp: Utc::now(),
        }
    }

    pub fn reminder(due: &DueReminder) -> Self {
        Self::new(EventPayload::Reminder(due.into()))
    }

    pub fn reordered(board_id: BoardId, snapshot: &ContainerSnapshot) -> Self {
        let payload = ReorderPayload {
            board_id,
            container: snapshot.container,
            version: snapshot.version,
            items: snapshot.items.clone(),
        };
        Self::new(match snapshot.container {
            Container::Board(_) => EventPayload::ListsReordered(payload),
            Container::List(_) => EventPayload::CardsReordered(payload),
        })
    }

    /// Wire name of the event, as found in the `type` field.
    pub fn event_type(&self) -> &'static str {
        match self.payload {
            EventPayload::Reminder(_) => "reminder",
            EventPayload::ListsReordered(_) => "lists_reordered",
            EventPayload::CardsReordered(_) => "cards_reordered",
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
