pub mod activity;
pub mod board;
pub mod card;
pub mod container;
pub mod list;
pub mod order_key;
pub mod reminder;
pub mod reorder;
pub mod requests;
pub mod store;

pub use activity::{ActivityKind, ActivityRecord};
pub use board::{Board, BoardId, OrganizationId};
pub use card::{Card, CardId, CardPriority, SprintId};
pub use container::{Container, ContainerKind, ContainerSnapshot, ItemId, Sibling, Version};
pub use list::{List, ListId};
pub use order_key::{OrderKey, PrecisionExhausted, KEY_SCALE, KEY_STEP, MAX_RAW};
pub use reminder::{DueReminder, Reminder, ReminderId, ReminderType, UserId};
pub use reorder::{ReorderEngine, ReorderOutcome};
pub use requests::{BulkReorder, BulkReorderRequest, MoveRequest, ValidatedMove};
pub use store::{ActivityLog, OrderingStore, Positions, ReminderStore, Transfer};
