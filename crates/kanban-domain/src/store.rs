//! Storage seams of the ordering and reminder engines.
//!
//! Backends live in `kanban-persistence`; the engines only see these traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kanban_core::KanbanResult;

use crate::activity::ActivityRecord;
use crate::card::CardId;
use crate::container::{Container, ContainerKind, ContainerSnapshot, ItemId, Version};
use crate::order_key::OrderKey;
use crate::reminder::{DueReminder, Reminder, ReminderId};

/// New order keys for members of one container.
pub type Positions = Vec<(ItemId, OrderKey)>;

/// Atomic move of one item into another container of the same kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub item_id: ItemId,
    pub from: Container,
    pub from_version: Version,
    pub to: Container,
    pub to_version: Version,
    /// Keys for the destination after the move, including the moved item.
    pub positions: Positions,
}

/// Owner of all order keys.
///
/// Every write is all-or-nothing and guarded by the container's version
/// stamp: a write carrying a stale `expected` version fails with
/// [`KanbanError::Conflict`](kanban_core::KanbanError::Conflict) and changes
/// nothing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderingStore: Send + Sync {
    /// Members sorted by ascending key, with the current version.
    async fn get_siblings(&self, container: Container) -> KanbanResult<ContainerSnapshot>;

    /// Apply `positions` to members of `container`; returns the new version.
    /// Fails with `Validation` if an id is not a member or keys would collide.
    async fn set_positions(
        &self,
        container: Container,
        expected: Version,
        positions: Positions,
    ) -> KanbanResult<Version>;

    /// Change the item's parent and apply the destination keys in one unit.
    /// Returns the new `(from, to)` versions.
    async fn transfer(&self, transfer: Transfer) -> KanbanResult<(Version, Version)>;

    /// The container currently holding `item_id`.
    async fn locate(&self, kind: ContainerKind, item_id: ItemId) -> KanbanResult<Container>;
}

#[async_trait]
pub trait ReminderStore: Send + Sync {
    async fn schedule(&self, reminder: Reminder) -> KanbanResult<Reminder>;

    async fn cancel(&self, id: ReminderId) -> KanbanResult<()>;

    async fn reminders_for_card(&self, card_id: CardId) -> KanbanResult<Vec<Reminder>>;

    /// Flip `sent` to true on up to `limit` reminders with
    /// `sent = false AND reminder_time <= now`, as one conditional update.
    ///
    /// Concurrent callers never receive the same reminder.
    async fn claim_due(&self, now: DateTime<Utc>, limit: usize) -> KanbanResult<Vec<DueReminder>>;
}

#[async_trait]
pub trait ActivityLog: Send + Sync {
    async fn record(&self, entry: ActivityRecord) -> KanbanResult<()>;
}
