use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kanban_core::{KanbanError, KanbanResult};
use kanban_domain::{
    ActivityLog, ActivityRecord, Board, BoardId, Card, CardId, CardPriority, Container,
    ContainerKind, ContainerSnapshot, DueReminder, ItemId, List, ListId, OrderKey,
    OrderingStore, OrganizationId, Positions, Reminder, ReminderId, ReminderStore, Sibling,
    Transfer, Version,
};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

use crate::snapshot::DataSnapshot;

#[derive(Default)]
struct State {
    boards: HashMap<BoardId, Board>,
    lists: HashMap<ListId, List>,
    cards: HashMap<CardId, Card>,
    reminders: HashMap<ReminderId, Reminder>,
    activity: Vec<ActivityRecord>,
    versions: HashMap<Container, Version>,
}

/// In-process ordering, reminder and activity store.
///
/// All state sits behind one non-poisoning lock that is only held for the
/// synchronous body of each call, never across an await. Order-key writes are
/// guarded by per-container version stamps, so a caller holding a stale read
/// gets a conflict instead of silently overwriting a concurrent move.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: DataSnapshot) -> Self {
        let state = State {
            boards: snapshot.boards.into_iter().map(|b| (b.id, b)).collect(),
            lists: snapshot.lists.into_iter().map(|l| (l.id, l)).collect(),
            cards: snapshot.cards.into_iter().map(|c| (c.id, c)).collect(),
            reminders: snapshot.reminders.into_iter().map(|r| (r.id, r)).collect(),
            activity: snapshot.activity,
            versions: HashMap::new(),
        };
        Self {
            state: RwLock::new(state),
        }
    }

    /// Export in a stable order (boards by creation, lists and cards by
    /// container then key).
    pub fn snapshot(&self) -> DataSnapshot {
        let state = self.state.read();

        let mut boards: Vec<Board> = state.boards.values().cloned().collect();
        boards.sort_by_key(|b| (b.created_at, b.id));
        let mut lists: Vec<List> = state.lists.values().cloned().collect();
        lists.sort_by_key(|l| (l.board_id, l.order, l.id));
        let mut cards: Vec<Card> = state.cards.values().cloned().collect();
        cards.sort_by_key(|c| (c.list_id, c.order, c.id));
        let mut reminders: Vec<Reminder> = state.reminders.values().cloned().collect();
        reminders.sort_by_key(|r| (r.reminder_time, r.id));

        DataSnapshot {
            boards,
            lists,
            cards,
            reminders,
            activity: state.activity.clone(),
        }
    }

    pub fn create_board(&self, organization_id: OrganizationId, title: String) -> Board {
        let board = Board::new(organization_id, title);
        self.state.write().boards.insert(board.id, board.clone());
        board
    }

    /// New lists go after the board's current last list.
    pub fn create_list(&self, board_id: BoardId, title: String) -> KanbanResult<List> {
        let mut state = self.state.write();
        let container = Container::Board(board_id);
        let max = state.members(container)?.last().map(|s| s.order);
        let order = OrderKey::append_after(max).map_err(|e| KanbanError::Internal(e.to_string()))?;

        let list = List::new(board_id, title, order);
        state.lists.insert(list.id, list.clone());
        state.bump(container);
        Ok(list)
    }

    /// New cards go after the list's current last card.
    pub fn create_card(
        &self,
        list_id: ListId,
        title: String,
        due_date: Option<DateTime<Utc>>,
        priority: Option<CardPriority>,
    ) -> KanbanResult<Card> {
        let mut state = self.state.write();
        let container = Container::List(list_id);
        let max = state.members(container)?.last().map(|s| s.order);
        let order = OrderKey::append_after(max).map_err(|e| KanbanError::Internal(e.to_string()))?;

        let card = Card::new(list_id, title, order)
            .with_due_date(due_date)
            .with_priority(priority);
        state.cards.insert(card.id, card.clone());
        state.bump(container);
        Ok(card)
    }

    pub fn delete_board(&self, board_id: BoardId) -> KanbanResult<()> {
        let mut state = self.state.write();
        if state.boards.remove(&board_id).is_none() {
            return Err(KanbanError::NotFound(format!("Board {}", board_id)));
        }
        let list_ids: Vec<ListId> = state
            .lists
            .values()
            .filter(|l| l.board_id == board_id)
            .map(|l| l.id)
            .collect();
        for list_id in list_ids {
            state.remove_list(list_id);
        }
        state.versions.remove(&Container::Board(board_id));
        Ok(())
    }

    /// Siblings keep their keys; the gap is harmless.
    pub fn delete_list(&self, list_id: ListId) -> KanbanResult<()> {
        let mut state = self.state.write();
        let board_id = state
            .lists
            .get(&list_id)
            .map(|l| l.board_id)
            .ok_or_else(|| KanbanError::NotFound(format!("List {}", list_id)))?;
        state.remove_list(list_id);
        state.bump(Container::Board(board_id));
        Ok(())
    }

    pub fn delete_card(&self, card_id: CardId) -> KanbanResult<()> {
        let mut state = self.state.write();
        let list_id = state
            .cards
            .get(&card_id)
            .map(|c| c.list_id)
            .ok_or_else(|| KanbanError::NotFound(format!("Card {}", card_id)))?;
        state.remove_card(card_id);
        state.bump(Container::List(list_id));
        Ok(())
    }

    pub fn board(&self, id: BoardId) -> Option<Board> {
        self.state.read().boards.get(&id).cloned()
    }

    pub fn list(&self, id: ListId) -> Option<List> {
        self.state.read().lists.get(&id).cloned()
    }

    pub fn card(&self, id: CardId) -> Option<Card> {
        self.state.read().cards.get(&id).cloned()
    }

    pub fn reminder(&self, id: ReminderId) -> Option<Reminder> {
        self.state.read().reminders.get(&id).cloned()
    }

    pub fn lists_on_board(&self, board_id: BoardId) -> Vec<List> {
        let state = self.state.read();
        let mut lists: Vec<List> = state
            .lists
            .values()
            .filter(|l| l.board_id == board_id)
            .cloned()
            .collect();
        lists.sort_by_key(|l| (l.order, l.id));
        lists
    }

    pub fn cards_in_list(&self, list_id: ListId) -> Vec<Card> {
        let state = self.state.read();
        let mut cards: Vec<Card> = state
            .cards
            .values()
            .filter(|c| c.list_id == list_id)
            .cloned()
            .collect();
        cards.sort_by_key(|c| (c.order, c.id));
        cards
    }

    pub fn activity(&self) -> Vec<ActivityRecord> {
        self.state.read().activity.clone()
    }
}

impl State {
    fn version(&self, container: Container) -> Version {
        self.versions.get(&container).copied().unwrap_or(0)
    }

    fn bump(&mut self, container: Container) -> Version {
        let version = self.versions.entry(container).or_insert(0);
        *version += 1;
        *version
    }

    fn exists(&self, container: Container) -> bool {
        match container {
            Container::Board(id) => self.boards.contains_key(&id),
            Container::List(id) => self.lists.contains_key(&id),
        }
    }

    fn members(&self, container: Container) -> KanbanResult<Vec<Sibling>> {
        if !self.exists(container) {
            return Err(KanbanError::NotFound(container.to_string()));
        }
        let mut items: Vec<Sibling> = match container {
            Container::Board(board_id) => self
                .lists
                .values()
                .filter(|l| l.board_id == board_id)
                .map(|l| Sibling {
                    id: l.id,
                    order: l.order,
                })
                .collect(),
            Container::List(list_id) => self
                .cards
                .values()
                .filter(|c| c.list_id == list_id)
                .map(|c| Sibling {
                    id: c.id,
                    order: c.order,
                })
                .collect(),
        };
        items.sort_by_key(|s| (s.order, s.id));
        Ok(items)
    }

    fn check_version(&self, container: Container, expected: Version) -> KanbanResult<()> {
        let actual = self.version(container);
        if actual != expected {
            return Err(KanbanError::Conflict(format!(
                "{} is at version {} (expected {})",
                container, actual, expected
            )));
        }
        Ok(())
    }

    /// Keys of `members` after overlaying `positions` must stay distinct.
    fn check_distinct(
        container: Container,
        members: &[Sibling],
        positions: &Positions,
    ) -> KanbanResult<()> {
        let overlay: HashMap<ItemId, OrderKey> = positions.iter().copied().collect();
        let mut seen = HashSet::with_capacity(members.len());
        for sibling in members {
            let key = overlay.get(&sibling.id).copied().unwrap_or(sibling.order);
            if !seen.insert(key) {
                return Err(KanbanError::Validation(format!(
                    "order key {} would be duplicated in {}",
                    key, container
                )));
            }
        }
        Ok(())
    }

    fn write_key(&mut self, container: Container, id: ItemId, order: OrderKey) {
        match container {
            Container::Board(_) => {
                if let Some(list) = self.lists.get_mut(&id) {
                    list.update_order(order);
                }
            }
            Container::List(_) => {
                if let Some(card) = self.cards.get_mut(&id) {
                    card.update_order(order);
                }
            }
        }
    }

    fn remove_list(&mut self, list_id: ListId) {
        self.lists.remove(&list_id);
        let card_ids: Vec<CardId> = self
            .cards
            .values()
            .filter(|c| c.list_id == list_id)
            .map(|c| c.id)
            .collect();
        for card_id in card_ids {
            self.remove_card(card_id);
        }
        self.versions.remove(&Container::List(list_id));
    }

    fn remove_card(&mut self, card_id: CardId) {
        self.cards.remove(&card_id);
        self.reminders.retain(|_, r| r.card_id != card_id);
    }

    fn due_context(&self, reminder: &Reminder) -> Option<DueReminder> {
        let card = self.cards.get(&reminder.card_id)?;
        let list = self.lists.get(&card.list_id)?;
        Some(DueReminder {
            reminder: reminder.clone(),
            card_title: card.title.clone(),
            due_date: card.due_date,
            list_id: list.id,
            board_id: list.board_id,
        })
    }
}

#[async_trait]
impl OrderingStore for MemoryStore {
    async fn get_siblings(&self, container: Container) -> KanbanResult<ContainerSnapshot> {
        let state = self.state.read();
        let items = state.members(container)?;
        Ok(ContainerSnapshot::new(
            container,
            state.version(container),
            items,
        ))
    }

    async fn set_positions(
        &self,
        container: Container,
        expected: Version,
        positions: Positions,
    ) -> KanbanResult<Version> {
        let mut state = self.state.write();
        let members = state.members(container)?;
        state.check_version(container, expected)?;

        if let Some((id, _)) = positions
            .iter()
            .find(|(id, _)| !members.iter().any(|s| s.id == *id))
        {
            return Err(KanbanError::Validation(format!(
                "{} is not a member of {}",
                id, container
            )));
        }
        State::check_distinct(container, &members, &positions)?;

        for (id, order) in positions {
            state.write_key(container, id, order);
        }
        let version = state.bump(container);
        tracing::debug!(%container, version, "Positions updated");
        Ok(version)
    }

    async fn transfer(&self, transfer: Transfer) -> KanbanResult<(Version, Version)> {
        let Transfer {
            item_id,
            from,
            from_version,
            to,
            to_version,
            positions,
        } = transfer;

        let (from_list, to_list) = match (from, to) {
            (Container::List(a), Container::List(b)) if a != b => (a, b),
            _ => {
                return Err(KanbanError::Validation(format!(
                    "cannot transfer {} from {} to {}",
                    item_id, from, to
                )))
            }
        };

        let mut state = self.state.write();
        let source = state.members(from)?;
        let mut destination = state.members(to)?;
        state.check_version(from, from_version)?;
        state.check_version(to, to_version)?;

        if !source.iter().any(|s| s.id == item_id) {
            return Err(KanbanError::Validation(format!(
                "{} is not a member of {}",
                item_id, from
            )));
        }
        let key = positions
            .iter()
            .find(|(id, _)| *id == item_id)
            .map(|(_, key)| *key)
            .ok_or_else(|| {
                KanbanError::Validation(format!("no destination key given for {}", item_id))
            })?;
        destination.push(Sibling {
            id: item_id,
            order: key,
        });
        if let Some((id, _)) = positions
            .iter()
            .find(|(id, _)| !destination.iter().any(|s| s.id == *id))
        {
            return Err(KanbanError::Validation(format!(
                "{} is not a member of {}",
                id, to
            )));
        }
        State::check_distinct(to, &destination, &positions)?;

        if let Some(card) = state.cards.get_mut(&item_id) {
            card.move_to_list(to_list, key);
        }
        for (id, order) in positions {
            state.write_key(to, id, order);
        }
        let versions = (state.bump(from), state.bump(to));
        tracing::debug!(
            card_id = %item_id,
            from = %from_list,
            to = %to_list,
            "Card transferred"
        );
        Ok(versions)
    }

    async fn locate(&self, kind: ContainerKind, item_id: ItemId) -> KanbanResult<Container> {
        let state = self.state.read();
        match kind {
            ContainerKind::Lists => state
                .lists
                .get(&item_id)
                .map(|l| Container::Board(l.board_id))
                .ok_or_else(|| KanbanError::NotFound(format!("List {}", item_id))),
            ContainerKind::Cards => state
                .cards
                .get(&item_id)
                .map(|c| Container::List(c.list_id))
                .ok_or_else(|| KanbanError::NotFound(format!("Card {}", item_id))),
        }
    }
}

#[async_trait]
impl ReminderStore for MemoryStore {
    async fn schedule(&self, reminder: Reminder) -> KanbanResult<Reminder> {
        let mut state = self.state.write();
        if !state.cards.contains_key(&reminder.card_id) {
            return Err(KanbanError::NotFound(format!("Card {}", reminder.card_id)));
        }
        if state.reminders.contains_key(&reminder.id) {
            return Err(KanbanError::Validation(format!(
                "reminder {} already exists",
                reminder.id
            )));
        }
        state.reminders.insert(reminder.id, reminder.clone());
        Ok(reminder)
    }

    async fn cancel(&self, id: ReminderId) -> KanbanResult<()> {
        self.state
            .write()
            .reminders
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| KanbanError::NotFound(format!("Reminder {}", id)))
    }

    async fn reminders_for_card(&self, card_id: CardId) -> KanbanResult<Vec<Reminder>> {
        let state = self.state.read();
        let mut reminders: Vec<Reminder> = state
            .reminders
            .values()
            .filter(|r| r.card_id == card_id)
            .cloned()
            .collect();
        reminders.sort_by_key(|r| (r.reminder_time, r.id));
        Ok(reminders)
    }

    async fn claim_due(&self, now: DateTime<Utc>, limit: usize) -> KanbanResult<Vec<DueReminder>> {
        let mut state = self.state.write();

        let mut due: Vec<(DateTime<Utc>, ReminderId)> = state
            .reminders
            .values()
            .filter(|r| r.is_due(now))
            .map(|r| (r.reminder_time, r.id))
            .collect();
        due.sort();
        due.truncate(limit);

        let mut claimed = Vec::with_capacity(due.len());
        for (_, id) in due {
            let Some(reminder) = state.reminders.get_mut(&id) else {
                continue;
            };
            if !reminder.claim() {
                continue;
            }
            let reminder = reminder.clone();
            match state.due_context(&reminder) {
                Some(context) => claimed.push(context),
                None => tracing::warn!(
                    reminder_id = %reminder.id,
                    card_id = %reminder.card_id,
                    "Claimed reminder has no card context, dropping"
                ),
            }
        }
        Ok(claimed)
    }
}

#[async_trait]
impl ActivityLog for MemoryStore {
    async fn record(&self, entry: ActivityRecord) -> KanbanResult<()> {
        self.state.write().activity.push(entry);
        Ok(())
    }
}
