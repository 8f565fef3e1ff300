use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kanban_core::{KanbanError, KanbanResult};
use kanban_domain::{
    ActivityLog, ActivityRecord, Board, BoardId, Card, CardId, CardPriority, Container,
    ContainerKind, ContainerSnapshot, DueReminder, ItemId, List, ListId, OrderKey,
    OrderingStore, OrganizationId, Positions, Reminder, ReminderId, ReminderStore, ReminderType,
    Sibling, Transfer, Version,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite, Transaction};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

const SCHEMA: &str = include_str!("../schema.sql");

const REMINDER_COLUMNS: &str =
    "id, card_id, user_id, reminder_time_ms, reminder_type, sent, created_at";

/// SQLite-backed ordering, reminder and activity store.
///
/// Version stamps live in `container_versions` and are advanced with a
/// conditional `UPDATE ... WHERE version = ?` inside the same transaction as
/// the key writes. Reminder claims are a single `UPDATE ... WHERE sent = 0
/// ... RETURNING`, so concurrent scanners never share a row.
pub struct SqliteStore {
    path: PathBuf,
    pool: tokio::sync::OnceCell<Pool<Sqlite>>,
}

fn db_err(e: sqlx::Error) -> KanbanError {
    KanbanError::Database(e.to_string())
}

fn parse_uuid(raw: &str) -> KanbanResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| KanbanError::Database(format!("invalid id '{}': {}", raw, e)))
}

fn parse_time(raw: &str) -> KanbanResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| KanbanError::Database(format!("invalid timestamp '{}': {}", raw, e)))
}

fn from_millis(ms: i64) -> KanbanResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| KanbanError::Database(format!("invalid reminder time {}", ms)))
}

fn container_key(container: Container) -> String {
    match container {
        Container::Board(id) => format!("board:{}", id),
        Container::List(id) => format!("list:{}", id),
    }
}

/// Table holding the container's members and the column naming the parent.
fn member_table(container: Container) -> (&'static str, &'static str) {
    match container {
        Container::Board(_) => ("lists", "board_id"),
        Container::List(_) => ("cards", "list_id"),
    }
}

fn priority_label(priority: CardPriority) -> &'static str {
    match priority {
        CardPriority::Low => "low",
        CardPriority::Medium => "medium",
        CardPriority::High => "high",
        CardPriority::Critical => "critical",
    }
}

fn parse_priority(raw: &str) -> KanbanResult<CardPriority> {
    match raw {
        "low" => Ok(CardPriority::Low),
        "medium" => Ok(CardPriority::Medium),
        "high" => Ok(CardPriority::High),
        "critical" => Ok(CardPriority::Critical),
        other => Err(KanbanError::Database(format!("invalid priority '{}'", other))),
    }
}

impl SqliteStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            pool: tokio::sync::OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn pool(&self) -> KanbanResult<&Pool<Sqlite>> {
        self.pool
            .get_or_try_init(|| async {
                let options = SqliteConnectOptions::from_str(&format!(
                    "sqlite://{}?mode=rwc",
                    self.path.display()
                ))
                .map_err(db_err)?
                .create_if_missing(true)
                .foreign_keys(true)
                .busy_timeout(Duration::from_secs(5));

                let pool = SqlitePoolOptions::new()
                    .max_connections(5)
                    .connect_with(options)
                    .await
                    .map_err(db_err)?;

                sqlx::raw_sql(SCHEMA).execute(&pool).await.map_err(db_err)?;
                tracing::info!(path = %self.path.display(), "Opened SQLite store");

                Ok(pool)
            })
            .await
    }

    pub async fn create_board(
        &self,
        organization_id: OrganizationId,
        title: String,
    ) -> KanbanResult<Board> {
        let board = Board::new(organization_id, title);
        let mut tx = self.pool().await?.begin().await.map_err(db_err)?;

        sqlx::query(
            "INSERT INTO boards (id, organization_id, title, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(board.id.to_string())
        .bind(board.organization_id.to_string())
        .bind(&board.title)
        .bind(board.created_at.to_rfc3339())
        .bind(board.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        Self::register_container(&mut tx, Container::Board(board.id)).await?;

        tx.commit().await.map_err(db_err)?;
        Ok(board)
    }

    pub async fn create_list(&self, board_id: BoardId, title: String) -> KanbanResult<List> {
        let container = Container::Board(board_id);
        let mut tx = self.pool().await?.begin().await.map_err(db_err)?;

        let order = Self::append_key(&mut tx, container).await?;
        let list = List::new(board_id, title, order);
        sqlx::query(
            "INSERT INTO lists (id, board_id, title, order_key, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(list.id.to_string())
        .bind(board_id.to_string())
        .bind(&list.title)
        .bind(list.order.raw())
        .bind(list.created_at.to_rfc3339())
        .bind(list.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        Self::register_container(&mut tx, Container::List(list.id)).await?;

        tx.commit().await.map_err(db_err)?;
        Ok(list)
    }

    pub async fn create_card(
        &self,
        list_id: ListId,
        title: String,
        due_date: Option<DateTime<Utc>>,
        priority: Option<CardPriority>,
    ) -> KanbanResult<Card> {
        let container = Container::List(list_id);
        let mut tx = self.pool().await?.begin().await.map_err(db_err)?;

        let order = Self::append_key(&mut tx, container).await?;
        let card = Card::new(list_id, title, order)
            .with_due_date(due_date)
            .with_priority(priority);
        sqlx::query(
            "INSERT INTO cards (id, list_id, title, order_key, sprint_id, due_date, priority,
                                created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(card.id.to_string())
        .bind(list_id.to_string())
        .bind(&card.title)
        .bind(card.order.raw())
        .bind(card.sprint_id.map(|id| id.to_string()))
        .bind(card.due_date.map(|d| d.to_rfc3339()))
        .bind(card.priority.map(priority_label))
        .bind(card.created_at.to_rfc3339())
        .bind(card.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(card)
    }

    pub async fn card(&self, id: CardId) -> KanbanResult<Option<Card>> {
        let row = sqlx::query(
            "SELECT id, list_id, title, order_key, sprint_id, due_date, priority, created_at,
                    updated_at FROM cards WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(self.pool().await?)
        .await
        .map_err(db_err)?;
        row.map(|row| Self::row_to_card(&row)).transpose()
    }

    /// Reminders go with the card through the foreign key. Sibling keys are
    /// left untouched.
    pub async fn delete_card(&self, id: CardId) -> KanbanResult<()> {
        let mut tx = self.pool().await?.begin().await.map_err(db_err)?;
        let list_id: Option<String> = sqlx::query_scalar("SELECT list_id FROM cards WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        let list_id = list_id.ok_or_else(|| KanbanError::NotFound(format!("Card {}", id)))?;

        sqlx::query("DELETE FROM cards WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        sqlx::query("UPDATE container_versions SET version = version + 1 WHERE container = ?")
            .bind(container_key(Container::List(parse_uuid(&list_id)?)))
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)
    }

    /// Cards and their reminders go through the foreign keys. The board's
    /// version advances; sibling keys are left untouched.
    pub async fn delete_list(&self, id: ListId) -> KanbanResult<()> {
        let mut tx = self.pool().await?.begin().await.map_err(db_err)?;
        let board_id: Option<String> =
            sqlx::query_scalar("SELECT board_id FROM lists WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err)?;
        let board_id = board_id.ok_or_else(|| KanbanError::NotFound(format!("List {}", id)))?;

        sqlx::query("DELETE FROM lists WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        Self::forget_container(&mut tx, Container::List(id)).await?;
        sqlx::query("UPDATE container_versions SET version = version + 1 WHERE container = ?")
            .bind(container_key(Container::Board(parse_uuid(&board_id)?)))
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)
    }

    /// Removes the board, everything on it, and the version rows of the board
    /// and each of its lists.
    pub async fn delete_board(&self, id: BoardId) -> KanbanResult<()> {
        let mut tx = self.pool().await?.begin().await.map_err(db_err)?;
        let lists: Vec<String> = sqlx::query_scalar("SELECT id FROM lists WHERE board_id = ?")
            .bind(id.to_string())
            .fetch_all(&mut *tx)
            .await
            .map_err(db_err)?;

        let deleted = sqlx::query("DELETE FROM boards WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        if deleted.rows_affected() == 0 {
            return Err(KanbanError::NotFound(format!("Board {}", id)));
        }

        Self::forget_container(&mut tx, Container::Board(id)).await?;
        for list_id in &lists {
            Self::forget_container(&mut tx, Container::List(parse_uuid(list_id)?)).await?;
        }

        tx.commit().await.map_err(db_err)
    }

    async fn register_container(
        tx: &mut Transaction<'_, Sqlite>,
        container: Container,
    ) -> KanbanResult<()> {
        sqlx::query("INSERT INTO container_versions (container, version) VALUES (?, 0)")
            .bind(container_key(container))
            .execute(&mut **tx)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn forget_container(
        tx: &mut Transaction<'_, Sqlite>,
        container: Container,
    ) -> KanbanResult<()> {
        sqlx::query("DELETE FROM container_versions WHERE container = ?")
            .bind(container_key(container))
            .execute(&mut **tx)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Key after the current maximum; also bumps the container's version.
    async fn append_key(
        tx: &mut Transaction<'_, Sqlite>,
        container: Container,
    ) -> KanbanResult<OrderKey> {
        let bumped = sqlx::query(
            "UPDATE container_versions SET version = version + 1 WHERE container = ?",
        )
        .bind(container_key(container))
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;
        if bumped.rows_affected() == 0 {
            return Err(KanbanError::NotFound(container.to_string()));
        }

        let (table, parent) = member_table(container);
        let sql = format!("SELECT MAX(order_key) FROM {} WHERE {} = ?", table, parent);
        let max: Option<i64> = sqlx::query_scalar(&sql)
            .bind(container.id().to_string())
            .fetch_one(&mut **tx)
            .await
            .map_err(db_err)?;
        OrderKey::append_after(max.map(OrderKey::from_raw))
            .map_err(|e| KanbanError::Internal(e.to_string()))
    }

    async fn advance_version(
        tx: &mut Transaction<'_, Sqlite>,
        container: Container,
        expected: Version,
    ) -> KanbanResult<Version> {
        let key = container_key(container);
        let result = sqlx::query(
            "UPDATE container_versions SET version = version + 1
             WHERE container = ? AND version = ?",
        )
        .bind(&key)
        .bind(expected as i64)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;
        if result.rows_affected() == 1 {
            return Ok(expected + 1);
        }

        let actual: Option<i64> =
            sqlx::query_scalar("SELECT version FROM container_versions WHERE container = ?")
                .bind(&key)
                .fetch_optional(&mut **tx)
                .await
                .map_err(db_err)?;
        match actual {
            None => Err(KanbanError::NotFound(container.to_string())),
            Some(actual) => Err(KanbanError::Conflict(format!(
                "{} is at version {} (expected {})",
                container, actual, expected
            ))),
        }
    }

    async fn write_key(
        tx: &mut Transaction<'_, Sqlite>,
        container: Container,
        id: ItemId,
        order: OrderKey,
    ) -> KanbanResult<()> {
        let (table, parent) = member_table(container);
        let sql = format!(
            "UPDATE {} SET order_key = ?, updated_at = ? WHERE id = ? AND {} = ?",
            table, parent
        );
        let result = sqlx::query(&sql)
            .bind(order.raw())
            .bind(Utc::now().to_rfc3339())
            .bind(id.to_string())
            .bind(container.id().to_string())
            .execute(&mut **tx)
            .await
            .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(KanbanError::Validation(format!(
                "{} is not a member of {}",
                id, container
            )));
        }
        Ok(())
    }

    async fn check_distinct(
        tx: &mut Transaction<'_, Sqlite>,
        container: Container,
    ) -> KanbanResult<()> {
        let (table, parent) = member_table(container);
        let sql = format!(
            "SELECT COUNT(*) - COUNT(DISTINCT order_key) FROM {} WHERE {} = ?",
            table, parent
        );
        let duplicates: i64 = sqlx::query_scalar(&sql)
            .bind(container.id().to_string())
            .fetch_one(&mut **tx)
            .await
            .map_err(db_err)?;
        if duplicates > 0 {
            return Err(KanbanError::Validation(format!(
                "order keys would be duplicated in {}",
                container
            )));
        }
        Ok(())
    }

    fn row_to_card(row: &SqliteRow) -> KanbanResult<Card> {
        let sprint_id: Option<String> = row.try_get("sprint_id").map_err(db_err)?;
        let due_date: Option<String> = row.try_get("due_date").map_err(db_err)?;
        let priority: Option<String> = row.try_get("priority").map_err(db_err)?;
        Ok(Card {
            id: parse_uuid(&row.try_get::<String, _>("id").map_err(db_err)?)?,
            list_id: parse_uuid(&row.try_get::<String, _>("list_id").map_err(db_err)?)?,
            title: row.try_get("title").map_err(db_err)?,
            order: OrderKey::from_raw(row.try_get("order_key").map_err(db_err)?),
            sprint_id: sprint_id.as_deref().map(parse_uuid).transpose()?,
            due_date: due_date.as_deref().map(parse_time).transpose()?,
            priority: priority.as_deref().map(parse_priority).transpose()?,
            created_at: parse_time(&row.try_get::<String, _>("created_at").map_err(db_err)?)?,
            updated_at: parse_time(&row.try_get::<String, _>("updated_at").map_err(db_err)?)?,
        })
    }

    fn row_to_reminder(row: &SqliteRow) -> KanbanResult<Reminder> {
        let reminder_type: String = row.try_get("reminder_type").map_err(db_err)?;
        Ok(Reminder {
            id: parse_uuid(&row.try_get::<String, _>("id").map_err(db_err)?)?,
            card_id: parse_uuid(&row.try_get::<String, _>("card_id").map_err(db_err)?)?,
            user_id: parse_uuid(&row.try_get::<String, _>("user_id").map_err(db_err)?)?,
            reminder_time: from_millis(row.try_get("reminder_time_ms").map_err(db_err)?)?,
            reminder_type: ReminderType::from_str(&reminder_type).map_err(KanbanError::Database)?,
            sent: row.try_get::<i64, _>("sent").map_err(db_err)? != 0,
            created_at: parse_time(&row.try_get::<String, _>("created_at").map_err(db_err)?)?,
        })
    }
}

#[async_trait]
impl OrderingStore for SqliteStore {
    async fn get_siblings(&self, container: Container) -> KanbanResult<ContainerSnapshot> {
        let mut tx = self.pool().await?.begin().await.map_err(db_err)?;

        let version: Option<i64> =
            sqlx::query_scalar("SELECT version FROM container_versions WHERE container = ?")
                .bind(container_key(container))
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err)?;
        let version = version.ok_or_else(|| KanbanError::NotFound(container.to_string()))?;

        let (table, parent) = member_table(container);
        let sql = format!(
            "SELECT id, order_key FROM {} WHERE {} = ? ORDER BY order_key, id",
            table, parent
        );
        let items = sqlx::query(&sql)
            .bind(container.id().to_string())
            .fetch_all(&mut *tx)
            .await
            .map_err(db_err)?
            .iter()
            .map(|row| {
                Ok(Sibling {
                    id: parse_uuid(&row.try_get::<String, _>("id").map_err(db_err)?)?,
                    order: OrderKey::from_raw(row.try_get("order_key").map_err(db_err)?),
                })
            })
            .collect::<KanbanResult<Vec<_>>>()?;

        tx.commit().await.map_err(db_err)?;
        Ok(ContainerSnapshot::new(container, version as Version, items))
    }

    async fn set_positions(
        &self,
        container: Container,
        expected: Version,
        positions: Positions,
    ) -> KanbanResult<Version> {
        let mut tx = self.pool().await?.begin().await.map_err(db_err)?;

        let version = Self::advance_version(&mut tx, container, expected).await?;
        for (id, order) in positions {
            Self::write_key(&mut tx, container, id, order).await?;
        }
        Self::check_distinct(&mut tx, container).await?;

        tx.commit().await.map_err(db_err)?;
        tracing::debug!(%container, version, "Positions updated");
        Ok(version)
    }

    async fn transfer(&self, transfer: Transfer) -> KanbanResult<(Version, Version)> {
        let (from_list, to_list) = match (transfer.from, transfer.to) {
            (Container::List(a), Container::List(b)) if a != b => (a, b),
            (from, to) => {
                return Err(KanbanError::Validation(format!(
                    "cannot transfer {} from {} to {}",
                    transfer.item_id, from, to
                )))
            }
        };
        let key = transfer
            .positions
            .iter()
            .find(|(id, _)| *id == transfer.item_id)
            .map(|(_, key)| *key)
            .ok_or_else(|| {
                KanbanError::Validation(format!(
                    "no destination key given for {}",
                    transfer.item_id
                ))
            })?;

        let mut tx = self.pool().await?.begin().await.map_err(db_err)?;
        let from_version =
            Self::advance_version(&mut tx, transfer.from, transfer.from_version).await?;
        let to_version = Self::advance_version(&mut tx, transfer.to, transfer.to_version).await?;

        let moved = sqlx::query(
            "UPDATE cards SET list_id = ?, order_key = ?, updated_at = ?
             WHERE id = ? AND list_id = ?",
        )
        .bind(to_list.to_string())
        .bind(key.raw())
        .bind(Utc::now().to_rfc3339())
        .bind(transfer.item_id.to_string())
        .bind(from_list.to_string())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        if moved.rows_affected() == 0 {
            return Err(KanbanError::Validation(format!(
                "{} is not a member of {}",
                transfer.item_id, transfer.from
            )));
        }

        for (id, order) in transfer.positions {
            if id != transfer.item_id {
                Self::write_key(&mut tx, transfer.to, id, order).await?;
            }
        }
        Self::check_distinct(&mut tx, transfer.to).await?;

        tx.commit().await.map_err(db_err)?;
        Ok((from_version, to_version))
    }

    async fn locate(&self, kind: ContainerKind, item_id: ItemId) -> KanbanResult<Container> {
        let sql = match kind {
            ContainerKind::Lists => "SELECT board_id FROM lists WHERE id = ?",
            ContainerKind::Cards => "SELECT list_id FROM cards WHERE id = ?",
        };
        let parent: Option<String> = sqlx::query_scalar(sql)
            .bind(item_id.to_string())
            .fetch_optional(self.pool().await?)
            .await
            .map_err(db_err)?;
        let parent = parent.ok_or_else(|| KanbanError::NotFound(format!("Item {}", item_id)))?;
        Ok(Container::for_kind(kind, parse_uuid(&parent)?))
    }
}

#[async_trait]
impl ReminderStore for SqliteStore {
    async fn schedule(&self, reminder: Reminder) -> KanbanResult<Reminder> {
        let pool = self.pool().await?;
        let card_exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM cards WHERE id = ?")
            .bind(reminder.card_id.to_string())
            .fetch_optional(pool)
            .await
            .map_err(db_err)?;
        if card_exists.is_none() {
            return Err(KanbanError::NotFound(format!("Card {}", reminder.card_id)));
        }

        sqlx::query(
            "INSERT INTO reminders (id, card_id, user_id, reminder_time_ms, reminder_type, sent,
                                    created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(reminder.id.to_string())
        .bind(reminder.card_id.to_string())
        .bind(reminder.user_id.to_string())
        .bind(reminder.reminder_time.timestamp_millis())
        .bind(reminder.reminder_type.as_str())
        .bind(reminder.sent as i64)
        .bind(reminder.created_at.to_rfc3339())
        .execute(pool)
        .await
        .map_err(db_err)?;
        Ok(reminder)
    }

    async fn cancel(&self, id: ReminderId) -> KanbanResult<()> {
        let result = sqlx::query("DELETE FROM reminders WHERE id = ?")
            .bind(id.to_string())
            .execute(self.pool().await?)
            .await
            .map_err(db_err)?;
        if result.rows_affected() == 0 {
            return Err(KanbanError::NotFound(format!("Reminder {}", id)));
        }
        Ok(())
    }

    async fn reminders_for_card(&self, card_id: CardId) -> KanbanResult<Vec<Reminder>> {
        let sql = format!(
            "SELECT {} FROM reminders WHERE card_id = ? ORDER BY reminder_time_ms, id",
            REMINDER_COLUMNS
        );
        sqlx::query(&sql)
            .bind(card_id.to_string())
            .fetch_all(self.pool().await?)
            .await
            .map_err(db_err)?
            .iter()
            .map(Self::row_to_reminder)
            .collect()
    }

    async fn claim_due(&self, now: DateTime<Utc>, limit: usize) -> KanbanResult<Vec<DueReminder>> {
        let pool = self.pool().await?;
        let sql = format!(
            "UPDATE reminders SET sent = 1
             WHERE sent = 0 AND id IN (
                 SELECT id FROM reminders
                 WHERE sent = 0 AND reminder_time_ms <= ?
                 ORDER BY reminder_time_ms, id
                 LIMIT ?)
             RETURNING {}",
            REMINDER_COLUMNS
        );
        let mut claimed = sqlx::query(&sql)
            .bind(now.timestamp_millis())
            .bind(limit as i64)
            .fetch_all(pool)
            .await
            .map_err(db_err)?
            .iter()
            .map(Self::row_to_reminder)
            .collect::<KanbanResult<Vec<_>>>()?;
        claimed.sort_by_key(|r| (r.reminder_time, r.id));

        let mut due = Vec::with_capacity(claimed.len());
        for reminder in claimed {
            let context = sqlx::query(
                "SELECT c.title, c.due_date, c.list_id, l.board_id
                 FROM cards c JOIN lists l ON l.id = c.list_id
                 WHERE c.id = ?",
            )
            .bind(reminder.card_id.to_string())
            .fetch_optional(pool)
            .await
            .map_err(db_err)?;
            let Some(row) = context else {
                tracing::warn!(
                    reminder_id = %reminder.id,
                    card_id = %reminder.card_id,
                    "Claimed reminder has no card context, dropping"
                );
                continue;
            };
            let due_date: Option<String> = row.try_get("due_date").map_err(db_err)?;
            due.push(DueReminder {
                card_title: row.try_get("title").map_err(db_err)?,
                due_date: due_date.as_deref().map(parse_time).transpose()?,
                list_id: parse_uuid(&row.try_get::<String, _>("list_id").map_err(db_err)?)?,
                board_id: parse_uuid(&row.try_get::<String, _>("board_id").map_err(db_err)?)?,
                reminder,
            });
        }
        Ok(due)
    }
}

#[async_trait]
impl ActivityLog for SqliteStore {
    async fn record(&self, entry: ActivityRecord) -> KanbanResult<()> {
        let data =
            serde_json::to_string(&entry).map_err(|e| KanbanError::Serialization(e.to_string()))?;
        sqlx::query("INSERT INTO activity (id, recorded_at, data) VALUES (?, ?, ?)")
            .bind(entry.id.to_string())
            .bind(entry.timestamp.to_rfc3339())
            .bind(data)
            .execute(self.pool().await?)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
