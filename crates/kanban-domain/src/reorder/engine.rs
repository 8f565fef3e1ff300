use kanban_core::{KanbanError, KanbanResult, ReorderSettings};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use super::plan;
use crate::activity::ActivityRecord;
use crate::container::{Container, ContainerSnapshot, ItemId, Sibling};
use crate::requests::{BulkReorder, ValidatedMove};
use crate::store::{ActivityLog, OrderingStore, Transfer};

/// Final state of the containers touched by a reorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReorderOutcome {
    pub destination: ContainerSnapshot,
    /// Set for cross-container moves.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ContainerSnapshot>,
    pub renumbered: bool,
}

struct Applied {
    outcome: ReorderOutcome,
    activity: Option<ActivityRecord>,
}

/// Computes new order keys and writes them through an [`OrderingStore`].
///
/// Every operation is a read-modify-write against the container's version
/// stamp. A stale write is retried from a fresh read up to `max_attempts`
/// times before the conflict is returned to the caller.
pub struct ReorderEngine<S: ?Sized> {
    store: Arc<S>,
    activity: Option<Arc<dyn ActivityLog>>,
    max_attempts: u32,
}

impl<S: OrderingStore + ?Sized> ReorderEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            activity: None,
            max_attempts: ReorderSettings::default().max_attempts,
        }
    }

    pub fn with_settings(mut self, settings: &ReorderSettings) -> Self {
        self.max_attempts = settings.max_attempts.max(1);
        self
    }

    pub fn with_activity_log(mut self, log: Arc<dyn ActivityLog>) -> Self {
        self.activity = Some(log);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Route a validated request: a destination different from the item's
    /// current container makes it a cross-container move. Every attempt
    /// locates the item again, so a retry follows it to wherever a concurrent
    /// writer put it.
    pub async fn submit(&self, request: ValidatedMove) -> KanbanResult<ReorderOutcome> {
        let request = &request;
        self.retrying(request.item_id(), move |_| self.try_submit(request))
            .await
    }

    pub async fn move_within(
        &self,
        item_id: ItemId,
        container: Container,
        target_index: usize,
    ) -> KanbanResult<ReorderOutcome> {
        self.retrying(container, move |attempt| {
            self.try_move_within(item_id, container, target_index, Absent::on(attempt))
        })
        .await
    }

    pub async fn move_across(
        &self,
        item_id: ItemId,
        from: Container,
        to: Container,
        target_index: usize,
    ) -> KanbanResult<ReorderOutcome> {
        if from == to {
            return self.move_within(item_id, from, target_index).await;
        }
        check_across(item_id, from, to)?;
        self.retrying(to, move |attempt| {
            self.try_move_across(item_id, from, to, target_index, Absent::on(attempt))
        })
        .await
    }

    pub async fn bulk_reorder(&self, request: &BulkReorder) -> KanbanResult<ReorderOutcome> {
        self.retrying(request.container(), move |_| self.try_bulk_reorder(request))
            .await
    }

    async fn retrying<T, F, Fut>(
        &self,
        subject: T,
        mut attempt: F,
    ) -> KanbanResult<ReorderOutcome>
    where
        T: fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = KanbanResult<Applied>>,
    {
        for n in 1..=self.max_attempts {
            match attempt(n).await {
                Ok(applied) => {
                    if let Some(record) = applied.activity {
                        self.record(record).await;
                    }
                    return Ok(applied.outcome);
                }
                Err(KanbanError::Conflict(reason)) => {
                    tracing::debug!(
                        %subject,
                        attempt = n,
                        max_attempts = self.max_attempts,
                        %reason,
                        "Concurrent reorder detected, retrying against latest state"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        tracing::warn!(
            %subject,
            attempts = self.max_attempts,
            "Giving up on reorder after repeated conflicts"
        );
        Err(KanbanError::Conflict(format!(
            "{} kept changing during {} attempts; refetch and retry",
            subject, self.max_attempts
        )))
    }

    async fn record(&self, record: ActivityRecord) {
        if let Some(log) = &self.activity {
            if let Err(e) = log.record(record).await {
                tracing::warn!(error = %e, "Failed to record reorder activity");
            }
        }
    }

    async fn try_submit(&self, request: &ValidatedMove) -> KanbanResult<Applied> {
        let item_id = request.item_id();
        let current = self.store.locate(request.kind(), item_id).await?;
        match request.destination() {
            Some(destination) if destination != current => {
                check_across(item_id, current, destination)?;
                self.try_move_across(
                    item_id,
                    current,
                    destination,
                    request.target_index(),
                    Absent::Stale,
                )
                .await
            }
            _ => {
                self.try_move_within(item_id, current, request.target_index(), Absent::Stale)
                    .await
            }
        }
    }

    async fn try_move_within(
        &self,
        item_id: ItemId,
        container: Container,
        target_index: usize,
        absent: Absent,
    ) -> KanbanResult<Applied> {
        let snapshot = self.store.get_siblings(container).await?;
        let current = snapshot
            .position_of(item_id)
            .ok_or_else(|| absent.error(item_id, container))?;
        let others: Vec<Sibling> = snapshot
            .items
            .iter()
            .filter(|s| s.id != item_id)
            .copied()
            .collect();

        if target_index.min(others.len()) == current {
            return Ok(Applied {
                outcome: ReorderOutcome {
                    destination: snapshot,
                    source: None,
                    renumbered: false,
                },
                activity: None,
            });
        }

        let placement = plan::place(&others, item_id, target_index);
        let version = self
            .store
            .set_positions(container, snapshot.version, placement.positions)
            .await?;

        Ok(Applied {
            activity: Some(ActivityRecord::moved(
                item_id,
                container,
                container,
                placement.key,
            )),
            outcome: ReorderOutcome {
                destination: ContainerSnapshot::new(container, version, placement.sequence),
                source: None,
                renumbered: placement.renumbered,
            },
        })
    }

    async fn try_move_across(
        &self,
        item_id: ItemId,
        from: Container,
        to: Container,
        target_index: usize,
        absent: Absent,
    ) -> KanbanResult<Applied> {
        let source = self.store.get_siblings(from).await?;
        if !source.contains(item_id) {
            return Err(absent.error(item_id, from));
        }
        let destination = self.store.get_siblings(to).await?;
        if destination.contains(item_id) {
            return Err(KanbanError::Conflict(format!(
                "{} already appears in {}",
                item_id, to
            )));
        }

        let placement = plan::place(&destination.items, item_id, target_index);
        let (from_version, to_version) = self
            .store
            .transfer(Transfer {
                item_id,
                from,
                from_version: source.version,
                to,
                to_version: destination.version,
                positions: placement.positions,
            })
            .await?;

        let remaining = source
            .items
            .into_iter()
            .filter(|s| s.id != item_id)
            .collect();

        Ok(Applied {
            activity: Some(ActivityRecord::moved(item_id, from, to, placement.key)),
            outcome: ReorderOutcome {
                destination: ContainerSnapshot::new(to, to_version, placement.sequence),
                source: Some(ContainerSnapshot::new(from, from_version, remaining)),
                renumbered: placement.renumbered,
            },
        })
    }

    async fn try_bulk_reorder(&self, request: &BulkReorder) -> KanbanResult<Applied> {
        let container = request.container();
        let snapshot = self.store.get_siblings(container).await?;
        check_membership(&snapshot, request.ordered())?;

        let sequence = plan::spaced(request.ordered());
        if sequence == snapshot.items {
            return Ok(Applied {
                outcome: ReorderOutcome {
                    destination: snapshot,
                    source: None,
                    renumbered: false,
                },
                activity: None,
            });
        }

        let positions = sequence.iter().map(|s| (s.id, s.order)).collect();
        let version = self
            .store
            .set_positions(container, snapshot.version, positions)
            .await?;

        Ok(Applied {
            activity: Some(ActivityRecord::reordered(container, sequence.len())),
            outcome: ReorderOutcome {
                destination: ContainerSnapshot::new(container, version, sequence),
                source: None,
                renumbered: true,
            },
        })
    }
}

/// How to report an item missing from the container it was expected in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Absent {
    /// The caller named the wrong container.
    Invalid,
    /// The item was seen there earlier and a concurrent writer moved it.
    Stale,
}

impl Absent {
    /// The first attempt trusts the caller's container; later ones follow a
    /// conflict, so the item may have been moved away in between.
    fn on(attempt: u32) -> Self {
        if attempt > 1 {
            Absent::Stale
        } else {
            Absent::Invalid
        }
    }

    fn error(self, item_id: ItemId, container: Container) -> KanbanError {
        match self {
            Absent::Invalid => {
                KanbanError::Validation(format!("{} is not a member of {}", item_id, container))
            }
            Absent::Stale => KanbanError::Conflict(format!(
                "{} was moved out of {} by another writer",
                item_id, container
            )),
        }
    }
}

fn check_across(item_id: ItemId, from: Container, to: Container) -> KanbanResult<()> {
    if from.kind() != to.kind() {
        return Err(KanbanError::Validation(format!(
            "cannot move {} from {} to {}: containers hold different kinds",
            item_id, from, to
        )));
    }
    if let (Container::Board(_), Container::Board(_)) = (from, to) {
        return Err(KanbanError::Validation(format!(
            "list {} cannot move from {} to {}: lists stay on their board",
            item_id, from, to
        )));
    }
    Ok(())
}

fn check_membership(snapshot: &ContainerSnapshot, ordered: &[ItemId]) -> KanbanResult<()> {
    let missing: Vec<String> = snapshot
        .items
        .iter()
        .filter(|s| !ordered.contains(&s.id))
        .map(|s| s.id.to_string())
        .collect();
    let extra: Vec<String> = ordered
        .iter()
        .filter(|id| !snapshot.contains(**id))
        .map(|id| id.to_string())
        .collect();

    if missing.is_empty() && extra.is_empty() {
        return Ok(());
    }
    let mut problems = Vec::new();
    if !missing.is_empty() {
        problems.push(format!("missing [{}]", missing.join(", ")));
    }
    if !extra.is_empty() {
        problems.push(format!("not in container [{}]", extra.join(", ")));
    }
    Err(KanbanError::Validation(format!(
        "requested order does not match the members of {}: {}",
        snapshot.container,
        problems.join("; ")
    )))
}
