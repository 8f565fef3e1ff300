use chrono::{DateTime, Utc};
use kanban_core::{KanbanError, KanbanResult, ScannerSettings};
use kanban_domain::ReminderStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::dispatcher::{DispatchQueue, DispatchRequest};

/// Counts from one scanner run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub claimed: usize,
    pub enqueued: usize,
    /// Claimed but not handed to the dispatcher. These stay `sent` and are
    /// not retried.
    pub failed: usize,
}

impl ScanReport {
    pub fn absorb(&mut self, other: ScanReport) {
        self.claimed += other.claimed;
        self.enqueued += other.enqueued;
        self.failed += other.failed;
    }
}

/// Periodically claims due reminders and queues them for delivery.
pub struct ReminderScanner {
    store: Arc<dyn ReminderStore>,
    queue: DispatchQueue,
    interval: Duration,
    batch_size: usize,
    claim_timeout: Duration,
}

impl ReminderScanner {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        queue: DispatchQueue,
        settings: &ScannerSettings,
    ) -> Self {
        Self {
            store,
            queue,
            interval: settings.interval(),
            batch_size: settings.batch_size.max(1),
            claim_timeout: settings.run_timeout(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Claim everything due at `now`, batch by batch, and enqueue each claimed
    /// reminder as soon as its batch returns.
    ///
    /// A batch never asks for more than the queue can take, so a backlog
    /// larger than the queue stays unclaimed for the next run instead of
    /// being marked sent and dropped.
    pub async fn run_once(&self, now: DateTime<Utc>) -> KanbanResult<ScanReport> {
        let mut report = ScanReport::default();
        loop {
            let room = self.queue.free_slots();
            if room == 0 {
                tracing::debug!(
                    capacity = self.queue.capacity(),
                    "Dispatch queue has no room, leaving due reminders for the next run"
                );
                break;
            }
            let limit = self.batch_size.min(room);

            let claim = self.store.claim_due(now, limit);
            let batch = time::timeout(self.claim_timeout, claim)
                .await
                .map_err(|_| {
                    KanbanError::Internal(format!(
                        "reminder claim timed out after {:?}",
                        self.claim_timeout
                    ))
                })??;
            let exhausted = batch.len() < limit;
            report.claimed += batch.len();

            for due in &batch {
                match self.queue.try_enqueue(DispatchRequest::reminder(due)) {
                    Ok(()) => report.enqueued += 1,
                    Err(e) => {
                        report.failed += 1;
                        tracing::warn!(
                            reminder_id = %due.reminder.id,
                            card_id = %due.reminder.card_id,
                            error = %e,
                            "Failed to hand reminder to dispatcher"
                        );
                    }
                }
            }

            if exhausted {
                break;
            }
        }
        Ok(report)
    }

    /// Run on a fixed interval until `shutdown` is cancelled. Runs never
    /// overlap; cancellation is only observed between runs.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = time::interval(self.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::info!(interval = ?self.interval, "Reminder scanner started");

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {}
                }

                match self.run_once(Utc::now()).await {
                    Ok(report) if report.claimed > 0 => {
                        tracing::info!(
                            claimed = report.claimed,
                            enqueued = report.enqueued,
                            failed = report.failed,
                            "Dispatched due reminders"
                        );
                    }
                    Ok(_) => tracing::debug!("No due reminders"),
                    Err(e) => tracing::error!(error = %e, "Reminder scan failed"),
                }
            }

            tracing::info!("Reminder scanner stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::dispatch_channel;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use kanban_domain::{CardId, DueReminder, Reminder, ReminderId, ReminderType};
    use mockall::mock;
    use uuid::Uuid;

    mock! {
        Reminders {}

        #[async_trait]
        impl ReminderStore for Reminders {
            async fn schedule(&self, reminder: Reminder) -> KanbanResult<Reminder>;
            async fn cancel(&self, id: ReminderId) -> KanbanResult<()>;
            async fn reminders_for_card(&self, card_id: CardId) -> KanbanResult<Vec<Reminder>>;
            async fn claim_due(
                &self,
                now: DateTime<Utc>,
                limit: usize,
            ) -> KanbanResult<Vec<DueReminder>>;
        }
    }

    fn due() -> DueReminder {
        DueReminder {
            reminder: Reminder::new(
                Uuid::new_v4(),
                Uuid::new_v4(),
                Utc::now() - ChronoDuration::seconds(1),
                ReminderType::Custom,
            ),
            card_title: "Invoice".to_string(),
            due_date: None,
            list_id: Uuid::new_v4(),
            board_id: Uuid::new_v4(),
        }
    }

    fn settings(batch_size: usize) -> ScannerSettings {
        ScannerSettings {
            batch_size,
            ..ScannerSettings::default()
        }
    }

    #[tokio::test]
    async fn test_full_batches_keep_claiming() {
        let mut store = MockReminders::new();
        let mut seq = mockall::Sequence::new();
        store
            .expect_claim_due()
            .withf(|_, limit| *limit == 2)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(vec![due(), due()]));
        store
            .expect_claim_due()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(vec![due()]));

        let (queue, mut receiver) = dispatch_channel(8);
        let scanner = ReminderScanner::new(Arc::new(store), queue, &settings(2));
        let report = scanner.run_once(Utc::now()).await.unwrap();

        assert_eq!(report.claimed, 3);
        assert_eq!(report.enqueued, 3);
        let mut queued = 0;
        while receiver.try_recv().is_some() {
            queued += 1;
        }
        assert_eq!(queued, 3);
    }

    #[tokio::test]
    async fn test_claims_are_capped_at_free_queue_slots() {
        let mut store = MockReminders::new();
        store
            .expect_claim_due()
            .withf(|_, limit| *limit == 3)
            .times(1)
            .returning(|_, _| Ok(vec![due(), due(), due()]));

        let (queue, _receiver) = dispatch_channel(3);
        let scanner = ReminderScanner::new(Arc::new(store), queue, &settings(10));
        let report = scanner.run_once(Utc::now()).await.unwrap();

        assert_eq!(
            report,
            ScanReport {
                claimed: 3,
                enqueued: 3,
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn test_full_queue_skips_claiming() {
        let mut store = MockReminders::new();
        store.expect_claim_due().never();

        let (queue, _receiver) = dispatch_channel(1);
        queue.try_enqueue(DispatchRequest::reminder(&due())).unwrap();
        let scanner = ReminderScanner::new(Arc::new(store), queue, &settings(10));

        assert_eq!(
            scanner.run_once(Utc::now()).await.unwrap(),
            ScanReport::default()
        );
    }

    #[tokio::test]
    async fn test_queue_filled_by_another_producer_is_counted_and_not_retried() {
        let (queue, _receiver) = dispatch_channel(2);
        let other_producer = queue.clone();

        let mut store = MockReminders::new();
        store
            .expect_claim_due()
            .withf(|_, limit| *limit == 2)
            .times(1)
            .returning(move |_, _| {
                other_producer
                    .try_enqueue(DispatchRequest::reminder(&due()))
                    .unwrap();
                Ok(vec![due(), due()])
            });

        let scanner = ReminderScanner::new(Arc::new(store), queue, &settings(10));
        let report = scanner.run_once(Utc::now()).await.unwrap();

        assert_eq!(
            report,
            ScanReport {
                claimed: 2,
                enqueued: 1,
                failed: 1
            }
        );
    }

    #[tokio::test]
    async fn test_store_error_propagates() {
        let mut store = MockReminders::new();
        store
            .expect_claim_due()
            .times(1)
            .returning(|_, _| Err(KanbanError::Database("disk I/O error".to_string())));

        let (queue, _receiver) = dispatch_channel(1);
        let scanner = ReminderScanner::new(Arc::new(store), queue, &settings(10));
        assert!(matches!(
            scanner.run_once(Utc::now()).await,
            Err(KanbanError::Database(_))
        ));
    }
}
