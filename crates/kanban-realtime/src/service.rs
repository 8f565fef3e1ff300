use kanban_core::{AppConfig, KanbanError, KanbanResult};
use kanban_domain::{BoardId, ReminderStore, ReorderOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::dispatcher::{
    dispatch_channel, DeliveryReport, DispatchQueue, DispatchRequest, Dispatcher,
};
use crate::event::ServerEvent;
use crate::scanner::ReminderScanner;
use crate::session::SessionRegistry;

/// Owns the scanner and dispatcher tasks for the lifetime of the process.
pub struct RealtimeService {
    registry: SessionRegistry,
    queue: DispatchQueue,
    shutdown: CancellationToken,
    scanner: JoinHandle<()>,
    dispatcher: JoinHandle<DeliveryReport>,
}

impl RealtimeService {
    pub fn start(
        config: &AppConfig,
        store: Arc<dyn ReminderStore>,
        registry: SessionRegistry,
    ) -> Self {
        Self::start_with_interval(config, store, registry, config.scanner.interval())
    }

    /// Like [`start`](Self::start) with an explicit scan interval, for
    /// cadences finer than the config's whole seconds.
    pub fn start_with_interval(
        config: &AppConfig,
        store: Arc<dyn ReminderStore>,
        registry: SessionRegistry,
        interval: Duration,
    ) -> Self {
        let (queue, receiver) = dispatch_channel(config.dispatcher.queue_capacity);
        let dispatcher = Dispatcher::new(registry.clone()).spawn(receiver);

        let shutdown = CancellationToken::new();
        let scanner = ReminderScanner::new(store, queue.clone(), &config.scanner)
            .with_interval(interval)
            .spawn(shutdown.clone());

        tracing::info!(
            queue_capacity = queue.capacity(),
            interval = ?interval,
            "Realtime service started"
        );
        Self {
            registry,
            queue,
            shutdown,
            scanner,
            dispatcher,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn publish(&self, request: DispatchRequest) -> KanbanResult<()> {
        self.queue.try_enqueue(request)
    }

    /// Tell every session watching `board_id` about the containers a reorder
    /// touched.
    pub fn publish_reorder(
        &self,
        board_id: BoardId,
        outcome: &ReorderOutcome,
    ) -> KanbanResult<()> {
        let snapshots = std::iter::once(&outcome.destination).chain(outcome.source.as_ref());
        for snapshot in snapshots {
            self.publish(DispatchRequest::to_board(
                board_id,
                ServerEvent::reordered(board_id, snapshot),
            ))?;
        }
        Ok(())
    }

    /// Stop scanning after the in-flight run, deliver what is already queued,
    /// then close every session.
    pub async fn shutdown(self) -> KanbanResult<DeliveryReport> {
        self.shutdown.cancel();
        self.scanner
            .await
            .map_err(|e| KanbanError::Internal(format!("scanner task failed: {}", e)))?;

        drop(self.queue);
        let report = self
            .dispatcher
            .await
            .map_err(|e| KanbanError::Internal(format!("dispatcher task failed: {}", e)))?;

        self.registry.shutdown();
        tracing::info!("Realtime service stopped");
        Ok(report)
    }
}
