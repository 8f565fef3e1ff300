use kanban_core::{KanbanError, KanbanResult};
use kanban_domain::{BoardId, DueReminder, UserId};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

use crate::event::ServerEvent;
use crate::session::SessionRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchTarget {
    /// Every connected session of these users.
    Users(Vec<UserId>),
    /// Every session watching the board.
    Board(BoardId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRequest {
    pub event: ServerEvent,
    pub target: DispatchTarget,
}

impl DispatchRequest {
    /// Reminder notification for the reminder's owner.
    pub fn reminder(due: &DueReminder) -> Self {
        Self {
            event: ServerEvent::reminder(due),
            target: DispatchTarget::Users(vec![due.reminder.user_id]),
        }
    }

    pub fn to_board(board_id: BoardId, event: ServerEvent) -> Self {
        Self {
            event,
            target: DispatchTarget::Board(board_id),
        }
    }
}

/// Outcome of pushing one or more events to sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub delivered: usize,
    /// Target users with no connected session.
    pub missed: usize,
    /// Sessions whose buffer was full or closed.
    pub failed: usize,
}

impl DeliveryReport {
    pub fn absorb(&mut self, other: DeliveryReport) {
        self.delivered += other.delivered;
        self.missed += other.missed;
        self.failed += other.failed;
    }
}

/// Producer side of the dispatch queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct DispatchQueue {
    sender: mpsc::Sender<DispatchRequest>,
    capacity: usize,
}

pub struct DispatchReceiver {
    receiver: mpsc::Receiver<DispatchRequest>,
}

/// Bounded queue between producers (scanner, reorder publishers) and the
/// dispatcher task.
pub fn dispatch_channel(capacity: usize) -> (DispatchQueue, DispatchReceiver) {
    let capacity = capacity.max(1);
    let (sender, receiver) = mpsc::channel(capacity);
    (
        DispatchQueue { sender, capacity },
        DispatchReceiver { receiver },
    )
}

impl DispatchQueue {
    /// Never waits: a full queue is reported as [`KanbanError::QueueFull`].
    pub fn try_enqueue(&self, request: DispatchRequest) -> KanbanResult<()> {
        match self.sender.try_send(request) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(KanbanError::QueueFull(self.capacity)),
            Err(TrySendError::Closed(_)) => Err(KanbanError::Dispatch(
                "dispatch queue is closed".to_string(),
            )),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Requests that can be enqueued right now without hitting
    /// [`KanbanError::QueueFull`]. Zero once the dispatcher is gone.
    pub fn free_slots(&self) -> usize {
        if self.sender.is_closed() {
            0
        } else {
            self.sender.capacity()
        }
    }
}

impl DispatchReceiver {
    pub async fn recv(&mut self) -> Option<DispatchRequest> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<DispatchRequest> {
        self.receiver.try_recv().ok()
    }
}

/// Delivers queued events to connected sessions. Best effort: nothing is
/// stored for users who are offline, and failed deliveries are not retried.
#[derive(Clone)]
pub struct Dispatcher {
    registry: SessionRegistry,
}

impl Dispatcher {
    pub fn new(registry: SessionRegistry) -> Self {
        Self { registry }
    }

    pub fn deliver(&self, request: &DispatchRequest) -> DeliveryReport {
        let report = match &request.target {
            DispatchTarget::Users(users) => self.registry.send_to_users(users, &request.event),
            DispatchTarget::Board(board_id) => {
                self.registry.send_to_board(*board_id, &request.event)
            }
        };

        if report.failed > 0 {
            tracing::warn!(
                event_type = request.event.event_type(),
                failed = report.failed,
                delivered = report.delivered,
                "Some sessions did not receive event"
            );
        } else {
            tracing::debug!(
                event_type = request.event.event_type(),
                delivered = report.delivered,
                missed = report.missed,
                "Event dispatched"
            );
        }
        report
    }

    /// Drain the queue until every producer has been dropped.
    pub async fn run(self, mut receiver: DispatchReceiver) -> DeliveryReport {
        let mut total = DeliveryReport::default();
        while let Some(request) = receiver.recv().await {
            total.absorb(self.deliver(&request));
        }
        tracing::info!(
            delivered = total.delivered,
            missed = total.missed,
            failed = total.failed,
            "Dispatcher stopped"
        );
        total
    }

    pub fn spawn(self, receiver: DispatchReceiver) -> JoinHandle<DeliveryReport> {
        tokio::spawn(self.run(receiver))
    }
}
