use kanban_core::{DispatcherSettings, KanbanError, KanbanResult};
use kanban_domain::{BoardId, UserId};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use crate::dispatcher::DeliveryReport;
use crate::event::ServerEvent;

pub type SessionId = Uuid;

struct SessionEntry {
    user_id: UserId,
    sender: mpsc::Sender<ServerEvent>,
    boards: HashSet<BoardId>,
}

#[derive(Default)]
struct RegistryState {
    sessions: HashMap<SessionId, SessionEntry>,
    closed: bool,
}

/// Receiving end of one connected client.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    user_id: UserId,
    receiver: mpsc::Receiver<ServerEvent>,
}

impl Session {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// `None` once the session was disconnected or the registry shut down
    /// and every buffered event has been read.
    pub async fn recv(&mut self) -> Option<ServerEvent> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<ServerEvent> {
        self.receiver.try_recv().ok()
    }
}

/// Connected sessions, shared by handle.
///
/// Created at process start, torn down with [`shutdown`](Self::shutdown).
/// Each session has its own bounded buffer; a slow client fills its buffer
/// and starts missing events without holding up anyone else.
#[derive(Clone)]
pub struct SessionRegistry {
    state: Arc<RwLock<RegistryState>>,
    buffer: usize,
}

impl SessionRegistry {
    pub fn new(buffer: usize) -> Self {
        Self {
            state: Arc::new(RwLock::new(RegistryState::default())),
            buffer: buffer.max(1),
        }
    }

    pub fn from_settings(settings: &DispatcherSettings) -> Self {
        Self::new(settings.session_buffer)
    }

    pub fn connect(&self, user_id: UserId) -> KanbanResult<Session> {
        let mut state = self.state.write();
        if state.closed {
            return Err(KanbanError::Dispatch(
                "session registry is shut down".to_string(),
            ));
        }

        let (sender, receiver) = mpsc::channel(self.buffer);
        let id = Uuid::new_v4();
        state.sessions.insert(
            id,
            SessionEntry {
                user_id,
                sender,
                boards: HashSet::new(),
            },
        );
        tracing::debug!(session_id = %id, %user_id, "Session connected");

        Ok(Session {
            id,
            user_id,
            receiver,
        })
    }

    /// Returns false if the session was already gone.
    pub fn disconnect(&self, session_id: SessionId) -> bool {
        let removed = self.state.write().sessions.remove(&session_id).is_some();
        if removed {
            tracing::debug!(%session_id, "Session disconnected");
        }
        removed
    }

    pub fn watch_board(&self, session_id: SessionId, board_id: BoardId) -> KanbanResult<()> {
        let mut state = self.state.write();
        let entry = state
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| KanbanError::NotFound(format!("Session {}", session_id)))?;
        entry.boards.insert(board_id);
        Ok(())
    }

    pub fn unwatch_board(&self, session_id: SessionId, board_id: BoardId) -> bool {
        self.state
            .write()
            .sessions
            .get_mut(&session_id)
            .map(|entry| entry.boards.remove(&board_id))
            .unwrap_or(false)
    }

    pub fn session_count(&self) -> usize {
        self.state.read().sessions.len()
    }

    pub fn is_connected(&self, user_id: UserId) -> bool {
        self.state
            .read()
            .sessions
            .values()
            .any(|entry| entry.user_id == user_id)
    }

    pub fn is_shut_down(&self) -> bool {
        self.state.read().closed
    }

    /// Drop every session; their receivers drain and then end. Later
    /// connects are refused.
    pub fn shutdown(&self) {
        let mut state = self.state.write();
        let count = state.sessions.len();
        state.sessions.clear();
        state.closed = true;
        tracing::info!(sessions = count, "Session registry shut down");
    }

    /// Push to every session of the given users. Users with no session are
    /// counted as missed.
    pub fn send_to_users(&self, users: &[UserId], event: &ServerEvent) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        let mut closed = Vec::new();
        {
            let state = self.state.read();
            for user_id in users {
                let mut reached = false;
                for (id, entry) in state.sessions.iter().filter(|(_, e)| e.user_id == *user_id) {
                    reached = true;
                    Self::push(*id, entry, event, &mut report, &mut closed);
                }
                if !reached {
                    report.missed += 1;
                }
            }
        }
        self.prune(closed);
        report
    }

    /// Push to every session watching the board.
    pub fn send_to_board(&self, board_id: BoardId, event: &ServerEvent) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        let mut closed = Vec::new();
        {
            let state = self.state.read();
            for (id, entry) in state
                .sessions
                .iter()
                .filter(|(_, e)| e.boards.contains(&board_id))
            {
                Self::push(*id, entry, event, &mut report, &mut closed);
            }
        }
        self.prune(closed);
        report
    }

    fn push(
        id: SessionId,
        entry: &SessionEntry,
        event: &ServerEvent,
        report: &mut DeliveryReport,
        closed: &mut Vec<SessionId>,
    ) {
        match entry.sender.try_send(event.clone()) {
            Ok(()) => report.delivered += 1,
            Err(TrySendError::Full(_)) => {
                tracing::debug!(session_id = %id, "Session buffer full, dropping event");
                report.failed += 1;
            }
            Err(TrySendError::Closed(_)) => {
                report.failed += 1;
                closed.push(id);
            }
        }
    }

    /// Receivers that were dropped without a disconnect.
    fn prune(&self, closed: Vec<SessionId>) {
        if closed.is_empty() {
            return;
        }
        let mut state = self.state.write();
        for id in closed {
            if state.sessions.remove(&id).is_some() {
                tracing::debug!(session_id = %id, "Removed session with closed receiver");
            }
        }
    }
}
