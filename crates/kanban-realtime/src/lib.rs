//! Reminder delivery: a periodic scanner claims due reminders and hands them
//! over a bounded queue to a dispatcher that pushes events to connected
//! sessions.

pub mod dispatcher;
pub mod event;
pub mod scanner;
pub mod service;
pub mod session;

pub use dispatcher::{
    dispatch_channel, DeliveryReport, DispatchQueue, DispatchReceiver, DispatchRequest,
    DispatchTarget, Dispatcher,
};
pub use event::{EventPayload, ReminderPayload, ReorderPayload, ServerEvent};
pub use scanner::{ReminderScanner, ScanReport};
pub use service::RealtimeService;
pub use session::{Session, SessionId, SessionRegistry};
