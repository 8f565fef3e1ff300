pub mod config;
pub mod error;
pub mod result;

pub use config::{AppConfig, DispatcherSettings, ReorderSettings, ScannerSettings};
pub use error::KanbanError;
pub use result::KanbanResult;
