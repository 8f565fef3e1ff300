//! Order-key maintenance for drag-and-drop moves.

pub mod engine;
pub mod plan;

pub use engine::{ReorderEngine, ReorderOutcome};
pub use plan::{place, Placement};
