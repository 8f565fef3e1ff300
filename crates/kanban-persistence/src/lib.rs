pub mod conflict;
pub mod snapshot;
pub mod store;
pub mod traits;

pub use conflict::*;
pub use snapshot::DataSnapshot;
pub use store::*;
pub use traits::*;
